use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::ConvertError;
use crate::model::PathwayDocument;

const WORKING_SUFFIX: &str = "working";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PreValidation,
    PreBridge,
    PreKnowledgeGraph,
    PreOptimizer,
}

impl Stage {
    pub fn suffix(self) -> &'static str {
        match self {
            Stage::PreValidation => "pre_validation",
            Stage::PreBridge => "pre_bridgedb",
            Stage::PreKnowledgeGraph => "pre_wd",
            Stage::PreOptimizer => "pre_svgo",
        }
    }
}

pub trait Checkpoint {
    fn write_working(&self, document: &PathwayDocument) -> Result<(), ConvertError>;
    fn advance(&self, stage: Stage, document: &PathwayDocument) -> Result<(), ConvertError>;
}

pub struct NoCheckpoint;

impl Checkpoint for NoCheckpoint {
    fn write_working(&self, _document: &PathwayDocument) -> Result<(), ConvertError> {
        Ok(())
    }

    fn advance(&self, _stage: Stage, _document: &PathwayDocument) -> Result<(), ConvertError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Staging {
    dir: Utf8PathBuf,
    stub: String,
    ext: String,
    output: Utf8PathBuf,
    working: Utf8PathBuf,
}

impl Staging {
    /// The artifact is built at `<stub>.working.<ext>` next to `output` and
    /// only moves onto `output` through [`Staging::commit`].
    pub fn for_output(output: &Utf8Path) -> Result<Self, ConvertError> {
        let stub = output
            .file_stem()
            .ok_or_else(|| ConvertError::Filesystem(format!("invalid output path {output}")))?
            .to_string();
        let ext = output.extension().unwrap_or("json").to_string();
        let dir = match output.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };
        let working = dir.join(format!("{stub}.{WORKING_SUFFIX}.{ext}"));
        Ok(Self {
            dir,
            stub,
            ext,
            output: output.to_path_buf(),
            working,
        })
    }

    pub fn working_path(&self) -> &Utf8Path {
        &self.working
    }

    pub fn staged_path(&self, stage: Stage) -> Utf8PathBuf {
        self.dir
            .join(format!("{}.{}.{}", self.stub, stage.suffix(), self.ext))
    }

    pub fn commit(&self) -> Result<(), ConvertError> {
        fs::rename(self.working.as_std_path(), self.output.as_std_path())
            .map_err(|err| ConvertError::Filesystem(format!("commit {}: {err}", self.output)))?;
        tracing::debug!(path = %self.output, "committed artifact");
        Ok(())
    }

    pub fn write_staged(&self, stage: Stage, content: &[u8]) -> Result<Utf8PathBuf, ConvertError> {
        let path = self.staged_path(stage);
        write_bytes_atomic(&path, content)?;
        Ok(path)
    }
}

impl Checkpoint for Staging {
    fn write_working(&self, document: &PathwayDocument) -> Result<(), ConvertError> {
        write_bytes_atomic(&self.working, &document.to_vec()?)
    }

    fn advance(&self, stage: Stage, document: &PathwayDocument) -> Result<(), ConvertError> {
        if self.working.as_std_path().exists() {
            let staged = self.staged_path(stage);
            fs::rename(self.working.as_std_path(), staged.as_std_path())
                .map_err(|err| ConvertError::Filesystem(format!("stage {staged}: {err}")))?;
            tracing::debug!(path = %staged, "staged intermediate artifact");
        }
        self.write_working(document)
    }
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ConvertError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ConvertError::Filesystem(err.to_string()))?;
    let mut temp = Builder::new()
        .prefix(".gpml-convert")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ConvertError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| ConvertError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| ConvertError::Filesystem(err.to_string()))?;
    Ok(())
}
