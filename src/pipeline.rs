use std::fs;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::bridge_table::BridgeTable;
use crate::bridgedb::BridgeDbResolver;
use crate::config::Settings;
use crate::domain::{
    ConversionPath, LATEST_GPML_VERSION, OutputFormat, PathwayTarget, Theme,
    gpml_version_from_namespace,
};
use crate::enrich::{EnrichReport, Enricher};
use crate::error::ConvertError;
use crate::model::PathwayDocument;
use crate::sparql::KnowledgeGraphClient;
use crate::staging::{Stage, Staging, write_bytes_atomic};
use crate::svg::{NormalizeOptions, NormalizeReport, Normalizer, SvgDocument};
use crate::tools::{ExternalTool, SystemTool};

pub const DEFAULT_SCALE: u32 = 100;

#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub path_in: Utf8PathBuf,
    pub path_out: Utf8PathBuf,
    pub target: PathwayTarget,
    pub scale: u32,
    pub theme: Theme,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertResult {
    pub path_in: String,
    pub path_out: String,
    pub pathway_id: String,
    pub format: String,
    pub action: String,
    pub converted_at: Option<String>,
    pub upgraded_from: Option<String>,
    pub enrichment: Option<EnrichReport>,
    pub normalization: Option<NormalizeReport>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct ToolSet {
    pub gpml2pvjson: Box<dyn ExternalTool>,
    pub bridgedb: Box<dyn ExternalTool>,
    pub pvjs: Box<dyn ExternalTool>,
    pub svgo: Box<dyn ExternalTool>,
    pub pathvisio: Box<dyn ExternalTool>,
}

impl ToolSet {
    pub fn from_settings(settings: &Settings) -> Self {
        let timeout = settings.tool_timeout;
        let tools = &settings.tools;
        Self {
            gpml2pvjson: Box::new(SystemTool::new(&tools.gpml2pvjson, timeout)),
            bridgedb: Box::new(SystemTool::new(&tools.bridgedb, timeout)),
            pvjs: Box::new(SystemTool::new(&tools.pvjs, timeout)),
            svgo: Box::new(SystemTool::new(&tools.svgo, timeout)),
            pathvisio: Box::new(SystemTool::new(&tools.pathvisio, timeout)),
        }
    }
}

pub struct Converter<'a, K: KnowledgeGraphClient> {
    settings: Settings,
    table: &'a BridgeTable,
    knowledge_graph: K,
    tools: ToolSet,
}

#[derive(Default)]
struct Reports {
    enrichment: Option<EnrichReport>,
    normalization: Option<NormalizeReport>,
}

impl<'a, K: KnowledgeGraphClient> Converter<'a, K> {
    pub fn new(settings: Settings, table: &'a BridgeTable, knowledge_graph: K, tools: ToolSet) -> Self {
        Self {
            settings,
            table,
            knowledge_graph,
            tools,
        }
    }

    pub fn convert(
        &self,
        request: &ConvertRequest,
        sink: &dyn ProgressSink,
    ) -> Result<ConvertResult, ConvertError> {
        let path_in = request.path_in.as_path();
        let path_out = request.path_out.as_path();
        if !path_in.as_std_path().exists() {
            return Err(ConvertError::MissingInput(path_in.as_std_path().to_path_buf()));
        }

        let extension = path_out.extension().unwrap_or_default();
        let mut result = ConvertResult {
            path_in: path_in.to_string(),
            path_out: path_out.to_string(),
            pathway_id: request.target.id.to_string(),
            format: extension.to_string(),
            action: "skipped".to_string(),
            converted_at: None,
            upgraded_from: None,
            enrichment: None,
            normalization: None,
        };

        if path_out.as_std_path().exists() {
            tracing::info!(path = %path_out, "output already exists, skipping");
            sink.event(ProgressEvent {
                message: "phase=Resolve; output already exists".to_string(),
                elapsed: None,
            });
            return Ok(result);
        }

        if path_in.extension() != Some("gpml") {
            return Err(ConvertError::UnsupportedInput(format!(
                "only *.gpml input is accepted, got {path_in}"
            )));
        }
        let format: OutputFormat = extension.parse()?;

        if format.extension != "gpml" {
            result.upgraded_from = self.upgrade_schema(path_in, sink)?;
        }

        let start = Instant::now();
        let reports = match format.path {
            ConversionPath::Exporter => {
                self.export_output(path_in, path_out, None, sink)?;
                Reports::default()
            }
            ConversionPath::Raster => {
                self.export_output(path_in, path_out, Some(request.scale), sink)?;
                Reports::default()
            }
            ConversionPath::Json => Reports {
                enrichment: Some(self.gpml_to_json(path_in, path_out, &request.target, sink)?),
                normalization: None,
            },
            ConversionPath::Svg => {
                let json_path = sibling_model_path(path_in, path_out)?;
                let enrichment = if json_path.as_std_path().is_file() {
                    tracing::info!(path = %json_path, "reusing existing model");
                    None
                } else {
                    Some(self.gpml_to_json(path_in, &json_path, &request.target, sink)?)
                };
                let normalization = self.json_to_svg(&json_path, path_out, request.theme, sink)?;
                Reports {
                    enrichment,
                    normalization: Some(normalization),
                }
            }
        };
        sink.event(ProgressEvent {
            message: format!("phase=Done; wrote {path_out}"),
            elapsed: Some(start.elapsed()),
        });

        result.action = "converted".to_string();
        result.converted_at = Some(chrono::Utc::now().to_rfc3339());
        result.enrichment = reports.enrichment;
        result.normalization = reports.normalization;
        Ok(result)
    }

    /// Moves an outdated GPML file aside as `<stub>.<version>.gpml` and writes
    /// the upgraded document back to the original path.
    fn upgrade_schema(
        &self,
        path_in: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<Option<String>, ConvertError> {
        let Some(version) = gpml_schema_version(path_in)? else {
            tracing::debug!(path = %path_in, "no GPML namespace on root element");
            return Ok(None);
        };
        if version == LATEST_GPML_VERSION {
            return Ok(None);
        }

        let stub = path_in.file_stem().unwrap_or_default();
        let old_path = path_in.with_file_name(format!("{stub}.{version}.gpml"));
        sink.event(ProgressEvent {
            message: format!("phase=Upgrade; GPML {version} -> {LATEST_GPML_VERSION}"),
            elapsed: None,
        });
        fs::rename(path_in.as_std_path(), old_path.as_std_path())
            .map_err(|err| ConvertError::Filesystem(format!("rename {path_in}: {err}")))?;
        self.export(&old_path, path_in, None, sink)?;
        Ok(Some(version))
    }

    fn export_output(
        &self,
        path_in: &Utf8Path,
        path_out: &Utf8Path,
        scale: Option<u32>,
        sink: &dyn ProgressSink,
    ) -> Result<(), ConvertError> {
        let staging = Staging::for_output(path_out)?;
        self.export(path_in, staging.working_path(), scale, sink)?;
        staging.commit()
    }

    fn export(
        &self,
        path_in: &Utf8Path,
        path_out: &Utf8Path,
        scale: Option<u32>,
        sink: &dyn ProgressSink,
    ) -> Result<(), ConvertError> {
        sink.event(ProgressEvent {
            message: format!("phase=Export; {path_in} -> {path_out}"),
            elapsed: None,
        });
        let mut args = vec![
            "convert".to_string(),
            path_in.to_string(),
            path_out.to_string(),
        ];
        if let Some(scale) = scale {
            args.push(scale.to_string());
        }
        let tool = self.tools.pathvisio.as_ref();
        tool.invoke(&[], &args)?.into_success(tool.name())?;
        Ok(())
    }

    fn gpml_to_json(
        &self,
        path_in: &Utf8Path,
        path_out: &Utf8Path,
        target: &PathwayTarget,
        sink: &dyn ProgressSink,
    ) -> Result<EnrichReport, ConvertError> {
        sink.event(ProgressEvent {
            message: "phase=Model; converting GPML to JSON".to_string(),
            elapsed: None,
        });
        let gpml = read_file(path_in)?;
        let mut args = vec!["--id".to_string(), target.iri.clone()];
        if let Some(version) = &target.version {
            args.push("--pathway-version".to_string());
            args.push(version.clone());
        }
        let tool = self.tools.gpml2pvjson.as_ref();
        let raw = tool.invoke(&gpml, &args)?.into_success(tool.name())?;

        let staging = Staging::for_output(path_out)?;
        if self.settings.keep_pre_validation {
            staging.write_staged(Stage::PreValidation, &raw)?;
        }
        let document = PathwayDocument::from_slice(&raw)?;

        sink.event(ProgressEvent {
            message: "phase=Enrich; resolving cross-references".to_string(),
            elapsed: None,
        });
        let start = Instant::now();
        let resolver = BridgeDbResolver::new(self.tools.bridgedb.as_ref());
        let enricher = Enricher::new(self.table, &self.knowledge_graph, resolver)
            .with_batch_size(self.settings.batch_size);
        let outcome = enricher.enrich(document, &target.id, &staging)?;
        staging.commit()?;
        sink.event(ProgressEvent {
            message: format!("phase=Enrich; {} tags added", outcome.report.tags_added),
            elapsed: Some(start.elapsed()),
        });
        Ok(outcome.report)
    }

    fn json_to_svg(
        &self,
        json_path: &Utf8Path,
        path_out: &Utf8Path,
        theme: Theme,
        sink: &dyn ProgressSink,
    ) -> Result<NormalizeReport, ConvertError> {
        sink.event(ProgressEvent {
            message: format!("phase=Render; theme {theme}"),
            elapsed: None,
        });
        let model = read_file(json_path)?;
        let args = vec!["--theme".to_string(), theme.to_string()];
        let tool = self.tools.pvjs.as_ref();
        let rendered = tool.invoke(&model, &args)?.into_success(tool.name())?;
        let text =
            String::from_utf8(rendered).map_err(|err| ConvertError::SvgParse(err.to_string()))?;

        sink.event(ProgressEvent {
            message: "phase=Normalize; rewriting SVG".to_string(),
            elapsed: None,
        });
        let mut document = SvgDocument::parse(&text)?;
        let normalizer = Normalizer::new(NormalizeOptions {
            linkout_base: self.settings.linkout_base.clone(),
            ..NormalizeOptions::default()
        });
        let report = normalizer.normalize(&mut document)?;

        let xml = document.to_xml();
        let staging = Staging::for_output(path_out)?;
        staging.write_staged(Stage::PreOptimizer, xml.as_bytes())?;
        write_bytes_atomic(staging.working_path(), xml.as_bytes())?;

        sink.event(ProgressEvent {
            message: "phase=Optimize; running svgo".to_string(),
            elapsed: None,
        });
        let mut args = vec!["--multipass".to_string()];
        if let Some(config) = &self.settings.svgo_config {
            args.push("--config".to_string());
            args.push(config.display().to_string());
        }
        args.push(staging.working_path().to_string());
        let tool = self.tools.svgo.as_ref();
        tool.invoke(&[], &args)?.into_success(tool.name())?;
        staging.commit()?;
        Ok(report)
    }
}

pub fn sibling_model_path(path_in: &Utf8Path, path_out: &Utf8Path) -> Result<Utf8PathBuf, ConvertError> {
    let stub = path_in
        .file_stem()
        .ok_or_else(|| ConvertError::UnsupportedInput(path_in.to_string()))?;
    let dir = match path_out.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    Ok(dir.join(format!("{stub}.json")))
}

pub fn gpml_schema_version(path: &Utf8Path) -> Result<Option<String>, ConvertError> {
    let text = fs::read_to_string(path.as_std_path())
        .map_err(|err| ConvertError::Filesystem(format!("read {path}: {err}")))?;
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(&text, options)
        .map_err(|err| ConvertError::UnsupportedInput(format!("{path}: {err}")))?;
    Ok(doc
        .root_element()
        .tag_name()
        .namespace()
        .and_then(gpml_version_from_namespace)
        .map(str::to_string))
}

fn read_file(path: &Utf8Path) -> Result<Vec<u8>, ConvertError> {
    fs::read(path.as_std_path()).map_err(|err| ConvertError::Filesystem(format!("read {path}: {err}")))
}
