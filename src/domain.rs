use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

pub const LATEST_GPML_VERSION: &str = "2013a";
pub const GPML_NAMESPACE_BASE: &str = "http://pathvisio.org/GPML/";
pub const PATHWAY_IRI_BASE: &str = "http://identifiers.org/wikipathways/";

pub const TARGET_VOCABULARIES: [(&str, Option<&str>); 6] = [
    ("ChEBI", Some("P683")),
    ("Ensembl", Some("P594")),
    ("Entrez Gene", Some("P351")),
    ("HGNC", Some("P353")),
    ("HMDB", Some("P2057")),
    ("Wikidata", None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Plain,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Plain => write!(f, "plain"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathwayId(String);

impl PathwayId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathwayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PathwayId {
    type Err = ConvertError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let digits = normalized.strip_prefix("WP").unwrap_or("");
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(ConvertError::InvalidPathwayId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathwayTarget {
    pub id: PathwayId,
    pub iri: String,
    pub version: Option<String>,
}

impl PathwayTarget {
    pub fn resolve(
        pathway_id: Option<&str>,
        path_in: &str,
        pathway_version: Option<&str>,
    ) -> Result<Self, ConvertError> {
        let re_id_rev = Regex::new(r"(WP\d+)_r?(\d+)").unwrap();
        let re_id = Regex::new(r"WP\d+").unwrap();

        let hint = pathway_id.unwrap_or(path_in);
        let haystack = format!("{hint} {path_in}");

        let (id, found_version) = if let Some(caps) = re_id_rev.captures(&haystack) {
            (caps[1].to_string(), Some(caps[2].to_string()))
        } else if let Some(found) = re_id.find(&haystack) {
            (found.as_str().to_string(), None)
        } else {
            return Err(ConvertError::InvalidPathwayId(haystack));
        };

        let id: PathwayId = id.parse()?;
        let iri = match pathway_id {
            Some(value) if value.starts_with("http") => value.to_string(),
            _ => format!("{PATHWAY_IRI_BASE}{id}"),
        };
        let version = pathway_version.map(|value| value.to_string()).or(found_version);

        Ok(Self { id, iri, version })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPath {
    Exporter,
    Raster,
    Json,
    Svg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat {
    pub extension: String,
    pub path: ConversionPath,
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let extension = value.trim_start_matches('.').to_string();
        let path = match extension.as_str() {
            "gpml" | "owl" | "pdf" | "pwf" | "txt" => ConversionPath::Exporter,
            "png" => ConversionPath::Raster,
            "json" | "jsonld" => ConversionPath::Json,
            "svg" | "pvjssvg" => ConversionPath::Svg,
            _ => return Err(ConvertError::UnsupportedExtension(extension)),
        };
        Ok(Self { extension, path })
    }
}

pub fn gpml_version_from_namespace(namespace: &str) -> Option<&str> {
    namespace
        .strip_prefix(GPML_NAMESPACE_BASE)
        .filter(|version| !version.is_empty() && version.chars().all(|ch| ch.is_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_pathway_id_valid() {
        let id: PathwayId = "wp4542".parse().unwrap();
        assert_eq!(id.as_str(), "WP4542");
    }

    #[test]
    fn parse_pathway_id_invalid() {
        let err = "WPX".parse::<PathwayId>().unwrap_err();
        assert_matches!(err, ConvertError::InvalidPathwayId(_));
    }

    #[test]
    fn output_format_routing() {
        let svg: OutputFormat = "svg".parse().unwrap();
        assert_eq!(svg.path, ConversionPath::Svg);
        let png: OutputFormat = ".png".parse().unwrap();
        assert_eq!(png.path, ConversionPath::Raster);
        let err = "docx".parse::<OutputFormat>().unwrap_err();
        assert_matches!(err, ConvertError::UnsupportedExtension(ext) if ext == "docx");
    }

    #[test]
    fn gpml_namespace_version() {
        assert_eq!(
            gpml_version_from_namespace("http://pathvisio.org/GPML/2010a"),
            Some("2010a")
        );
        assert_eq!(gpml_version_from_namespace("http://www.w3.org/2000/svg"), None);
    }
}
