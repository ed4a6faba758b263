use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ConvertError {
    #[error("missing input file: {0}")]
    MissingInput(PathBuf),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("invalid output extension: '{0}'")]
    #[diagnostic(help(
        "supported extensions: gpml, owl, pdf, pwf, txt, png, json, jsonld, svg, pvjssvg"
    ))]
    UnsupportedExtension(String),

    #[error("no WikiPathways id found in {0}")]
    #[diagnostic(help("specify one with --pathway-id, e.g. --pathway-id WP4542"))]
    InvalidPathwayId(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("bridging table request failed: {0}")]
    BridgeTableHttp(String),

    #[error("bridging table returned status {status}: {message}")]
    BridgeTableStatus { status: u16, message: String },

    #[error("malformed bridging table: {0}")]
    BridgeTableParse(String),

    #[error("SPARQL request failed: {0}")]
    SparqlHttp(String),

    #[error("SPARQL endpoint returned status {status}: {message}")]
    SparqlStatus { status: u16, message: String },

    #[error("unexpected SPARQL response: {0}")]
    SparqlParse(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("{tool} did not finish within {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    #[error("failed to read pathway model: {0}")]
    ModelParse(String),

    #[error("failed to parse rendered SVG: {0}")]
    SvgParse(String),

    #[error("malformed rendered SVG: {0}")]
    #[diagnostic(help("the renderer produced output this converter does not accept"))]
    MalformedSvg(StructuralViolation),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralViolation {
    #[error("expected empty style sheets")]
    NonEmptyStylesheet,

    #[error("unexpected pattern {0}")]
    DisallowedPattern(String),

    #[error("unexpected style attribute on path element for edge")]
    StyledEdgePath,

    #[error("unexpected nested svg for defs")]
    NestedDefs,
}
