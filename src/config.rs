use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

pub const DEFAULT_CONFIG_FILE: &str = "gpml-convert.json";
pub const DEFAULT_BRIDGE_TABLE_URL: &str = "https://raw.githubusercontent.com/bridgedb/BridgeDb/master/org.bridgedb.bio/src/main/resources/org/bridgedb/bio/datasources.tsv";
pub const DEFAULT_SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";
pub const DEFAULT_LINKOUT_BASE: &str = "https://scholia.toolforge.org/";
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bridge_table_url: Option<String>,
    #[serde(default)]
    pub sparql_endpoint: Option<String>,
    #[serde(default)]
    pub linkout_base: Option<String>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
    #[serde(default)]
    pub keep_pre_validation: Option<bool>,
    #[serde(default)]
    pub svgo_config: Option<String>,
    #[serde(default)]
    pub tools: ToolNames,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ToolNames {
    #[serde(default)]
    pub gpml2pvjson: Option<String>,
    #[serde(default)]
    pub bridgedb: Option<String>,
    #[serde(default)]
    pub pvjs: Option<String>,
    #[serde(default)]
    pub svgo: Option<String>,
    #[serde(default)]
    pub pathvisio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    pub gpml2pvjson: String,
    pub bridgedb: String,
    pub pvjs: String,
    pub svgo: String,
    pub pathvisio: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            gpml2pvjson: "gpml2pvjson".to_string(),
            bridgedb: "bridgedb".to_string(),
            pvjs: "pvjs".to_string(),
            svgo: "svgo".to_string(),
            pathvisio: "pathvisio".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bridge_table_url: String,
    pub sparql_endpoint: String,
    pub linkout_base: String,
    pub batch_size: usize,
    pub http_timeout: Duration,
    pub tool_timeout: Duration,
    pub keep_pre_validation: bool,
    pub svgo_config: Option<PathBuf>,
    pub tools: ToolCommands,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bridge_table_url: DEFAULT_BRIDGE_TABLE_URL.to_string(),
            sparql_endpoint: DEFAULT_SPARQL_ENDPOINT.to_string(),
            linkout_base: DEFAULT_LINKOUT_BASE.to_string(),
            batch_size: MAX_BATCH_SIZE,
            http_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(600),
            keep_pre_validation: false,
            svgo_config: None,
            tools: ToolCommands::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<Settings, ConvertError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConvertError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ConvertError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<Settings, ConvertError> {
        let defaults = Settings::default();

        let batch_size = config.batch_size.unwrap_or(defaults.batch_size);
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(ConvertError::InvalidConfig(format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}"
            )));
        }

        let mut linkout_base = config.linkout_base.unwrap_or(defaults.linkout_base);
        if !linkout_base.ends_with('/') {
            linkout_base.push('/');
        }

        let tool_defaults = ToolCommands::default();
        let tools = ToolCommands {
            gpml2pvjson: config.tools.gpml2pvjson.unwrap_or(tool_defaults.gpml2pvjson),
            bridgedb: config.tools.bridgedb.unwrap_or(tool_defaults.bridgedb),
            pvjs: config.tools.pvjs.unwrap_or(tool_defaults.pvjs),
            svgo: config.tools.svgo.unwrap_or(tool_defaults.svgo),
            pathvisio: config.tools.pathvisio.unwrap_or(tool_defaults.pathvisio),
        };

        Ok(Settings {
            bridge_table_url: config
                .bridge_table_url
                .unwrap_or(defaults.bridge_table_url),
            sparql_endpoint: config.sparql_endpoint.unwrap_or(defaults.sparql_endpoint),
            linkout_base,
            batch_size,
            http_timeout: config
                .http_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            tool_timeout: config
                .tool_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.tool_timeout),
            keep_pre_validation: config
                .keep_pre_validation
                .unwrap_or(defaults.keep_pre_validation),
            svgo_config: config.svgo_config.map(PathBuf::from),
            tools,
        })
    }
}
