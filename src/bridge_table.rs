use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConvertError;
use crate::http;

const DATASOURCE_COLUMN: &str = "datasource_name";
const PROPERTY_COLUMN: &str = "wikidata_property";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeTable {
    properties: HashMap<String, String>,
}

impl BridgeTable {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            properties: pairs
                .into_iter()
                .map(|(name, property)| (name.into(), property.into()))
                .collect(),
        }
    }

    pub fn from_tsv(text: &str) -> Result<Self, ConvertError> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| ConvertError::BridgeTableParse("empty table".to_string()))?;
        let columns = header.split('\t').map(str::trim).collect::<Vec<_>>();
        let column = |name: &str| {
            columns
                .iter()
                .position(|column| *column == name)
                .ok_or_else(|| ConvertError::BridgeTableParse(format!("missing column {name}")))
        };
        let name_idx = column(DATASOURCE_COLUMN)?;
        let property_idx = column(PROPERTY_COLUMN)?;

        let mut properties = HashMap::new();
        for line in lines {
            let fields = line.split('\t').collect::<Vec<_>>();
            let name = fields.get(name_idx).map(|value| value.trim()).unwrap_or("");
            let property = fields
                .get(property_idx)
                .map(|value| value.trim())
                .unwrap_or("");
            if name.is_empty() || property.is_empty() {
                continue;
            }
            properties
                .entry(name.to_string())
                .or_insert_with(|| property.to_string());
        }
        Ok(Self { properties })
    }

    pub fn fetch(url: &str, timeout: Duration) -> Result<Self, ConvertError> {
        let client = http::build_client(timeout, ConvertError::BridgeTableHttp)?;
        let response = http::send_with_retries(|| client.get(url), ConvertError::BridgeTableHttp)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "bridging table request failed".to_string());
            return Err(ConvertError::BridgeTableStatus { status, message });
        }
        let text = response
            .text()
            .map_err(|err| ConvertError::BridgeTableHttp(err.to_string()))?;
        let table = Self::from_tsv(&text)?;
        tracing::info!(datasources = table.len(), url, "loaded bridging table");
        Ok(table)
    }

    pub fn property(&self, datasource: &str) -> Option<&str> {
        self.properties.get(datasource).map(String::as_str)
    }

    pub fn contains(&self, datasource: &str) -> bool {
        self.properties.contains_key(datasource)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
