use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::batch::Batch;
use crate::bridge_table::BridgeTable;
use crate::domain::PathwayId;
use crate::error::ConvertError;
use crate::http;

pub const WIKIDATA_ENTITY_PREFIX: &str = "http://www.wikidata.org/entity/";
pub const PATHWAY_ID_PROPERTY: &str = "P2410";
const LABEL_SERVICE: &str = r#"SERVICE wikibase:label { bd:serviceParam wikibase:language "en" }"#;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SparqlResults {
    pub head: SparqlHead,
    pub results: SparqlBindings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SparqlHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SparqlBindings {
    #[serde(default)]
    pub bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SparqlTerm {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl SparqlResults {
    pub fn is_empty(&self) -> bool {
        self.results.bindings.is_empty()
    }

    pub fn first_value(&self, var: &str) -> Option<&str> {
        self.results
            .bindings
            .iter()
            .find_map(|binding| binding.get(var))
            .map(|term| term.value.as_str())
    }
}

pub trait KnowledgeGraphClient: Send + Sync {
    fn query(&self, sparql: &str) -> Result<SparqlResults, ConvertError>;
}

impl<T: KnowledgeGraphClient + ?Sized> KnowledgeGraphClient for &T {
    fn query(&self, sparql: &str) -> Result<SparqlResults, ConvertError> {
        (**self).query(sparql)
    }
}

#[derive(Clone)]
pub struct WikidataSparqlClient {
    client: Client,
    endpoint: String,
}

impl WikidataSparqlClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ConvertError> {
        let client = http::build_client(timeout, ConvertError::SparqlHttp)?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, ConvertError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "SPARQL request failed".to_string());
        Err(ConvertError::SparqlStatus { status, message })
    }
}

impl KnowledgeGraphClient for WikidataSparqlClient {
    fn query(&self, sparql: &str) -> Result<SparqlResults, ConvertError> {
        tracing::debug!(endpoint = %self.endpoint, query = sparql, "sparql query");
        let response = http::send_with_retries(
            || {
                self.client
                    .get(&self.endpoint)
                    .header(ACCEPT, "application/sparql-results+json")
                    .query(&[("query", sparql), ("format", "json")])
            },
            ConvertError::SparqlHttp,
        )?;
        let response = Self::handle_status(response)?;
        response
            .json::<SparqlResults>()
            .map_err(|err| ConvertError::SparqlParse(err.to_string()))
    }
}

pub fn pathway_identity_query(pathway_id: &PathwayId) -> String {
    format!(
        "SELECT ?item WHERE {{\n?item wdt:{PATHWAY_ID_PROPERTY} \"{pathway_id}\" .\n{LABEL_SERVICE}\n}}"
    )
}

/// One query per batch: a projected variable per bridge key, each constrained
/// by the knowledge-graph property of its datasource. Keys whose datasource is
/// missing from the table are left out.
pub fn xref_batch_query(batch: &Batch<'_>, table: &BridgeTable) -> Option<String> {
    let mut variables = Vec::with_capacity(batch.len());
    let mut patterns = Vec::with_capacity(batch.len());
    for (key, group) in &batch.entries {
        let Some(property) = table.property(&group.xref.datasource) else {
            continue;
        };
        let variable = key.variable();
        patterns.push(format!(
            "{variable} wdt:{property} \"{}\" .",
            escape_literal(&group.xref.identifier)
        ));
        variables.push(variable);
    }
    if variables.is_empty() {
        return None;
    }
    Some(format!(
        "SELECT {} WHERE {{ {} {LABEL_SERVICE}}}",
        variables.join(" "),
        patterns.join(" ")
    ))
}

pub fn strip_entity_prefix(value: &str) -> &str {
    value.strip_prefix(WIKIDATA_ENTITY_PREFIX).unwrap_or(value)
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
