use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConvertError;

pub const UNDEFINED_PLACEHOLDER: &str = "undefined";
pub const WIKIDATA_TAG_PREFIX: &str = "Wikidata:";

const PATHWAY_KEY: &str = "pathway";
const ENTITIES_KEY: &str = "entitiesById";
const TYPE_KEY: &str = "type";
const XREF_DATA_SOURCE_KEY: &str = "xrefDataSource";
const XREF_IDENTIFIER_KEY: &str = "xrefIdentifier";
const ORGANISM_KEY: &str = "organism";
const SAME_AS_KEY: &str = "sameAs";

#[derive(Debug, Clone, PartialEq)]
pub struct PathwayDocument {
    pub pathway: Pathway,
    pub entities_by_id: IndexMap<String, Entity>,
    // `pathway` and `entitiesById` hold a null placeholder here.
    members: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pathway(Map<String, Value>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SameAs {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    pub fn types(&self) -> Vec<&str> {
        self.0
            .get(TYPE_KEY)
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn xref_data_source(&self) -> Option<&str> {
        self.0.get(XREF_DATA_SOURCE_KEY).and_then(Value::as_str)
    }

    pub fn xref_identifier(&self) -> Option<&str> {
        self.0.get(XREF_IDENTIFIER_KEY).and_then(Value::as_str)
    }

    pub fn has_xref_fields(&self) -> bool {
        self.0.contains_key(XREF_DATA_SOURCE_KEY) || self.0.contains_key(XREF_IDENTIFIER_KEY)
    }

    pub fn valid_xref(&self) -> Option<(&str, &str)> {
        let datasource = self.xref_data_source().filter(|v| is_valid_xref_field(v))?;
        let identifier = self.xref_identifier().filter(|v| is_valid_xref_field(v))?;
        Some((datasource, identifier))
    }

    pub fn clear_xref(&mut self) {
        self.0.shift_remove(XREF_DATA_SOURCE_KEY);
        self.0.shift_remove(XREF_IDENTIFIER_KEY);
    }

    pub fn has_wikidata_tag(&self) -> bool {
        self.types()
            .iter()
            .any(|tag| tag.starts_with(WIKIDATA_TAG_PREFIX))
    }

    pub fn push_type(&mut self, tag: String) -> bool {
        let slot = self
            .0
            .entry(TYPE_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        let Value::Array(tags) = slot else {
            return false;
        };
        if tags.iter().any(|existing| existing.as_str() == Some(tag.as_str())) {
            return false;
        }
        tags.push(Value::String(tag));
        true
    }
}

fn is_valid_xref_field(value: &str) -> bool {
    !value.trim().is_empty() && value != UNDEFINED_PLACEHOLDER
}

impl Pathway {
    pub fn organism(&self) -> Option<&str> {
        self.0
            .get(ORGANISM_KEY)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn same_as(&self) -> Option<SameAs> {
        match self.0.get(SAME_AS_KEY)? {
            Value::String(value) => Some(SameAs::One(value.clone())),
            Value::Array(values) => Some(SameAs::Many(
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            )),
            _ => None,
        }
    }

    pub fn merge_same_as(&mut self, identifier: &str) {
        let merged = match self.same_as() {
            None => Value::String(identifier.to_string()),
            Some(SameAs::One(existing)) => {
                same_as_list(vec![existing, identifier.to_string()])
            }
            Some(SameAs::Many(mut values)) => {
                values.push(identifier.to_string());
                same_as_list(values)
            }
        };
        self.0.insert(SAME_AS_KEY.to_string(), merged);
    }
}

fn same_as_list(values: Vec<String>) -> Value {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    Value::Array(out.into_iter().map(Value::String).collect())
}

impl PathwayDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConvertError> {
        let mut members: Map<String, Value> =
            serde_json::from_slice(bytes).map_err(model_error)?;
        let pathway = members
            .get_mut(PATHWAY_KEY)
            .map(Value::take)
            .ok_or_else(|| ConvertError::ModelParse("missing field `pathway`".to_string()))?;
        let pathway = serde_json::from_value(pathway).map_err(model_error)?;
        let entities_by_id = match members.get_mut(ENTITIES_KEY) {
            Some(entities) => serde_json::from_value(entities.take()).map_err(model_error)?,
            None => IndexMap::new(),
        };
        Ok(Self {
            pathway,
            entities_by_id,
            members,
        })
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, ConvertError> {
        let mut members = self.members.clone();
        members.insert(
            PATHWAY_KEY.to_string(),
            serde_json::to_value(&self.pathway).map_err(model_error)?,
        );
        members.insert(
            ENTITIES_KEY.to_string(),
            serde_json::to_value(&self.entities_by_id).map_err(model_error)?,
        );
        serde_json::to_vec(&members).map_err(model_error)
    }
}

fn model_error(err: serde_json::Error) -> ConvertError {
    ConvertError::ModelParse(err.to_string())
}
