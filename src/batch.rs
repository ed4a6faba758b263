use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::bridge_table::BridgeTable;
use crate::model::PathwayDocument;

/// Deduplication key for a (datasource, identifier) pair. Only alphanumeric
/// characters survive, so the key doubles as a SPARQL variable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BridgeKey(String);

impl BridgeKey {
    pub fn new(datasource: &str, identifier: &str) -> Self {
        Self(
            datasource
                .chars()
                .chain(identifier.chars())
                .filter(|ch| ch.is_alphanumeric())
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn variable(&self) -> String {
        format!("?{}", self.0)
    }
}

impl fmt::Display for BridgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xref {
    pub datasource: String,
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGroup {
    pub xref: Xref,
    pub entity_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyGroups {
    groups: IndexMap<BridgeKey, KeyGroup>,
}

impl KeyGroups {
    pub fn insert(&mut self, datasource: &str, identifier: &str, entity_id: &str) {
        let key = BridgeKey::new(datasource, identifier);
        let group = self.groups.entry(key).or_insert_with(|| KeyGroup {
            xref: Xref {
                datasource: datasource.to_string(),
                identifier: identifier.to_string(),
            },
            entity_ids: Vec::new(),
        });
        if !group.entity_ids.iter().any(|id| id == entity_id) {
            group.entity_ids.push(entity_id.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<&KeyGroup> {
        self.groups.get(key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn batches(&self, size: usize) -> Vec<Batch<'_>> {
        let size = size.max(1);
        let entries = self.groups.iter().collect::<Vec<_>>();
        entries
            .chunks(size)
            .map(|chunk| Batch {
                entries: chunk.to_vec(),
            })
            .collect()
    }
}

impl std::borrow::Borrow<str> for BridgeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Batch<'a> {
    pub entries: Vec<(&'a BridgeKey, &'a KeyGroup)>,
}

impl Batch<'_> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn residual_keys(document: &PathwayDocument, table: &BridgeTable) -> KeyGroups {
    let mut groups = KeyGroups::default();
    for (entity_id, entity) in &document.entities_by_id {
        let Some((datasource, identifier)) = entity.valid_xref() else {
            continue;
        };
        if !table.contains(datasource) || entity.has_wikidata_tag() {
            continue;
        }
        groups.insert(datasource, identifier, entity_id);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_strips_non_alphanumeric() {
        let key = BridgeKey::new("Entrez Gene", "1234-5");
        assert_eq!(key.as_str(), "EntrezGene12345");
        assert_eq!(key.variable(), "?EntrezGene12345");
    }

    #[test]
    fn groups_share_key() {
        let mut groups = KeyGroups::default();
        groups.insert("HGNC", "5", "a");
        groups.insert("HGNC", "5", "b");
        groups.insert("ChEBI", "CHEBI:15377", "c");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.get("HGNC5").unwrap().entity_ids, vec!["a", "b"]);
    }
}
