use serde::Serialize;

use crate::batch::{self, KeyGroups};
use crate::bridge_table::BridgeTable;
use crate::bridgedb::XrefResolver;
use crate::config::MAX_BATCH_SIZE;
use crate::domain::PathwayId;
use crate::error::ConvertError;
use crate::model::{PathwayDocument, WIKIDATA_TAG_PREFIX};
use crate::sparql::{self, KnowledgeGraphClient, SparqlResults};
use crate::staging::{Checkpoint, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoOrganism,
    NoEligibleXrefs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichReport {
    pub eligible: usize,
    pub excluded: Vec<String>,
    pub skipped: Option<SkipReason>,
    pub pathway_item: Option<String>,
    pub residual_keys: usize,
    pub batches: usize,
    pub tags_added: usize,
}

#[derive(Debug, Clone)]
pub struct EnrichOutcome {
    pub document: PathwayDocument,
    pub report: EnrichReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub eligible: Vec<String>,
    pub excluded: Vec<String>,
}

pub struct Enricher<'a, K, R> {
    table: &'a BridgeTable,
    knowledge_graph: K,
    resolver: R,
    batch_size: usize,
}

impl<'a, K: KnowledgeGraphClient, R: XrefResolver> Enricher<'a, K, R> {
    pub fn new(table: &'a BridgeTable, knowledge_graph: K, resolver: R) -> Self {
        Self {
            table,
            knowledge_graph,
            resolver,
            batch_size: MAX_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn enrich(
        &self,
        mut document: PathwayDocument,
        pathway_id: &PathwayId,
        checkpoint: &dyn Checkpoint,
    ) -> Result<EnrichOutcome, ConvertError> {
        let validation = validate_xrefs(&mut document);
        for entity_id in &validation.excluded {
            tracing::debug!(pathway = %pathway_id, entity = %entity_id, "entity has no usable xref");
        }
        checkpoint.write_working(&document)?;

        let mut report = EnrichReport {
            eligible: validation.eligible.len(),
            excluded: validation.excluded,
            ..EnrichReport::default()
        };

        let Some(organism) = document.pathway.organism().map(str::to_string) else {
            tracing::info!(pathway = %pathway_id, "no organism, can't call BridgeDb");
            report.skipped = Some(SkipReason::NoOrganism);
            return Ok(EnrichOutcome { document, report });
        };
        if report.eligible == 0 {
            tracing::info!(pathway = %pathway_id, "no xrefs to process");
            report.skipped = Some(SkipReason::NoEligibleXrefs);
            return Ok(EnrichOutcome { document, report });
        }

        let mut document = self.resolver.resolve(&document, &organism)?;
        checkpoint.advance(Stage::PreBridge, &document)?;

        let groups = batch::residual_keys(&document, self.table);
        report.residual_keys = groups.len();

        report.pathway_item = link_pathway_identity(&self.knowledge_graph, &mut document, pathway_id)?;

        let (batches, tags_added) = self.resolve_residual(&mut document, &groups)?;
        report.batches = batches;
        report.tags_added = tags_added;

        checkpoint.advance(Stage::PreKnowledgeGraph, &document)?;
        tracing::info!(
            pathway = %pathway_id,
            eligible = report.eligible,
            excluded = report.excluded.len(),
            residual = report.residual_keys,
            batches = report.batches,
            tags_added = report.tags_added,
            "enrichment complete"
        );
        Ok(EnrichOutcome { document, report })
    }

    fn resolve_residual(
        &self,
        document: &mut PathwayDocument,
        groups: &KeyGroups,
    ) -> Result<(usize, usize), ConvertError> {
        let mut issued = 0usize;
        let mut tags_added = 0usize;
        for batch in groups.batches(self.batch_size) {
            let Some(query) = sparql::xref_batch_query(&batch, self.table) else {
                continue;
            };
            let results = self.knowledge_graph.query(&query)?;
            issued += 1;
            tags_added += apply_xref_results(document, groups, &results);
        }
        Ok((issued, tags_added))
    }
}

pub fn validate_xrefs(document: &mut PathwayDocument) -> Validation {
    let mut validation = Validation::default();
    for (entity_id, entity) in document.entities_by_id.iter_mut() {
        if entity.valid_xref().is_some() {
            validation.eligible.push(entity_id.clone());
        } else {
            if entity.has_xref_fields() {
                tracing::info!(entity = %entity_id, "invalid xref datasource and/or identifier");
            }
            entity.clear_xref();
            validation.excluded.push(entity_id.clone());
        }
    }
    validation
}

/// Looks up the knowledge-graph item of the pathway, retrying exactly once
/// when the first query has no results, and merges it into `sameAs`. An item
/// that is still not found only skips the linking.
pub fn link_pathway_identity<K: KnowledgeGraphClient>(
    knowledge_graph: &K,
    document: &mut PathwayDocument,
    pathway_id: &PathwayId,
) -> Result<Option<String>, ConvertError> {
    let query = sparql::pathway_identity_query(pathway_id);
    let mut results = knowledge_graph.query(&query)?;
    if results.is_empty() {
        tracing::info!(pathway = %pathway_id, "pathway id not found in Wikidata, retrying");
        results = knowledge_graph.query(&query)?;
    }
    let Some(item) = results.first_value("item") else {
        tracing::warn!(pathway = %pathway_id, "pathway id still not found in Wikidata, skipping sameAs link");
        return Ok(None);
    };
    let identifier = sparql::strip_entity_prefix(item).to_string();
    document.pathway.merge_same_as(&identifier);
    Ok(Some(identifier))
}

pub fn apply_xref_results(
    document: &mut PathwayDocument,
    groups: &KeyGroups,
    results: &SparqlResults,
) -> usize {
    let mut added = 0usize;
    for binding in &results.results.bindings {
        for var in &results.head.vars {
            let Some(term) = binding.get(var) else {
                continue;
            };
            let Some(group) = groups.get(var) else {
                tracing::debug!(var = %var, "binding for unknown bridge key");
                continue;
            };
            let tag = format!(
                "{WIKIDATA_TAG_PREFIX}{}",
                sparql::strip_entity_prefix(&term.value)
            );
            for entity_id in &group.entity_ids {
                if let Some(entity) = document.entities_by_id.get_mut(entity_id) {
                    if entity.push_type(tag.clone()) {
                        added += 1;
                    }
                }
            }
        }
    }
    added
}
