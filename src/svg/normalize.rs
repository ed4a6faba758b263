use std::collections::BTreeMap;

use serde::Serialize;

use super::rules::{self, Rule, Scope};
use super::tree::{Element, SvgDocument};
use crate::config::DEFAULT_LINKOUT_BASE;
use crate::error::{ConvertError, StructuralViolation};

pub const DEFAULT_WIDTH: &str = "800px";
pub const DEFAULT_HEIGHT: &str = "600px";
const DISALLOWED_PATTERN_ID: &str = "PatternQ47512";
const JIC_DEFS_ID: &str = "jic-defs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub width: String,
    pub height: String,
    pub linkout_base: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH.to_string(),
            height: DEFAULT_HEIGHT.to_string(),
            linkout_base: DEFAULT_LINKOUT_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub rules_applied: BTreeMap<String, usize>,
    pub warnings: Vec<String>,
}

impl NormalizeReport {
    pub fn applied(&self, rule: &str) -> usize {
        self.rules_applied.get(rule).copied().unwrap_or(0)
    }
}

pub struct Normalizer {
    options: NormalizeOptions,
    rules: Vec<Box<dyn Rule>>,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        let rules = rules::default_rules(&options.linkout_base);
        Self { options, rules }
    }

    pub fn with_rules(options: NormalizeOptions, rules: Vec<Box<dyn Rule>>) -> Self {
        Self { options, rules }
    }

    pub fn normalize(&self, document: &mut SvgDocument) -> Result<NormalizeReport, ConvertError> {
        let mut report = NormalizeReport::default();
        fix_dimensions(&mut document.root, &self.options);

        if let Some(warning) = check_structure(&document.root)? {
            tracing::warn!("{warning}");
            report.warnings.push(warning);
        }

        visit(&mut document.root, &Scope::default(), &self.rules, &mut report);
        tracing::debug!(rules = ?report.rules_applied, "normalization complete");
        Ok(report)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}

pub fn fix_dimensions(root: &mut Element, options: &NormalizeOptions) {
    root.set_attr("width", options.width.clone());
    root.set_attr("height", options.height.clone());
}

/// Fails on the first structural violation. Returns the nested edge group
/// warning, reported at most once per document.
pub fn check_structure(root: &Element) -> Result<Option<String>, ConvertError> {
    let mut nested_edge_group = false;
    check_element(root, None, &mut nested_edge_group)?;
    Ok(nested_edge_group
        .then(|| "edge group contains nested g elements".to_string()))
}

fn check_element(
    element: &Element,
    parent: Option<&Element>,
    nested_edge_group: &mut bool,
) -> Result<(), ConvertError> {
    if element.is("style") && !is_empty_stylesheet(element) {
        return Err(ConvertError::MalformedSvg(
            StructuralViolation::NonEmptyStylesheet,
        ));
    }
    if element.is("pattern") && element.attr("id") == Some(DISALLOWED_PATTERN_ID) {
        return Err(ConvertError::MalformedSvg(
            StructuralViolation::DisallowedPattern(DISALLOWED_PATTERN_ID.to_string()),
        ));
    }
    if parent.is_some_and(|parent| parent.is("g")) && is_edge_group(element) {
        for child in element.child_elements() {
            if child.is("path") && child.has_attr("style") {
                return Err(ConvertError::MalformedSvg(StructuralViolation::StyledEdgePath));
            }
            if child.is("g") {
                *nested_edge_group = true;
            }
        }
    }
    if element.is("defs") && has_nested_defs(element) {
        return Err(ConvertError::MalformedSvg(StructuralViolation::NestedDefs));
    }
    for child in element.child_elements() {
        check_element(child, Some(element), nested_edge_group)?;
    }
    Ok(())
}

fn is_empty_stylesheet(element: &Element) -> bool {
    element.child_elements().next().is_none() && element.text().trim().is_empty()
}

fn is_edge_group(element: &Element) -> bool {
    element.is("g")
        && element
            .attr("class")
            .is_some_and(|class| class.contains("Edge"))
}

fn has_nested_defs(defs: &Element) -> bool {
    defs.child_elements()
        .filter(|g| g.is("g") && g.attr("id") == Some(JIC_DEFS_ID))
        .flat_map(|g| g.child_elements())
        .filter(|svg| svg.is("svg"))
        .flat_map(|svg| svg.child_elements())
        .any(|inner| inner.is("defs"))
}

fn visit(element: &mut Element, scope: &Scope, rules: &[Box<dyn Rule>], report: &mut NormalizeReport) {
    let child_scope = scope.for_children(element);
    for rule in rules {
        if rule.matches(element, scope) {
            rule.apply(element, scope);
            *report
                .rules_applied
                .entry(rule.name().to_string())
                .or_default() += 1;
        }
    }
    for child in element.child_elements_mut() {
        visit(child, &child_scope, rules, report);
    }
}
