use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;

use super::tree::{Element, QName};

pub const INHERIT_STYLE: &str =
    "color:inherit;fill:inherit;fill-opacity:inherit;stroke:inherit;stroke-width:inherit";
pub const DISALLOWED_FILTER: &str = "url(#kaavioblackto000000filter)";
pub const FONT_FALLBACK: &str = "'Liberation Sans', Arial, sans-serif";
pub const TEXT_HINT_STROKE_WIDTH: &str = "0.05px";
pub const BASELINE_MARKER: &str = "data-baseline-offset";
pub const DEFAULT_FONT_SIZE: f64 = 5.0;
const DEFAULT_STROKE_WIDTH: &str = "1";
const UNSUPPORTED_TEXT_ATTRIBUTES: [&str; 3] = ["overflow", "dominant-baseline", "clip-path"];

/// What a rule may know about an element's surroundings. Captured from the
/// parent before any rule touched it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub parent_stroke_width: Option<String>,
    pub in_defs: bool,
    pub in_marker_definition: bool,
}

impl Scope {
    pub fn for_children(&self, element: &Element) -> Scope {
        Scope {
            parent_stroke_width: element.attr("stroke-width").map(str::to_string),
            in_defs: self.in_defs || element.is("defs"),
            in_marker_definition: self.in_marker_definition
                || (self.in_defs && element.is("marker")),
        }
    }
}

pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, element: &Element, scope: &Scope) -> bool;
    fn apply(&self, element: &mut Element, scope: &Scope);
}

pub fn default_rules(linkout_base: &str) -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(InheritStrokeWidth),
        Box::new(StripDisallowedFilter),
        Box::new(RemoveRasterImages),
        Box::new(SubstituteFont),
        Box::new(DefaultMarkerFill),
        Box::new(StripTextAttributes),
        Box::new(CorrectBaseline),
        Box::new(InjectHyperlink {
            linkout_base: linkout_base.to_string(),
        }),
    ]
}

pub struct InheritStrokeWidth;

impl Rule for InheritStrokeWidth {
    fn name(&self) -> &'static str {
        "inherit-stroke-width"
    }

    fn matches(&self, element: &Element, _scope: &Scope) -> bool {
        element.attr("style") == Some(INHERIT_STYLE)
    }

    fn apply(&self, element: &mut Element, scope: &Scope) {
        let stroke_width = scope
            .parent_stroke_width
            .as_deref()
            .unwrap_or(DEFAULT_STROKE_WIDTH);
        element.set_attr(
            "style",
            format!(
                "color:inherit;fill:inherit;fill-opacity:inherit;stroke:inherit;stroke-width:{stroke_width}"
            ),
        );
    }
}

pub struct StripDisallowedFilter;

impl Rule for StripDisallowedFilter {
    fn name(&self) -> &'static str {
        "strip-disallowed-filter"
    }

    fn matches(&self, element: &Element, _scope: &Scope) -> bool {
        element.attr("filter") == Some(DISALLOWED_FILTER)
    }

    fn apply(&self, element: &mut Element, _scope: &Scope) {
        element.remove_attr("filter");
    }
}

pub struct RemoveRasterImages;

impl Rule for RemoveRasterImages {
    fn name(&self) -> &'static str {
        "remove-raster-images"
    }

    fn matches(&self, element: &Element, _scope: &Scope) -> bool {
        element.child_elements().any(|child| child.is("image"))
    }

    fn apply(&self, element: &mut Element, _scope: &Scope) {
        element.remove_children_where(|child| child.is("image"));
    }
}

pub struct SubstituteFont;

impl Rule for SubstituteFont {
    fn name(&self) -> &'static str {
        "substitute-font"
    }

    fn matches(&self, element: &Element, _scope: &Scope) -> bool {
        element
            .attr("font-family")
            .is_some_and(|family| family.contains("Arial") && family != FONT_FALLBACK)
    }

    fn apply(&self, element: &mut Element, _scope: &Scope) {
        element.set_attr("font-family", FONT_FALLBACK);
    }
}

pub struct DefaultMarkerFill;

impl Rule for DefaultMarkerFill {
    fn name(&self) -> &'static str {
        "default-marker-fill"
    }

    fn matches(&self, element: &Element, scope: &Scope) -> bool {
        scope.in_marker_definition && !element.has_attr("fill")
    }

    fn apply(&self, element: &mut Element, _scope: &Scope) {
        element.set_attr("fill", "currentColor");
    }
}

pub struct StripTextAttributes;

impl Rule for StripTextAttributes {
    fn name(&self) -> &'static str {
        "strip-text-attributes"
    }

    fn matches(&self, element: &Element, _scope: &Scope) -> bool {
        element.is("text")
            && (element.attr("stroke-width") == Some(TEXT_HINT_STROKE_WIDTH)
                || UNSUPPORTED_TEXT_ATTRIBUTES
                    .iter()
                    .any(|name| element.has_attr(name)))
    }

    fn apply(&self, element: &mut Element, _scope: &Scope) {
        if element.attr("stroke-width") == Some(TEXT_HINT_STROKE_WIDTH) {
            element.remove_attr("stroke-width");
        }
        for name in UNSUPPORTED_TEXT_ATTRIBUTES {
            element.remove_attr(name);
        }
    }
}

/// Pushes text down by a third of its font size, standing in for
/// `dominant-baseline` on renderers that lack it.
pub struct CorrectBaseline;

impl Rule for CorrectBaseline {
    fn name(&self) -> &'static str {
        "correct-baseline"
    }

    fn matches(&self, element: &Element, _scope: &Scope) -> bool {
        element.is("text") && element.has_attr("font-size") && !element.has_attr(BASELINE_MARKER)
    }

    fn apply(&self, element: &mut Element, _scope: &Scope) {
        let font_size = parse_font_size(element.attr("font-size"));
        let (x, y) = parse_translate(element.attr("transform"));
        let offset = font_size / 3.0;
        element.set_attr(
            "transform",
            format!("translate({},{})", format_number(x), format_number(y + offset)),
        );
        element.set_attr(BASELINE_MARKER, format_number(offset));
    }
}

pub struct InjectHyperlink {
    pub linkout_base: String,
}

impl Rule for InjectHyperlink {
    fn name(&self) -> &'static str {
        "inject-hyperlink"
    }

    fn matches(&self, element: &Element, _scope: &Scope) -> bool {
        match wikidata_classes(element).as_slice() {
            [_] => true,
            [] => false,
            many => {
                tracing::debug!(classes = ?many, "several Wikidata classes, not linking");
                false
            }
        }
    }

    fn apply(&self, element: &mut Element, _scope: &Scope) {
        let Some(identifier) = wikidata_classes(element).first().map(|id| id.to_string()) else {
            return;
        };
        element.name = QName::new(element.name.namespace.as_deref(), "a");
        element.set_attr_ns(
            QName::xlink("href"),
            format!("{}{identifier}", self.linkout_base),
        );
        element.set_attr("target", "_blank");
    }
}

fn re_font_size() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"^([0-9.]*)px$").unwrap())
}

fn re_translate() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| {
        Regex::new(r"^translate\(\s*(-?[0-9.]+)(?:\s*,\s*|\s+)(-?[0-9.]+)\s*\)$").unwrap()
    })
}

fn re_wikidata_class() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"^Wikidata_(Q[0-9]+)$").unwrap())
}

pub fn wikidata_classes(element: &Element) -> Vec<&str> {
    element
        .class_tokens()
        .filter_map(|token| {
            re_wikidata_class()
                .captures(token)
                .and_then(|caps| caps.get(1))
                .map(|id| id.as_str())
        })
        .collect()
}

pub fn parse_font_size(value: Option<&str>) -> f64 {
    value
        .and_then(|value| re_font_size().captures(value.trim()))
        .and_then(|caps| caps.get(1))
        .and_then(|size| size.as_str().parse::<f64>().ok())
        .filter(|size| size.is_finite() && *size > 0.0)
        .unwrap_or(DEFAULT_FONT_SIZE)
}

pub fn parse_translate(value: Option<&str>) -> (f64, f64) {
    value
        .and_then(|value| re_translate().captures(value.trim()))
        .and_then(|caps| {
            let x = caps.get(1)?.as_str().parse::<f64>().ok()?;
            let y = caps.get(2)?.as_str().parse::<f64>().ok()?;
            Some((x, y))
        })
        .unwrap_or((0.0, 0.0))
}

pub fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let mut out = String::new();
    let _ = write!(out, "{rounded:.2}");
    if out.contains('.') {
        while out.ends_with('0') {
            out.pop();
        }
        if out.ends_with('.') {
            out.pop();
        }
    }
    if out == "-0" {
        out = "0".to_string();
    }
    out
}
