use assert_matches::assert_matches;

use gpml_convert::error::{ConvertError, StructuralViolation};
use gpml_convert::svg::rules::{CorrectBaseline, INHERIT_STYLE, Rule, Scope};
use gpml_convert::svg::tree::XLINK_NS;
use gpml_convert::svg::{Element, NormalizeOptions, Normalizer, QName, SvgDocument};

const SVG_OPEN: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="1200" height="900">"#;

fn svg(body: &str) -> SvgDocument {
    SvgDocument::parse(&format!("{SVG_OPEN}{body}</svg>")).unwrap()
}

fn normalized(body: &str) -> SvgDocument {
    let mut doc = svg(body);
    Normalizer::default().normalize(&mut doc).unwrap();
    doc
}

fn find<'a>(doc: &'a SvgDocument, id: &str) -> &'a Element {
    doc.root
        .descendants()
        .into_iter()
        .find(|el| el.attr("id") == Some(id))
        .unwrap()
}

fn violation(body: &str) -> StructuralViolation {
    let mut doc = svg(body);
    match Normalizer::default().normalize(&mut doc) {
        Err(ConvertError::MalformedSvg(violation)) => violation,
        other => panic!("expected a structural violation, got {other:?}"),
    }
}

#[test]
fn fixes_dimensions() {
    let doc = normalized("<g/>");
    assert_eq!(doc.root.attr("width"), Some("800px"));
    assert_eq!(doc.root.attr("height"), Some("600px"));
}

#[test]
fn baseline_moves_text_down_a_third_of_font_size() {
    let doc = normalized(r#"<text id="t" font-size="12px" transform="translate(10,20)">ATP</text>"#);
    let text = find(&doc, "t");
    assert_eq!(text.attr("transform"), Some("translate(10,24)"));
    assert_eq!(text.attr("data-baseline-offset"), Some("4"));
}

#[test]
fn baseline_uses_default_font_size() {
    let doc = normalized(r#"<text id="t" font-size="medium">ATP</text>"#);
    assert_eq!(find(&doc, "t").attr("transform"), Some("translate(0,1.67)"));
}

#[test]
fn baseline_keeps_negative_x() {
    let doc = normalized(r#"<text id="t" font-size="9px" transform="translate(-4.5, 0)">ATP</text>"#);
    assert_eq!(find(&doc, "t").attr("transform"), Some("translate(-4.5,3)"));
}

#[test]
fn text_without_font_size_is_left_alone() {
    let doc = normalized(r#"<text id="t" transform="translate(1,2)">ATP</text>"#);
    assert_eq!(find(&doc, "t").attr("transform"), Some("translate(1,2)"));
}

#[test]
fn baseline_rule_works_standalone() {
    let mut text = Element::new(QName::svg("text"));
    text.set_attr("font-size", "15px");
    let rule = CorrectBaseline;
    let scope = Scope::default();
    assert!(rule.matches(&text, &scope));
    rule.apply(&mut text, &scope);
    assert_eq!(text.attr("transform"), Some("translate(0,5)"));
    assert!(!rule.matches(&text, &scope));
}

#[test]
fn single_wikidata_class_becomes_link() {
    let doc = normalized(r#"<g id="n" class="DataNode Wikidata_Q130"><rect/></g>"#);
    let link = find(&doc, "n");
    assert_eq!(link.name, QName::svg("a"));
    assert_eq!(
        link.attr_ns(&QName::new(Some(XLINK_NS), "href")),
        Some("https://scholia.toolforge.org/Q130")
    );
    assert_eq!(link.attr("target"), Some("_blank"));
    assert_eq!(link.child_elements().count(), 1);
}

#[test]
fn link_keeps_namespace_of_unqualified_document() {
    let mut doc = SvgDocument::parse(
        r#"<svg xmlns:xlink="http://www.w3.org/1999/xlink"><g id="n" class="DataNode Wikidata_Q42"/></svg>"#,
    )
    .unwrap();
    Normalizer::default().normalize(&mut doc).unwrap();

    assert_eq!(find(&doc, "n").name, QName::new(None, "a"));
    let xml = doc.to_xml();
    assert!(xml.contains(r#"<a id="n""#), "{xml}");
    assert!(!xml.contains("ns0"), "{xml}");
}

#[test]
fn ambiguous_wikidata_classes_are_not_linked() {
    let doc = normalized(r#"<g id="n" class="DataNode Wikidata_Q1 Wikidata_Q2"/>"#);
    let group = find(&doc, "n");
    assert!(group.is("g"));
    assert!(group.attr_ns(&QName::xlink("href")).is_none());
}

#[test]
fn partial_class_match_is_not_linked() {
    let doc = normalized(r#"<g id="n" class="DataNode Wikidata_Q12x"/>"#);
    assert!(find(&doc, "n").is("g"));
}

#[test]
fn linkout_base_is_configurable() {
    let mut doc = svg(r#"<g id="n" class="Wikidata_Q7"/>"#);
    let normalizer = Normalizer::new(NormalizeOptions {
        linkout_base: "https://www.wikidata.org/wiki/".to_string(),
        ..NormalizeOptions::default()
    });
    normalizer.normalize(&mut doc).unwrap();
    assert_eq!(
        find(&doc, "n").attr_ns(&QName::xlink("href")),
        Some("https://www.wikidata.org/wiki/Q7")
    );
}

#[test]
fn inherit_style_reads_each_parents_stroke_width() {
    let doc = normalized(&format!(
        r#"<g stroke-width="2"><path id="a" style="{INHERIT_STYLE}"/></g><g><path id="b" style="{INHERIT_STYLE}"/></g>"#
    ));
    assert_eq!(
        find(&doc, "a").attr("style"),
        Some("color:inherit;fill:inherit;fill-opacity:inherit;stroke:inherit;stroke-width:2")
    );
    assert_eq!(
        find(&doc, "b").attr("style"),
        Some("color:inherit;fill:inherit;fill-opacity:inherit;stroke:inherit;stroke-width:1")
    );
}

#[test]
fn cleanup_rules() {
    let doc = normalized(concat!(
        r#"<g id="g" filter="url(#kaavioblackto000000filter)" font-family="Arial">"#,
        r#"<image href="data:image/png;base64,AAAA"/><rect/></g>"#,
        r#"<text id="t" stroke-width="0.05px" overflow="hidden" dominant-baseline="central" clip-path="url(#c)">X</text>"#,
    ));
    let group = find(&doc, "g");
    assert!(!group.has_attr("filter"));
    assert_eq!(group.attr("font-family"), Some("'Liberation Sans', Arial, sans-serif"));
    assert_eq!(group.child_elements().count(), 1);
    assert!(doc.root.descendants().iter().all(|el| !el.is("image")));

    let text = find(&doc, "t");
    for name in ["stroke-width", "overflow", "dominant-baseline", "clip-path"] {
        assert!(!text.has_attr(name), "{name} should be stripped");
    }
}

#[test]
fn marker_children_default_to_current_color() {
    let doc = normalized(concat!(
        r#"<defs><marker id="m"><path id="p1"/><path id="p2" fill="red"/></marker></defs>"#,
        r#"<marker id="loose"><path id="p3"/></marker>"#,
    ));
    assert_eq!(find(&doc, "p1").attr("fill"), Some("currentColor"));
    assert_eq!(find(&doc, "p2").attr("fill"), Some("red"));
    assert!(!find(&doc, "m").has_attr("fill"));
    assert!(!find(&doc, "p3").has_attr("fill"));
}

#[test]
fn normalizing_twice_changes_nothing() {
    let body = format!(
        r#"<defs><marker><path/></marker></defs><g stroke-width="3"><path style="{INHERIT_STYLE}"/></g><g class="Wikidata_Q5" font-family="Arial"><text font-size="12px" transform="translate(10,20)">A</text></g>"#
    );
    let mut doc = svg(&body);
    let normalizer = Normalizer::default();
    normalizer.normalize(&mut doc).unwrap();
    let once = doc.to_xml();
    normalizer.normalize(&mut doc).unwrap();
    assert_eq!(doc.to_xml(), once);
}

#[test]
fn whitespace_stylesheet_is_accepted() {
    normalized("<style>\n  </style>");
}

#[test]
fn non_empty_stylesheet_is_fatal() {
    assert_eq!(
        violation("<style>.Edge { stroke: red }</style>"),
        StructuralViolation::NonEmptyStylesheet
    );
}

#[test]
fn disallowed_pattern_is_fatal() {
    assert_matches!(
        violation(r#"<defs><pattern id="PatternQ47512"/></defs>"#),
        StructuralViolation::DisallowedPattern(id) if id == "PatternQ47512"
    );
}

#[test]
fn styled_edge_path_is_fatal() {
    assert_eq!(
        violation(r#"<g><g class="Edge Interaction"><path style="stroke:red"/></g></g>"#),
        StructuralViolation::StyledEdgePath
    );
}

#[test]
fn nested_jic_defs_is_fatal() {
    assert_eq!(
        violation(r#"<defs><g id="jic-defs"><svg><defs/></svg></g></defs>"#),
        StructuralViolation::NestedDefs
    );
}

#[test]
fn fatal_check_runs_before_any_rewrite() {
    let mut doc = svg(r#"<style>x</style><text font-size="12px">A</text>"#);
    let before = doc.clone();
    let err = Normalizer::default().normalize(&mut doc).unwrap_err();
    assert_matches!(err, ConvertError::MalformedSvg(_));
    assert_eq!(doc.root.descendants().len(), before.root.descendants().len());
    assert!(
        doc.root
            .descendants()
            .iter()
            .all(|el| !el.has_attr("data-baseline-offset"))
    );
}

#[test]
fn nested_edge_groups_warn_once() {
    let mut doc = svg(concat!(
        r#"<g><g class="Edge"><g/></g><g class="Edge"><g/></g></g>"#,
    ));
    let report = Normalizer::default().normalize(&mut doc).unwrap();
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn report_counts_rule_applications() {
    let mut doc = svg(r#"<text font-size="12px">A</text><text font-size="6px">B</text>"#);
    let report = Normalizer::default().normalize(&mut doc).unwrap();
    assert_eq!(report.applied("correct-baseline"), 2);
    assert_eq!(report.applied("inject-hyperlink"), 0);
}
