use assert_matches::assert_matches;

use gpml_convert::error::ConvertError;
use gpml_convert::svg::tree::{SVG_NS, XLINK_NS};
use gpml_convert::svg::{Element, Node, QName, SvgDocument};

const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" id="WP4542" viewBox="0 0 10 10"><!-- rendered --><defs><marker id="arrow"/></defs><g class="DataNode"><use xlink:href="#arrow"/><text x="1">A &amp; B &lt; C</text></g></svg>"##;

#[test]
fn parses_namespaced_elements_and_attributes() {
    let doc = SvgDocument::parse(SAMPLE).unwrap();
    assert_eq!(doc.root.name, QName::new(Some(SVG_NS), "svg"));
    assert_eq!(doc.root.attr("id"), Some("WP4542"));

    let use_el = doc
        .root
        .descendants()
        .into_iter()
        .find(|el| el.is("use"))
        .unwrap();
    assert_eq!(use_el.attr_ns(&QName::new(Some(XLINK_NS), "href")), Some("#arrow"));

    let text = doc
        .root
        .descendants()
        .into_iter()
        .find(|el| el.is("text"))
        .unwrap();
    assert_eq!(text.text(), "A & B < C");
    assert_matches!(doc.root.children.first(), Some(Node::Comment(comment)) if comment == " rendered ");
}

#[test]
fn serialization_round_trips() {
    let doc = SvgDocument::parse(SAMPLE).unwrap();
    let xml = doc.to_xml();
    assert!(xml.starts_with("<svg"));
    assert!(xml.contains(r##"xlink:href="#arrow""##));
    assert!(xml.contains("A &amp; B &lt; C"));
    assert!(xml.contains("<!-- rendered -->"));
    assert!(xml.contains(r#"<marker id="arrow"/>"#));
    assert_eq!(SvgDocument::parse(&xml).unwrap(), doc);
}

#[test]
fn attribute_order_is_kept() {
    let doc = SvgDocument::parse(
        r#"<svg xmlns="http://www.w3.org/2000/svg"><rect y="2" x="1" width="3"/></svg>"#,
    )
    .unwrap();
    let xml = doc.to_xml();
    assert!(xml.contains(r#"<rect y="2" x="1" width="3"/>"#));
}

#[test]
fn xlink_is_declared_when_added_later() {
    let mut doc =
        SvgDocument::parse(r#"<svg xmlns="http://www.w3.org/2000/svg"><g/></svg>"#).unwrap();
    if let Some(Node::Element(group)) = doc.root.children.first_mut() {
        group.set_attr_ns(QName::xlink("href"), "https://example.org/Q1");
    }
    let xml = doc.to_xml();
    assert!(xml.contains(r#"xmlns:xlink="http://www.w3.org/1999/xlink""#));
    assert!(xml.contains(r#"<g xlink:href="https://example.org/Q1"/>"#));
}

#[test]
fn quotes_in_attributes_are_escaped() {
    let mut root = Element::new(QName::svg("svg"));
    root.set_attr("font-family", r#""Liberation Sans", Arial"#);
    let xml = SvgDocument::new(root).to_xml();
    assert!(xml.contains(r#"font-family="&quot;Liberation Sans&quot;, Arial""#));
}

#[test]
fn malformed_input_is_reported() {
    let err = SvgDocument::parse("<svg><g></svg>").unwrap_err();
    assert_matches!(err, ConvertError::SvgParse(_));
}

#[test]
fn remove_attribute_keeps_remaining_order() {
    let mut el = Element::new(QName::svg("text"));
    el.set_attr("a", "1");
    el.set_attr("b", "2");
    el.set_attr("c", "3");
    assert_eq!(el.remove_attr("b").as_deref(), Some("2"));
    let names = el
        .attributes
        .keys()
        .map(|name| name.local.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["a", "c"]);
}
