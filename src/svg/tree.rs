use std::collections::BTreeMap;
use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::error::ConvertError;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.to_string(),
        }
    }

    pub fn plain(local: &str) -> Self {
        Self::new(None, local)
    }

    pub fn svg(local: &str) -> Self {
        Self::new(Some(SVG_NS), local)
    }

    pub fn xlink(local: &str) -> Self {
        Self::new(Some(XLINK_NS), local)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    pub attributes: IndexMap<QName, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn is(&self, local: &str) -> bool {
        self.name.local == local
            && matches!(self.name.namespace.as_deref(), None | Some(SVG_NS))
    }

    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .get(&QName::plain(local))
            .map(String::as_str)
    }

    pub fn has_attr(&self, local: &str) -> bool {
        self.attributes.contains_key(&QName::plain(local))
    }

    /// Sets a plain attribute, keeping its position when it already exists.
    pub fn set_attr(&mut self, local: &str, value: impl Into<String>) {
        self.attributes.insert(QName::plain(local), value.into());
    }

    pub fn set_attr_ns(&mut self, name: QName, value: impl Into<String>) {
        self.attributes.insert(name, value.into());
    }

    pub fn attr_ns(&self, name: &QName) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn remove_attr(&mut self, local: &str) -> Option<String> {
        self.attributes.shift_remove(&QName::plain(local))
    }

    pub fn class_tokens(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn remove_children_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Element) -> bool,
    {
        let before = self.children.len();
        self.children.retain(|node| match node {
            Node::Element(element) => !predicate(element),
            _ => true,
        });
        before - self.children.len()
    }

    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(element) = stack.pop() {
            out.push(element);
            let children = element.child_elements().collect::<Vec<_>>();
            stack.extend(children.into_iter().rev());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgDocument {
    pub root: Element,
    prefixes: BTreeMap<String, Option<String>>,
}

impl SvgDocument {
    pub fn new(root: Element) -> Self {
        let mut prefixes = BTreeMap::new();
        prefixes.insert(SVG_NS.to_string(), None);
        prefixes.insert(XLINK_NS.to_string(), Some("xlink".to_string()));
        Self { root, prefixes }
    }

    pub fn parse(text: &str) -> Result<Self, ConvertError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, options)
            .map_err(|err| ConvertError::SvgParse(err.to_string()))?;

        let mut prefixes = BTreeMap::new();
        for node in doc.descendants().filter(|node| node.is_element()) {
            for ns in node.namespaces() {
                if ns.uri() == XML_NS || prefixes.contains_key(ns.uri()) {
                    continue;
                }
                // Only one namespace can be serialized as the default.
                let prefix = match ns.name() {
                    Some(prefix) => Some(prefix.to_string()),
                    None if prefixes.values().any(Option::is_none) => {
                        Some(format!("ns{}", prefixes.len()))
                    }
                    None => None,
                };
                prefixes.insert(ns.uri().to_string(), prefix);
            }
        }

        let root = build_element(doc.root_element());
        Ok(Self { root, prefixes })
    }

    pub fn to_xml(&self) -> String {
        let mut prefixes = self.prefixes.clone();
        collect_namespaces(&self.root, &mut prefixes);

        let mut out = String::new();
        write_element(&mut out, &self.root, &prefixes, true);
        out
    }
}

fn write_element(
    out: &mut String,
    element: &Element,
    prefixes: &BTreeMap<String, Option<String>>,
    declare: bool,
) {
    let tag = element_name(&element.name, prefixes);
    out.push('<');
    out.push_str(&tag);
    if declare {
        for (uri, prefix) in prefixes {
            match prefix {
                Some(prefix) => {
                    let _ = write!(out, " xmlns:{prefix}=\"{}\"", escape_attr(uri));
                }
                None => {
                    let _ = write!(out, " xmlns=\"{}\"", escape_attr(uri));
                }
            }
        }
    }
    for (name, value) in &element.attributes {
        let attr_name = attribute_name(name, prefixes);
        let _ = write!(out, " {attr_name}=\"{}\"", escape_attr(value));
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        match child {
            Node::Element(child) => write_element(out, child, prefixes, false),
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Comment(comment) => {
                let _ = write!(out, "<!--{comment}-->");
            }
        }
    }
    let _ = write!(out, "</{tag}>");
}

fn build_element(node: roxmltree::Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let mut element = Element::new(QName::new(tag.namespace(), tag.name()));
    for attr in node.attributes() {
        element
            .attributes
            .insert(QName::new(attr.namespace(), attr.name()), attr.value().to_string());
    }
    for child in node.children() {
        if child.is_element() {
            element.children.push(Node::Element(build_element(child)));
        } else if child.is_text() {
            if let Some(text) = child.text() {
                element.children.push(Node::Text(text.to_string()));
            }
        } else if child.is_comment() {
            if let Some(text) = child.text() {
                element.children.push(Node::Comment(text.to_string()));
            }
        }
    }
    element
}

fn collect_namespaces(element: &Element, prefixes: &mut BTreeMap<String, Option<String>>) {
    register_namespace(&element.name.namespace, prefixes);
    for name in element.attributes.keys() {
        register_namespace(&name.namespace, prefixes);
    }
    for child in element.child_elements() {
        collect_namespaces(child, prefixes);
    }
}

fn register_namespace(namespace: &Option<String>, prefixes: &mut BTreeMap<String, Option<String>>) {
    let Some(uri) = namespace else {
        return;
    };
    if uri == XML_NS || prefixes.contains_key(uri) {
        return;
    }
    let prefix = if uri == XLINK_NS {
        "xlink".to_string()
    } else {
        format!("ns{}", prefixes.len())
    };
    prefixes.insert(uri.clone(), Some(prefix));
}

fn element_name(name: &QName, prefixes: &BTreeMap<String, Option<String>>) -> String {
    match name.namespace.as_deref() {
        None => name.local.clone(),
        Some(uri) => match prefixes.get(uri) {
            Some(Some(prefix)) => format!("{prefix}:{}", name.local),
            _ => name.local.clone(),
        },
    }
}

fn attribute_name(name: &QName, prefixes: &BTreeMap<String, Option<String>>) -> String {
    match name.namespace.as_deref() {
        None => name.local.clone(),
        Some(XML_NS) => format!("xml:{}", name.local),
        Some(uri) => match prefixes.get(uri) {
            Some(Some(prefix)) => format!("{prefix}:{}", name.local),
            _ => name.local.clone(),
        },
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            _ => out.push(ch),
        }
    }
    out
}
