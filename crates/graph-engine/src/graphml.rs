//! GraphML codec for the transaction graph.
//!
//! Reads the subset of GraphML needed here (typed `<key>` declarations with
//! optional `<default>` values, one directed `<graph>`, `<node>`/`<edge>`
//! elements with `<data>` children) and writes the same shape back.

use crate::error::LoadError;
use crate::store::{EdgeAttrs, GraphStore, NodeAttrs};
use crate::transaction::AccountId;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fmt;

const IS_FRAUD: &str = "is_fraud";
const CUSTOMER_ID: &str = "customer_id";
const TOTAL_AMOUNT: &str = "total_amount";
const TOTAL_TRANSACTIONS: &str = "total_transactions";

/// Nodes and edges in document order, attributes already typed
#[derive(Debug, Default)]
pub(crate) struct ParsedGraph {
    pub nodes: Vec<(AccountId, NodeAttrs)>,
    pub edges: Vec<(AccountId, AccountId, EdgeAttrs)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Node,
    Edge,
    All,
    Other,
}

impl Domain {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("node") => Self::Node,
            Some("edge") => Self::Edge,
            Some("all") | None => Self::All,
            Some(_) => Self::Other,
        }
    }

    fn applies_to(self, element: Element) -> bool {
        match self {
            Self::All => true,
            Self::Node => element == Element::Node,
            Self::Edge => element == Element::Edge,
            Self::Other => false,
        }
    }
}

#[derive(Debug)]
struct KeyDecl {
    name: String,
    domain: Domain,
    default: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Node,
    Edge,
}

impl Element {
    const fn label(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge => "edge",
        }
    }
}

/// A `<node>` or `<edge>` whose `<data>` children are still being read
#[derive(Debug)]
struct Pending {
    element: Element,
    id: AccountId,
    target: Option<AccountId>,
    data: HashMap<String, String>,
}

impl Pending {
    fn display_id(&self) -> String {
        match &self.target {
            Some(target) => format!("{} -> {target}", self.id),
            None => self.id.to_string(),
        }
    }
}

/// Collected attribute values of one element, resolved by attribute name
struct Attributes<'a> {
    element: Element,
    id: String,
    values: HashMap<&'a str, &'a str>,
}

impl Attributes<'_> {
    fn required(&self, attribute: &'static str) -> Result<&str, LoadError> {
        self.values
            .get(attribute)
            .copied()
            .ok_or_else(|| LoadError::MissingAttribute {
                element: self.element.label(),
                id: self.id.clone(),
                attribute,
            })
    }

    fn invalid(&self, attribute: &'static str, value: &str) -> LoadError {
        LoadError::InvalidValue {
            element: self.element.label(),
            id: self.id.clone(),
            attribute,
            value: value.to_owned(),
        }
    }

    fn boolean(&self, attribute: &'static str) -> Result<bool, LoadError> {
        let raw = self.required(attribute)?;

        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(self.invalid(attribute, raw)),
        }
    }

    fn amount(&self, attribute: &'static str) -> Result<f64, LoadError> {
        let raw = self.required(attribute)?;

        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|amount| amount.is_finite())
            .ok_or_else(|| self.invalid(attribute, raw))
    }

    fn count(&self, attribute: &'static str) -> Result<u64, LoadError> {
        let raw = self.required(attribute)?;

        raw.trim()
            .parse()
            .map_err(|_| self.invalid(attribute, raw))
    }
}

fn xml_attribute(start: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, LoadError> {
    for attribute in start.attributes() {
        let attribute = attribute?;

        if attribute.key.local_name().as_ref() == name {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }

    Ok(None)
}

fn required_xml_attribute(
    start: &BytesStart<'_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<String, LoadError> {
    xml_attribute(start, attribute.as_bytes())?
        .ok_or(LoadError::MissingXmlAttribute { element, attribute })
}

#[derive(Default)]
struct Parser {
    keys: HashMap<String, KeyDecl>,
    graph: ParsedGraph,
    seen_graph: bool,
    open_key: Option<String>,
    in_default: bool,
    pending: Option<Pending>,
    open_data: Option<(String, String)>,
}

impl Parser {
    fn start(&mut self, start: &BytesStart<'_>, empty: bool) -> Result<(), LoadError> {
        match start.local_name().as_ref() {
            b"key" => {
                let id = required_xml_attribute(start, "key", "id")?;
                let name = required_xml_attribute(start, "key", "attr.name")?;
                let domain = Domain::parse(xml_attribute(start, b"for")?.as_deref());

                self.keys.insert(
                    id.clone(),
                    KeyDecl {
                        name,
                        domain,
                        default: None,
                    },
                );

                if !empty {
                    self.open_key = Some(id);
                }
            }
            b"default" if self.open_key.is_some() => {
                self.in_default = !empty;
            }
            b"graph" => {
                let edge_default = required_xml_attribute(start, "graph", "edgedefault")?;

                if edge_default != "directed" {
                    return Err(LoadError::Undirected);
                }

                self.seen_graph = true;
            }
            b"node" => {
                let id = required_xml_attribute(start, "node", "id")?;

                self.pending = Some(Pending {
                    element: Element::Node,
                    id: AccountId::from(id),
                    target: None,
                    data: HashMap::new(),
                });

                if empty {
                    self.finish_element()?;
                }
            }
            b"edge" => {
                let source = required_xml_attribute(start, "edge", "source")?;
                let target = required_xml_attribute(start, "edge", "target")?;

                self.pending = Some(Pending {
                    element: Element::Edge,
                    id: AccountId::from(source),
                    target: Some(AccountId::from(target)),
                    data: HashMap::new(),
                });

                if empty {
                    self.finish_element()?;
                }
            }
            b"data" if self.pending.is_some() => {
                let key = required_xml_attribute(start, "data", "key")?;

                if empty {
                    self.store_data(key, String::new());
                } else {
                    self.open_data = Some((key, String::new()));
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some((_, value)) = self.open_data.as_mut() {
            value.push_str(text);
        } else if self.in_default {
            if let Some(key) = self.open_key.as_ref().and_then(|id| self.keys.get_mut(id)) {
                key.default.get_or_insert_with(String::new).push_str(text);
            }
        }
    }

    fn end(&mut self, name: &[u8]) -> Result<(), LoadError> {
        match name {
            b"key" => self.open_key = None,
            b"default" => self.in_default = false,
            b"data" => {
                if let Some((key, value)) = self.open_data.take() {
                    self.store_data(key, value);
                }
            }
            b"node" | b"edge" => self.finish_element()?,
            _ => {}
        }

        Ok(())
    }

    fn store_data(&mut self, key: String, value: String) {
        if let Some(pending) = self.pending.as_mut() {
            pending.data.insert(key, value);
        }
    }

    fn finish_element(&mut self) -> Result<(), LoadError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let mut values = HashMap::new();

        for (key, decl) in &self.keys {
            if !decl.domain.applies_to(pending.element) {
                continue;
            }

            let value = pending.data.get(key).or(decl.default.as_ref());

            if let Some(value) = value {
                values.insert(decl.name.as_str(), value.as_str());
            }
        }

        let attributes = Attributes {
            element: pending.element,
            id: pending.display_id(),
            values,
        };

        match (pending.element, pending.target) {
            (Element::Node, _) => {
                let attrs = NodeAttrs {
                    is_fraud: attributes.boolean(IS_FRAUD)?,
                    customer_id: attributes.required(CUSTOMER_ID)?.to_owned(),
                };

                self.graph.nodes.push((pending.id, attrs));
            }
            (Element::Edge, Some(target)) => {
                let attrs = EdgeAttrs {
                    total_amount: attributes.amount(TOTAL_AMOUNT)?,
                    total_transactions: attributes.count(TOTAL_TRANSACTIONS)?,
                };

                self.graph.edges.push((pending.id, target, attrs));
            }
            (Element::Edge, None) => {}
        }

        Ok(())
    }
}

/// Parse a GraphML document into typed nodes and edges
pub(crate) fn parse(text: &str) -> Result<ParsedGraph, LoadError> {
    let mut reader = Reader::from_str(text);

    let mut parser = Parser::default();

    loop {
        match reader.read_event()? {
            Event::Start(start) => parser.start(&start, false)?,
            Event::Empty(start) => parser.start(&start, true)?,
            Event::Text(text) => parser.text(&text.unescape()?),
            Event::CData(data) => parser.text(&String::from_utf8_lossy(&data.into_inner())),
            Event::End(end) => parser.end(end.local_name().as_ref())?,
            Event::Eof => break,
            _ => {}
        }
    }

    if !parser.seen_graph {
        return Err(LoadError::MissingGraph);
    }

    Ok(parser.graph)
}

/// Renders a [`GraphStore`] as a GraphML document
pub(crate) struct GraphmlDocument<'a>(pub &'a GraphStore);

impl fmt::Display for GraphmlDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            f,
            r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://graphml.graphdrawing.org/xmlns http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd">"#
        )?;
        writeln!(f, r#"  <key id="d0" for="node" attr.name="{IS_FRAUD}" attr.type="boolean"/>"#)?;
        writeln!(f, r#"  <key id="d1" for="node" attr.name="{CUSTOMER_ID}" attr.type="string"/>"#)?;
        writeln!(f, r#"  <key id="d2" for="edge" attr.name="{TOTAL_AMOUNT}" attr.type="double"/>"#)?;
        writeln!(f, r#"  <key id="d3" for="edge" attr.name="{TOTAL_TRANSACTIONS}" attr.type="long"/>"#)?;
        writeln!(f, r#"  <graph edgedefault="directed">"#)?;

        for (id, node) in self.0.nodes() {
            writeln!(
                f,
                r#"    <node id="{}"><data key="d0">{}</data><data key="d1">{}</data></node>"#,
                escape(id.as_str()),
                node.is_fraud,
                escape(&node.customer_id),
            )?;
        }

        for (sender, receiver, edge) in self.0.edges() {
            writeln!(
                f,
                r#"    <edge source="{}" target="{}"><data key="d2">{}</data><data key="d3">{}</data></edge>"#,
                escape(sender.as_str()),
                escape(receiver.as_str()),
                edge.total_amount,
                edge.total_transactions,
            )?;
        }

        writeln!(f, "  </graph>")?;
        writeln!(f, "</graphml>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: &str = r#"
        <key id="d0" for="node" attr.name="is_fraud" attr.type="boolean"/>
        <key id="d1" for="node" attr.name="customer_id" attr.type="string"/>
        <key id="d2" for="edge" attr.name="total_amount" attr.type="double"/>
        <key id="d3" for="edge" attr.name="total_transactions" attr.type="long"/>
    "#;

    fn document(keys: &str, body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
            <graphml xmlns="http://graphml.graphdrawing.org/xmlns">{keys}
            <graph edgedefault="directed">{body}</graph></graphml>"#
        )
    }

    #[test]
    fn test_parse_nodes_and_edges() {
        let text = document(
            KEYS,
            r#"
            <node id="1"><data key="d0">False</data><data key="d1">C100</data></node>
            <node id="2"><data key="d0">True</data><data key="d1">C200 &amp; co</data></node>
            <edge source="1" target="2"><data key="d2">100.5</data><data key="d3">2</data></edge>
            "#,
        );

        let graph = parse(&text).unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].0, AccountId::from("1"));
        assert!(!graph.nodes[0].1.is_fraud);
        assert!(graph.nodes[1].1.is_fraud);
        assert_eq!(graph.nodes[1].1.customer_id, "C200 & co");

        let (sender, receiver, edge) = &graph.edges[0];
        assert_eq!(sender, &AccountId::from("1"));
        assert_eq!(receiver, &AccountId::from("2"));
        assert_eq!(edge.total_amount, 100.5);
        assert_eq!(edge.total_transactions, 2);
    }

    #[test]
    fn test_parse_applies_key_defaults() {
        let keys = r#"
            <key id="fraud" for="node" attr.name="is_fraud" attr.type="boolean"><default>false</default></key>
            <key id="cust" for="node" attr.name="customer_id" attr.type="string"/>
        "#;
        let text = document(keys, r#"<node id="7"><data key="cust">C7</data></node>"#);

        let graph = parse(&text).unwrap();

        assert!(!graph.nodes[0].1.is_fraud);
        assert_eq!(graph.nodes[0].1.customer_id, "C7");
    }

    #[test]
    fn test_parse_scientific_amount() {
        let text = document(
            KEYS,
            r#"
            <node id="1"><data key="d0">0</data><data key="d1">C1</data></node>
            <edge source="1" target="1"><data key="d2">1e-05</data><data key="d3">1</data></edge>
            "#,
        );

        let graph = parse(&text).unwrap();

        assert_eq!(graph.edges[0].2.total_amount, 1e-5);
    }

    #[test]
    fn test_parse_keeps_data_whitespace() {
        let text = document(
            KEYS,
            r#"<node id="1"><data key="d0"> true </data><data key="d1">  C 1 </data></node>"#,
        );

        let graph = parse(&text).unwrap();

        assert!(graph.nodes[0].1.is_fraud);
        assert_eq!(graph.nodes[0].1.customer_id, "  C 1 ");
    }

    #[test]
    fn test_parse_large_amount() {
        let text = document(
            KEYS,
            r#"<edge source="1" target="2"><data key="d2">1e30</data><data key="d3">1</data></edge>"#,
        );

        let graph = parse(&text).unwrap();

        assert_eq!(graph.edges[0].2.total_amount, 1e30);
    }

    #[test]
    fn test_parse_rejects_non_finite_amount() {
        let text = document(
            KEYS,
            r#"<edge source="1" target="2"><data key="d2">inf</data><data key="d3">1</data></edge>"#,
        );

        let err = parse(&text).unwrap_err();

        assert!(matches!(
            err,
            LoadError::InvalidValue {
                attribute: "total_amount",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_missing_node_attribute() {
        let text = document(KEYS, r#"<node id="1"><data key="d0">true</data></node>"#);

        let err = parse(&text).unwrap_err();

        assert!(matches!(
            err,
            LoadError::MissingAttribute {
                element: "node",
                attribute: "customer_id",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_invalid_edge_count() {
        let text = document(
            KEYS,
            r#"<edge source="1" target="2"><data key="d2">1.0</data><data key="d3">many</data></edge>"#,
        );

        let err = parse(&text).unwrap_err();

        assert!(matches!(
            err,
            LoadError::InvalidValue {
                attribute: "total_transactions",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_rejects_undirected_graph() {
        let text = r#"<graphml><graph edgedefault="undirected"></graph></graphml>"#;

        assert!(matches!(parse(text), Err(LoadError::Undirected)));
    }

    #[test]
    fn test_parse_requires_graph_element() {
        let text = format!("<graphml>{KEYS}</graphml>");

        assert!(matches!(parse(&text), Err(LoadError::MissingGraph)));
    }

    #[test]
    fn test_parse_rejects_malformed_xml() {
        let text = r#"<graphml><graph edgedefault="directed"><node id="1"></graph></graphml>"#;

        assert!(parse(text).is_err());
    }
}
