//! Structured (XML) configuration grammar.
//!
//! ```text
//! <configuration>
//!   <sink name="file" kind="rolling_file" path="orders.log" max_backups="10"/>
//!   <sink name="out" kind="console" target="stderr"/>
//!   <logger name="orders.db" level="debug"/>
//!   <root level="info">
//!     <sink-ref name="file"/>
//!     <sink-ref name="out"/>
//!   </root>
//! </configuration>
//! ```
//!
//! Unknown elements and attributes are rejected. Declaration order of sinks
//! and loggers does not matter; attachment order follows `<sink-ref>` order.

use roxmltree::{Document, Node};
use std::collections::BTreeMap;

use crate::loader::document::{DocumentError, LoggingDocument, SinkSection};

const ROOT_ELEMENT: &str = "configuration";

/// Parse an XML logging document.
pub fn parse(text: &str) -> Result<LoggingDocument, DocumentError> {
    let xml = Document::parse(text).map_err(|e| DocumentError::Syntax(e.to_string()))?;
    let top = xml.root_element();
    if top.tag_name().name() != ROOT_ELEMENT {
        return Err(DocumentError::Invalid(format!(
            "expected <{}> document element, found <{}>",
            ROOT_ELEMENT,
            top.tag_name().name()
        )));
    }
    only_attributes(top, &[])?;

    let mut doc = LoggingDocument::default();
    let mut seen_root = false;

    for node in top.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "root" => {
                if seen_root {
                    return Err(DocumentError::Invalid("<root> declared twice".to_string()));
                }
                seen_root = true;
                only_attributes(node, &["level"])?;
                doc.root.level = node.attribute("level").map(String::from);
                for child in node.children().filter(|n| n.is_element()) {
                    if child.tag_name().name() != "sink-ref" {
                        return Err(unknown_element(child, "root"));
                    }
                    only_attributes(child, &["name"])?;
                    doc.root.sinks.push(required(child, "name")?);
                }
            }
            "logger" => {
                only_attributes(node, &["name", "level"])?;
                let name = required(node, "name")?;
                let level = required(node, "level")?;
                if doc.loggers.insert(name.clone(), level).is_some() {
                    return Err(DocumentError::Invalid(format!("logger '{}' declared twice", name)));
                }
            }
            "sink" => {
                let name = required(node, "name")?;
                let fields: BTreeMap<String, String> = node
                    .attributes()
                    .filter(|a| a.name() != "name")
                    .map(|a| (a.name().to_string(), a.value().to_string()))
                    .collect();
                let section = SinkSection::from_fields(&name, fields)?;
                if doc.sinks.insert(name.clone(), section).is_some() {
                    return Err(DocumentError::Invalid(format!("sink '{}' declared twice", name)));
                }
            }
            _ => return Err(unknown_element(node, ROOT_ELEMENT)),
        }
    }

    Ok(doc)
}

fn required(node: Node<'_, '_>, attribute: &str) -> Result<String, DocumentError> {
    node.attribute(attribute).map(String::from).ok_or_else(|| {
        DocumentError::Invalid(format!(
            "<{}> is missing attribute '{}'",
            node.tag_name().name(),
            attribute
        ))
    })
}

fn only_attributes(node: Node<'_, '_>, allowed: &[&str]) -> Result<(), DocumentError> {
    match node.attributes().find(|a| !allowed.contains(&a.name())) {
        Some(attr) => Err(DocumentError::Invalid(format!(
            "<{}> has unknown attribute '{}'",
            node.tag_name().name(),
            attr.name()
        ))),
        None => Ok(()),
    }
}

fn unknown_element(node: Node<'_, '_>, parent: &str) -> DocumentError {
    DocumentError::Invalid(format!("unknown element <{}> in <{}>", node.tag_name().name(), parent))
}
