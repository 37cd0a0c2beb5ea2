//! XML document -> [`Record`], driven by schema-declared fields

use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;

use super::convert::parse_scalar;
use super::fields::{Field, FieldKind, FieldResolver, FieldType};
use super::value::{Record, Value};
use crate::error::{Result, XsdError};
use crate::model::{ComplexType, ScalarKind, Schema, XSI_NAMESPACE};
use crate::walk::Walked;

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Fail with [`XsdError::MissingField`] when a required attribute or
    /// element is absent instead of omitting it
    pub strict: bool,
}

/// Parse `xml` into `{ rootLocalName: content }` using the lenient defaults
pub fn parse_xml(schema: &Schema, xml: &str) -> Result<Record> {
    parse_xml_with(schema, xml, &ParseOptions::default())
}

pub fn parse_xml_with(
    schema: &Schema,
    xml: &str,
    options: &ParseOptions,
) -> Result<Record> {
    let doc = Document::parse_with_options(
        xml,
        ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        },
    )?;
    let root = doc.root_element();
    let name = root.tag_name().name();

    let fields = FieldResolver::new(schema);
    let field = fields
        .root_field(name)
        .ok_or_else(|| XsdError::UnknownRootElement {
            name: name.to_string(),
        })?;

    let parser = XmlParser {
        fields: &fields,
        options,
    };
    let content = parser.value(root, &field)?;
    Ok(Record::from([(name.to_string(), content)]))
}

struct XmlParser<'p, 'a> {
    fields: &'p FieldResolver<'a>,
    options: &'p ParseOptions,
}

impl<'a> XmlParser<'_, 'a> {
    fn value(&self, node: Node, field: &Field<'a>) -> Result<Value> {
        if node.attribute((XSI_NAMESPACE, "nil")) == Some("true") {
            return Ok(Value::Null);
        }
        match field.ty {
            FieldType::Complex(ty) => self.record(node, ty).map(Value::Record),
            other => Ok(text_value(&text_of(node), other)),
        }
    }

    fn record(&self, node: Node, ty: Walked<'a, ComplexType>) -> Result<Record> {
        let fields = self.fields.fields(ty.item, ty.schema);
        let mut record = Record::new();

        for field in fields.iter() {
            match field.kind {
                FieldKind::Attribute => {
                    // Matched by local name whatever prefix the document uses
                    match node.attributes().find(|a| a.name() == field.name) {
                        Some(attr) => {
                            record.insert(field.key.clone(), text_value(attr.value(), field.ty));
                        }
                        None => self.missing(field, node)?,
                    }
                }
                FieldKind::Text => {
                    // Mixed text skips the whitespace-only runs that indentation leaves
                    let text = if field.optional {
                        mixed_text_of(node)
                    } else {
                        text_of(node)
                    };
                    if field.optional && text.is_empty() {
                        continue;
                    }
                    record.insert(field.key.clone(), text_value(&text, field.ty));
                }
                FieldKind::Element => {
                    // Namespaces only tell same-named siblings apart
                    let shared = fields
                        .iter()
                        .filter(|f| f.kind == FieldKind::Element && f.name == field.name)
                        .count()
                        > 1;
                    let children: Vec<Node> = node
                        .children()
                        .filter(|c| c.is_element() && c.tag_name().name() == field.name)
                        .filter(|c| !shared || c.tag_name().namespace() == field.namespace.as_deref())
                        .collect();
                    if children.is_empty() {
                        self.missing(field, node)?;
                        continue;
                    }
                    let value = if field.array {
                        Value::List(
                            children
                                .iter()
                                .map(|child| self.value(*child, field))
                                .collect::<Result<_>>()?,
                        )
                    } else {
                        self.value(children[0], field)?
                    };
                    record.insert(field.key.clone(), value);
                }
            }
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            for child in node.children().filter(|c| c.is_element()) {
                let name = child.tag_name().name();
                if !fields.iter().any(|f| f.kind == FieldKind::Element && f.name == name) {
                    debug!(element = name, parent = node.tag_name().name(), "Undeclared element skipped");
                }
            }
        }
        Ok(record)
    }

    fn missing(&self, field: &Field<'a>, parent: Node) -> Result<()> {
        if self.options.strict && !field.optional {
            return Err(XsdError::MissingField {
                kind: field.kind.as_str(),
                name: field.name.clone(),
                parent: parent.tag_name().name().to_string(),
            });
        }
        Ok(())
    }
}

/// Concatenated direct text children
fn text_of(node: Node) -> String {
    node.children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect()
}

/// Direct text children of a mixed element, without whitespace-only runs
fn mixed_text_of(node: Node) -> String {
    node.children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .filter(|text| !text.trim().is_empty())
        .collect()
}

fn text_value(text: &str, ty: FieldType<'_>) -> Value {
    match ty {
        FieldType::Scalar(kind) => parse_scalar(text, kind),
        FieldType::List(kind) => Value::List(
            text.split_whitespace()
                .map(|item| parse_scalar(item, kind))
                .collect(),
        ),
        FieldType::Complex(_) => parse_scalar(text, ScalarKind::String),
    }
}
