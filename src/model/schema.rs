//! Root schema entity and schema-composition directives

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use super::types::{
    Attribute, AttributeGroup, ComplexType, Element, Form, NamedGroup, Opaque, SimpleType,
};

/// Linking state of an `xs:import` / `xs:include` / `xs:redefine`
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Link {
    /// The linker has not run over this directive
    #[default]
    Unlinked,
    Linked(Arc<Schema>),
    /// Target was already being linked higher up the chain; the cycle was cut here
    Cyclic,
    /// The loader could not supply the location
    Missing,
}

impl Link {
    pub fn schema(&self) -> Option<&Schema> {
        match self {
            Link::Linked(schema) => Some(schema),
            _ => None,
        }
    }

    fn state(&self) -> &'static str {
        match self {
            Link::Unlinked => "unlinked",
            Link::Linked(_) => "linked",
            Link::Cyclic => "cyclic",
            Link::Missing => "missing",
        }
    }
}

// Linked schemas are dumped separately; only the state is useful here.
impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.state())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Import {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_location: Option<String>,
    pub link: Link,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Include {
    pub schema_location: String,
    pub link: Link,
}

/// `xs:redefine`: overriding declarations plus the schema they redefine
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redefine {
    pub schema_location: String,
    pub complex_types: Vec<ComplexType>,
    pub simple_types: Vec<SimpleType>,
    pub groups: Vec<NamedGroup>,
    pub attribute_groups: Vec<AttributeGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opaque: Vec<Opaque>,
    pub link: Link,
}

impl Redefine {
    /// The redefined base schema
    pub fn base_schema(&self) -> Option<&Schema> {
        self.link.schema()
    }
}

/// A parsed XSD document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Resolved location this schema was loaded from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_form_default: Option<Form>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_form_default: Option<Form>,
    /// Prefix -> namespace URI; the default namespace uses the empty prefix
    pub xmlns: BTreeMap<String, String>,
    pub elements: Vec<Element>,
    pub complex_types: Vec<ComplexType>,
    pub simple_types: Vec<SimpleType>,
    pub groups: Vec<NamedGroup>,
    pub attribute_groups: Vec<AttributeGroup>,
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<Include>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub redefines: Vec<Redefine>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opaque: Vec<Opaque>,
}

impl Schema {
    /// Schemas attached by `xs:import` (`$imports`)
    pub fn linked_imports(&self) -> impl Iterator<Item = &Schema> + '_ {
        self.imports.iter().filter_map(|i| i.link.schema())
    }

    /// Schemas attached by `xs:include` (`$includes`)
    pub fn linked_includes(&self) -> impl Iterator<Item = &Schema> + '_ {
        self.includes.iter().filter_map(|i| i.link.schema())
    }

    /// Base schemas attached to `xs:redefine` entries (`redefine[].$schema`)
    pub fn redefined_schemas(&self) -> impl Iterator<Item = &Schema> + '_ {
        self.redefines.iter().filter_map(|r| r.base_schema())
    }

    /// Human-readable identity for diagnostics
    pub fn display_name(&self) -> String {
        self.location
            .clone()
            .or_else(|| self.target_namespace.clone())
            .unwrap_or_else(|| "<inline schema>".to_string())
    }

    /// Namespace URI bound to `prefix` in this document
    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.xmlns.get(prefix).map(|s| s.as_str())
    }

    /// First non-empty prefix bound to `uri` in this document
    pub fn prefix_for_namespace(&self, uri: &str) -> Option<&str> {
        self.xmlns
            .iter()
            .find(|(prefix, ns)| !prefix.is_empty() && ns.as_str() == uri)
            .map(|(prefix, _)| prefix.as_str())
    }

    pub fn element_form(&self) -> Form {
        self.element_form_default.unwrap_or(Form::Unqualified)
    }

    pub fn attribute_form(&self) -> Form {
        self.attribute_form_default.unwrap_or(Form::Unqualified)
    }
}
