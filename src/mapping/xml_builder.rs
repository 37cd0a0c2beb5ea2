//! [`Record`] -> XML document, driven by schema-declared fields

use std::collections::{BTreeMap, HashMap, HashSet};

use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::warn;

use super::convert::{format_scalar, format_text};
use super::fields::{Field, FieldKind, FieldResolver, FieldType};
use super::value::{Record, Value};
use crate::error::{Result, XsdError};
use crate::model::{ComplexType, Schema, XML_NAMESPACE, XSI_NAMESPACE};
use crate::walk::{walk_schemas, Walked};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>`
    pub xml_decl: bool,
    /// Indent nested elements by two spaces
    pub pretty: bool,
    /// Prefix attributes that belong to a namespace. When off, namespaced
    /// attributes are written unprefixed; the parser accepts both.
    pub qualify_attributes: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            xml_decl: true,
            pretty: true,
            qualify_attributes: true,
        }
    }
}

/// Build the document for a wrapped record `{ rootName: content }`
pub fn build_document(schema: &Schema, document: &Record, options: &BuildOptions) -> Result<String> {
    let mut entries = document.iter();
    match (entries.next(), entries.next()) {
        (Some((root, content)), None) => build_xml(schema, root, content, options),
        _ => Err(XsdError::Write {
            message: format!("expected exactly one root entry, found {}", document.len()),
        }),
    }
}

/// Build the document whose root element is `root` with the given content
pub fn build_xml(schema: &Schema, root: &str, content: &Value, options: &BuildOptions) -> Result<String> {
    let fields = FieldResolver::new(schema);
    let field = fields
        .root_field(root)
        .ok_or_else(|| XsdError::UnknownRootElement {
            name: root.to_string(),
        })?;

    let tree = NodeBuilder { fields: &fields }.node(&field, content);
    let prefixes = Prefixes::assign(schema, &tree, options.qualify_attributes);
    write_document(&tree, &prefixes, options)
}

#[derive(Debug)]
struct XmlNode {
    namespace: Option<String>,
    name: String,
    attributes: Vec<XmlAttribute>,
    text: Option<String>,
    children: Vec<XmlNode>,
}

#[derive(Debug)]
struct XmlAttribute {
    namespace: Option<String>,
    name: String,
    value: String,
}

struct NodeBuilder<'b, 'a> {
    fields: &'b FieldResolver<'a>,
}

impl<'a> NodeBuilder<'_, 'a> {
    fn node(&self, field: &Field<'a>, value: &Value) -> XmlNode {
        let mut node = XmlNode {
            namespace: field.namespace.clone(),
            name: field.name.clone(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        };
        match (field.ty, value) {
            (_, Value::Null) => {
                if field.nillable {
                    node.attributes.push(XmlAttribute {
                        namespace: Some(XSI_NAMESPACE.to_string()),
                        name: "nil".to_string(),
                        value: "true".to_string(),
                    });
                }
            }
            (FieldType::Complex(ty), Value::Record(record)) => self.fill(&mut node, ty, record),
            (_, other) => node.text = Some(format_text(other)),
        }
        node
    }

    fn fill(&self, node: &mut XmlNode, ty: Walked<'a, ComplexType>, record: &Record) {
        let fields = self.fields.fields(ty.item, ty.schema);
        for field in fields.iter() {
            let Some(value) = record.get(&field.key) else {
                continue;
            };
            match field.kind {
                FieldKind::Attribute => {
                    if !value.is_null() {
                        node.attributes.push(XmlAttribute {
                            namespace: field.namespace.clone(),
                            name: field.name.clone(),
                            value: attribute_text(value),
                        });
                    }
                }
                FieldKind::Text => node.text = Some(format_text(value)),
                FieldKind::Element => match value {
                    Value::List(items) if field.array => {
                        node.children
                            .extend(items.iter().map(|item| self.node(field, item)));
                    }
                    other => node.children.push(self.node(field, other)),
                },
            }
        }

        for key in record.keys() {
            if !fields.iter().any(|f| &f.key == key) {
                warn!(key = %key, element = %node.name, "Record key has no schema field, ignored");
            }
        }
    }
}

/// Attribute text: records are JSON-encoded, lists whitespace separated
fn attribute_text(value: &Value) -> String {
    match value {
        Value::Record(_) => serde_json::to_string(value).unwrap_or_default(),
        other => format_scalar(other).unwrap_or_else(|| format_text(other)),
    }
}

/// Namespace -> prefix assignment for one document
struct Prefixes {
    by_namespace: HashMap<String, String>,
    /// Declarations written on the root element
    declared: BTreeMap<String, String>,
    qualify_attributes: bool,
}

impl Prefixes {
    /// Collect namespaces actually used by the tree and name them after the
    /// schema closure's prefixes, generating `ns1`, `ns2`, ... otherwise
    fn assign(schema: &Schema, root: &XmlNode, qualify_attributes: bool) -> Self {
        let mut used: Vec<&str> = Vec::new();
        collect_namespaces(root, qualify_attributes, &mut used);

        let mut prefixes = Prefixes {
            by_namespace: HashMap::new(),
            declared: BTreeMap::new(),
            qualify_attributes,
        };
        let mut taken: HashSet<String> = HashSet::from(["xml".to_string()]);
        let mut generated = 0;
        for ns in used {
            if ns == XML_NAMESPACE {
                prefixes
                    .by_namespace
                    .insert(ns.to_string(), "xml".to_string());
                continue;
            }
            let known = walk_schemas(schema)
                .find_map(|s| s.prefix_for_namespace(ns))
                .map(str::to_string)
                .or_else(|| (ns == XSI_NAMESPACE).then(|| "xsi".to_string()))
                .filter(|p| !taken.contains(p));
            let prefix = known.unwrap_or_else(|| loop {
                generated += 1;
                let candidate = format!("ns{generated}");
                if !taken.contains(&candidate) {
                    break candidate;
                }
            });
            taken.insert(prefix.clone());
            prefixes.declared.insert(prefix.clone(), ns.to_string());
            prefixes.by_namespace.insert(ns.to_string(), prefix);
        }
        prefixes
    }

    fn qualify(&self, namespace: Option<&str>, name: &str) -> String {
        match namespace.and_then(|ns| self.by_namespace.get(ns)) {
            Some(prefix) => format!("{prefix}:{name}"),
            None => name.to_string(),
        }
    }

    fn element_name(&self, node: &XmlNode) -> String {
        self.qualify(node.namespace.as_deref(), &node.name)
    }

    fn attribute_name(&self, attr: &XmlAttribute) -> String {
        let always = attr.namespace.as_deref() == Some(XSI_NAMESPACE)
            || attr.namespace.as_deref() == Some(XML_NAMESPACE);
        if self.qualify_attributes || always {
            self.qualify(attr.namespace.as_deref(), &attr.name)
        } else {
            attr.name.clone()
        }
    }
}

fn collect_namespaces<'n>(node: &'n XmlNode, qualify_attributes: bool, used: &mut Vec<&'n str>) {
    let mut note = |ns: Option<&'n str>| {
        if let Some(ns) = ns {
            if !used.contains(&ns) {
                used.push(ns);
            }
        }
    };
    note(node.namespace.as_deref());
    for attr in &node.attributes {
        let special = matches!(attr.namespace.as_deref(), Some(XSI_NAMESPACE) | Some(XML_NAMESPACE));
        if qualify_attributes || special {
            note(attr.namespace.as_deref());
        }
    }
    for child in &node.children {
        collect_namespaces(child, qualify_attributes, used);
    }
}

fn write_document(root: &XmlNode, prefixes: &Prefixes, options: &BuildOptions) -> Result<String> {
    let writer = if options.pretty {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };
    let mut out = DocumentWriter { writer, prefixes };
    if options.xml_decl {
        out.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    }
    out.node(root, true)?;
    String::from_utf8(out.writer.into_inner()).map_err(|e| XsdError::Write {
        message: e.to_string(),
    })
}

struct DocumentWriter<'p> {
    writer: Writer<Vec<u8>>,
    prefixes: &'p Prefixes,
}

impl DocumentWriter<'_> {
    fn emit(&mut self, event: Event) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| XsdError::Write {
                message: e.to_string(),
            })
    }

    fn node(&mut self, node: &XmlNode, is_root: bool) -> Result<()> {
        let name = self.prefixes.element_name(node);
        let mut start = BytesStart::new(name.as_str());
        if is_root {
            for (prefix, uri) in &self.prefixes.declared {
                start.push_attribute((format!("xmlns:{prefix}").as_str(), uri.as_str()));
            }
        }
        for attr in &node.attributes {
            let key = self.prefixes.attribute_name(attr);
            start.push_attribute((key.as_str(), attr.value.as_str()));
        }

        if node.children.is_empty() && node.text.as_deref().map_or(true, str::is_empty) {
            return self.emit(Event::Empty(start));
        }

        self.emit(Event::Start(start.borrow()))?;
        if node.text.is_some() && !node.children.is_empty() {
            // Indentation inside mixed content would become part of its text
            let mut inner = DocumentWriter {
                writer: Writer::new(Vec::new()),
                prefixes: self.prefixes,
            };
            inner.content(node)?;
            let raw = String::from_utf8(inner.writer.into_inner()).map_err(|e| XsdError::Write {
                message: e.to_string(),
            })?;
            self.emit(Event::Text(BytesText::from_escaped(raw)))?;
        } else {
            self.content(node)?;
        }
        self.emit(Event::End(start.to_end()))
    }

    fn content(&mut self, node: &XmlNode) -> Result<()> {
        if let Some(text) = &node.text {
            self.emit(Event::Text(BytesText::new(text)))?;
        }
        for child in &node.children {
            self.node(child, false)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::parse_xml;
    use crate::xsd::parse_schema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    xmlns:cfg="urn:config" targetNamespace="urn:config"
    elementFormDefault="qualified" attributeFormDefault="qualified">
  <xs:element name="config">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="entry" maxOccurs="unbounded">
          <xs:complexType>
            <xs:simpleContent><xs:extension base="xs:string">
              <xs:attribute name="key" type="xs:string"/>
            </xs:extension></xs:simpleContent>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
      <xs:attribute name="version" type="xs:int"/>
      <xs:attribute name="meta" type="xs:string"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    fn compact() -> BuildOptions {
        BuildOptions {
            xml_decl: false,
            pretty: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_builds_with_schema_prefix() {
        let schema = parse_schema(XSD).unwrap();
        let content = Value::from(json!({
            "version": 2,
            "entry": [{"key": "a", "$value": "1"}, {"key": "b", "$value": "x < y"}]
        }));
        let xml = build_xml(&schema, "config", &content, &compact()).unwrap();
        assert_eq!(
            xml,
            r#"<cfg:config xmlns:cfg="urn:config" cfg:version="2"><cfg:entry cfg:key="a">1</cfg:entry><cfg:entry cfg:key="b">x &lt; y</cfg:entry></cfg:config>"#
        );
    }

    #[test]
    fn test_unqualified_attributes_option() {
        let schema = parse_schema(XSD).unwrap();
        let content = Value::from(json!({"version": 1}));
        let options = BuildOptions {
            qualify_attributes: false,
            ..compact()
        };
        let xml = build_xml(&schema, "config", &content, &options).unwrap();
        assert_eq!(xml, r#"<cfg:config xmlns:cfg="urn:config" version="1"/>"#);
    }

    #[test]
    fn test_record_attribute_is_json() {
        let schema = parse_schema(XSD).unwrap();
        let content = Value::from(json!({"meta": {"a": 1}}));
        let xml = build_xml(&schema, "config", &content, &compact()).unwrap();
        assert!(xml.contains(r#"cfg:meta="{&quot;a&quot;:1}""#), "{xml}");
    }

    #[test]
    fn test_generated_prefix_without_declaration() {
        let schema = parse_schema(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:bare">
  <xs:element name="item" type="xs:string"/>
</xs:schema>"#,
        )
        .unwrap();
        let xml = build_xml(&schema, "item", &Value::from("v"), &compact()).unwrap();
        assert_eq!(xml, r#"<ns1:item xmlns:ns1="urn:bare">v</ns1:item>"#);
    }

    #[test]
    fn test_round_trip() {
        let schema = parse_schema(XSD).unwrap();
        let original = parse_xml(
            &schema,
            r#"<c:config xmlns:c="urn:config" c:version="3"><c:entry c:key="k">v</c:entry></c:config>"#,
        )
        .unwrap();
        let xml = build_document(&schema, &original, &BuildOptions::default()).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert_eq!(parse_xml(&schema, &xml).unwrap(), original);
    }

    #[test]
    fn test_document_needs_single_root() {
        let schema = parse_schema(XSD).unwrap();
        let err = build_document(&schema, &Record::new(), &compact()).unwrap_err();
        assert!(matches!(err, XsdError::Write { .. }));
    }
}
