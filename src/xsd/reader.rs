//! XSD markup -> [`Schema`]

use std::path::Path;

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{Result, XsdError};
use crate::link::read_schema_text;
use crate::model::{
    Attribute, AttributeGroup, AttributeItem, AttributeUse, ComplexType, Derivation,
    DerivationMethod, Element, Facet, Form, GroupRef, Import, Include, Link, MaxOccurs,
    ModelGroup, NamedGroup, Occurs, Opaque, Particle, Redefine, Schema, SimpleType,
    SimpleVariety, TypeContent, Wildcard, XML_NAMESPACE, XS_NAMESPACE,
};

/// Parse XSD markup into a schema model.
///
/// Constructs the model has no slot for (annotations, identity constraints,
/// foreign elements) are kept verbatim as [`Opaque`] markup on the enclosing
/// declaration, group or derivation. Annotations inside `complexContent` /
/// `simpleContent` wrappers, `list` / `union` bodies, directives, group
/// references, wildcards and facets are not kept.
pub fn parse_schema(text: &str) -> Result<Schema> {
    parse_schema_at(text, None)
}

/// Parse XSD markup, recording the location it was loaded from
pub fn parse_schema_at(text: &str, location: Option<String>) -> Result<Schema> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(text, options)
        .map_err(|e| XsdError::schema_parse("document", e.to_string()))?;

    let reader = Reader { text };
    let mut schema = reader.schema(doc.root_element())?;
    schema.location = location;
    Ok(schema)
}

/// Read and parse an XSD file
pub fn parse_schema_file(path: &Path) -> Result<Schema> {
    let text = read_schema_text(path)?;
    parse_schema_at(&text, Some(path.to_string_lossy().into_owned()))
}

fn is_xs(node: &Node) -> bool {
    node.is_element() && node.tag_name().namespace() == Some(XS_NAMESPACE)
}

fn local<'a, 'input>(node: &Node<'a, 'input>) -> &'a str {
    node.tag_name().name()
}

fn attr(node: &Node, name: &str) -> Option<String> {
    node.attribute(name).map(|s| s.to_string())
}

fn flag(node: &Node, name: &str) -> bool {
    matches!(node.attribute(name), Some("true") | Some("1"))
}

/// Describe a node for error messages: `element 'foo'` or `complexType`
fn describe(node: &Node) -> String {
    match node.attribute("name").or_else(|| node.attribute("ref")) {
        Some(name) => format!("{} '{}'", local(node), name),
        None => local(node).to_string(),
    }
}

struct Reader<'t> {
    text: &'t str,
}

impl<'t> Reader<'t> {
    fn opaque(&self, node: &Node) -> Opaque {
        Opaque {
            name: local(node).to_string(),
            xml: self.text[node.range()].to_string(),
        }
    }

    fn schema(&self, root: Node) -> Result<Schema> {
        if !is_xs(&root) || local(&root) != "schema" {
            return Err(XsdError::schema_parse(
                describe(&root),
                "root element must be xs:schema",
            ));
        }

        let mut schema = Schema {
            target_namespace: attr(&root, "targetNamespace"),
            element_form_default: self.form(&root, "elementFormDefault")?,
            attribute_form_default: self.form(&root, "attributeFormDefault")?,
            ..Default::default()
        };

        for ns in root.namespaces() {
            if ns.uri() == XML_NAMESPACE {
                continue;
            }
            schema
                .xmlns
                .insert(ns.name().unwrap_or("").to_string(), ns.uri().to_string());
        }

        for child in root.children().filter(|n| n.is_element()) {
            if !is_xs(&child) {
                schema.opaque.push(self.opaque(&child));
                continue;
            }
            match local(&child) {
                "element" => schema.elements.push(self.element(&child)?),
                "complexType" => schema.complex_types.push(self.named_complex_type(&child)?),
                "simpleType" => schema.simple_types.push(self.named_simple_type(&child)?),
                "group" => schema.groups.push(self.named_group(&child)?),
                "attributeGroup" => schema.attribute_groups.push(self.attribute_group(&child)?),
                "attribute" => schema.attributes.push(self.attribute(&child)?),
                "import" => schema.imports.push(Import {
                    namespace: attr(&child, "namespace"),
                    schema_location: attr(&child, "schemaLocation"),
                    link: Link::Unlinked,
                }),
                "include" => schema.includes.push(Include {
                    schema_location: self.required(&child, "schemaLocation")?,
                    link: Link::Unlinked,
                }),
                "redefine" => schema.redefines.push(self.redefine(&child)?),
                _ => schema.opaque.push(self.opaque(&child)),
            }
        }

        Ok(schema)
    }

    fn required(&self, node: &Node, name: &str) -> Result<String> {
        attr(node, name).ok_or_else(|| {
            XsdError::schema_parse(describe(node), format!("missing required attribute '{name}'"))
        })
    }

    fn form(&self, node: &Node, name: &str) -> Result<Option<Form>> {
        match node.attribute(name) {
            None => Ok(None),
            Some(value) => Form::parse(value).map(Some).ok_or_else(|| {
                XsdError::schema_parse(describe(node), format!("invalid {name} '{value}'"))
            }),
        }
    }

    fn occurs(&self, node: &Node) -> Result<Occurs> {
        let min = match node.attribute("minOccurs") {
            None => None,
            Some(value) => Some(value.trim().parse::<u32>().map_err(|_| {
                XsdError::schema_parse(describe(node), format!("invalid minOccurs '{value}'"))
            })?),
        };
        let max = match node.attribute("maxOccurs") {
            None => None,
            Some(value) => Some(MaxOccurs::parse(value).ok_or_else(|| {
                XsdError::schema_parse(describe(node), format!("invalid maxOccurs '{value}'"))
            })?),
        };
        Ok(Occurs::new(min, max))
    }

    fn element(&self, node: &Node) -> Result<Element> {
        let mut element = Element {
            name: attr(node, "name"),
            reference: attr(node, "ref"),
            type_name: attr(node, "type"),
            occurs: self.occurs(node)?,
            is_abstract: flag(node, "abstract"),
            substitution_group: attr(node, "substitutionGroup"),
            nillable: flag(node, "nillable"),
            default: attr(node, "default"),
            fixed: attr(node, "fixed"),
            form: self.form(node, "form")?,
            namespace: attr(node, "targetNamespace"),
            ..Default::default()
        };
        if element.name.is_none() && element.reference.is_none() {
            return Err(XsdError::schema_parse(
                describe(node),
                "element needs either a name or a ref",
            ));
        }

        for child in node.children().filter(|n| n.is_element()) {
            match (is_xs(&child), local(&child)) {
                (true, "complexType") => {
                    element.complex_type = Some(Box::new(self.complex_type(&child)?))
                }
                (true, "simpleType") => {
                    element.simple_type = Some(Box::new(self.simple_type(&child)?))
                }
                _ => element.opaque.push(self.opaque(&child)),
            }
        }
        Ok(element)
    }

    fn named_complex_type(&self, node: &Node) -> Result<ComplexType> {
        let ct = self.complex_type(node)?;
        if ct.name.is_none() {
            return Err(XsdError::schema_parse(
                "complexType",
                "top-level complexType needs a name",
            ));
        }
        Ok(ct)
    }

    fn complex_type(&self, node: &Node) -> Result<ComplexType> {
        let mut ct = ComplexType {
            name: attr(node, "name"),
            is_abstract: flag(node, "abstract"),
            mixed: flag(node, "mixed"),
            ..Default::default()
        };

        for child in node.children().filter(|n| n.is_element()) {
            if !is_xs(&child) {
                ct.opaque.push(self.opaque(&child));
                continue;
            }
            match local(&child) {
                "sequence" | "choice" | "all" | "group" => {
                    if let Some(particle) = self.particle(&child)? {
                        ct.content = TypeContent::Particle(particle);
                    }
                }
                "complexContent" => {
                    if flag(&child, "mixed") {
                        ct.mixed = true;
                    }
                    ct.content = TypeContent::Complex(self.derivation(&child)?);
                }
                "simpleContent" => ct.content = TypeContent::Simple(self.derivation(&child)?),
                "attribute" | "attributeGroup" | "anyAttribute" => {
                    ct.attributes.push(self.attribute_item(&child)?)
                }
                _ => ct.opaque.push(self.opaque(&child)),
            }
        }
        Ok(ct)
    }

    /// `complexContent` / `simpleContent` body
    fn derivation(&self, node: &Node) -> Result<Derivation> {
        let body = node
            .children()
            .find(|n| is_xs(n) && matches!(local(n), "extension" | "restriction"))
            .ok_or_else(|| {
                XsdError::schema_parse(describe(node), "expected extension or restriction")
            })?;
        let method = if local(&body) == "extension" {
            DerivationMethod::Extension
        } else {
            DerivationMethod::Restriction
        };

        let mut derivation = Derivation {
            method,
            base: self.required(&body, "base")?,
            particle: None,
            attributes: Vec::new(),
            facets: Vec::new(),
            opaque: Vec::new(),
        };

        for child in body.children().filter(|n| n.is_element()) {
            if !is_xs(&child) {
                derivation.opaque.push(self.opaque(&child));
                continue;
            }
            match local(&child) {
                "sequence" | "choice" | "all" | "group" => {
                    derivation.particle = self.particle(&child)?;
                }
                "attribute" | "attributeGroup" | "anyAttribute" => {
                    derivation.attributes.push(self.attribute_item(&child)?)
                }
                "annotation" | "simpleType" => derivation.opaque.push(self.opaque(&child)),
                kind => derivation.facets.push(self.facet(&child, kind)?),
            }
        }
        Ok(derivation)
    }

    fn facet(&self, node: &Node, kind: &str) -> Result<Facet> {
        Ok(Facet {
            kind: kind.to_string(),
            value: self.required(node, "value")?,
        })
    }

    fn particle(&self, node: &Node) -> Result<Option<Particle>> {
        let particle = match local(node) {
            "element" => Particle::Element(self.element(node)?),
            "sequence" => Particle::Sequence(self.model_group(node)?),
            "choice" => Particle::Choice(self.model_group(node)?),
            "all" => Particle::All(self.model_group(node)?),
            "group" => Particle::Group(GroupRef {
                reference: self.required(node, "ref")?,
                occurs: self.occurs(node)?,
            }),
            "any" => Particle::Any(self.wildcard(node)?),
            _ => return Ok(None),
        };
        Ok(Some(particle))
    }

    fn xs_particle(&self, node: &Node) -> Result<Option<Particle>> {
        if is_xs(node) {
            self.particle(node)
        } else {
            Ok(None)
        }
    }

    fn model_group(&self, node: &Node) -> Result<ModelGroup> {
        let mut group = ModelGroup {
            occurs: self.occurs(node)?,
            ..Default::default()
        };
        for child in node.children().filter(|n| n.is_element()) {
            match self.xs_particle(&child)? {
                Some(particle) => group.particles.push(particle),
                None => group.opaque.push(self.opaque(&child)),
            }
        }
        Ok(group)
    }

    fn wildcard(&self, node: &Node) -> Result<Wildcard> {
        Ok(Wildcard {
            namespace: attr(node, "namespace"),
            process_contents: attr(node, "processContents"),
            occurs: self.occurs(node)?,
        })
    }

    fn named_group(&self, node: &Node) -> Result<NamedGroup> {
        let mut particle = None;
        let mut opaque = Vec::new();
        for child in node.children().filter(|n| n.is_element()) {
            match self.xs_particle(&child)? {
                Some(p) => particle = Some(p),
                None => opaque.push(self.opaque(&child)),
            }
        }
        Ok(NamedGroup {
            name: self.required(node, "name")?,
            particle,
            opaque,
        })
    }

    fn attribute_group(&self, node: &Node) -> Result<AttributeGroup> {
        let mut attributes = Vec::new();
        let mut opaque = Vec::new();
        for child in node.children().filter(|n| n.is_element()) {
            if is_xs(&child)
                && matches!(local(&child), "attribute" | "attributeGroup" | "anyAttribute")
            {
                attributes.push(self.attribute_item(&child)?);
            } else {
                opaque.push(self.opaque(&child));
            }
        }
        Ok(AttributeGroup {
            name: self.required(node, "name")?,
            attributes,
            opaque,
        })
    }

    fn attribute_item(&self, node: &Node) -> Result<AttributeItem> {
        match local(node) {
            "attribute" => Ok(AttributeItem::Attribute(self.attribute(node)?)),
            "attributeGroup" => Ok(AttributeItem::Group(self.required(node, "ref")?)),
            _ => Ok(AttributeItem::Any(self.wildcard(node)?)),
        }
    }

    fn attribute(&self, node: &Node) -> Result<Attribute> {
        let usage = match node.attribute("use") {
            None => None,
            Some(value) => Some(AttributeUse::parse(value).ok_or_else(|| {
                XsdError::schema_parse(describe(node), format!("invalid use '{value}'"))
            })?),
        };
        let mut attribute = Attribute {
            name: attr(node, "name"),
            reference: attr(node, "ref"),
            type_name: attr(node, "type"),
            usage,
            default: attr(node, "default"),
            fixed: attr(node, "fixed"),
            form: self.form(node, "form")?,
            namespace: attr(node, "targetNamespace"),
            ..Default::default()
        };
        if attribute.name.is_none() && attribute.reference.is_none() {
            return Err(XsdError::schema_parse(
                describe(node),
                "attribute needs either a name or a ref",
            ));
        }
        for child in node.children().filter(|n| n.is_element()) {
            if is_xs(&child) && local(&child) == "simpleType" {
                attribute.simple_type = Some(Box::new(self.simple_type(&child)?));
            } else {
                attribute.opaque.push(self.opaque(&child));
            }
        }
        Ok(attribute)
    }

    fn named_simple_type(&self, node: &Node) -> Result<SimpleType> {
        let st = self.simple_type(node)?;
        if st.name.is_none() {
            return Err(XsdError::schema_parse(
                "simpleType",
                "top-level simpleType needs a name",
            ));
        }
        Ok(st)
    }

    fn simple_type(&self, node: &Node) -> Result<SimpleType> {
        let body = node
            .children()
            .find(|n| is_xs(n) && matches!(local(n), "restriction" | "list" | "union"))
            .ok_or_else(|| {
                XsdError::schema_parse(describe(node), "expected restriction, list or union")
            })?;

        let inline: Vec<Node> = body
            .children()
            .filter(|n| is_xs(n) && local(n) == "simpleType")
            .collect();

        let variety = match local(&body) {
            "restriction" => {
                let mut facets = Vec::new();
                let mut opaque = Vec::new();
                for child in body.children().filter(|n| n.is_element()) {
                    match (is_xs(&child), local(&child)) {
                        (true, "simpleType") => {}
                        (true, kind) if kind != "annotation" => {
                            facets.push(self.facet(&child, kind)?)
                        }
                        _ => opaque.push(self.opaque(&child)),
                    }
                }
                SimpleVariety::Restriction {
                    base: attr(&body, "base"),
                    inline_base: match inline.first() {
                        Some(n) => Some(Box::new(self.simple_type(n)?)),
                        None => None,
                    },
                    facets,
                    opaque,
                }
            }
            "list" => SimpleVariety::List {
                item_type: attr(&body, "itemType"),
                item: match inline.first() {
                    Some(n) => Some(Box::new(self.simple_type(n)?)),
                    None => None,
                },
            },
            _ => SimpleVariety::Union {
                member_types: body
                    .attribute("memberTypes")
                    .map(|s| s.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default(),
                members: inline
                    .iter()
                    .map(|n| self.simple_type(n))
                    .collect::<Result<Vec<_>>>()?,
            },
        };

        // Anything beside the variety, usually its documentation
        let opaque = node
            .children()
            .filter(|n| n.is_element() && *n != body)
            .map(|n| self.opaque(&n))
            .collect();
        Ok(SimpleType {
            name: attr(node, "name"),
            variety,
            opaque,
        })
    }

    fn redefine(&self, node: &Node) -> Result<Redefine> {
        let mut redefine = Redefine {
            schema_location: self.required(node, "schemaLocation")?,
            ..Default::default()
        };
        for child in node.children().filter(|n| n.is_element()) {
            if !is_xs(&child) {
                redefine.opaque.push(self.opaque(&child));
                continue;
            }
            match local(&child) {
                "complexType" => redefine
                    .complex_types
                    .push(self.named_complex_type(&child)?),
                "simpleType" => redefine.simple_types.push(self.named_simple_type(&child)?),
                "group" => redefine.groups.push(self.named_group(&child)?),
                "attributeGroup" => redefine.attribute_groups.push(self.attribute_group(&child)?),
                _ => redefine.opaque.push(self.opaque(&child)),
            }
        }
        Ok(redefine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:pak="http://www.sap.com/adt/packages"
           targetNamespace="http://www.sap.com/adt/packages"
           elementFormDefault="qualified">
  <xs:annotation><xs:documentation>Packages</xs:documentation></xs:annotation>
  <xs:import namespace="http://www.sap.com/adt/core" schemaLocation="adtcore.xsd"/>
  <xs:element name="package" type="pak:Package"/>
  <xs:complexType name="Package">
    <xs:sequence>
      <xs:element name="attributes" type="pak:Attributes" minOccurs="0"/>
      <xs:element name="subPackage" type="xs:string" maxOccurs="unbounded"/>
    </xs:sequence>
    <xs:attribute name="name" type="xs:string" use="required"/>
  </xs:complexType>
  <xs:complexType name="Attributes">
    <xs:attribute name="packageType" type="xs:string"/>
  </xs:complexType>
</xs:schema>"#;

    #[test]
    fn test_parse_top_level_declarations() {
        let schema = parse_schema(PACKAGE_XSD).unwrap();
        assert_eq!(
            schema.target_namespace.as_deref(),
            Some("http://www.sap.com/adt/packages")
        );
        assert_eq!(schema.element_form_default, Some(Form::Qualified));
        assert_eq!(schema.elements.len(), 1);
        assert_eq!(schema.complex_types.len(), 2);
        assert_eq!(schema.imports.len(), 1);
        assert_eq!(schema.imports[0].link, Link::Unlinked);
        assert_eq!(
            schema.xmlns.get("pak").map(String::as_str),
            Some("http://www.sap.com/adt/packages")
        );
        assert!(!schema.xmlns.contains_key("xml"));
        assert_eq!(schema.opaque.len(), 1);
        assert_eq!(schema.opaque[0].name, "annotation");
    }

    #[test]
    fn test_parse_cardinalities() {
        let schema = parse_schema(PACKAGE_XSD).unwrap();
        let package = &schema.complex_types[0];
        let TypeContent::Particle(Particle::Sequence(seq)) = &package.content else {
            panic!("expected a sequence, got {:?}", package.content);
        };
        let Particle::Element(attributes) = &seq.particles[0] else {
            panic!("expected element");
        };
        assert!(attributes.occurs.is_optional());
        let Particle::Element(sub) = &seq.particles[1] else {
            panic!("expected element");
        };
        assert_eq!(sub.occurs.max, Some(MaxOccurs::Unbounded));
        assert_eq!(package.attributes.len(), 1);
    }

    #[test]
    fn test_parse_extension() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:complexType name="Derived">
    <xs:complexContent>
      <xs:extension base="Base">
        <xs:sequence><xs:element name="extra" type="xs:string"/></xs:sequence>
        <xs:attribute name="version" type="xs:string"/>
      </xs:extension>
    </xs:complexContent>
  </xs:complexType>
</xs:schema>"#;
        let schema = parse_schema(xsd).unwrap();
        let derived = schema.complex_types[0].extension().unwrap();
        assert_eq!(derived.base, "Base");
        assert!(derived.particle.is_some());
        assert_eq!(derived.attributes.len(), 1);
    }

    #[test]
    fn test_parse_simple_type_varieties() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="Visibility">
    <xs:restriction base="xs:string">
      <xs:enumeration value="public"/>
      <xs:enumeration value="private"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="Numbers"><xs:list itemType="xs:int"/></xs:simpleType>
  <xs:simpleType name="Either"><xs:union memberTypes="xs:int xs:boolean"/></xs:simpleType>
</xs:schema>"#;
        let schema = parse_schema(xsd).unwrap();
        assert_eq!(schema.simple_types[0].enumeration(), vec!["public", "private"]);
        assert!(matches!(
            &schema.simple_types[1].variety,
            SimpleVariety::List { item_type: Some(t), .. } if t == "xs:int"
        ));
        assert!(matches!(
            &schema.simple_types[2].variety,
            SimpleVariety::Union { member_types, .. } if member_types.len() == 2
        ));
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let err = parse_schema("<xs:schema").unwrap_err();
        assert!(matches!(err, XsdError::SchemaParse { .. }));
    }

    #[test]
    fn test_error_names_construct() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="broken" type="xs:string" maxOccurs="lots"/>
</xs:schema>"#;
        match parse_schema(xsd).unwrap_err() {
            XsdError::SchemaParse { construct, message } => {
                assert_eq!(construct, "element 'broken'");
                assert!(message.contains("maxOccurs"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_schema_root() {
        let err = parse_schema("<root/>").unwrap_err();
        assert!(matches!(err, XsdError::SchemaParse { .. }));
    }

    #[test]
    fn test_parse_redefine() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:redefine schemaLocation="base.xsd">
    <xs:complexType name="T">
      <xs:complexContent>
        <xs:extension base="T">
          <xs:sequence><xs:element name="added" type="xs:string"/></xs:sequence>
        </xs:extension>
      </xs:complexContent>
    </xs:complexType>
  </xs:redefine>
</xs:schema>"#;
        let schema = parse_schema(xsd).unwrap();
        assert_eq!(schema.redefines.len(), 1);
        assert_eq!(schema.redefines[0].schema_location, "base.xsd");
        assert_eq!(schema.redefines[0].complex_types.len(), 1);
        assert!(schema.includes.is_empty());
    }
}
