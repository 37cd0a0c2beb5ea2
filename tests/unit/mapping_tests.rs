//! Record mapping through the public API

use pretty_assertions::assert_eq;
use serde_json::json;
use xsdmap::link::MemoryLoader;
use xsdmap::{
    build_document, build_xml, link_schema, parse_schema, parse_xml, parse_xml_with,
    resolve_schema, BuildOptions, LinkOptions, ParseOptions, ResolveOptions, Value, XsdError,
};

const XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="report" type="Report"/>
  <xs:complexType name="Report">
    <xs:sequence>
      <xs:choice>
        <xs:element name="draft" type="xs:string"/>
        <xs:element name="final" type="xs:string"/>
      </xs:choice>
      <xs:element name="score" type="xs:decimal" nillable="true"/>
      <xs:element name="tags" type="TagList" minOccurs="0"/>
      <xs:element name="price" type="Price" minOccurs="0" maxOccurs="unbounded"/>
    </xs:sequence>
    <xs:attribute name="created" type="xs:dateTime"/>
  </xs:complexType>
  <xs:simpleType name="TagList">
    <xs:list itemType="xs:token"/>
  </xs:simpleType>
  <xs:complexType name="Price">
    <xs:simpleContent>
      <xs:extension base="xs:decimal">
        <xs:attribute name="currency" type="xs:string" use="required"/>
      </xs:extension>
    </xs:simpleContent>
  </xs:complexType>
</xs:schema>"#;

fn compact() -> BuildOptions {
    BuildOptions {
        xml_decl: false,
        pretty: false,
        ..Default::default()
    }
}

#[test]
fn test_choice_members_are_never_required() {
    let schema = parse_schema(XSD).unwrap();
    let strict = ParseOptions { strict: true };
    let record = parse_xml_with(
        &schema,
        r#"<report><final>done</final><score>1.5</score></report>"#,
        &strict,
    )
    .unwrap();
    assert_eq!(record["report"].get("final"), Some(&Value::from("done")));
    assert!(record["report"].get("draft").is_none());
}

#[test]
fn test_nil_list_and_simple_content() {
    let schema = parse_schema(XSD).unwrap();
    let record = parse_xml(
        &schema,
        r#"<report xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" created="2024-05-01T08:00:00+02:00">
             <draft>wip</draft>
             <score xsi:nil="true"/>
             <tags>alpha  beta
               gamma</tags>
             <price currency="EUR">9.50</price>
           </report>"#,
    )
    .unwrap();
    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({
            "report": {
                "created": "2024-05-01T08:00:00+02:00",
                "draft": "wip",
                "score": null,
                "tags": ["alpha", "beta", "gamma"],
                "price": [{"currency": "EUR", "$value": 9.5}]
            }
        })
    );
}

#[test]
fn test_build_nil_and_list() {
    let schema = parse_schema(XSD).unwrap();
    let content = Value::from(json!({
        "draft": "x",
        "score": null,
        "tags": ["a", "b"],
        "price": [{"currency": "USD", "$value": 3}]
    }));
    let xml = build_xml(&schema, "report", &content, &compact()).unwrap();
    assert_eq!(
        xml,
        r#"<report xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><draft>x</draft><score xsi:nil="true"/><tags>a b</tags><price currency="USD">3</price></report>"#
    );
}

#[test]
fn test_resolved_and_linked_schemas_agree() {
    let schema = parse_schema(XSD).unwrap();
    let resolved = resolve_schema(&schema, &ResolveOptions::default()).unwrap();
    let xml = r#"<report><draft>a</draft><score>2</score><price currency="CHF">1</price></report>"#;
    assert_eq!(parse_xml(&schema, xml).unwrap(), parse_xml(&resolved, xml).unwrap());
}

#[test]
fn test_unknown_root_is_reported() {
    let schema = parse_schema(XSD).unwrap();
    let err = build_xml(&schema, "invoice", &Value::Null, &compact()).unwrap_err();
    assert!(matches!(err, XsdError::UnknownRootElement { .. }));
}

#[test]
fn test_attribute_and_element_with_same_name() {
    let schema = parse_schema(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="obj">
    <xs:complexType>
      <xs:sequence><xs:element name="name" type="xs:string"/></xs:sequence>
      <xs:attribute name="name" type="xs:string"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
    )
    .unwrap();
    let xml = r#"<obj name="ATTR"><name>ELEM</name></obj>"#;

    let record = parse_xml(&schema, xml).unwrap();
    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({"obj": {"@name": "ATTR", "name": "ELEM"}})
    );
    assert_eq!(build_document(&schema, &record, &compact()).unwrap(), xml);
}

#[test]
fn test_same_local_name_from_two_namespaces() {
    let loader = MemoryLoader::new().with(
        "b.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:b">
  <xs:element name="item" type="xs:int"/>
</xs:schema>"#,
    );
    let root = parse_schema(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:a="urn:a"
    xmlns:b="urn:b" targetNamespace="urn:a" elementFormDefault="qualified">
  <xs:import namespace="urn:b" schemaLocation="b.xsd"/>
  <xs:element name="obj">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="item" type="xs:string"/>
        <xs:element ref="b:item"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
    )
    .unwrap();
    let schema = link_schema(root, &loader, &LinkOptions::default()).unwrap();
    let xml = r#"<a:obj xmlns:a="urn:a" xmlns:b="urn:b"><a:item>one</a:item><b:item>2</b:item></a:obj>"#;

    let record = parse_xml(&schema, xml).unwrap();
    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({"obj": {"item": "one", "{urn:b}item": 2}})
    );
    assert_eq!(build_document(&schema, &record, &compact()).unwrap(), xml);
}

#[test]
fn test_mixed_content_survives_indentation() {
    let schema = parse_schema(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="doc">
    <xs:complexType>
      <xs:sequence><xs:element name="note" type="Note"/></xs:sequence>
    </xs:complexType>
  </xs:element>
  <xs:complexType name="Note" mixed="true">
    <xs:sequence><xs:element name="b" type="xs:string" minOccurs="0"/></xs:sequence>
  </xs:complexType>
</xs:schema>"#,
    )
    .unwrap();
    let content = Value::from(json!({"note": {"$value": "hello", "b": "bold"}}));

    let xml = build_xml(&schema, "doc", &content, &BuildOptions::default()).unwrap();
    assert!(xml.contains("<note>hello<b>bold</b></note>"), "{xml}");
    let record = parse_xml(&schema, &xml).unwrap();
    assert_eq!(record["doc"], content);

    // Hand-indented documents drop the whitespace-only runs around children
    let record = parse_xml(
        &schema,
        "<doc>\n  <note>hello<b>bold</b>\n  </note>\n</doc>",
    )
    .unwrap();
    assert_eq!(record["doc"], content);
}
