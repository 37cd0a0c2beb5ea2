//! Traversal over linked closures through the public API

use pretty_assertions::assert_eq;
use xsdmap::link::{link_schema, LinkOptions, MemoryLoader};
use xsdmap::walk::{
    find_complex_type, walk_attributes, walk_complex_types, walk_elements, walk_schemas,
    walk_schemas_with, ContentSource, WalkOptions,
};
use xsdmap::{parse_schema, resolve_schema, ResolveOptions};

const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

fn schema_text(body: &str) -> String {
    format!("<xs:schema {XS}>{body}</xs:schema>")
}

fn linked_root() -> xsdmap::Schema {
    let loader = MemoryLoader::new()
        .with(
            "common/base.xsd",
            schema_text(
                r#"<xs:complexType name="Item">
                     <xs:sequence><xs:element name="code" type="xs:string"/></xs:sequence>
                     <xs:attribute name="id" type="xs:string" use="required"/>
                   </xs:complexType>"#,
            ),
        )
        .with(
            "common/extra.xsd",
            schema_text(r#"<xs:complexType name="Extra"/>"#),
        );
    let root = parse_schema(&schema_text(
        r#"<xs:include schemaLocation="common/extra.xsd"/>
           <xs:redefine schemaLocation="common/base.xsd">
             <xs:complexType name="Item">
               <xs:complexContent>
                 <xs:extension base="Item">
                   <xs:sequence><xs:element name="label" type="xs:string" minOccurs="0"/></xs:sequence>
                   <xs:attribute name="lang" type="xs:language"/>
                 </xs:extension>
               </xs:complexContent>
             </xs:complexType>
           </xs:redefine>
           <xs:element name="item" type="Item"/>"#,
    ))
    .unwrap();
    link_schema(root, &loader, &LinkOptions::default()).unwrap()
}

#[test]
fn test_closure_contains_each_schema_once() {
    let schema = linked_root();
    assert_eq!(walk_schemas(&schema).count(), 3);

    let without_includes = WalkOptions {
        imports: true,
        includes: false,
    };
    assert_eq!(walk_schemas_with(&schema, without_includes).count(), 1);
}

#[test]
fn test_redefined_type_walks_original_content_first() {
    let schema = linked_root();
    let item = find_complex_type("Item", &schema).unwrap();

    let elements: Vec<(String, bool)> = walk_elements(item.item, item.schema)
        .map(|w| (w.element.name.clone().unwrap_or_default(), w.optional))
        .collect();
    assert_eq!(
        elements,
        vec![("code".to_string(), false), ("label".to_string(), true)]
    );

    let attributes: Vec<(String, bool)> = walk_attributes(item.item, item.schema)
        .map(|w| (w.decl.name.clone().unwrap_or_default(), w.required))
        .collect();
    assert_eq!(
        attributes,
        vec![("id".to_string(), true), ("lang".to_string(), false)]
    );
}

#[test]
fn test_complex_types_visible_across_closure() {
    let schema = linked_root();
    let names: Vec<String> = walk_complex_types(&schema)
        .filter_map(|w| w.item.name.clone())
        .collect();
    assert!(names.contains(&"Extra".to_string()));
    // The redefinition and the original are both part of the closure
    assert_eq!(names.iter().filter(|n| n.as_str() == "Item").count(), 2);
}

#[test]
fn test_resolved_redefine_is_flat() {
    let schema = linked_root();
    let resolved = resolve_schema(&schema, &ResolveOptions::default()).unwrap();
    let item = find_complex_type("Item", &resolved).unwrap();
    let names: Vec<String> = walk_elements(item.item, item.schema)
        .map(|w| w.element.name.clone().unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["code", "label"]);
    assert!(resolved.redefines.is_empty());
}

#[test]
fn test_content_source_reports_compositor() {
    let schema = parse_schema(&schema_text(
        r#"<xs:complexType name="T">
             <xs:choice>
               <xs:element name="a" type="xs:string"/>
               <xs:sequence><xs:element name="b" type="xs:string"/></xs:sequence>
             </xs:choice>
           </xs:complexType>"#,
    ))
    .unwrap();
    let ty = find_complex_type("T", &schema).unwrap();
    let sources: Vec<(String, ContentSource, bool)> = walk_elements(ty.item, ty.schema)
        .map(|w| {
            (
                w.element.name.clone().unwrap_or_default(),
                w.source,
                w.optional,
            )
        })
        .collect();
    assert_eq!(
        sources,
        vec![
            ("a".to_string(), ContentSource::Choice, true),
            ("b".to_string(), ContentSource::Nested, true),
        ]
    );
}

#[test]
fn test_same_local_name_base_in_other_namespace() {
    let loader = MemoryLoader::new().with(
        "b.xsd",
        format!(
            r#"<xs:schema {XS} targetNamespace="urn:b">
                 <xs:complexType name="Item">
                   <xs:sequence><xs:element name="inherited" type="xs:string"/></xs:sequence>
                   <xs:attribute name="origin" type="xs:string"/>
                 </xs:complexType>
               </xs:schema>"#
        ),
    );
    let root = parse_schema(&format!(
        r#"<xs:schema {XS} xmlns:a="urn:a" xmlns:b="urn:b" targetNamespace="urn:a">
             <xs:import namespace="urn:b" schemaLocation="b.xsd"/>
             <xs:complexType name="Item">
               <xs:complexContent>
                 <xs:extension base="b:Item">
                   <xs:sequence><xs:element name="own" type="xs:string"/></xs:sequence>
                 </xs:extension>
               </xs:complexContent>
             </xs:complexType>
             <xs:element name="item" type="a:Item"/>
           </xs:schema>"#
    ))
    .unwrap();
    let schema = link_schema(root, &loader, &LinkOptions::default()).unwrap();

    let item = find_complex_type("a:Item", &schema).unwrap();
    assert_eq!(item.schema.target_namespace.as_deref(), Some("urn:a"));
    let base = find_complex_type("b:Item", &schema).unwrap();
    assert_eq!(base.schema.target_namespace.as_deref(), Some("urn:b"));

    let elements: Vec<String> = walk_elements(item.item, item.schema)
        .map(|w| w.element.name.clone().unwrap_or_default())
        .collect();
    assert_eq!(elements, vec!["inherited", "own"]);
    let attributes: Vec<String> = walk_attributes(item.item, item.schema)
        .map(|w| w.decl.name.clone().unwrap_or_default())
        .collect();
    assert_eq!(attributes, vec!["origin"]);

    let resolved = resolve_schema(&schema, &ResolveOptions::default()).unwrap();
    let flat = find_complex_type("Item", &resolved).unwrap();
    let names: Vec<String> = walk_elements(flat.item, flat.schema)
        .map(|w| w.element.name.clone().unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["inherited", "own"]);
}
