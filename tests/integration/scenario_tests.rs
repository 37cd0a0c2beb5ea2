//! End-to-end scenarios over on-disk schema sets

use pretty_assertions::assert_eq;
use serde_json::json;
use xsdmap::mapping::FieldKind;
use xsdmap::model::Link;
use xsdmap::{
    build_document, infer_shape, parse_xml, resolve_schema, write_schema, BuildOptions,
    ResolveOptions, Shape, WriteOptions, XsdError,
};

use crate::common::{keys, TestContext};

#[test]
fn test_class_fields_flattened_to_one_level() {
    let ctx = TestContext::with_fixture("classes");
    let schema = ctx.resolved("classes.xsd");

    let shape = infer_shape(&schema, "myClass").unwrap();
    let Shape::Record { fields } = &shape else {
        panic!("expected record shape, got {shape:?}");
    };
    let mut names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "abstract",
            "description",
            "final",
            "id",
            "include",
            "name",
            "packageRef",
            "version",
            "visibility"
        ]
    );

    let package_ref = shape.field("packageRef").unwrap();
    assert!(package_ref.optional);
    assert_eq!(package_ref.kind, FieldKind::Element);

    let include = shape.field("include").unwrap();
    assert!(include.array);
    let Shape::Record { fields: item } = &include.shape else {
        panic!("include should be a record, got {:?}", include.shape);
    };
    let item: Vec<&str> = item.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(item, vec!["includeType", "sourceUri"]);

    assert_eq!(shape.field("id").unwrap().kind, FieldKind::Attribute);
    assert!(!shape.field("id").unwrap().optional);
}

#[test]
fn test_class_document_parses_into_flat_record() {
    let ctx = TestContext::with_fixture("classes");
    let schema = ctx.resolved("classes.xsd");

    let record = parse_xml(&schema, &ctx.read("class.xml")).unwrap();
    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({
            "myClass": {
                "id": "ZCL_DEMO",
                "name": "ZCL_DEMO",
                "version": "active",
                "description": "Demo class",
                "final": true,
                "abstract": false,
                "visibility": "public",
                "packageRef": "$ZDEMO",
                "include": [
                    {"includeType": "main", "sourceUri": "source/main"},
                    {"includeType": "testclasses", "sourceUri": "includes/testclasses"}
                ]
            }
        })
    );

    // Inherited element keeps its declaring namespace when written back
    let xml = build_document(&schema, &record, &BuildOptions::default()).unwrap();
    assert!(xml.contains(r#"xmlns:obj="urn:example:objects""#), "{xml}");
    assert!(xml.contains("<obj:packageRef>$ZDEMO</obj:packageRef>"), "{xml}");
    assert_eq!(parse_xml(&schema, &xml).unwrap(), record);
}

#[test]
fn test_type_alias_root() {
    let ctx = TestContext::with_fixture("shapes");
    let schema = ctx.resolved("shapes.xsd");

    // No element is named `ShapeType`; the complex type is matched by name
    let shape = infer_shape(&schema, "ShapeType").unwrap();
    assert!(shape.field("color").is_some());
    assert!(matches!(
        infer_shape(&schema, "Polygon").unwrap_err(),
        XsdError::UnknownRootElement { .. }
    ));
}

#[test]
fn test_substitution_group_expanded() {
    let ctx = TestContext::with_fixture("shapes");
    let schema = ctx.resolved("shapes.xsd");

    let shape = infer_shape(&schema, "drawing").unwrap();
    let Shape::Record { fields } = &shape else {
        panic!("expected record shape, got {shape:?}");
    };
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["title", "circle", "square"]);
    for name in ["circle", "square"] {
        let field = shape.field(name).unwrap();
        assert!(field.optional, "{name} should be optional");
        assert!(field.array, "{name} should keep the reference's maxOccurs");
    }
    let circle = shape.field("circle").unwrap();
    assert!(circle.shape.field("color").is_some());
    assert!(circle.shape.field("radius").is_some());

    let record = parse_xml(
        &schema,
        r#"<drawing xmlns="urn:example:shapes" title="t">
             <circle color="red" radius="2.5"/><square side="3"/><circle radius="1"/>
           </drawing>"#,
    )
    .unwrap();
    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({
            "drawing": {
                "title": "t",
                "circle": [{"color": "red", "radius": 2.5}, {"radius": 1.0}],
                "square": [{"side": 3.0}]
            }
        })
    );
}

#[test]
fn test_substitution_in_linked_mode() {
    let ctx = TestContext::with_fixture("shapes");
    let schema = ctx.linked("shapes.xsd");

    let record = parse_xml(
        &schema,
        r#"<drawing xmlns="urn:example:shapes"><square side="4"/></drawing>"#,
    )
    .unwrap();
    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({"drawing": {"square": [{"side": 4.0}]}})
    );
}

#[test]
fn test_cyclic_imports_terminate() {
    let ctx = TestContext::with_fixture("cycle");
    let schema = ctx.linked("a.xsd");

    let b = schema.linked_imports().next().expect("b.xsd should be linked");
    assert_eq!(b.imports[0].link, Link::Cyclic);

    let resolved = resolve_schema(&schema, &ResolveOptions::default()).unwrap();
    let types: Vec<&str> = resolved
        .complex_types
        .iter()
        .filter_map(|t| t.name.as_deref())
        .collect();
    assert_eq!(types, vec!["A", "B"]);

    let record = parse_xml(
        &resolved,
        r#"<a xmlns="urn:example:a" label="outer"><b xmlns="urn:example:b" x="1"><a xmlns="urn:example:a" label="inner"/></b></a>"#,
    )
    .unwrap();
    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({"a": {"label": "outer", "b": {"x": 1, "a": [{"label": "inner"}]}}})
    );

    let shape = infer_shape(&resolved, "a").unwrap();
    let nested = &shape.field("b").unwrap().shape;
    assert!(matches!(
        nested.field("a").unwrap().shape,
        Shape::Recursive { .. }
    ));
}

#[test]
fn test_resolution_is_deterministic() {
    let ctx = TestContext::with_fixture("package");
    let first = ctx.resolved("packagesV1.xsd");
    let second = ctx.resolved("packagesV1.xsd");
    assert_eq!(first, second);

    let options = WriteOptions::default();
    assert_eq!(
        write_schema(&first, &options).unwrap(),
        write_schema(&second, &options).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_missing_dependency_fails_resolution() {
    let ctx = TestContext::new();
    ctx.write_schema(
        "root.xsd",
        "",
        r#"<xs:include schemaLocation="absent.xsd"/><xs:element name="r" type="xs:string"/>"#,
    );

    // Linking is lenient; resolving is not
    let schema = ctx.linked("root.xsd");
    let err = resolve_schema(&schema, &ResolveOptions::default()).unwrap_err();
    match err {
        XsdError::Resolve { location, .. } => assert_eq!(location, "absent.xsd"),
        other => panic!("unexpected error: {other:?}"),
    }

    let strict = xsdmap::LinkOptions {
        throw_on_missing: true,
        ..Default::default()
    };
    let err = xsdmap::load_schema(&ctx.path("root.xsd"), &strict).unwrap_err();
    assert!(matches!(err, XsdError::Link { .. }));
}

#[test]
fn test_record_keys_follow_schema() {
    let ctx = TestContext::with_fixture("classes");
    let schema = ctx.resolved("classes.xsd");
    let record = parse_xml(
        &schema,
        r#"<myClass xmlns="urn:example:classes" id="X"><undeclared/></myClass>"#,
    )
    .unwrap();
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(keys(&json["myClass"]), vec!["id"]);
}
