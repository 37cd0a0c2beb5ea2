//! Package descriptor: three namespaces, inheritance across imports, round trip

use pretty_assertions::assert_eq;
use serde_json::json;
use xsdmap::{build_document, parse_xml, write_schema, BuildOptions, WriteOptions};

use crate::common::TestContext;

fn expected_package() -> serde_json::Value {
    json!({
        "package": {
            "name": "$ZDEMO",
            "type": "DEVC/K",
            "description": "Demo package",
            "responsible": "DEVELOPER",
            "changedAt": "2024-03-01T10:15:00Z",
            "masterLanguage": "EN",
            "link": [
                {
                    "href": "/sap/bc/adt/packages/%24zdemo/versions",
                    "rel": "http://www.sap.com/adt/relations/versions"
                },
                {
                    "href": "/sap/bc/adt/repository/nodestructure",
                    "rel": "http://www.sap.com/adt/relations/packages/elements",
                    "type": "application/vnd.sap.as+xml"
                }
            ],
            "packageRef": {
                "uri": "/sap/bc/adt/packages/%24zdemo",
                "type": "DEVC/K",
                "name": "$ZDEMO"
            },
            "attributes": {
                "packageType": "development",
                "isEncapsulated": false,
                "recordChanges": true
            },
            "superPackage": {
                "uri": "/sap/bc/adt/packages/%24tmp",
                "name": "$TMP"
            },
            "subPackages": {
                "packageRef": [
                    {"uri": "/sap/bc/adt/packages/%24zdemo_core", "name": "$ZDEMO_CORE"},
                    {"uri": "/sap/bc/adt/packages/%24zdemo_ui", "name": "$ZDEMO_UI"}
                ]
            }
        }
    })
}

#[test]
fn test_parse_package_with_linked_schema() {
    let ctx = TestContext::with_fixture("package");
    let schema = ctx.linked("packagesV1.xsd");

    let record = parse_xml(&schema, &ctx.read("package.xml")).unwrap();
    assert_eq!(serde_json::to_value(&record).unwrap(), expected_package());
}

#[test]
fn test_parse_package_with_resolved_schema() {
    let ctx = TestContext::with_fixture("package");
    let schema = ctx.resolved("packagesV1.xsd");

    assert!(schema.imports.is_empty());
    let record = parse_xml(&schema, &ctx.read("package.xml")).unwrap();
    assert_eq!(serde_json::to_value(&record).unwrap(), expected_package());
}

#[test]
fn test_package_round_trip_keeps_namespaces() {
    let ctx = TestContext::with_fixture("package");
    let schema = ctx.linked("packagesV1.xsd");
    let original = parse_xml(&schema, &ctx.read("package.xml")).unwrap();

    let xml = build_document(&schema, &original, &BuildOptions::default()).unwrap();
    for declaration in [
        r#"xmlns:pak="http://www.sap.com/adt/packages""#,
        r#"xmlns:adtcore="http://www.sap.com/adt/core""#,
        r#"xmlns:atom="http://www.w3.org/2005/Atom""#,
    ] {
        assert!(xml.contains(declaration), "missing {declaration} in:\n{xml}");
    }
    assert!(xml.contains("<pak:package "));
    assert!(xml.contains(r#"adtcore:name="$ZDEMO""#));
    assert!(xml.contains(r#"pak:isEncapsulated="false""#));
    assert!(xml.contains(r#"<atom:link href="/sap/bc/adt/packages/%24zdemo/versions""#));
    assert!(xml.contains("<pak:subPackages>"));

    let reparsed = parse_xml(&schema, &xml).unwrap();
    assert_eq!(reparsed, original);
}

#[test]
fn test_resolved_package_schema_is_self_contained() {
    let ctx = TestContext::with_fixture("package");
    let resolved = ctx.resolved("packagesV1.xsd");

    let names: Vec<&str> = resolved
        .complex_types
        .iter()
        .filter_map(|t| t.name.as_deref())
        .collect();
    for expected in ["Package", "AdtObject", "AdtMainObject", "AdtObjectReference", "linkType"] {
        assert!(names.contains(&expected), "{expected} missing from {names:?}");
    }

    let text = write_schema(&resolved, &WriteOptions::default()).unwrap();
    assert!(!text.contains("xs:import"));
    assert!(!text.contains("xs:extension"));

    // Written markup parses back into the same declarations
    let reparsed = xsdmap::parse_schema(&text).unwrap();
    assert_eq!(reparsed.complex_types.len(), resolved.complex_types.len());
    assert_eq!(reparsed.elements.len(), resolved.elements.len());
}
