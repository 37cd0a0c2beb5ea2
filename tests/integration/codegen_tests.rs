//! Codegen driver over fixture directories

use std::fs;

use pretty_assertions::assert_eq;
use xsdmap::codegen::{self, load_config, GeneratorKind};

use crate::common::{fixture_path, TestContext};

#[test]
fn test_codegen_from_config_file() {
    let ctx = TestContext::new();
    for name in ["atom.xsd", "adtcore.xsd", "packagesV1.xsd"] {
        let text = fs::read_to_string(fixture_path("package").join(name)).unwrap();
        ctx.write(&format!("xsd/{name}"), &text);
    }
    let config_path = ctx.write(
        "xsdmap.json",
        r#"{"input": "xsd", "output": "generated", "generator": "json", "schemas": ["packages*"]}"#,
    );

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.generator, GeneratorKind::Json);
    assert_eq!(config.output, ctx.path("generated"));

    let report = codegen::run(&config).unwrap();
    let mut names: Vec<String> = report
        .generated
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    // adtcore and atom are pulled in as dependencies of the selected schema
    assert_eq!(names, vec!["adtcore.json", "atom.json", "packagesV1.json"]);
    assert!(report.stubs.is_empty());

    let model: serde_json::Value =
        serde_json::from_str(&ctx.read("generated/packagesV1.json")).unwrap();
    assert_eq!(model["targetNamespace"], "http://www.sap.com/adt/packages");
    let types: Vec<&str> = model["complexTypes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert!(types.contains(&"AdtObject"));
    assert!(types.contains(&"linkType"));
}

#[test]
fn test_codegen_shapes_for_class_scenario() {
    let ctx = TestContext::with_fixture("classes");
    let mut config = codegen::CodegenConfig::new(&ctx.dir, ctx.path("out"));
    config.generator = GeneratorKind::Shapes;
    config.schemas = Some(vec!["classes".to_string()]);
    config.prefix = "shape_".to_string();

    codegen::run(&config).unwrap();
    let shapes: serde_json::Value =
        serde_json::from_str(&ctx.read("out/shape_classes.shapes.json")).unwrap();
    let fields = shapes["myClass"]["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 9);
    let include = fields.iter().find(|f| f["name"] == "include").unwrap();
    assert_eq!(include["array"], true);
    assert_eq!(include["shape"]["kind"], "record");

    // objects.xsd is a dependency under the input directory
    assert!(ctx.path("out/shape_objects.shapes.json").exists());
}

#[test]
fn test_codegen_stubs_unresolved_imports() {
    let ctx = TestContext::new();
    ctx.write_schema(
        "xsd/main.xsd",
        r#"xmlns:ext="urn:external""#,
        r#"<xs:import namespace="urn:external" schemaLocation="../vendor/external.xsd"/>
           <xs:element name="main" type="xs:string"/>"#,
    );

    let config = codegen::CodegenConfig::new(ctx.path("xsd"), ctx.path("out"));
    let report = codegen::run(&config).unwrap();
    assert_eq!(report.generated.len(), 1);
    assert_eq!(report.stubs, vec![ctx.path("out/stubs/external.xsd")]);
    assert!(ctx.read("out/main.xsd").contains(r#"name="main""#));
}
