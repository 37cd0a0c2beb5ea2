//! Rendering of one resolved schema

use std::collections::BTreeMap;

use super::config::GeneratorKind;
use crate::error::{Result, XsdError};
use crate::mapping::{infer_shape, Shape};
use crate::model::Schema;
use crate::xsd::{write_schema, WriteOptions};

/// Generated file content for a resolved schema
pub fn render(kind: GeneratorKind, schema: &Schema) -> Result<String> {
    match kind {
        GeneratorKind::Xsd => write_schema(schema, &WriteOptions::default()),
        GeneratorKind::Json => to_json(schema),
        GeneratorKind::Shapes => {
            let mut shapes: BTreeMap<&str, Shape> = BTreeMap::new();
            for element in &schema.elements {
                if let Some(name) = element.name.as_deref() {
                    shapes.insert(name, infer_shape(schema, name)?);
                }
            }
            to_json(&shapes)
        }
    }
}

/// `{prefix}{stem}.{ext}`
pub fn output_file_name(kind: GeneratorKind, prefix: &str, stem: &str) -> String {
    format!("{}{}.{}", prefix, stem, kind.extension())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| XsdError::Write {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xsd::parse_schema;

    const XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="note" type="Note"/>
  <xs:complexType name="Note">
    <xs:sequence><xs:element name="body" type="xs:string"/></xs:sequence>
  </xs:complexType>
</xs:schema>"#;

    #[test]
    fn test_render_shapes() {
        let schema = parse_schema(XSD).unwrap();
        let text = render(GeneratorKind::Shapes, &schema).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["note"]["kind"], "record");
        assert_eq!(json["note"]["fields"][0]["name"], "body");
    }

    #[test]
    fn test_render_xsd_and_json() {
        let schema = parse_schema(XSD).unwrap();
        let xsd = render(GeneratorKind::Xsd, &schema).unwrap();
        assert!(xsd.contains(r#"<xs:complexType name="Note">"#));

        let json: serde_json::Value =
            serde_json::from_str(&render(GeneratorKind::Json, &schema).unwrap()).unwrap();
        assert_eq!(json["complexTypes"][0]["name"], "Note");
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(GeneratorKind::Xsd, "", "atom"), "atom.xsd");
        assert_eq!(
            output_file_name(GeneratorKind::Shapes, "gen_", "atom"),
            "gen_atom.shapes.json"
        );
    }
}
