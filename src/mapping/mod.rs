//! XML <-> structured record mapping over a (linked or resolved) schema

mod convert;
mod fields;
mod infer;
mod value;
mod xml_builder;
mod xml_parser;

pub use convert::{format_scalar, parse_scalar};
pub use fields::{Field, FieldKind, FieldResolver, FieldType, TEXT_KEY};
pub use infer::{infer_shape, Shape, ShapeField};
pub use value::{Record, Value};
pub use xml_builder::{build_document, build_xml, BuildOptions};
pub use xml_parser::{parse_xml, parse_xml_with, ParseOptions};
