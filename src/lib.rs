//! xsdmap: an XSD schema engine
//!
//! This library parses XML Schema documents into a typed model, links their
//! imports and includes, resolves the closure into one flattened schema and
//! maps XML instance documents to and from structured records.

pub mod codegen;
pub mod error;
pub mod link;
pub mod mapping;
pub mod model;
pub mod resolve;
pub mod util;
pub mod walk;
pub mod xsd;

use std::path::Path;

pub use error::{Result, XsdError};
pub use link::{link_schema, FsLoader, LinkOptions, SchemaLoader};
pub use mapping::{
    build_document, build_xml, infer_shape, parse_xml, parse_xml_with, BuildOptions,
    ParseOptions, Record, Shape, Value,
};
pub use model::Schema;
pub use resolve::{resolve_schema, ResolveOptions};
pub use xsd::{parse_schema, write_schema, WriteOptions};

/// Read, parse and link a schema file from disk.
///
/// Relative `schemaLocation`s resolve against the file's directory, whatever
/// `options.base_path` says.
pub fn load_schema(path: &Path, options: &LinkOptions) -> Result<Schema> {
    let schema = xsd::parse_schema_file(path)?;
    let options = LinkOptions {
        base_path: path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| ".".into()),
        ..options.clone()
    };
    link_schema(schema, &FsLoader, &options)
}

/// Load and resolve a schema file in one step
pub fn load_resolved(path: &Path, link: &LinkOptions, resolve: &ResolveOptions) -> Result<Schema> {
    let linked = load_schema(path, link)?;
    resolve_schema(&linked, resolve)
}
