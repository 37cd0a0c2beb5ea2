//! Error types for xsdmap

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by the schema engine
pub type Result<T> = std::result::Result<T, XsdError>;

/// Errors that can occur while loading, linking, resolving or mapping schemas
#[derive(Error, Debug)]
pub enum XsdError {
    #[error("Failed to read schema file: {path}")]
    SchemaReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid schema markup in {construct}: {message}")]
    SchemaParse { construct: String, message: String },

    #[error("Failed to parse XML document: {message}")]
    XmlParse { message: String },

    #[error("Unresolved schemaLocation '{location}' referenced from {schema}")]
    Link { schema: String, location: String },

    #[error("Cannot resolve schemaLocation '{location}' referenced from {schema}")]
    Resolve { schema: String, location: String },

    #[error("Root element '{name}' is not declared by the schema")]
    UnknownRootElement { name: String },

    #[error("Required {kind} '{name}' missing in <{parent}>")]
    MissingField {
        kind: &'static str,
        name: String,
        parent: String,
    },

    #[error("XML generation error: {message}")]
    Write { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl XsdError {
    pub(crate) fn schema_parse(construct: impl Into<String>, message: impl Into<String>) -> Self {
        XsdError::SchemaParse {
            construct: construct.into(),
            message: message.into(),
        }
    }
}

impl From<roxmltree::Error> for XsdError {
    fn from(err: roxmltree::Error) -> Self {
        XsdError::XmlParse {
            message: err.to_string(),
        }
    }
}
