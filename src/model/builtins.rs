//! Built-in XSD datatypes and the scalar kind each one maps to

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

use super::schema::Schema;
use crate::util::{local_name, prefix_of};

pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// How text of a built-in type is converted into a record value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarKind {
    String,
    Boolean,
    Integer,
    Decimal,
    Date,
    DateTime,
}

static BUILTIN_TYPES: LazyLock<HashMap<&'static str, ScalarKind>> = LazyLock::new(|| {
    use ScalarKind::*;
    let mut map = HashMap::new();
    for name in [
        "string",
        "normalizedString",
        "token",
        "language",
        "Name",
        "NCName",
        "NMTOKEN",
        "NMTOKENS",
        "ID",
        "IDREF",
        "IDREFS",
        "ENTITY",
        "ENTITIES",
        "QName",
        "NOTATION",
        "anyURI",
        "anyType",
        "anySimpleType",
        "base64Binary",
        "hexBinary",
        "time",
        "duration",
        "gYear",
        "gYearMonth",
        "gMonth",
        "gMonthDay",
        "gDay",
    ] {
        map.insert(name, String);
    }
    map.insert("boolean", Boolean);
    for name in [
        "int",
        "integer",
        "long",
        "short",
        "byte",
        "nonNegativeInteger",
        "nonPositiveInteger",
        "positiveInteger",
        "negativeInteger",
        "unsignedLong",
        "unsignedInt",
        "unsignedShort",
        "unsignedByte",
    ] {
        map.insert(name, Integer);
    }
    for name in ["decimal", "float", "double"] {
        map.insert(name, Decimal);
    }
    map.insert("date", Date);
    map.insert("dateTime", DateTime);
    map
});

/// Scalar kind of a built-in type given by local name
pub fn builtin_kind(local: &str) -> Option<ScalarKind> {
    BUILTIN_TYPES.get(local).copied()
}

/// Whether `qname` names a type from the XML Schema namespace.
///
/// The prefix is resolved through the schema's own `xmlns` map; `xs`/`xsd`
/// are accepted when the document does not declare them (stripped models).
pub fn is_builtin(qname: &str, schema: &Schema) -> bool {
    let uri = match prefix_of(qname) {
        Some(prefix) => schema.namespace_for_prefix(prefix),
        None => schema.namespace_for_prefix(""),
    };
    match uri {
        Some(uri) => uri == XS_NAMESPACE && builtin_kind(local_name(qname)).is_some(),
        None => {
            matches!(prefix_of(qname), Some("xs") | Some("xsd"))
                && builtin_kind(local_name(qname)).is_some()
        }
    }
}
