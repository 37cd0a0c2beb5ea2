//! In-memory XML Schema model
//!
//! Pure data: parsing lives in [`crate::xsd`], linking in [`crate::link`],
//! traversal in [`crate::walk`].

mod builtins;
mod schema;
mod types;

pub use builtins::{
    builtin_kind, is_builtin, ScalarKind, XML_NAMESPACE, XSI_NAMESPACE, XS_NAMESPACE,
};
pub use schema::{Import, Include, Link, Redefine, Schema};
pub use types::{
    Attribute, AttributeGroup, AttributeItem, AttributeUse, ComplexType, Derivation,
    DerivationMethod, Element, Facet, Form, GroupRef, MaxOccurs, ModelGroup, NamedGroup, Occurs,
    Opaque, Particle, SimpleType, SimpleVariety, TypeContent, Wildcard,
};
