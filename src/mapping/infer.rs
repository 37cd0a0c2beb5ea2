//! Shape inference: the record structure an element parses into

use std::collections::HashSet;

use serde::Serialize;

use super::fields::{FieldKind, FieldResolver, FieldType};
use crate::error::{Result, XsdError};
use crate::model::{ComplexType, ScalarKind, Schema};
use crate::walk::Walked;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Shape {
    Scalar {
        #[serde(rename = "type")]
        ty: ScalarKind,
    },
    List {
        item: ScalarKind,
    },
    Record {
        fields: Vec<ShapeField>,
    },
    /// Reference back to a type already being expanded
    Recursive {
        #[serde(rename = "type")]
        type_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeField {
    /// Record key the field is stored under
    pub name: String,
    pub kind: FieldKind,
    pub optional: bool,
    pub array: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub shape: Shape,
}

impl Shape {
    /// Field of a record shape by name
    pub fn field(&self, name: &str) -> Option<&ShapeField> {
        match self {
            Shape::Record { fields } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }
}

/// Shape of the content of root element `element` (type aliases accepted)
pub fn infer_shape(schema: &Schema, element: &str) -> Result<Shape> {
    let fields = FieldResolver::new(schema);
    let root = fields
        .root_field(element)
        .ok_or_else(|| XsdError::UnknownRootElement {
            name: element.to_string(),
        })?;
    let mut active = HashSet::new();
    Ok(shape_of(&fields, root.ty, &mut active))
}

fn shape_of<'a>(
    fields: &FieldResolver<'a>,
    ty: FieldType<'a>,
    active: &mut HashSet<*const ComplexType>,
) -> Shape {
    match ty {
        FieldType::Scalar(kind) => Shape::Scalar { ty: kind },
        FieldType::List(kind) => Shape::List { item: kind },
        FieldType::Complex(walked) => record_shape(fields, walked, active),
    }
}

fn record_shape<'a>(
    fields: &FieldResolver<'a>,
    ty: Walked<'a, ComplexType>,
    active: &mut HashSet<*const ComplexType>,
) -> Shape {
    let key = ty.item as *const ComplexType;
    if !active.insert(key) {
        return Shape::Recursive {
            type_name: ty.item.name.clone().unwrap_or_default(),
        };
    }
    let shape = Shape::Record {
        fields: fields
            .fields(ty.item, ty.schema)
            .iter()
            .map(|f| ShapeField {
                name: f.key.clone(),
                kind: f.kind,
                optional: f.optional,
                array: f.array,
                namespace: f.namespace.clone(),
                shape: shape_of(fields, f.ty, active),
            })
            .collect(),
    };
    active.remove(&key);
    shape
}
