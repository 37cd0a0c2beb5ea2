//! Schema-declared field lists shared by the XML parser, builder and shape inference
//!
//! Every field carries its kind (attribute, element or text) so placement is
//! decided by the schema, never by looking at record keys.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

use crate::model::{
    builtin_kind, is_builtin, ComplexType, Element, Form, ScalarKind, Schema, SimpleType,
    SimpleVariety, TypeContent, XML_NAMESPACE,
};
use crate::resolve::SubstitutionIndex;
use crate::util::{local_name, prefix_of, upper_first};
use crate::walk::{
    find_base_type, find_complex_type, find_element, find_simple_type, walk_attributes,
    walk_complex_types, walk_elements, Walked, WalkedAttribute, WalkedElement,
};

/// Record key holding simple content and mixed text
pub const TEXT_KEY: &str = "$value";

/// Longest chain of simple type derivations followed before falling back to string
const MAX_TYPE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Attribute,
    Element,
    Text,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Attribute => "attribute",
            FieldKind::Element => "element",
            FieldKind::Text => "text",
        }
    }
}

/// What a field's text or children convert to
#[derive(Debug, Clone, Copy)]
pub enum FieldType<'a> {
    Scalar(ScalarKind),
    /// `xs:list` of a scalar item type
    List(ScalarKind),
    Complex(Walked<'a, ComplexType>),
}

#[derive(Debug, Clone)]
pub struct Field<'a> {
    pub kind: FieldKind,
    /// Record key: the local name, unless another field of the type already
    /// uses it (see `assign_keys`)
    pub key: String,
    /// Local XML name
    pub name: String,
    /// Namespace the XML name is qualified with
    pub namespace: Option<String>,
    pub optional: bool,
    pub array: bool,
    pub nillable: bool,
    pub ty: FieldType<'a>,
}

/// Computes (and memoizes) the fields of complex types within one schema closure
pub struct FieldResolver<'a> {
    root: &'a Schema,
    substitutions: SubstitutionIndex,
    cache: RefCell<HashMap<*const ComplexType, Rc<Vec<Field<'a>>>>>,
}

impl<'a> FieldResolver<'a> {
    pub fn new(root: &'a Schema) -> Self {
        Self {
            root,
            substitutions: SubstitutionIndex::from_schema(root),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Field for a document root named `name`.
    ///
    /// Top-level elements match by local name. As a convenience, a complex
    /// type `FooType` also answers to `foo`, `Foo` and `FooType`.
    pub fn root_field(&self, name: &str) -> Option<Field<'a>> {
        let local = local_name(name);
        if let Some(found) = find_element(local, self.root) {
            return Some(self.top_level_field(found, false, false));
        }
        let alias = format!("{}Type", upper_first(local));
        walk_complex_types(self.root)
            .find(|w| match w.item.name.as_deref() {
                Some(n) => n == alias || (n == local && n.ends_with("Type")),
                None => false,
            })
            .map(|w| {
                debug!(root = local, type_name = ?w.item.name, "Root matched by type alias");
                Field {
                    kind: FieldKind::Element,
                    key: local.to_string(),
                    name: local.to_string(),
                    namespace: w.schema.target_namespace.clone(),
                    optional: false,
                    array: false,
                    nillable: false,
                    ty: FieldType::Complex(w),
                }
            })
    }

    /// Attributes, text and elements of `ty`, inherited ones first
    pub fn fields(&self, ty: &'a ComplexType, schema: &'a Schema) -> Rc<Vec<Field<'a>>> {
        let key = ty as *const ComplexType;
        if let Some(hit) = self.cache.borrow().get(&key) {
            return hit.clone();
        }

        let mut fields = Vec::new();
        for walked in walk_attributes(ty, schema) {
            fields.push(self.attribute_field(&walked));
        }
        if let Some(text) = self.text_field(ty, schema) {
            fields.push(text);
        }
        for walked in walk_elements(ty, schema) {
            self.element_fields(&walked, &mut fields);
        }

        let fields = Rc::new(assign_keys(dedupe(fields)));
        self.cache.borrow_mut().insert(key, fields.clone());
        fields
    }

    fn attribute_field(&self, walked: &WalkedAttribute<'a>) -> Field<'a> {
        let decl = walked.decl;
        let unresolved_ref = walked.is_global() && std::ptr::eq(walked.attribute, decl);
        let namespace = if decl.namespace.is_some() {
            decl.namespace.clone()
        } else if unresolved_ref {
            // `xml:lang` and friends: no declaration in the closure, go by prefix
            walked
                .attribute
                .reference
                .as_deref()
                .and_then(prefix_of)
                .and_then(|prefix| match prefix {
                    "xml" => Some(XML_NAMESPACE.to_string()),
                    p => walked.schema.namespace_for_prefix(p).map(str::to_string),
                })
        } else {
            let qualified = walked.is_global()
                || decl.form.unwrap_or_else(|| walked.schema.attribute_form()) == Form::Qualified;
            if qualified {
                walked.schema.target_namespace.clone()
            } else {
                None
            }
        };

        let ty = match (&decl.simple_type, &decl.type_name) {
            (Some(st), _) => self.simple_type(st, walked.schema, 0),
            (None, Some(name)) => self.named_type(name, walked.schema, 0),
            (None, None) => FieldType::Scalar(ScalarKind::String),
        };

        let name = walked.attribute.display_name().to_string();
        Field {
            kind: FieldKind::Attribute,
            key: name.clone(),
            name,
            namespace,
            optional: !walked.required,
            array: false,
            nillable: false,
            ty: scalar_only(ty),
        }
    }

    /// `$value` for simple content and mixed types
    fn text_field(&self, ty: &'a ComplexType, schema: &'a Schema) -> Option<Field<'a>> {
        let field_type = if ty.has_simple_content() {
            self.simple_content_type(ty, schema)
        } else if ty.mixed {
            FieldType::Scalar(ScalarKind::String)
        } else {
            return None;
        };
        Some(Field {
            kind: FieldKind::Text,
            key: TEXT_KEY.to_string(),
            name: TEXT_KEY.to_string(),
            namespace: None,
            optional: ty.mixed,
            array: false,
            nillable: false,
            ty: field_type,
        })
    }

    fn simple_content_type(&self, ty: &'a ComplexType, schema: &'a Schema) -> FieldType<'a> {
        let mut current = Walked { item: ty, schema };
        for _ in 0..MAX_TYPE_DEPTH {
            match find_base_type(current.item, current.schema) {
                Some(base) if base.item.has_simple_content() => current = base,
                Some(_) => return FieldType::Scalar(ScalarKind::String),
                None => break,
            }
        }
        match &current.item.content {
            TypeContent::Simple(d) => scalar_only(self.named_type(&d.base, current.schema, 0)),
            _ => FieldType::Scalar(ScalarKind::String),
        }
    }

    /// One field per element; a reference to an abstract element yields one
    /// optional field per substitute
    fn element_fields(&self, walked: &WalkedElement<'a>, out: &mut Vec<Field<'a>>) {
        let element = walked.element;
        let Some(reference) = element.reference.as_deref() else {
            let form = element
                .form
                .unwrap_or_else(|| walked.schema.element_form());
            let namespace = element.namespace.clone().or_else(|| {
                (form == Form::Qualified)
                    .then(|| walked.schema.target_namespace.clone())
                    .flatten()
            });
            out.push(Field {
                kind: FieldKind::Element,
                key: element.display_name().to_string(),
                name: element.display_name().to_string(),
                namespace,
                optional: walked.optional,
                array: walked.array,
                nillable: element.nillable,
                ty: self.declared_type(element, walked.schema),
            });
            return;
        };

        if let Some(substitutes) = self.substitutions.substitute(element) {
            for substitute in substitutes {
                let name = substitute.reference.as_deref().unwrap_or_default();
                if let Some(target) = find_element(name, self.root) {
                    out.push(self.top_level_field(
                        target,
                        true,
                        walked.array || substitute.occurs.is_array(),
                    ));
                }
            }
            return;
        }

        match find_element(reference, walked.schema).or_else(|| find_element(reference, self.root)) {
            Some(target) => out.push(self.top_level_field(target, walked.optional, walked.array)),
            None => {
                debug!(reference, "Referenced element not declared, reading as text");
                out.push(Field {
                    kind: FieldKind::Element,
                    key: element.display_name().to_string(),
                    name: element.display_name().to_string(),
                    namespace: None,
                    optional: walked.optional,
                    array: walked.array,
                    nillable: false,
                    ty: FieldType::Scalar(ScalarKind::String),
                });
            }
        }
    }

    fn top_level_field(&self, target: Walked<'a, Element>, optional: bool, array: bool) -> Field<'a> {
        Field {
            kind: FieldKind::Element,
            key: target.item.display_name().to_string(),
            name: target.item.display_name().to_string(),
            namespace: target
                .item
                .namespace
                .clone()
                .or_else(|| target.schema.target_namespace.clone()),
            optional,
            array,
            nillable: target.item.nillable,
            ty: self.declared_type(target.item, target.schema),
        }
    }

    fn declared_type(&self, element: &'a Element, schema: &'a Schema) -> FieldType<'a> {
        if let Some(ct) = element.complex_type.as_deref() {
            return FieldType::Complex(Walked { item: ct, schema });
        }
        if let Some(st) = element.simple_type.as_deref() {
            return self.simple_type(st, schema, 0);
        }
        match element.type_name.as_deref() {
            Some(name) => self.named_type(name, schema, 0),
            None => FieldType::Scalar(ScalarKind::String),
        }
    }

    fn named_type(&self, qname: &str, schema: &'a Schema, depth: usize) -> FieldType<'a> {
        let builtin = builtin_kind(local_name(qname));
        if is_builtin(qname, schema) {
            return FieldType::Scalar(builtin.unwrap_or(ScalarKind::String));
        }
        if let Some(ct) = find_complex_type(qname, schema).or_else(|| find_complex_type(qname, self.root)) {
            return FieldType::Complex(ct);
        }
        if let Some(st) = find_simple_type(qname, schema).or_else(|| find_simple_type(qname, self.root)) {
            return self.simple_type(st.item, st.schema, depth + 1);
        }
        FieldType::Scalar(builtin.unwrap_or(ScalarKind::String))
    }

    fn simple_type(&self, st: &'a SimpleType, schema: &'a Schema, depth: usize) -> FieldType<'a> {
        if depth > MAX_TYPE_DEPTH {
            return FieldType::Scalar(ScalarKind::String);
        }
        match &st.variety {
            SimpleVariety::Restriction {
                inline_base: Some(inline),
                ..
            } => self.simple_type(inline, schema, depth + 1),
            SimpleVariety::Restriction {
                base: Some(base), ..
            } => scalar_only(self.named_type(base, schema, depth + 1)),
            SimpleVariety::Restriction { .. } | SimpleVariety::Union { .. } => {
                FieldType::Scalar(ScalarKind::String)
            }
            SimpleVariety::List { item: Some(item), .. } => {
                list_of(self.simple_type(item, schema, depth + 1))
            }
            SimpleVariety::List {
                item_type: Some(name),
                ..
            } => list_of(self.named_type(name, schema, depth + 1)),
            SimpleVariety::List { .. } => FieldType::List(ScalarKind::String),
        }
    }
}

fn scalar_only(ty: FieldType<'_>) -> FieldType<'_> {
    match ty {
        FieldType::Complex(_) => FieldType::Scalar(ScalarKind::String),
        other => other,
    }
}

fn list_of(item: FieldType<'_>) -> FieldType<'_> {
    match item {
        FieldType::Scalar(kind) | FieldType::List(kind) => FieldType::List(kind),
        FieldType::Complex(_) => FieldType::List(ScalarKind::String),
    }
}

/// Later declarations of the same kind, name and namespace replace earlier
/// ones in place. Attributes are matched by local name alone, as the parser does.
fn dedupe(fields: Vec<Field<'_>>) -> Vec<Field<'_>> {
    let mut out: Vec<Field<'_>> = Vec::with_capacity(fields.len());
    for field in fields {
        match out.iter().position(|f| {
            f.kind == field.kind
                && f.name == field.name
                && (f.kind == FieldKind::Attribute || f.namespace == field.namespace)
        }) {
            Some(at) => out[at] = field,
            None => out.push(field),
        }
    }
    out
}

/// Make record keys unique within one type.
///
/// Elements keep their local name; a later element sharing it from another
/// namespace is keyed `{namespace}name`. An attribute whose name is also an
/// element's key is keyed `@name`.
fn assign_keys(mut fields: Vec<Field<'_>>) -> Vec<Field<'_>> {
    let mut taken: HashSet<String> = HashSet::new();
    for field in fields.iter_mut().filter(|f| f.kind != FieldKind::Attribute) {
        if !taken.insert(field.key.clone()) {
            let namespace = field.namespace.as_deref().unwrap_or_default();
            field.key = format!("{{{namespace}}}{}", field.name);
            taken.insert(field.key.clone());
        }
    }
    for field in fields.iter_mut().filter(|f| f.kind == FieldKind::Attribute) {
        if taken.contains(&field.key) {
            field.key = format!("@{}", field.name);
        }
    }
    fields
}
