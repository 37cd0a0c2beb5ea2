//! Schema-closure traversal and by-name lookup of top-level declarations

use std::collections::HashSet;

use crate::model::{Attribute, AttributeGroup, ComplexType, Element, NamedGroup, Schema, SimpleType};
use crate::util::{local_name, prefix_of};

/// A declaration together with the schema that declares it
#[derive(Debug)]
pub struct Walked<'a, T> {
    pub item: &'a T,
    pub schema: &'a Schema,
}

impl<T> Clone for Walked<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Walked<'_, T> {}

/// Which linked dependencies a walk descends into
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    pub imports: bool,
    /// Includes and redefined base schemas
    pub includes: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            imports: true,
            includes: true,
        }
    }
}

/// Depth-first, pre-order iterator over a schema and its linked closure.
///
/// Children are visited in declaration order: includes, redefined bases,
/// then imports. A schema reachable along several paths is yielded once.
pub struct SchemaWalk<'a> {
    stack: Vec<&'a Schema>,
    seen: HashSet<*const Schema>,
    options: WalkOptions,
}

impl<'a> Iterator for SchemaWalk<'a> {
    type Item = &'a Schema;

    fn next(&mut self) -> Option<&'a Schema> {
        while let Some(schema) = self.stack.pop() {
            if !self.seen.insert(schema as *const Schema) {
                continue;
            }
            let mut children: Vec<&'a Schema> = Vec::new();
            if self.options.includes {
                children.extend(schema.linked_includes());
                children.extend(schema.redefined_schemas());
            }
            if self.options.imports {
                children.extend(schema.linked_imports());
            }
            self.stack.extend(children.into_iter().rev());
            return Some(schema);
        }
        None
    }
}

pub fn walk_schemas(schema: &Schema) -> SchemaWalk<'_> {
    walk_schemas_with(schema, WalkOptions::default())
}

pub fn walk_schemas_with(schema: &Schema, options: WalkOptions) -> SchemaWalk<'_> {
    SchemaWalk {
        stack: vec![schema],
        seen: HashSet::new(),
        options,
    }
}

pub fn walk_complex_types(schema: &Schema) -> impl Iterator<Item = Walked<'_, ComplexType>> {
    walk_complex_types_with(schema, WalkOptions::default())
}

/// Complex types of the closure; within one schema, redefinitions come first
pub fn walk_complex_types_with(
    schema: &Schema,
    options: WalkOptions,
) -> impl Iterator<Item = Walked<'_, ComplexType>> {
    walk_schemas_with(schema, options).flat_map(|s| {
        s.redefines
            .iter()
            .flat_map(|r| r.complex_types.iter())
            .chain(s.complex_types.iter())
            .map(move |item| Walked { item, schema: s })
    })
}

pub fn walk_simple_types(schema: &Schema) -> impl Iterator<Item = Walked<'_, SimpleType>> {
    walk_simple_types_with(schema, WalkOptions::default())
}

pub fn walk_simple_types_with(
    schema: &Schema,
    options: WalkOptions,
) -> impl Iterator<Item = Walked<'_, SimpleType>> {
    walk_schemas_with(schema, options).flat_map(|s| {
        s.redefines
            .iter()
            .flat_map(|r| r.simple_types.iter())
            .chain(s.simple_types.iter())
            .map(move |item| Walked { item, schema: s })
    })
}

pub fn walk_top_level_elements(schema: &Schema) -> impl Iterator<Item = Walked<'_, Element>> {
    walk_top_level_elements_with(schema, WalkOptions::default())
}

pub fn walk_top_level_elements_with(
    schema: &Schema,
    options: WalkOptions,
) -> impl Iterator<Item = Walked<'_, Element>> {
    walk_schemas_with(schema, options)
        .flat_map(|s| s.elements.iter().map(move |item| Walked { item, schema: s }))
}

pub fn walk_groups(schema: &Schema) -> impl Iterator<Item = Walked<'_, NamedGroup>> {
    walk_groups_with(schema, WalkOptions::default())
}

pub fn walk_groups_with(
    schema: &Schema,
    options: WalkOptions,
) -> impl Iterator<Item = Walked<'_, NamedGroup>> {
    walk_schemas_with(schema, options).flat_map(|s| {
        s.redefines
            .iter()
            .flat_map(|r| r.groups.iter())
            .chain(s.groups.iter())
            .map(move |item| Walked { item, schema: s })
    })
}

pub fn walk_attribute_groups(schema: &Schema) -> impl Iterator<Item = Walked<'_, AttributeGroup>> {
    walk_attribute_groups_with(schema, WalkOptions::default())
}

pub fn walk_attribute_groups_with(
    schema: &Schema,
    options: WalkOptions,
) -> impl Iterator<Item = Walked<'_, AttributeGroup>> {
    walk_schemas_with(schema, options).flat_map(|s| {
        s.redefines
            .iter()
            .flat_map(|r| r.attribute_groups.iter())
            .chain(s.attribute_groups.iter())
            .map(move |item| Walked { item, schema: s })
    })
}

pub fn walk_top_level_attributes(schema: &Schema) -> impl Iterator<Item = Walked<'_, Attribute>> {
    walk_top_level_attributes_with(schema, WalkOptions::default())
}

pub fn walk_top_level_attributes_with(
    schema: &Schema,
    options: WalkOptions,
) -> impl Iterator<Item = Walked<'_, Attribute>> {
    walk_schemas_with(schema, options)
        .flat_map(|s| s.attributes.iter().map(move |item| Walked { item, schema: s }))
}

/// Look up a complex type by (possibly prefixed) name: current schema first,
/// then the linked closure in declaration order.
///
/// When the prefix (or the default namespace) is bound in `schema`, a
/// declaration from that target namespace is preferred over an earlier one
/// with the same local name.
pub fn find_complex_type<'a>(name: &str, schema: &'a Schema) -> Option<Walked<'a, ComplexType>> {
    find_qualified(name, schema, walk_complex_types(schema), |t| t.name.as_deref())
}

pub fn find_simple_type<'a>(name: &str, schema: &'a Schema) -> Option<Walked<'a, SimpleType>> {
    find_qualified(name, schema, walk_simple_types(schema), |t| t.name.as_deref())
}

pub fn find_element<'a>(name: &str, schema: &'a Schema) -> Option<Walked<'a, Element>> {
    find_qualified(name, schema, walk_top_level_elements(schema), |e| e.name.as_deref())
}

pub fn find_group<'a>(name: &str, schema: &'a Schema) -> Option<Walked<'a, NamedGroup>> {
    find_qualified(name, schema, walk_groups(schema), |g| Some(g.name.as_str()))
}

pub fn find_attribute_group<'a>(
    name: &str,
    schema: &'a Schema,
) -> Option<Walked<'a, AttributeGroup>> {
    find_qualified(name, schema, walk_attribute_groups(schema), |g| Some(g.name.as_str()))
}

pub fn find_attribute<'a>(name: &str, schema: &'a Schema) -> Option<Walked<'a, Attribute>> {
    find_qualified(name, schema, walk_top_level_attributes(schema), |a| a.name.as_deref())
}

/// Namespace a QName refers to in `schema`, if its prefix is bound there
pub(crate) fn qname_namespace<'s>(qname: &str, schema: &'s Schema) -> Option<&'s str> {
    schema.namespace_for_prefix(prefix_of(qname).unwrap_or_default())
}

fn find_qualified<'a, T: 'a>(
    qname: &str,
    schema: &Schema,
    items: impl Iterator<Item = Walked<'a, T>>,
    name: impl Fn(&'a T) -> Option<&'a str>,
) -> Option<Walked<'a, T>> {
    let local = local_name(qname);
    let namespace = qname_namespace(qname, schema);
    let mut fallback = None;
    for walked in items.filter(|w| name(w.item) == Some(local)) {
        match namespace {
            Some(ns) if walked.schema.target_namespace.as_deref() != Some(ns) => {
                if fallback.is_none() {
                    fallback = Some(walked);
                }
            }
            _ => return Some(walked),
        }
    }
    fallback
}

/// `ty` is declared inside one of `schema`'s `xs:redefine` blocks
pub(crate) fn is_redefinition(ty: &ComplexType, schema: &Schema) -> bool {
    schema
        .redefines
        .iter()
        .flat_map(|r| r.complex_types.iter())
        .any(|t| std::ptr::eq(t, ty))
}

/// Base schemas of the redefines in `schema` that redefine a complex type named `name`
pub(crate) fn redefined_bases_for_type<'a>(
    name: &'a str,
    schema: &'a Schema,
) -> impl Iterator<Item = &'a Schema> {
    schema
        .redefines
        .iter()
        .filter(move |r| r.complex_types.iter().any(|t| t.name.as_deref() == Some(name)))
        .filter_map(|r| r.base_schema())
}

/// Base schemas of the redefines in `schema` that redefine a group named `name`
pub(crate) fn redefined_bases_for_group<'a>(
    name: &'a str,
    schema: &'a Schema,
) -> impl Iterator<Item = &'a Schema> {
    schema
        .redefines
        .iter()
        .filter(move |r| r.groups.iter().any(|g| g.name == name))
        .filter_map(|r| r.base_schema())
}
