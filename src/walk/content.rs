//! Inheritance-aware traversal of content models and attribute lists
//!
//! Both walks are explicit-stack state machines: nothing beyond the element
//! or attribute being yielded is looked up, so callers may stop early.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use super::schemas::{
    find_attribute, find_attribute_group, find_complex_type, find_group, is_redefinition,
    qname_namespace, redefined_bases_for_group, redefined_bases_for_type, Walked,
};
use crate::model::{
    Attribute, AttributeItem, AttributeUse, ComplexType, DerivationMethod, Element, NamedGroup,
    Occurs, Particle, Schema, TypeContent,
};
use crate::util::{local_name, prefix_of};

/// Named-group expansions allowed in one walk before giving up on a cycle
const MAX_GROUP_EXPANSIONS: usize = 1024;

/// Which compositor contributed an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentSource {
    Sequence,
    Choice,
    All,
    /// Compositor nested inside another compositor (including named groups)
    Nested,
}

/// An element particle reached through a content model
#[derive(Debug, Clone, Copy)]
pub struct WalkedElement<'a> {
    /// The particle as declared (may be a `ref`)
    pub element: &'a Element,
    /// Schema declaring the particle
    pub schema: &'a Schema,
    pub optional: bool,
    pub array: bool,
    pub source: ContentSource,
}

/// An attribute use reached through an attribute list
#[derive(Debug, Clone, Copy)]
pub struct WalkedAttribute<'a> {
    /// The attribute as used (may be a `ref`)
    pub attribute: &'a Attribute,
    /// The effective declaration: the referenced top-level attribute, or `attribute`
    pub decl: &'a Attribute,
    /// Schema declaring `decl`
    pub schema: &'a Schema,
    pub required: bool,
}

impl WalkedAttribute<'_> {
    /// Reached through `ref=` to a top-level declaration
    pub fn is_global(&self) -> bool {
        self.attribute.reference.is_some()
    }
}

/// Resolve the base of a `complexContent`/`simpleContent` derivation.
///
/// A redefinition that extends its own name refers to the definition in the
/// redefined schema, not to itself.
pub fn find_base_type<'a>(
    ty: &'a ComplexType,
    schema: &'a Schema,
) -> Option<Walked<'a, ComplexType>> {
    let base = ty.base_name()?;
    if is_self_redefinition(ty, schema) {
        let local = local_name(base);
        return redefined_bases_for_type(local, schema)
            .find_map(|base_schema| find_complex_type(local, base_schema));
    }
    find_complex_type(base, schema)
}

/// `ty` sits in an `xs:redefine` of `schema` and derives from the same
/// QName: same local name, and a base prefix bound to the target namespace
pub fn is_self_redefinition(ty: &ComplexType, schema: &Schema) -> bool {
    let (Some(name), Some(base)) = (ty.name.as_deref(), ty.base_name()) else {
        return false;
    };
    if local_name(base) != name || !is_redefinition(ty, schema) {
        return false;
    }
    match qname_namespace(base, schema) {
        Some(ns) => schema.target_namespace.as_deref() == Some(ns),
        None => prefix_of(base).is_none(),
    }
}

pub fn walk_elements<'a>(ty: &'a ComplexType, schema: &'a Schema) -> ElementWalk<'a> {
    ElementWalk {
        root: schema,
        stack: vec![ElementFrame::Type {
            ty,
            schema,
            ctx: Ctx::default(),
        }],
        seen_types: HashSet::new(),
        group_expansions: 0,
    }
}

pub fn walk_attributes<'a>(ty: &'a ComplexType, schema: &'a Schema) -> AttributeWalk<'a> {
    AttributeWalk {
        root: schema,
        stack: vec![AttributeFrame::Type { ty, schema }],
        seen_types: HashSet::new(),
        group_expansions: 0,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Ctx<'a> {
    optional: bool,
    array: bool,
    depth: u16,
    kind: Option<ContentSource>,
    /// Named group currently being expanded
    group: Option<&'a str>,
}

impl<'a> Ctx<'a> {
    fn enter(self, kind: ContentSource, occurs: &Occurs) -> Self {
        Self {
            optional: self.optional || occurs.is_optional() || kind == ContentSource::Choice,
            array: self.array || occurs.is_array(),
            depth: self.depth + 1,
            kind: Some(kind),
            group: self.group,
        }
    }

    fn enter_group(self, name: &'a str, occurs: &Occurs) -> Self {
        Self {
            optional: self.optional || occurs.is_optional(),
            array: self.array || occurs.is_array(),
            depth: self.depth,
            kind: self.kind,
            group: Some(name),
        }
    }

    fn source(&self) -> ContentSource {
        match self.kind {
            Some(kind) if self.depth <= 1 => kind,
            Some(_) => ContentSource::Nested,
            None => ContentSource::Sequence,
        }
    }
}

enum ElementFrame<'a> {
    Type {
        ty: &'a ComplexType,
        schema: &'a Schema,
        ctx: Ctx<'a>,
    },
    Particles {
        iter: std::slice::Iter<'a, Particle>,
        schema: &'a Schema,
        ctx: Ctx<'a>,
    },
}

/// Lazy iterator over the elements of a complex type, base type first
pub struct ElementWalk<'a> {
    root: &'a Schema,
    stack: Vec<ElementFrame<'a>>,
    seen_types: HashSet<*const ComplexType>,
    group_expansions: usize,
}

impl<'a> ElementWalk<'a> {
    fn expand_type(&mut self, ty: &'a ComplexType, schema: &'a Schema, ctx: Ctx<'a>) {
        if !self.seen_types.insert(ty as *const ComplexType) {
            warn!(
                type_name = ty.name.as_deref().unwrap_or("<anonymous>"),
                "Inheritance cycle detected, stopping"
            );
            return;
        }
        match &ty.content {
            TypeContent::Particle(p) => self.push_particle(p, schema, ctx),
            TypeContent::Complex(d) => {
                if let Some(p) = &d.particle {
                    self.push_particle(p, schema, ctx);
                }
                // Pushed last so the base type's elements come out first
                if d.method == DerivationMethod::Extension {
                    match self.base_of(ty, schema) {
                        Some(base) => self.stack.push(ElementFrame::Type {
                            ty: base.item,
                            schema: base.schema,
                            ctx,
                        }),
                        None => debug!(base = %d.base, "Base type not found"),
                    }
                }
            }
            TypeContent::Simple(_) | TypeContent::Empty => {}
        }
    }

    fn base_of(&self, ty: &'a ComplexType, schema: &'a Schema) -> Option<Walked<'a, ComplexType>> {
        if is_self_redefinition(ty, schema) {
            return find_base_type(ty, schema);
        }
        find_base_type(ty, schema).or_else(|| find_complex_type(ty.base_name()?, self.root))
    }

    fn push_particle(&mut self, particle: &'a Particle, schema: &'a Schema, ctx: Ctx<'a>) {
        self.stack.push(ElementFrame::Particles {
            iter: std::slice::from_ref(particle).iter(),
            schema,
            ctx,
        });
    }

    fn resolve_group(
        &self,
        reference: &str,
        ctx: &Ctx<'a>,
        schema: &'a Schema,
    ) -> Option<Walked<'a, NamedGroup>> {
        let local = local_name(reference);
        // A redefined group referencing its own name means the original definition
        if let Some(own) = ctx.group.filter(|g| *g == local) {
            return redefined_bases_for_group(own, schema).find_map(|base| find_group(own, base));
        }
        find_group(reference, schema).or_else(|| find_group(reference, self.root))
    }

    fn visit(
        &mut self,
        particle: &'a Particle,
        schema: &'a Schema,
        ctx: Ctx<'a>,
    ) -> Option<WalkedElement<'a>> {
        let (kind, group) = match particle {
            Particle::Element(element) => {
                return Some(WalkedElement {
                    element,
                    schema,
                    optional: ctx.optional || element.occurs.is_optional(),
                    array: ctx.array || element.occurs.is_array(),
                    source: ctx.source(),
                });
            }
            Particle::Sequence(g) => (ContentSource::Sequence, g),
            Particle::Choice(g) => (ContentSource::Choice, g),
            Particle::All(g) => (ContentSource::All, g),
            Particle::Group(group_ref) => {
                self.group_expansions += 1;
                if self.group_expansions > MAX_GROUP_EXPANSIONS {
                    warn!(group = %group_ref.reference, "Group expansion limit reached");
                    return None;
                }
                match self.resolve_group(&group_ref.reference, &ctx, schema) {
                    Some(found) => {
                        if let Some(inner) = &found.item.particle {
                            let ctx = ctx.enter_group(&found.item.name, &group_ref.occurs);
                            self.push_particle(inner, found.schema, ctx);
                        }
                    }
                    None => debug!(group = %group_ref.reference, "Model group not found"),
                }
                return None;
            }
            Particle::Any(_) => return None,
        };
        self.stack.push(ElementFrame::Particles {
            iter: group.particles.iter(),
            schema,
            ctx: ctx.enter(kind, &group.occurs),
        });
        None
    }
}

impl<'a> Iterator for ElementWalk<'a> {
    type Item = WalkedElement<'a>;

    fn next(&mut self) -> Option<WalkedElement<'a>> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                ElementFrame::Type { ty, schema, ctx } => self.expand_type(ty, schema, ctx),
                ElementFrame::Particles {
                    mut iter,
                    schema,
                    ctx,
                } => {
                    let Some(particle) = iter.next() else {
                        continue;
                    };
                    self.stack
                        .push(ElementFrame::Particles { iter, schema, ctx });
                    if let Some(found) = self.visit(particle, schema, ctx) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }
}

enum AttributeFrame<'a> {
    Type {
        ty: &'a ComplexType,
        schema: &'a Schema,
    },
    Items {
        iter: std::slice::Iter<'a, AttributeItem>,
        schema: &'a Schema,
    },
}

/// Lazy iterator over the attributes of a complex type, base type first.
///
/// Attribute groups are expanded in place; `use="prohibited"` is skipped.
pub struct AttributeWalk<'a> {
    root: &'a Schema,
    stack: Vec<AttributeFrame<'a>>,
    seen_types: HashSet<*const ComplexType>,
    group_expansions: usize,
}

impl<'a> AttributeWalk<'a> {
    fn expand_type(&mut self, ty: &'a ComplexType, schema: &'a Schema) {
        if !self.seen_types.insert(ty as *const ComplexType) {
            return;
        }
        self.stack.push(AttributeFrame::Items {
            iter: ty.attributes.iter(),
            schema,
        });
        if let TypeContent::Complex(d) | TypeContent::Simple(d) = &ty.content {
            self.stack.push(AttributeFrame::Items {
                iter: d.attributes.iter(),
                schema,
            });
            let base = if is_self_redefinition(ty, schema) {
                find_base_type(ty, schema)
            } else {
                find_base_type(ty, schema).or_else(|| find_complex_type(&d.base, self.root))
            };
            if let Some(base) = base {
                self.stack.push(AttributeFrame::Type {
                    ty: base.item,
                    schema: base.schema,
                });
            }
        }
    }

    fn visit(&mut self, item: &'a AttributeItem, schema: &'a Schema) -> Option<WalkedAttribute<'a>> {
        match item {
            AttributeItem::Attribute(attribute) => {
                if attribute.usage == Some(AttributeUse::Prohibited) {
                    return None;
                }
                let (decl, decl_schema) = match &attribute.reference {
                    Some(reference) => find_attribute(reference, schema)
                        .or_else(|| find_attribute(reference, self.root))
                        .map(|w| (w.item, w.schema))
                        .unwrap_or((attribute, schema)),
                    None => (attribute, schema),
                };
                Some(WalkedAttribute {
                    attribute,
                    decl,
                    schema: decl_schema,
                    required: attribute.is_required(),
                })
            }
            AttributeItem::Group(reference) => {
                self.group_expansions += 1;
                if self.group_expansions > MAX_GROUP_EXPANSIONS {
                    warn!(group = %reference, "Attribute group expansion limit reached");
                    return None;
                }
                let found = find_attribute_group(reference, schema)
                    .or_else(|| find_attribute_group(reference, self.root));
                match found {
                    Some(group) => self.stack.push(AttributeFrame::Items {
                        iter: group.item.attributes.iter(),
                        schema: group.schema,
                    }),
                    None => debug!(group = %reference, "Attribute group not found"),
                }
                None
            }
            AttributeItem::Any(_) => None,
        }
    }
}

impl<'a> Iterator for AttributeWalk<'a> {
    type Item = WalkedAttribute<'a>;

    fn next(&mut self) -> Option<WalkedAttribute<'a>> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                AttributeFrame::Type { ty, schema } => self.expand_type(ty, schema),
                AttributeFrame::Items { mut iter, schema } => {
                    let Some(item) = iter.next() else {
                        continue;
                    };
                    self.stack.push(AttributeFrame::Items { iter, schema });
                    if let Some(found) = self.visit(item, schema) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }
}
