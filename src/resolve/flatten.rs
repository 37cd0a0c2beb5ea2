//! Per-declaration rewriting: inheritance flattening and namespace stamping

use std::collections::{HashMap, HashSet};

use super::ResolveOptions;
use crate::model::{
    Attribute, AttributeGroup, AttributeItem, AttributeUse, ComplexType, Derivation,
    DerivationMethod, Element, Form, MaxOccurs, ModelGroup, NamedGroup, Particle, Schema,
    TypeContent,
};
use crate::util::local_name;
use crate::walk::{
    find_attribute_group, find_base_type, find_group, is_self_redefinition,
    redefined_bases_for_group, walk_attributes, walk_elements, Walked,
};

/// Longest simpleContent chain followed before giving up
const MAX_SIMPLE_CONTENT_DEPTH: usize = 64;

pub(super) struct Flattener<'r> {
    root: &'r Schema,
    options: &'r ResolveOptions,
}

impl<'r> Flattener<'r> {
    pub(super) fn new(root: &'r Schema, options: &'r ResolveOptions) -> Self {
        Self { root, options }
    }

    pub(super) fn expand_type(&self, ty: &ComplexType, schema: &Schema) -> ComplexType {
        let self_derived = is_self_redefinition(ty, schema);
        let flatten = self.options.expand_extensions || self_derived;
        match &ty.content {
            TypeContent::Complex(d) if flatten && d.method == DerivationMethod::Extension => {
                self.flatten_extension(ty, schema)
            }
            TypeContent::Complex(d) if self_derived => self.flatten_restriction(ty, d, schema),
            TypeContent::Simple(_) if flatten => self.collapse_simple_content(ty, schema),
            _ => {
                let mut out = ty.clone();
                self.localize_type(&mut out, schema);
                out
            }
        }
    }

    pub(super) fn expand_element(&self, element: &Element, schema: &Schema) -> Element {
        let mut out = element.clone();
        self.stamp_element(&mut out, schema, true);
        self.expand_inline(&mut out, schema);
        out
    }

    pub(super) fn expand_attribute(&self, attribute: &Attribute, schema: &Schema) -> Attribute {
        let mut out = attribute.clone();
        self.stamp_attribute(&mut out, schema, true);
        out
    }

    pub(super) fn expand_group(&self, group: &NamedGroup, schema: &Schema) -> NamedGroup {
        let mut out = group.clone();
        if let Some(particle) = &mut out.particle {
            self.localize_particle(particle, schema, Some(&group.name));
        }
        out
    }

    /// Attribute group with a redefinition's self-reference replaced by the
    /// original group's attributes
    pub(super) fn expand_attribute_group(
        &self,
        group: &AttributeGroup,
        schema: &Schema,
    ) -> AttributeGroup {
        let mut attributes = Vec::with_capacity(group.attributes.len());
        for item in &group.attributes {
            match item {
                AttributeItem::Group(reference) if local_name(reference) == group.name => {
                    let original = schema
                        .redefines
                        .iter()
                        .filter(|r| r.attribute_groups.iter().any(|g| g.name == group.name))
                        .filter_map(|r| r.base_schema())
                        .find_map(|base| find_attribute_group(&group.name, base));
                    if let Some(original) = original {
                        attributes.extend(
                            self.expand_attribute_group(original.item, original.schema)
                                .attributes,
                        );
                    }
                }
                AttributeItem::Attribute(attribute) => {
                    let mut attribute = attribute.clone();
                    self.stamp_attribute(&mut attribute, schema, false);
                    attributes.push(AttributeItem::Attribute(attribute));
                }
                other => attributes.push(other.clone()),
            }
        }
        AttributeGroup {
            name: group.name.clone(),
            attributes,
            opaque: group.opaque.clone(),
        }
    }

    /// `complexContent/extension` → one `all` group holding every inherited
    /// and own element, with effective occurrence baked in
    fn flatten_extension(&self, ty: &ComplexType, schema: &Schema) -> ComplexType {
        let mut fields: Vec<Element> = Vec::new();
        let mut positions: HashMap<(Option<String>, String), usize> = HashMap::new();

        for walked in walk_elements(ty, schema) {
            let mut element = walked.element.clone();
            if walked.optional {
                element.occurs.min = Some(0);
            }
            if walked.array && !element.occurs.is_array() {
                element.occurs.max = Some(MaxOccurs::Unbounded);
            }
            self.stamp_element(&mut element, walked.schema, false);
            self.expand_inline(&mut element, walked.schema);

            let key = (element.namespace.clone(), element.display_name().to_string());
            match positions.get(&key) {
                // Redeclared in a derived type: replace the base entry in place
                Some(&at) => fields[at] = element,
                None => {
                    positions.insert(key, fields.len());
                    fields.push(element);
                }
            }
        }

        let content = if fields.is_empty() {
            TypeContent::Empty
        } else {
            TypeContent::Particle(Particle::All(ModelGroup {
                particles: fields.into_iter().map(Particle::Element).collect(),
                ..Default::default()
            }))
        };

        ComplexType {
            name: ty.name.clone(),
            is_abstract: ty.is_abstract,
            mixed: ty.mixed,
            content,
            attributes: self.merged_attributes(ty, schema),
            opaque: ty.opaque.clone(),
        }
    }

    /// Self-derived restriction: keep the restricted particle, drop the base
    fn flatten_restriction(
        &self,
        ty: &ComplexType,
        derivation: &Derivation,
        schema: &Schema,
    ) -> ComplexType {
        let mut out = ComplexType {
            name: ty.name.clone(),
            is_abstract: ty.is_abstract,
            mixed: ty.mixed,
            content: derivation
                .particle
                .clone()
                .map(TypeContent::Particle)
                .unwrap_or_default(),
            attributes: self.merged_attributes(ty, schema),
            opaque: ty.opaque.clone(),
        };
        self.localize_type(&mut out, schema);
        out
    }

    /// `simpleContent` chains through complex types collapse onto the
    /// ultimate simple base. Facets of intermediate restrictions are dropped.
    fn collapse_simple_content(&self, ty: &ComplexType, schema: &Schema) -> ComplexType {
        let TypeContent::Simple(own) = &ty.content else {
            return ty.clone();
        };
        let mut derivation = own.clone();
        let mut current = Walked { item: ty, schema };
        for _ in 0..MAX_SIMPLE_CONTENT_DEPTH {
            let Some(base) = find_base_type(current.item, current.schema) else {
                break;
            };
            let TypeContent::Simple(inherited) = &base.item.content else {
                break;
            };
            derivation.base = inherited.base.clone();
            derivation.method = DerivationMethod::Extension;
            derivation.facets.clear();
            current = base;
        }
        derivation.particle = None;
        derivation.attributes = self.merged_attributes(ty, schema);

        ComplexType {
            name: ty.name.clone(),
            is_abstract: ty.is_abstract,
            mixed: ty.mixed,
            content: TypeContent::Simple(derivation),
            attributes: Vec::new(),
            opaque: ty.opaque.clone(),
        }
    }

    /// Attribute uses base-first; a derived redeclaration replaces the base
    /// entry in place and `use="prohibited"` removes it
    fn merged_attributes(&self, ty: &ComplexType, schema: &Schema) -> Vec<AttributeItem> {
        let prohibited: HashSet<&str> = own_attribute_items(ty)
            .filter_map(|item| match item {
                AttributeItem::Attribute(a) if a.usage == Some(AttributeUse::Prohibited) => {
                    Some(a.display_name())
                }
                _ => None,
            })
            .collect();

        let mut merged: Vec<Attribute> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for walked in walk_attributes(ty, schema) {
            let attribute = if walked.is_global() {
                walked.attribute.clone()
            } else {
                let mut local = walked.decl.clone();
                self.stamp_attribute(&mut local, walked.schema, false);
                local
            };
            let key = attribute.display_name().to_string();
            if prohibited.contains(key.as_str()) {
                continue;
            }
            match positions.get(&key) {
                Some(&at) => merged[at] = attribute,
                None => {
                    positions.insert(key, merged.len());
                    merged.push(attribute);
                }
            }
        }
        merged.into_iter().map(AttributeItem::Attribute).collect()
    }

    fn localize_type(&self, ty: &mut ComplexType, schema: &Schema) {
        let (particle, derived_attributes) = match &mut ty.content {
            TypeContent::Particle(p) => (Some(p), None),
            TypeContent::Complex(d) | TypeContent::Simple(d) => {
                (d.particle.as_mut(), Some(&mut d.attributes))
            }
            TypeContent::Empty => (None, None),
        };
        if let Some(particle) = particle {
            self.localize_particle(particle, schema, None);
        }
        for item in derived_attributes
            .into_iter()
            .flatten()
            .chain(ty.attributes.iter_mut())
        {
            if let AttributeItem::Attribute(attribute) = item {
                self.stamp_attribute(attribute, schema, false);
            }
        }
    }

    fn localize_particle(&self, particle: &mut Particle, schema: &Schema, own_group: Option<&str>) {
        let replacement = match particle {
            Particle::Element(element) => {
                self.stamp_element(element, schema, false);
                self.expand_inline(element, schema);
                None
            }
            Particle::Sequence(g) | Particle::Choice(g) | Particle::All(g) => {
                for child in &mut g.particles {
                    self.localize_particle(child, schema, own_group);
                }
                None
            }
            Particle::Group(r) => match own_group {
                Some(own) if local_name(&r.reference) == own => {
                    self.original_group(own, schema).map(|inner| {
                        Particle::Sequence(ModelGroup {
                            occurs: r.occurs.clone(),
                            particles: vec![inner],
                            opaque: Vec::new(),
                        })
                    })
                }
                _ => None,
            },
            Particle::Any(_) => None,
        };
        if let Some(replacement) = replacement {
            *particle = replacement;
        }
    }

    /// Content of the group a redefinition of `name` replaces
    fn original_group(&self, name: &str, schema: &Schema) -> Option<Particle> {
        let original = redefined_bases_for_group(name, schema).find_map(|base| find_group(name, base))?;
        let mut particle = original.item.particle.clone()?;
        self.localize_particle(&mut particle, original.schema, None);
        Some(particle)
    }

    fn expand_inline(&self, element: &mut Element, schema: &Schema) {
        if let Some(inline) = &mut element.complex_type {
            let expanded = self.expand_type(inline, schema);
            **inline = expanded;
        }
    }

    /// Record the namespace (and form, where the defaults differ) of a
    /// declaration coming from another schema
    fn stamp_element(&self, element: &mut Element, from: &Schema, top_level: bool) {
        let Some(ns) = from.target_namespace.as_deref() else {
            return;
        };
        if element.reference.is_some() {
            return;
        }
        let foreign = self.root.target_namespace.as_deref() != Some(ns);
        if top_level {
            if foreign {
                element.namespace = Some(ns.to_string());
            }
            return;
        }
        let form = element.form.unwrap_or_else(|| from.element_form());
        if foreign && form == Form::Qualified {
            element.namespace = Some(ns.to_string());
        }
        if element.form.is_none() && form != self.root.element_form() {
            element.form = Some(form);
        }
    }

    fn stamp_attribute(&self, attribute: &mut Attribute, from: &Schema, top_level: bool) {
        let Some(ns) = from.target_namespace.as_deref() else {
            return;
        };
        if attribute.reference.is_some() {
            return;
        }
        let foreign = self.root.target_namespace.as_deref() != Some(ns);
        if top_level {
            if foreign {
                attribute.namespace = Some(ns.to_string());
            }
            return;
        }
        let form = attribute.form.unwrap_or_else(|| from.attribute_form());
        if foreign && form == Form::Qualified {
            attribute.namespace = Some(ns.to_string());
        }
        if attribute.form.is_none() && form != self.root.attribute_form() {
            attribute.form = Some(form);
        }
    }
}

fn own_attribute_items(ty: &ComplexType) -> impl Iterator<Item = &AttributeItem> {
    let derived: &[AttributeItem] = match &ty.content {
        TypeContent::Complex(d) | TypeContent::Simple(d) => d.attributes.as_slice(),
        _ => &[],
    };
    derived.iter().chain(ty.attributes.iter())
}
