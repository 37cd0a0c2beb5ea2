//! Substitution-group index and reference expansion

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{ComplexType, Element, MaxOccurs, ModelGroup, Occurs, Particle, Schema, TypeContent};
use crate::util::local_name;
use crate::walk::walk_top_level_elements;

/// Maps each substitution-group head to the elements declaring it.
///
/// Derived from top-level element declarations; never stored on a schema.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionIndex {
    members: BTreeMap<String, Vec<String>>,
    abstracts: HashSet<String>,
    max_occurs: HashMap<String, Option<MaxOccurs>>,
}

impl SubstitutionIndex {
    /// Build from top-level elements; a name seen twice keeps its first declaration
    pub fn build<'a>(elements: impl IntoIterator<Item = &'a Element>) -> Self {
        let mut index = Self::default();
        let mut seen = HashSet::new();
        for element in elements {
            let Some(name) = element.name.as_deref() else {
                continue;
            };
            if !seen.insert(name) {
                continue;
            }
            if element.is_abstract {
                index.abstracts.insert(name.to_string());
            }
            if let Some(head) = &element.substitution_group {
                index
                    .members
                    .entry(local_name(head).to_string())
                    .or_default()
                    .push(name.to_string());
            }
            index
                .max_occurs
                .insert(name.to_string(), element.occurs.max);
        }
        index
    }

    /// Index over every top-level element of a linked closure
    pub fn from_schema(schema: &Schema) -> Self {
        Self::build(walk_top_level_elements(schema).map(|w| w.item))
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_abstract(&self, name: &str) -> bool {
        self.abstracts.contains(local_name(name))
    }

    /// Concrete elements that may stand in for `head`, following chains
    /// through abstract members, in declaration order.
    pub fn substitutes(&self, head: &str) -> Vec<&str> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = self
            .members
            .get(local_name(head))
            .map(|m| m.iter().rev().map(String::as_str).collect())
            .unwrap_or_default();

        while let Some(name) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            if !self.abstracts.contains(name) {
                found.push(name);
            }
            if let Some(members) = self.members.get(name) {
                stack.extend(members.iter().rev().map(String::as_str));
            }
        }
        found
    }

    /// The references replacing `element` when it refers to an abstract head
    pub fn substitute(&self, element: &Element) -> Option<Vec<Element>> {
        let head = local_name(element.reference.as_deref()?);
        if !self.is_abstract(head) {
            return None;
        }
        let substitutes = self.substitutes(head);
        if substitutes.is_empty() {
            return None;
        }
        Some(
            substitutes
                .into_iter()
                .map(|name| {
                    let own_max = self.max_occurs.get(name).copied().flatten();
                    Element {
                        reference: Some(name.to_string()),
                        occurs: Occurs::new(
                            Some(element.occurs.min.unwrap_or(0)),
                            own_max.or(element.occurs.max),
                        ),
                        ..Default::default()
                    }
                })
                .collect(),
        )
    }

    pub(crate) fn expand_schema(&self, schema: &mut Schema) {
        for ty in &mut schema.complex_types {
            self.expand_type(ty);
        }
        for group in &mut schema.groups {
            if let Some(particle) = &mut group.particle {
                self.expand_root(particle);
            }
        }
        for element in &mut schema.elements {
            if let Some(ty) = &mut element.complex_type {
                self.expand_type(ty);
            }
        }
    }

    fn expand_type(&self, ty: &mut ComplexType) {
        match &mut ty.content {
            TypeContent::Particle(particle) => self.expand_root(particle),
            TypeContent::Complex(d) | TypeContent::Simple(d) => {
                if let Some(particle) = &mut d.particle {
                    self.expand_root(particle);
                }
            }
            TypeContent::Empty => {}
        }
    }

    /// A content model made of a single abstract reference becomes a sequence
    fn expand_root(&self, particle: &mut Particle) {
        if let Particle::Element(element) = particle {
            if let Some(substitutes) = self.substitute(element) {
                *particle = Particle::Sequence(ModelGroup {
                    particles: substitutes.into_iter().map(Particle::Element).collect(),
                    ..Default::default()
                });
                return;
            }
        }
        self.expand_particle(particle);
    }

    fn expand_particle(&self, particle: &mut Particle) {
        match particle {
            Particle::Sequence(g) | Particle::Choice(g) | Particle::All(g) => {
                let particles = std::mem::take(&mut g.particles);
                for mut child in particles {
                    let substitutes = match &child {
                        Particle::Element(element) => self.substitute(element),
                        _ => None,
                    };
                    match substitutes {
                        Some(subs) => g.particles.extend(subs.into_iter().map(Particle::Element)),
                        None => {
                            self.expand_particle(&mut child);
                            g.particles.push(child);
                        }
                    }
                }
            }
            Particle::Element(element) => {
                if let Some(ty) = &mut element.complex_type {
                    self.expand_type(ty);
                }
            }
            Particle::Group(_) | Particle::Any(_) => {}
        }
    }
}
