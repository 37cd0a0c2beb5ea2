//! Schema resolution: merge a linked closure into one self-contained schema
//!
//! The output has no imports, includes or redefines. Every type, group and
//! element is reachable by unprefixed name, extension hierarchies are
//! flattened and abstract element references are expanded to their
//! substitutes.

mod flatten;
mod substitution;

pub use substitution::SubstitutionIndex;

use std::collections::HashSet;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, XsdError};
use crate::model::{Link, Schema};
use crate::walk::{
    walk_attribute_groups_with, walk_complex_types_with, walk_groups_with, walk_schemas_with,
    walk_simple_types_with, walk_top_level_attributes_with, walk_top_level_elements_with,
    WalkOptions, Walked,
};
use flatten::Flattener;

/// What the resolver merges and rewrites
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveOptions {
    /// Merge declarations of imported schemas
    pub imports: bool,
    /// Merge declarations of included and redefined schemas
    pub includes: bool,
    /// Flatten `complexContent/extension` and `simpleContent` chains
    pub expand_extensions: bool,
    /// Replace references to abstract elements by their substitutes
    pub expand_substitutions: bool,
    /// Keep the root's `xs:import` directives in the output
    pub keep_imports: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            imports: true,
            includes: true,
            expand_extensions: true,
            expand_substitutions: true,
            keep_imports: false,
        }
    }
}

impl ResolveOptions {
    fn walk(&self) -> WalkOptions {
        WalkOptions {
            imports: self.imports,
            includes: self.includes,
        }
    }
}

/// Resolve a linked schema into a single flattened schema.
///
/// Fails with [`XsdError::Resolve`] when a directive in scope names a
/// `schemaLocation` that was never linked or could not be loaded.
pub fn resolve_schema(schema: &Schema, options: &ResolveOptions) -> Result<Schema> {
    let walk = options.walk();
    verify_links(schema, walk)?;

    let flattener = Flattener::new(schema, options);
    let mut out = Schema {
        location: schema.location.clone(),
        target_namespace: schema.target_namespace.clone(),
        element_form_default: schema.element_form_default,
        attribute_form_default: schema.attribute_form_default,
        opaque: schema.opaque.clone(),
        ..Default::default()
    };

    for s in walk_schemas_with(schema, walk) {
        for (prefix, uri) in &s.xmlns {
            out.xmlns
                .entry(prefix.clone())
                .or_insert_with(|| uri.clone());
        }
    }

    out.complex_types = first_wins(walk_complex_types_with(schema, walk), |t| t.name.as_deref())
        .into_iter()
        .map(|w| flattener.expand_type(w.item, w.schema))
        .collect();
    out.simple_types = first_wins(walk_simple_types_with(schema, walk), |t| t.name.as_deref())
        .into_iter()
        .map(|w| w.item.clone())
        .collect();
    out.groups = first_wins(walk_groups_with(schema, walk), |g| Some(g.name.as_str()))
        .into_iter()
        .map(|w| flattener.expand_group(w.item, w.schema))
        .collect();
    out.attribute_groups =
        first_wins(walk_attribute_groups_with(schema, walk), |g| Some(g.name.as_str()))
            .into_iter()
            .map(|w| flattener.expand_attribute_group(w.item, w.schema))
            .collect();
    out.attributes = first_wins(walk_top_level_attributes_with(schema, walk), |a| {
        a.name.as_deref()
    })
    .into_iter()
    .map(|w| flattener.expand_attribute(w.item, w.schema))
    .collect();
    out.elements = first_wins(walk_top_level_elements_with(schema, walk), |e| e.name.as_deref())
        .into_iter()
        .map(|w| flattener.expand_element(w.item, w.schema))
        .collect();

    if options.expand_substitutions {
        let index = SubstitutionIndex::build(&out.elements);
        if !index.is_empty() {
            index.expand_schema(&mut out);
        }
    }

    if options.keep_imports {
        out.imports = schema.imports.clone();
    }

    debug!(
        schema = %schema.display_name(),
        complex_types = out.complex_types.len(),
        elements = out.elements.len(),
        "Resolved schema"
    );
    Ok(out)
}

fn verify_links(schema: &Schema, walk: WalkOptions) -> Result<()> {
    for s in walk_schemas_with(schema, walk) {
        let imports = s
            .imports
            .iter()
            .filter(|_| walk.imports)
            .filter_map(|i| Some((i.schema_location.as_deref()?, &i.link)));
        let includes = s
            .includes
            .iter()
            .filter(|_| walk.includes)
            .map(|i| (i.schema_location.as_str(), &i.link));
        let redefines = s
            .redefines
            .iter()
            .filter(|_| walk.includes)
            .map(|r| (r.schema_location.as_str(), &r.link));

        for (location, link) in imports.chain(includes).chain(redefines) {
            if matches!(link, Link::Unlinked | Link::Missing) {
                return Err(XsdError::Resolve {
                    schema: s.display_name(),
                    location: location.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Keep the first declaration of every name; later ones are shadowed
fn first_wins<'a, T>(
    items: impl Iterator<Item = Walked<'a, T>>,
    name: impl Fn(&'a T) -> Option<&'a str>,
) -> Vec<Walked<'a, T>> {
    let mut seen = HashSet::new();
    items
        .filter(|w| match name(w.item) {
            Some(n) => {
                let first = seen.insert(n);
                if !first {
                    debug!(name = n, schema = %w.schema.display_name(), "Shadowed declaration skipped");
                }
                first
            }
            None => false,
        })
        .collect()
}
