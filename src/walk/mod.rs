//! Traversal over linked schema closures and complex-type content

mod content;
mod schemas;

pub use content::{
    find_base_type, is_self_redefinition, walk_attributes, walk_elements, AttributeWalk,
    ContentSource, ElementWalk, WalkedAttribute, WalkedElement,
};
pub(crate) use schemas::redefined_bases_for_group;
pub use schemas::{
    find_attribute, find_attribute_group, find_complex_type, find_element, find_group,
    find_simple_type, walk_attribute_groups, walk_attribute_groups_with, walk_complex_types,
    walk_complex_types_with, walk_groups, walk_groups_with, walk_schemas, walk_schemas_with,
    walk_simple_types, walk_simple_types_with, walk_top_level_attributes,
    walk_top_level_attributes_with, walk_top_level_elements, walk_top_level_elements_with,
    SchemaWalk, WalkOptions, Walked,
};
