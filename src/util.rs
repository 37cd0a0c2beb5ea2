//! Shared utility helpers.

use std::path::{Component, Path, PathBuf};

/// Local part of a qualified name (`xs:string` -> `string`).
#[inline]
pub fn local_name(qname: &str) -> &str {
    match qname.rfind(':') {
        Some(pos) => &qname[pos + 1..],
        None => qname,
    }
}

/// Prefix of a qualified name, if any (`xs:string` -> `Some("xs")`).
#[inline]
pub fn prefix_of(qname: &str) -> Option<&str> {
    qname.rfind(':').map(|pos| &qname[..pos])
}

/// Uppercase the first character (`abapClass` -> `AbapClass`).
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase the first character (`AbapClass` -> `abapClass`).
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lexically normalize a path, folding `.` and `..` without touching the filesystem.
///
/// Schema locations may come from an in-memory loader, so canonicalize() is not an option.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve a `schemaLocation` against the directory of the referring schema.
pub fn resolve_location(base_dir: &Path, location: &str) -> PathBuf {
    let location = location.replace('\\', "/");
    let candidate = Path::new(&location);
    if candidate.is_absolute() {
        normalize_path(candidate)
    } else {
        normalize_path(&base_dir.join(candidate))
    }
}
