//! Common test utilities for xsdmap tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use xsdmap::{load_schema, resolve_schema, LinkOptions, ResolveOptions, Schema};

/// Test context with temporary directory for isolated test execution
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    pub dir: PathBuf,
}

impl TestContext {
    /// Create an empty context
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            dir,
        }
    }

    /// Create a new test context by copying a fixture to a temp directory
    pub fn with_fixture(fixture_name: &str) -> Self {
        let ctx = Self::new();
        copy_dir_recursive(&fixture_path(fixture_name), &ctx.dir)
            .expect("Failed to copy fixture");
        ctx
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.join(rel)
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", rel, e))
    }

    /// Write `<xs:schema>` wrapping `body` to `rel`
    pub fn write_schema(&self, rel: &str, attrs: &str, body: &str) -> PathBuf {
        self.write(rel, &schema_text(attrs, body))
    }

    pub fn write(&self, rel: &str, text: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(&path, text).expect("Failed to write file");
        path
    }

    /// Load and link a schema, panicking on failure
    pub fn linked(&self, rel: &str) -> Schema {
        load_schema(&self.path(rel), &LinkOptions::default())
            .unwrap_or_else(|e| panic!("Failed to load {}: {}", rel, e))
    }

    /// Load, link and resolve a schema with default options
    pub fn resolved(&self, rel: &str) -> Schema {
        resolve_schema(&self.linked(rel), &ResolveOptions::default())
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", rel, e))
    }
}

/// Path of a fixture directory under tests/fixtures
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn schema_text(attrs: &str, body: &str) -> String {
    format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" {}>{}</xs:schema>"#,
        attrs, body
    )
}

/// Names of the record fields of a JSON object, in order
pub fn keys(value: &serde_json::Value) -> Vec<String> {
    value
        .as_object()
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default()
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}
