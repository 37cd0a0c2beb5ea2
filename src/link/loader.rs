//! Schema location loading strategies and the parsed-schema cache

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use encoding_rs::WINDOWS_1252;

use crate::error::{Result, XsdError};
use crate::model::Schema;
use crate::util::normalize_path;

/// Supplies raw XSD text for a resolved `schemaLocation`.
///
/// `Ok(None)` means the location does not exist; the linker then skips it or
/// fails depending on `throw_on_missing`.
pub trait SchemaLoader: Send + Sync {
    fn load(&self, location: &Path) -> Result<Option<String>>;
}

impl<F> SchemaLoader for F
where
    F: Fn(&Path) -> Option<String> + Send + Sync,
{
    fn load(&self, location: &Path) -> Result<Option<String>> {
        Ok(self(location))
    }
}

/// Reads schemas from the filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl SchemaLoader for FsLoader {
    fn load(&self, location: &Path) -> Result<Option<String>> {
        match read_schema_text(location) {
            Ok(text) => Ok(Some(text)),
            Err(XsdError::SchemaReadError { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Serves schemas from memory, keyed by normalized path
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files
            .insert(normalize_path(path.as_ref()), text.into());
    }

    pub fn with(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }
}

impl SchemaLoader for MemoryLoader {
    fn load(&self, location: &Path) -> Result<Option<String>> {
        Ok(self.files.get(&normalize_path(location)).cloned())
    }
}

/// Read a schema file as a string, trying UTF-8 first, then Windows-1252 as fallback
pub fn read_schema_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| XsdError::SchemaReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(err) => {
            let bytes = err.into_bytes();
            let (decoded, _, had_errors) = WINDOWS_1252.decode(&bytes);
            if had_errors {
                return Err(XsdError::SchemaReadError {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "File contains invalid characters",
                    ),
                });
            }
            decoded.into_owned()
        }
    };

    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Parsed (unlinked) schemas keyed by resolved location.
///
/// Append-only; entries are never invalidated for the lifetime of the cache.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<PathBuf, Arc<Schema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Arc<Schema>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(path).cloned()
    }

    /// Return the cached schema for `path`, computing it with `load` if absent.
    ///
    /// A `None` from `load` is not cached so a later loader may still supply it.
    pub fn get_or_try_load<F>(&self, path: &Path, load: F) -> Result<Option<Arc<Schema>>>
    where
        F: FnOnce() -> Result<Option<Schema>>,
    {
        if let Some(hit) = self.get(path) {
            return Ok(Some(hit));
        }
        let Some(schema) = load()? else {
            return Ok(None);
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(schema));
        Ok(Some(entry.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
