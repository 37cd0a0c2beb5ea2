//! Placeholder schemas for dependencies that cannot be found

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::error::{Result, XsdError};
use crate::link::SchemaLoader;
use crate::model::XS_NAMESPACE;

/// Wraps a loader and answers unavailable locations with an empty schema.
///
/// Every stubbed location is recorded so the driver can materialize the
/// placeholders next to the generated output.
pub struct StubLoader<L> {
    inner: L,
    enabled: bool,
    stubbed: Mutex<BTreeSet<PathBuf>>,
}

impl<L: SchemaLoader> StubLoader<L> {
    pub fn new(inner: L, enabled: bool) -> Self {
        Self {
            inner,
            enabled,
            stubbed: Mutex::new(BTreeSet::new()),
        }
    }

    /// Locations answered with a placeholder so far
    pub fn stubbed(&self) -> Vec<PathBuf> {
        let stubbed = self.stubbed.lock().unwrap_or_else(|e| e.into_inner());
        stubbed.iter().cloned().collect()
    }

    /// Write one placeholder per stubbed location into `dir`, keyed by file name
    pub fn write_stubs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let stubbed = self.stubbed();
        if stubbed.is_empty() {
            return Ok(Vec::new());
        }
        std::fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;

        // Same-named locations from different directories share one stub
        let mut written = BTreeSet::new();
        for location in stubbed {
            let Some(file_name) = location.file_name() else {
                continue;
            };
            let path = dir.join(file_name);
            if written.contains(&path) {
                continue;
            }
            std::fs::write(&path, stub_text()).map_err(|e| write_error(&path, e))?;
            written.insert(path);
        }
        Ok(written.into_iter().collect())
    }
}

impl<L: SchemaLoader> SchemaLoader for StubLoader<L> {
    fn load(&self, location: &Path) -> Result<Option<String>> {
        match self.inner.load(location)? {
            Some(text) => Ok(Some(text)),
            None if self.enabled => {
                warn!(location = %location.display(), "Schema not found, using stub");
                let mut stubbed = self.stubbed.lock().unwrap_or_else(|e| e.into_inner());
                stubbed.insert(location.to_path_buf());
                Ok(Some(stub_text()))
            }
            None => Ok(None),
        }
    }
}

fn stub_text() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<xs:schema xmlns:xs=\"{}\"/>\n",
        XS_NAMESPACE
    )
}

fn write_error(path: &Path, err: std::io::Error) -> XsdError {
    XsdError::Write {
        message: format!("{}: {}", path.display(), err),
    }
}
