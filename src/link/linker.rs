//! Recursive `schemaLocation` linking with cycle detection

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::loader::{SchemaCache, SchemaLoader};
use crate::error::{Result, XsdError};
use crate::model::{Link, Schema};
use crate::util::{normalize_path, resolve_location};
use crate::xsd::parse_schema_at;

/// Options for linking a schema against its dependencies
#[derive(Debug, Clone)]
pub struct LinkOptions {
    /// Directory relative `schemaLocation`s of the root schema resolve against
    pub base_path: PathBuf,
    /// Fail with [`XsdError::Link`] instead of skipping unavailable locations
    pub throw_on_missing: bool,
    /// Link dependencies of dependencies (otherwise only one level is attached)
    pub auto_link: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            throw_on_missing: false,
            auto_link: true,
        }
    }
}

impl LinkOptions {
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Default::default()
        }
    }
}

/// Populate the `link` of every import, include and redefine of `schema`
pub fn link_schema(
    schema: Schema,
    loader: &dyn SchemaLoader,
    options: &LinkOptions,
) -> Result<Schema> {
    Linker::new(loader, options.clone()).link(schema)
}

/// One linking traversal.
///
/// Tracks schemas currently being linked (to cut cycles) and schemas already
/// linked (so a dependency reached twice is shared, not re-linked).
pub struct Linker<'l> {
    loader: &'l dyn SchemaLoader,
    cache: Option<&'l SchemaCache>,
    options: LinkOptions,
    in_progress: HashSet<PathBuf>,
    done: HashMap<PathBuf, Arc<Schema>>,
}

impl<'l> Linker<'l> {
    pub fn new(loader: &'l dyn SchemaLoader, options: LinkOptions) -> Self {
        Self {
            loader,
            cache: None,
            options,
            in_progress: HashSet::new(),
            done: HashMap::new(),
        }
    }

    /// Reuse parsed schemas across traversals
    pub fn with_cache(mut self, cache: &'l SchemaCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn link(&mut self, schema: Schema) -> Result<Schema> {
        let key = schema
            .location
            .as_deref()
            .map(|loc| normalize_path(Path::new(loc)));
        let base = self.options.base_path.clone();
        self.link_at(schema, &base, key)
    }

    fn link_at(&mut self, mut schema: Schema, base_dir: &Path, key: Option<PathBuf>) -> Result<Schema> {
        if let Some(k) = &key {
            self.in_progress.insert(k.clone());
        }
        let referrer = schema.display_name();

        for import in &mut schema.imports {
            if let Some(location) = &import.schema_location {
                import.link = self.dependency(location, base_dir, &referrer)?;
            }
        }
        for include in &mut schema.includes {
            include.link = self.dependency(&include.schema_location, base_dir, &referrer)?;
        }
        for redefine in &mut schema.redefines {
            redefine.link = self.dependency(&redefine.schema_location, base_dir, &referrer)?;
        }

        if let Some(k) = &key {
            self.in_progress.remove(k);
        }
        Ok(schema)
    }

    fn dependency(&mut self, location: &str, base_dir: &Path, referrer: &str) -> Result<Link> {
        let path = resolve_location(base_dir, location);

        if self.in_progress.contains(&path) {
            debug!(location, referrer, "Import cycle detected, not descending");
            return Ok(Link::Cyclic);
        }
        if let Some(done) = self.done.get(&path) {
            return Ok(Link::Linked(done.clone()));
        }

        let Some(parsed) = self.load(&path)? else {
            if self.options.throw_on_missing {
                return Err(XsdError::Link {
                    schema: referrer.to_string(),
                    location: location.to_string(),
                });
            }
            warn!(location, referrer, "Schema location unavailable, skipping");
            return Ok(Link::Missing);
        };

        debug!(path = %path.display(), "Linking schema");
        let linked = if self.options.auto_link {
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            self.link_at(parsed, &dir, Some(path.clone()))?
        } else {
            parsed
        };

        let linked = Arc::new(linked);
        self.done.insert(path, linked.clone());
        Ok(Link::Linked(linked))
    }

    fn load(&self, path: &Path) -> Result<Option<Schema>> {
        let location = path.to_string_lossy().into_owned();
        let parse = || -> Result<Option<Schema>> {
            match self.loader.load(path)? {
                Some(text) => parse_schema_at(&text, Some(location.clone())).map(Some),
                None => Ok(None),
            }
        };
        match self.cache {
            Some(cache) => Ok(cache
                .get_or_try_load(path, parse)?
                .map(|schema| (*schema).clone())),
            None => parse(),
        }
    }
}
