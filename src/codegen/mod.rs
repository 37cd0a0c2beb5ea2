//! Batch driver: discover, link, resolve and render a directory of schemas

mod config;
mod generator;
mod stubs;

pub use config::{load_config, CodegenConfig, GeneratorKind};
pub use generator::{output_file_name, render};
pub use stubs::StubLoader;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::link::{read_schema_text, FsLoader, LinkOptions, Linker, SchemaCache, SchemaLoader};
use crate::model::Schema;
use crate::resolve::resolve_schema;
use crate::util::normalize_path;
use crate::walk::walk_schemas;
use crate::xsd::parse_schema_at;

/// Minimum number of schemas before linking and rendering go parallel
const PARALLEL_THRESHOLD: usize = 8;

/// Files written by one codegen run
#[derive(Debug, Clone, Default)]
pub struct CodegenReport {
    pub generated: Vec<PathBuf>,
    pub stubs: Vec<PathBuf>,
}

/// Run the codegen pipeline described by `config`
pub fn run(config: &CodegenConfig) -> Result<CodegenReport> {
    config.validate()?;
    let input = normalize_path(&config.input);
    let output = normalize_path(&config.output);

    if config.clean && output.exists() {
        fs::remove_dir_all(&output)
            .with_context(|| format!("Failed to clean output directory: {}", output.display()))?;
    }
    fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))?;

    let sources = discover_schemas(&input, &output, config)?;
    if sources.is_empty() {
        warn!(input = %input.display(), "No schemas selected");
    }
    info!(count = sources.len(), "Discovered schemas");

    let loader = StubLoader::new(FsLoader, config.stubs);
    let cache = SchemaCache::new();
    let link = |path: &PathBuf| link_file(path, &loader, &cache);

    let mut linked: Vec<(PathBuf, Schema)> = map_files(&sources, |path| {
        link(path).map(|schema| (path.clone(), schema))
    })?;

    // Dependencies living under the input directory are generated as well
    let stubbed: BTreeSet<PathBuf> = loader.stubbed().into_iter().collect();
    let mut known: BTreeSet<PathBuf> = sources.iter().cloned().collect();
    let mut dependencies = Vec::new();
    for (path, schema) in &linked {
        for dep in walk_schemas(schema) {
            let Some(location) = dep.location.as_deref().map(|l| normalize_path(Path::new(l)))
            else {
                continue;
            };
            if &location == path || !location.starts_with(&input) || stubbed.contains(&location) {
                continue;
            }
            if known.insert(location.clone()) {
                debug!(dependency = %location.display(), "Adding linked dependency");
                dependencies.push(location);
            }
        }
    }
    linked.extend(map_files(&dependencies, |path| {
        link(path).map(|schema| (path.clone(), schema))
    })?);

    let stubs = loader
        .write_stubs(&config.stubs_dir())
        .context("Failed to write stub schemas")?;

    let generated = map_files(&linked, |(path, schema)| generate(config, &output, path, schema))?;
    info!(
        generated = generated.len(),
        stubs = stubs.len(),
        output = %output.display(),
        "Codegen complete"
    );

    Ok(CodegenReport { generated, stubs })
}

/// Every selected `*.xsd` under `input`, sorted, skipping the output tree
fn discover_schemas(input: &Path, output: &Path, config: &CodegenConfig) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        bail!("Input directory not found: {}", input.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| !p.starts_with(output))
        .filter(|p| {
            p.extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("xsd"))
        })
        .filter(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map_or(false, |stem| config.selects(stem))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn link_file(path: &Path, loader: &dyn SchemaLoader, cache: &SchemaCache) -> Result<Schema> {
    let text = read_schema_text(path)?;
    let schema = parse_schema_at(&text, Some(path.to_string_lossy().into_owned()))
        .with_context(|| format!("Failed to parse schema: {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut linker = Linker::new(loader, LinkOptions::with_base_path(base)).with_cache(cache);
    linker
        .link(schema)
        .with_context(|| format!("Failed to link schema: {}", path.display()))
}

fn generate(config: &CodegenConfig, output: &Path, path: &Path, schema: &Schema) -> Result<PathBuf> {
    let resolved = resolve_schema(schema, &config.resolver)
        .with_context(|| format!("Failed to resolve schema: {}", path.display()))?;
    let text = render(config.generator, &resolved)
        .with_context(|| format!("Failed to render schema: {}", path.display()))?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("schema");
    let target = output.join(output_file_name(config.generator, &config.prefix, stem));
    fs::write(&target, text)
        .with_context(|| format!("Failed to write output file: {}", target.display()))?;
    info!(schema = %path.display(), output = %target.display(), "Generated");
    Ok(target)
}

/// Apply `f` to every item, in parallel above [`PARALLEL_THRESHOLD`].
///
/// Output order matches input order; the first error wins.
fn map_files<T, R, F>(items: &[T], f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync,
{
    if items.len() >= PARALLEL_THRESHOLD {
        let results: Vec<Result<R>> = items.par_iter().map(&f).collect();
        let mut out = Vec::with_capacity(results.len());
        for result in results {
            out.push(result?);
        }
        Ok(out)
    } else {
        items.iter().map(f).collect()
    }
}
