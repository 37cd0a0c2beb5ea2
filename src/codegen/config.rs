//! Codegen configuration file

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, XsdError};
use crate::resolve::ResolveOptions;

/// What the codegen driver emits per schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// Flattened schema markup
    #[default]
    Xsd,
    /// The resolved model as JSON
    Json,
    /// Inferred record shape of every top-level element
    Shapes,
}

impl GeneratorKind {
    pub fn extension(self) -> &'static str {
        match self {
            GeneratorKind::Xsd => "xsd",
            GeneratorKind::Json => "json",
            GeneratorKind::Shapes => "shapes.json",
        }
    }
}

/// `{ input, output, generator, resolver?, schemas?, stubs?, prefix?, clean? }`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodegenConfig {
    /// Directory holding the source `*.xsd` files
    pub input: PathBuf,
    /// Directory generated files are written to
    pub output: PathBuf,
    #[serde(default)]
    pub generator: GeneratorKind,
    #[serde(default)]
    pub resolver: ResolveOptions,
    /// Allow-list of schema names (file stems, glob patterns allowed)
    #[serde(default)]
    pub schemas: Option<Vec<String>>,
    /// Write placeholder schemas for unresolved dependencies
    #[serde(default = "default_stubs")]
    pub stubs: bool,
    /// Prepended to every generated file name
    #[serde(default)]
    pub prefix: String,
    /// Remove the output directory before generating
    #[serde(default)]
    pub clean: bool,
}

fn default_stubs() -> bool {
    true
}

impl CodegenConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            generator: GeneratorKind::default(),
            resolver: ResolveOptions::default(),
            schemas: None,
            stubs: true,
            prefix: String::new(),
            clean: false,
        }
    }

    /// Parse a JSON config; relative paths are taken against `base_dir`
    pub fn from_json(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: CodegenConfig =
            serde_json::from_str(text).map_err(|e| XsdError::Config {
                message: e.to_string(),
            })?;
        if config.input.is_relative() {
            config.input = base_dir.join(&config.input);
        }
        if config.output.is_relative() {
            config.output = base_dir.join(&config.output);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(config_error("'input' must not be empty"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(config_error("'output' must not be empty"));
        }
        if let Some(patterns) = &self.schemas {
            for pattern in patterns {
                glob::Pattern::new(pattern).map_err(|e| {
                    config_error(format!("invalid schema pattern '{}': {}", pattern, e))
                })?;
            }
        }
        if self.prefix.contains(['/', '\\']) {
            return Err(config_error("'prefix' must not contain path separators"));
        }
        Ok(())
    }

    /// Whether a schema with file stem `name` is selected
    pub fn selects(&self, name: &str) -> bool {
        match &self.schemas {
            None => true,
            Some(patterns) => patterns.iter().any(|p| {
                glob::Pattern::new(p)
                    .map(|pattern| pattern.matches(name))
                    .unwrap_or(false)
            }),
        }
    }

    /// Directory placeholder schemas are written to
    pub fn stubs_dir(&self) -> PathBuf {
        self.output.join("stubs")
    }
}

fn config_error(message: impl Into<String>) -> XsdError {
    XsdError::Config {
        message: message.into(),
    }
}

/// Read and validate a codegen config file
pub fn load_config(path: &Path) -> Result<CodegenConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| XsdError::SchemaReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    CodegenConfig::from_json(&text, base_dir)
}
