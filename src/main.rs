use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use xsdmap::{
    build_document, build_xml, codegen, infer_shape, load_schema, parse_xml_with, resolve_schema,
    write_schema, BuildOptions, LinkOptions, ParseOptions, ResolveOptions, Schema, Value,
    WriteOptions,
};

#[derive(Parser)]
#[command(name = "xsdmap")]
#[command(author, version, about = "XSD schema engine: resolve schemas, map XML to records and back")]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaFormat {
    Xsd,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a schema and its dependencies into one flattened schema
    Resolve {
        /// Path to the root .xsd file
        schema: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "xsd")]
        format: SchemaFormat,

        /// Keep extension hierarchies instead of flattening them
        #[arg(long)]
        no_expand: bool,

        /// Keep the root's xs:import directives
        #[arg(long)]
        keep_imports: bool,

        /// Fail on schemaLocations that cannot be loaded
        #[arg(long)]
        strict_links: bool,
    },

    /// Parse an XML document into a JSON record
    Parse {
        /// Path to the .xsd file describing the document
        #[arg(short, long)]
        schema: PathBuf,

        /// XML document to parse
        xml: PathBuf,

        /// Fail when required attributes or elements are missing
        #[arg(long)]
        strict: bool,
    },

    /// Build an XML document from a JSON record
    Build {
        /// Path to the .xsd file describing the document
        #[arg(short, long)]
        schema: PathBuf,

        /// JSON file with the record to serialize
        json: PathBuf,

        /// Root element; when omitted the JSON must be `{ "<root>": { ... } }`
        #[arg(short, long)]
        root: Option<String>,

        /// Omit the XML declaration
        #[arg(long)]
        no_decl: bool,

        /// Write without indentation
        #[arg(long)]
        compact: bool,

        /// Write attributes without a namespace prefix
        #[arg(long)]
        unqualified_attributes: bool,
    },

    /// Print the inferred record shape of a root element as JSON
    Infer {
        /// Path to the .xsd file
        #[arg(short, long)]
        schema: PathBuf,

        /// Root element (or type alias) name
        element: String,
    },

    /// Generate outputs for a directory of schemas from a JSON config
    Codegen {
        /// Path to the codegen config file
        #[arg(short, long, default_value = "xsdmap.json")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Resolve {
            schema,
            output,
            format,
            no_expand,
            keep_imports,
            strict_links,
        } => {
            let link = LinkOptions {
                throw_on_missing: strict_links,
                ..Default::default()
            };
            let options = ResolveOptions {
                expand_extensions: !no_expand,
                keep_imports,
                ..Default::default()
            };
            let linked = load(&schema, &link)?;
            let resolved = resolve_schema(&linked, &options)
                .with_context(|| format!("Failed to resolve {}", schema.display()))?;
            let text = match format {
                SchemaFormat::Xsd => write_schema(&resolved, &WriteOptions::default())?,
                SchemaFormat::Json => serde_json::to_string_pretty(&resolved)?,
            };
            emit(output.as_deref(), &text)?;
        }
        Commands::Parse { schema, xml, strict } => {
            let schema = load(&schema, &LinkOptions::default())?;
            let text = fs::read_to_string(&xml)
                .with_context(|| format!("Failed to read {}", xml.display()))?;
            let record = parse_xml_with(&schema, &text, &ParseOptions { strict })
                .with_context(|| format!("Failed to parse {}", xml.display()))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Build {
            schema,
            json,
            root,
            no_decl,
            compact,
            unqualified_attributes,
        } => {
            let schema = load(&schema, &LinkOptions::default())?;
            let text = fs::read_to_string(&json)
                .with_context(|| format!("Failed to read {}", json.display()))?;
            let data: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("Invalid JSON in {}", json.display()))?;
            let options = BuildOptions {
                xml_decl: !no_decl,
                pretty: !compact,
                qualify_attributes: !unqualified_attributes,
            };
            let xml = match (root, Value::from(data)) {
                (Some(root), value) => build_xml(&schema, &root, &value, &options)?,
                (None, Value::Record(record)) => build_document(&schema, &record, &options)?,
                (None, _) => bail!("Expected a JSON object keyed by the root element"),
            };
            println!("{}", xml);
        }
        Commands::Infer { schema, element } => {
            let schema = load(&schema, &LinkOptions::default())?;
            let shape = infer_shape(&schema, &element)?;
            println!("{}", serde_json::to_string_pretty(&shape)?);
        }
        Commands::Codegen { config } => {
            let config = codegen::load_config(&config)
                .with_context(|| format!("Failed to load config {}", config.display()))?;
            let report = codegen::run(&config)?;
            println!(
                "Generated {} file(s) in {}",
                report.generated.len(),
                config.output.display()
            );
            if !report.stubs.is_empty() {
                println!("Wrote {} stub schema(s)", report.stubs.len());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn load(path: &Path, options: &LinkOptions) -> Result<Schema> {
    load_schema(path, options).with_context(|| format!("Failed to load schema {}", path.display()))
}

fn emit(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}
