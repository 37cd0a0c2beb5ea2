//! Schema linking: resolving `xs:import` / `xs:include` / `xs:redefine`

mod linker;
mod loader;

pub use linker::{link_schema, LinkOptions, Linker};
pub use loader::{read_schema_text, FsLoader, MemoryLoader, SchemaCache, SchemaLoader};
