//! XSD markup reading and writing

mod reader;
mod writer;

pub use reader::{parse_schema, parse_schema_at, parse_schema_file};
pub use writer::{write_schema, WriteOptions};
