//! Vector half of the chunk store: one LanceDB table of chunk embeddings,
//! searched by cosine distance.

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use writer::LanceVectorIndexer;

/// Table name used when none is configured.
pub const DEFAULT_TABLE: &str = "chunks";
