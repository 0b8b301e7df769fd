//! docrag-text
//!
//! Tantivy keyword index for document chunks. Chinese text is indexed as
//! overlapping character bigrams, ASCII text as lowercased words.
pub mod tantivy_utils;
pub mod index;

pub use index::TantivyIndexer;
