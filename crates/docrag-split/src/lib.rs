//! Markdown segmenter and chunk splitter.
//!
//! `raw Markdown -> normalize -> segment -> refine -> find_best_split -> render`.
//! Every stage is a plain function over in-memory strings; [`Splitter`] wires
//! them together for one document.

pub mod chunk;
pub mod cut;
pub mod dp;
pub mod normalize;
pub mod segment;
pub mod splitter;
pub mod tree;

pub use dp::{find_best_split, ScoreWeights};
pub use normalize::{normalize, strip_data_uri_images};
pub use segment::Segment;
pub use splitter::Splitter;
