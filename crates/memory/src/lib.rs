//! Semantic index for Mimic.
//!
//! Embeds canonical transcript lines and answers nearest-neighbour queries
//! over them. The index lives only as long as the session that owns it.

pub mod index;
pub mod vector;

pub use index::{IndexedDocument, SemanticIndex};
pub use vector::{cosine_similarity, top_k_by_similarity};
