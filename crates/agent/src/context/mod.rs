//! Context assembly for one reply.
//!
//! Two sources feed the prompt's context block, in this order:
//!
//! | Source | Origin | Trim Strategy |
//! |--------|--------|---------------|
//! | 1. Retrieved lines | Semantic index over the transcript | Dropped first (oldest in the block) |
//! | 2. Recent history | Last turns of this conversation | Kept newest-first |
//!
//! The token budget is enforced over both together, newest line first.

pub mod assembler;
pub mod history;
pub mod token;

pub use assembler::{
    AssembledContext, AssemblyConfig, AssemblyMetadata, ContextAssembler, TrimmedLines,
    trim_to_budget,
};
pub use history::HistoryFormatter;
pub use token::{HeuristicTokenizer, Tokenizer, estimate_tokens};
#[cfg(feature = "hf-tokenizer")]
pub use token::HfTokenizer;
