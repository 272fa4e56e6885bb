//! # Mimic Core
//!
//! Domain types, traits and errors shared by every Mimic crate.
//!
//! The hosted services (text generation, embeddings), the transcript index
//! and chat front ends are all traits here; the crates that implement them
//! depend inward on core, and tests swap in scripted doubles.

pub mod channel;
pub mod error;
pub mod index;
pub mod provider;
pub mod session;
pub mod transcript;

// Re-export key types at crate root for ergonomics
pub use channel::{Attachment, Channel, ChannelId, ChannelMessage};
pub use error::{Error, Result};
pub use index::{SearchHit, SemanticSearch};
pub use provider::{
    Embedder, EmbeddingPurpose, EmbeddingRequest, EmbeddingResponse, GenerationRequest,
    GenerationResponse, Provider, Usage,
};
pub use session::{InMemorySessionStore, Session, SessionHandle, SessionStore, UserId};
pub use transcript::{CanonicalMessage, RawRecord, MEDIA_OMITTED};
