//! Generation and embedding backends for Mimic.
//!
//! Hosted backends implement both `mimic_core::Provider` and
//! `mimic_core::Embedder`. The router selects one from configuration and
//! [`RetryPolicy`] bounds how often a failing call is repeated.

pub mod cohere;
pub mod openai_compat;
pub mod retry;
pub mod router;

#[cfg(test)]
mod test_server;

pub use cohere::CohereProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::{Backoff, RetryPolicy};
pub use router::ProviderRouter;
