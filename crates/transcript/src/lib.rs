//! Transcript ingestion for Mimic.
//!
//! Turns an uploaded chat export into canonical, deduplicated messages:
//!
//! - [`parse`] — strict JSON schema validation (flat or nested exports)
//! - [`flatten`] — `date → time → [records]` exports to flat records
//! - [`whatsapp`] — WhatsApp `.txt` exports to records
//! - [`normalize`] — deduplication, cleaning, persona extraction

pub mod flatten;
pub mod normalize;
pub mod parse;
pub mod whatsapp;

pub use flatten::flatten_nested;
pub use normalize::{normalize, roles_of};
pub use parse::{parse_records, parse_transcript};
pub use whatsapp::{group_by_date_time, parse_export};
