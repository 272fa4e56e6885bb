//! Transcript normalization.
//!
//! Drops empty lines and media placeholders, removes duplicate
//! `(sender, message)` pairs (first occurrence wins), trims whitespace, and
//! derives each line's persona role from the first token of the sender.

use std::collections::{BTreeSet, HashSet};

use mimic_core::transcript::{CanonicalMessage, RawRecord, MEDIA_OMITTED};
use tracing::debug;

/// Normalize raw records into canonical messages, preserving input order.
///
/// Never fails; unusable records are dropped silently. The dedup key is the
/// trimmed pair, so no two outputs share a `(sender, message)` even when the
/// raw export differs only in surrounding whitespace.
pub fn normalize(records: &[RawRecord]) -> Vec<CanonicalMessage> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut out = Vec::new();
    let mut dropped = 0usize;

    for record in records {
        let sender = record.sender.trim();
        let message = record.message.trim();

        if message.is_empty() || message == MEDIA_OMITTED {
            dropped += 1;
            continue;
        }

        // A blank sender has no role token and can never be chosen as a persona.
        let Some(role) = sender.split_whitespace().next() else {
            dropped += 1;
            continue;
        };

        if !seen.insert((sender, message)) {
            dropped += 1;
            continue;
        }

        out.push(CanonicalMessage {
            sender: sender.to_string(),
            role: role.to_string(),
            message: message.to_string(),
        });
    }

    debug!(
        input = records.len(),
        kept = out.len(),
        dropped,
        "Normalized transcript"
    );

    out
}

/// The distinct persona roles present in `messages`, sorted.
pub fn roles_of(messages: &[CanonicalMessage]) -> BTreeSet<String> {
    messages.iter().map(|m| m.role.clone()).collect()
}
