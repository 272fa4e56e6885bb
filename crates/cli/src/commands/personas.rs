//! `mimic personas` — List who can be emulated from a transcript.

use std::path::Path;

pub async fn run(transcript: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(transcript)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", transcript.display()))?;

    let records = mimic_transcript::parse_transcript(&bytes)?;
    let messages = mimic_transcript::normalize(&records);
    if messages.is_empty() {
        println!("❌ No usable lines found in chat.");
        return Ok(());
    }

    let roles = mimic_transcript::roles_of(&messages);
    println!(
        "{} usable messages, {} personas:",
        messages.len(),
        roles.len()
    );
    for role in &roles {
        let lines = messages.iter().filter(|m| &m.role == role).count();
        println!("  {role:<20} {lines} lines");
    }

    Ok(())
}
