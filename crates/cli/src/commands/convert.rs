//! `mimic convert` — WhatsApp text export to transcript JSON.

use std::path::Path;

use mimic_core::transcript::RawRecord;

pub async fn run(
    input: &Path,
    output: Option<&Path>,
    nested: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", input.display()))?;

    let records = mimic_transcript::parse_export(&text);
    if records.is_empty() {
        return Err(format!("No WhatsApp message lines found in {}", input.display()).into());
    }

    let json = render(&records, nested)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            eprintln!("✅ Wrote {} messages to {}", records.len(), path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn render(records: &[RawRecord], nested: bool) -> Result<String, serde_json::Error> {
    let value = if nested {
        mimic_transcript::group_by_date_time(records)
    } else {
        serde_json::to_value(records)?
    };
    serde_json::to_string_pretty(&value)
}
