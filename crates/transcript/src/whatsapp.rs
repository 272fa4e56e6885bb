//! WhatsApp `.txt` export parsing.
//!
//! Recognises lines of the form `DD/MM/YYYY, HH:MM - Name: Message`.
//! System notices ("Messages are end-to-end encrypted") and continuation
//! lines of multi-line messages do not match and are skipped.

use std::sync::OnceLock;

use mimic_core::transcript::RawRecord;
use regex_lite::Regex;
use serde_json::{Map, Value};

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{2}/\d{2}/\d{4}), (\d{2}:\d{2}) - (.*?): (.*)$")
            .expect("WhatsApp line pattern is valid")
    })
}

/// Parse a WhatsApp text export into flat records, in file order.
///
/// Each record carries `date` and `time` as extra fields.
pub fn parse_export(text: &str) -> Vec<RawRecord> {
    text.lines()
        .filter_map(|line| {
            let caps = line_pattern().captures(line.trim())?;
            let mut record = RawRecord::new(&caps[3], &caps[4]);
            record.extra.insert("date".into(), Value::String(caps[1].to_string()));
            record.extra.insert("time".into(), Value::String(caps[2].to_string()));
            Some(record)
        })
        .collect()
}

/// Group records into the nested `{date: {time: [ {sender, message} ]}}`
/// form, preserving first-seen order of dates and times.
pub fn group_by_date_time(records: &[RawRecord]) -> Value {
    let mut dates: Map<String, Value> = Map::new();

    for record in records {
        let date = extra_str(record, "date");
        let time = extra_str(record, "time");

        let times = dates
            .entry(date)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(times) = times {
            let lines = times.entry(time).or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(lines) = lines {
                let mut line = Map::new();
                line.insert("sender".into(), Value::String(record.sender.clone()));
                line.insert("message".into(), Value::String(record.message.clone()));
                lines.push(Value::Object(line));
            }
        }
    }

    Value::Object(dates)
}

fn extra_str(record: &RawRecord, key: &str) -> String {
    record
        .extra
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten_nested;
    use crate::parse::parse_records;

    const EXPORT: &str = "\
12/03/2024, 09:15 - Messages and calls are end-to-end encrypted.
12/03/2024, 09:15 - Alice Smith: morning! ☀️
12/03/2024, 09:16 - Bob: hey, ready for 3pm?
and this continues the previous line
12/03/2024, 09:16 - Alice Smith: <Media omitted>
13/03/2024, 18:02 - Bob: time: 6pm works
";

    #[test]
    fn parses_matching_lines_only() {
        let records = parse_export(EXPORT);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].sender, "Alice Smith");
        assert_eq!(records[0].message, "morning! ☀️");
        assert_eq!(records[1].extra["time"], "09:16");
    }

    #[test]
    fn sender_stops_at_first_colon_space() {
        let records = parse_export(EXPORT);
        assert_eq!(records[3].sender, "Bob");
        assert_eq!(records[3].message, "time: 6pm works");
        assert_eq!(records[3].extra["date"], "13/03/2024");
    }

    #[test]
    fn grouping_round_trips_through_flatten() {
        let records = parse_export(EXPORT);
        let nested = group_by_date_time(&records);
        assert_eq!(nested["12/03/2024"]["09:16"].as_array().unwrap().len(), 2);

        let flat = parse_records(&flatten_nested(&nested).unwrap()).unwrap();
        let pairs: Vec<(&str, &str)> = flat
            .iter()
            .map(|r| (r.sender.as_str(), r.message.as_str()))
            .collect();
        let original: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.sender.as_str(), r.message.as_str()))
            .collect();
        assert_eq!(pairs, original);
    }

    #[test]
    fn empty_export_yields_nothing() {
        assert!(parse_export("").is_empty());
        assert!(parse_export("just some text\nno timestamps").is_empty());
    }
}
