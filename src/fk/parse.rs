//! Validation of raw foreign-key records.

use serde_json::Value;

use super::PgForeignKey;

/// Rows that passed validation plus the reasons others were dropped.
#[derive(Debug, Clone, Default)]
pub struct ParsedForeignKeys {
    pub rows: Vec<PgForeignKey>,
    pub dropped: Vec<String>,
}

/// Validate a batch of FK records.
///
/// Accepts a flat array or an object with a `results` array. A record
/// missing any required non-empty string field is dropped with a logged
/// reason; the rest of the batch is unaffected.
pub fn parse_foreign_keys(value: &Value) -> ParsedForeignKeys {
    let records = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => {
                log::warn!("FK payload is an object without a results array");
                return ParsedForeignKeys {
                    rows: Vec::new(),
                    dropped: vec!["payload has no results array".to_string()],
                };
            }
        },
        other => {
            log::warn!("FK payload is neither an array nor an object: {}", other);
            return ParsedForeignKeys {
                rows: Vec::new(),
                dropped: vec!["payload is not an array".to_string()],
            };
        }
    };

    let mut parsed = ParsedForeignKeys::default();
    for (index, record) in records.iter().enumerate() {
        match parse_record(record) {
            Ok(row) => parsed.rows.push(row),
            Err(reason) => {
                let reason = format!("record {}: {}", index, reason);
                log::warn!("Dropping FK {}", reason);
                parsed.dropped.push(reason);
            }
        }
    }

    log::debug!(
        "Parsed {} FK rows, dropped {}",
        parsed.rows.len(),
        parsed.dropped.len()
    );
    parsed
}

fn parse_record(record: &Value) -> std::result::Result<PgForeignKey, String> {
    let object = record
        .as_object()
        .ok_or_else(|| "not an object".to_string())?;

    let field = |name: &str| match object.get(name).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(_) => Err(format!("empty {}", name)),
        None => Err(format!("missing or non-string {}", name)),
    };

    Ok(PgForeignKey {
        source_table: field("source_table")?,
        source_column: field("source_column")?,
        target_table: field("target_table")?,
        target_column: field("target_column")?,
    })
}
