//! Key-value (properties) configuration grammar.
//!
//! ```text
//! root.level = INFO
//! root.sinks = file, out
//! logger.orders.db = WARN
//! sink.file.kind = rolling_file
//! sink.file.path = orders.log
//! sink.out.kind = console
//! ```
//!
//! `#` and `!` start comment lines, `=` or `:` separate key from value, and a
//! trailing backslash continues a value on the next line.

use std::collections::BTreeMap;

use crate::loader::document::{DocumentError, LoggingDocument, SinkSection};

/// Split properties text into ordered key/value pairs.
pub fn parse_pairs(text: &str) -> Result<Vec<(String, String)>, DocumentError> {
    let mut pairs = Vec::new();
    let mut pending: Option<String> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = match pending.take() {
            Some(mut head) => {
                head.push_str(raw.trim_start());
                head
            }
            None => {
                let trimmed = raw.trim_start();
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                trimmed.to_string()
            }
        };

        if let Some(head) = line.strip_suffix('\\') {
            pending = Some(head.to_string());
            continue;
        }

        let split = line.find(['=', ':']).ok_or_else(|| {
            DocumentError::Syntax(format!("line {}: expected 'key = value'", index + 1))
        })?;
        let key = line[..split].trim();
        if key.is_empty() {
            return Err(DocumentError::Syntax(format!("line {}: empty key", index + 1)));
        }
        pairs.push((key.to_string(), line[split + 1..].trim().to_string()));
    }

    if let Some(head) = pending {
        return Err(DocumentError::Syntax(format!("dangling line continuation after '{}'", head)));
    }
    Ok(pairs)
}

/// Parse a properties logging document.
pub fn parse(text: &str) -> Result<LoggingDocument, DocumentError> {
    let mut doc = LoggingDocument::default();
    let mut sink_fields: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

    for (key, value) in parse_pairs(text)? {
        if key == "root.level" {
            doc.root.level = Some(value);
        } else if key == "root.sinks" {
            doc.root.sinks = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        } else if let Some(logger) = key.strip_prefix("logger.") {
            doc.loggers.insert(logger.to_string(), value);
        } else if let Some((name, field)) = key.strip_prefix("sink.").and_then(|rest| rest.rsplit_once('.')) {
            sink_fields
                .entry(name.to_string())
                .or_default()
                .insert(field.to_string(), value);
        } else {
            return Err(DocumentError::Invalid(format!("unknown key '{}'", key)));
        }
    }

    for (name, fields) in sink_fields {
        doc.sinks.insert(name.clone(), SinkSection::from_fields(&name, fields)?);
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs("# comment\n! also comment\n\na = 1\nb: two words \nc=x\\\n  y\n").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two words".to_string()),
                ("c".to_string(), "xy".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_separator() {
        assert!(matches!(parse_pairs("just words\n"), Err(DocumentError::Syntax(_))));
    }

    #[test]
    fn test_parse_document() {
        let doc = parse(
            "root.level = WARN\n\
             root.sinks = file, out\n\
             logger.orders.db = DEBUG\n\
             sink.file.kind = rolling_file\n\
             sink.file.path = orders.log\n\
             sink.file.max_file_size = 1_000\n\
             sink.file.max_backups = 4\n\
             sink.out.kind = console\n\
             sink.out.target = stderr\n",
        )
        .unwrap();

        assert_eq!(doc.root.level.as_deref(), Some("WARN"));
        assert_eq!(doc.root.sinks, vec!["file", "out"]);
        assert_eq!(doc.loggers.get("orders.db").map(String::as_str), Some("DEBUG"));
        assert_eq!(
            doc.sinks.get("file"),
            Some(&SinkSection::RollingFile {
                path: "orders.log".into(),
                max_file_size: Some(1000),
                max_backups: Some(4),
            })
        );
        assert_eq!(doc.sinks.get("out"), Some(&SinkSection::Console { target: Some("stderr".into()) }));
    }

    #[test]
    fn test_rejects_unknown_keys_and_fields() {
        assert!(parse("appender.x = 1\n").is_err());
        assert!(parse("sink.f.kind = console\nsink.f.colour = red\n").is_err());
        assert!(parse("sink.f.kind = rolling_file\n").is_err());
        assert!(parse("sink.f.kind = rolling_file\nsink.f.path = a\nsink.f.max_backups = many\n").is_err());
    }
}
