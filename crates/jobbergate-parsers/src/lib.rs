//! Shared parsing utilities for scheduler command output.
//!
//! Used by jobbergate-slurm to turn `sbatch`, `scontrol` and `sacct`
//! output into structured values.

pub mod command;
pub mod time;

use std::collections::BTreeMap;

pub use command::{CommandError, run_command};
pub use time::{parse_duration, parse_exit_code, parse_exit_signal, parse_slurm_timestamp};

/// Filter helper for optional string fields.
/// Returns None if the string is empty or a placeholder value.
pub fn non_empty_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty()
        || trimmed == "-"
        || trimmed == "N/A"
        || trimmed == "Unknown"
        || trimmed == "None"
        || trimmed == "(null)"
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split a pipe-delimited line and validate field count.
pub fn split_delimited(line: &str, min_fields: usize) -> Result<Vec<&str>, String> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < min_fields {
        return Err(format!(
            "Expected {} fields, got {}: {}",
            min_fields,
            fields.len(),
            line
        ));
    }
    Ok(fields)
}

/// Parse whitespace separated `Key=Value` tokens.
///
/// Tokens without an `=` are appended to the previous value, so
/// `JobName=my job Partition=debug` yields `JobName -> "my job"`.
/// Only the first `=` of a token splits key from value.
pub fn parse_key_values(s: &str) -> BTreeMap<String, String> {
    let mut pairs = BTreeMap::new();
    let mut last_key: Option<String> = None;

    for token in s.split_whitespace() {
        match token.split_once('=') {
            Some((key, value)) if !key.is_empty() && !key.contains('/') => {
                pairs.insert(key.to_string(), value.to_string());
                last_key = Some(key.to_string());
            }
            _ => {
                if let Some(value) = last_key.as_ref().and_then(|k| pairs.get_mut(k)) {
                    value.push(' ');
                    value.push_str(token);
                }
            }
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_string() {
        assert_eq!(non_empty_string("hello"), Some("hello".to_string()));
        assert_eq!(non_empty_string("  hello  "), Some("hello".to_string()));
        assert_eq!(non_empty_string(""), None);
        assert_eq!(non_empty_string("-"), None);
        assert_eq!(non_empty_string("N/A"), None);
        assert_eq!(non_empty_string("(null)"), None);
    }

    #[test]
    fn test_split_delimited() {
        let line = "a|b|c|d";
        assert_eq!(split_delimited(line, 4).unwrap(), vec!["a", "b", "c", "d"]);
        assert!(split_delimited(line, 5).is_err());
    }

    #[test]
    fn test_parse_key_values() {
        let pairs = parse_key_values("JobId=42 JobName=my job JobState=RUNNING Reason=None");
        assert_eq!(pairs.get("JobId").map(String::as_str), Some("42"));
        assert_eq!(pairs.get("JobName").map(String::as_str), Some("my job"));
        assert_eq!(pairs.get("JobState").map(String::as_str), Some("RUNNING"));
        assert_eq!(pairs.get("Reason").map(String::as_str), Some("None"));
    }

    #[test]
    fn test_parse_key_values_keeps_equals_in_value() {
        let pairs = parse_key_values("Comment=a=b WorkDir=/tmp/x");
        assert_eq!(pairs.get("Comment").map(String::as_str), Some("a=b"));
        assert_eq!(pairs.get("WorkDir").map(String::as_str), Some("/tmp/x"));
    }
}
