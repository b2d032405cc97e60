//! Reading and writing load-path documents as JSON files.

use std::path::Path;

use chrono::NaiveDateTime;

use crate::document::{GraphDocument, RawDocument};
use crate::errors::PersistenceError;

/// Prefix of every exported snapshot.
pub const EXPORT_PREFIX: &str = "load_path_data_";

/// File name for a snapshot taken at `timestamp`: `load_path_data_YYYYMMDD_HHMMSS.json`.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use loadpath::export_file_name;
///
/// let taken = NaiveDate::from_ymd_opt(2025, 3, 21)
///     .and_then(|day| day.and_hms_opt(0, 0, 33))
///     .expect("valid timestamp");
/// assert_eq!(export_file_name(taken), "load_path_data_20250321_000033.json");
/// ```
#[must_use]
pub fn export_file_name(timestamp: NaiveDateTime) -> String {
    format!("{EXPORT_PREFIX}{}.json", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Serialize a document with two-space indentation and numeric arrays on one line.
///
/// # Errors
///
/// Returns [`PersistenceError::Malformed`] if serialization fails.
pub fn to_json(document: &GraphDocument) -> Result<String, PersistenceError> {
    let pretty = serde_json::to_string_pretty(document)?;
    Ok(compact_numeric_arrays(&pretty))
}

/// Collapse every array that holds only numbers onto a single line.
///
/// `[\n  0.0,\n  1.5\n]` becomes `[0.0, 1.5]`. Arrays holding strings, objects or
/// nested arrays are left as they are.
fn compact_numeric_arrays(pretty: &str) -> String {
    let mut out = String::with_capacity(pretty.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut index = 0;
    while let Some(c) = pretty[index..].chars().next() {
        index += c.len_utf8();
        out.push(c);
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => {
                let rest = &pretty[index..];
                let Some(close) = rest.find(']') else {
                    continue;
                };
                let body = &rest[..close];
                if is_numeric_list(body) {
                    let items: Vec<&str> = body.split(',').map(str::trim).collect();
                    out.push_str(&items.join(", "));
                    out.push(']');
                    index += close + 1;
                }
            }
            _ => {}
        }
    }
    out
}

/// Whether the text between two brackets is a non-empty list of JSON numbers.
fn is_numeric_list(body: &str) -> bool {
    !body.trim().is_empty()
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || ".,-+eE".contains(c))
}

/// Parse JSON text into a raw document.
///
/// # Errors
///
/// Returns [`PersistenceError::Malformed`] when the text is not JSON or lacks the
/// `nodes`/`edges` keys or required edge endpoints.
pub fn parse_raw_document(text: &str) -> Result<RawDocument, PersistenceError> {
    Ok(serde_json::from_str(text)?)
}

/// Read a raw document from a file whose name mentions `json`.
///
/// # Errors
///
/// Returns [`PersistenceError::NotJson`] for other file names,
/// [`PersistenceError::Io`] when the file cannot be read and
/// [`PersistenceError::Malformed`] when it cannot be parsed.
pub fn read_raw_document(path: &Path) -> Result<RawDocument, PersistenceError> {
    let is_json = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.to_ascii_lowercase().contains("json"));
    if !is_json {
        return Err(PersistenceError::NotJson(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_raw_document(&text)
}

/// Write a document to `path` in the export format.
///
/// # Errors
///
/// Returns [`PersistenceError::Io`] when the file cannot be written.
pub fn write_document(document: &GraphDocument, path: &Path) -> Result<(), PersistenceError> {
    let json = to_json(document)?;
    std::fs::write(path, json + "\n").map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::document::{Edge, Node, NodeData};
    use crate::geometry::{position, vec3};

    fn sample_document() -> GraphDocument {
        let mut data = NodeData::new("Arm", "#2ECC40");
        data.cog = vec3(0.5, -1.0, 2.0);
        GraphDocument {
            nodes: vec![
                Node {
                    data,
                    position: position(150.0, 200.0),
                },
                Node {
                    data: NodeData::new("Base", "#0074D9"),
                    position: position(300.0, 400.0),
                },
            ],
            edges: vec![Edge::new("e0", "Arm", "Base")],
        }
    }

    #[test]
    fn export_name_uses_compact_timestamp() {
        let timestamp = NaiveDate::from_ymd_opt(2024, 12, 1)
            .and_then(|day| day.and_hms_opt(13, 5, 9))
            .expect("valid timestamp");
        assert_eq!(
            export_file_name(timestamp),
            "load_path_data_20241201_130509.json"
        );
    }

    #[test]
    fn numeric_arrays_are_compacted() {
        let json = to_json(&sample_document()).expect("serializes");
        assert!(json.contains("\"cog\": [0.5, -1.0, 2.0]"));
        assert!(json.contains("\"moment\": [0.0, 0.0, 0.0]"));
        assert!(json.contains("\"rotation_order\": \"xyz\""));
        // Non-numeric arrays keep one element per line.
        assert!(json.contains("\"nodes\": [\n"));
    }

    #[test]
    fn compaction_leaves_empty_and_string_arrays_alone() {
        let pretty = "{\n  \"a\": [],\n  \"b\": [\n    \"x\"\n  ],\n  \"c\": [\n    1,\n    2e-3\n  ]\n}";
        let compacted = compact_numeric_arrays(pretty);
        assert_eq!(
            compacted,
            "{\n  \"a\": [],\n  \"b\": [\n    \"x\"\n  ],\n  \"c\": [1, 2e-3]\n}"
        );
    }

    #[test]
    fn brackets_inside_names_are_not_touched() {
        let mut document = sample_document();
        document.nodes[0].data.name = "Arm[1,2]".into();
        document.nodes[0].data.id = "Arm[1,2]".into();
        let json = to_json(&document).expect("serializes");
        assert!(json.contains("\"name\": \"Arm[1,2]\""));
    }

    #[test]
    fn exported_text_parses_back() {
        let json = to_json(&sample_document()).expect("serializes");
        let (document, warnings) = parse_raw_document(&json)
            .expect("parses")
            .sanitize()
            .expect("sanitizes");
        assert!(warnings.is_empty());
        assert_eq!(document, sample_document());
    }

    #[test]
    fn missing_top_level_keys_are_malformed() {
        let error = parse_raw_document(r#"{"nodes": []}"#).expect_err("edges key required");
        assert!(matches!(error, PersistenceError::Malformed(_)));
        let error = parse_raw_document("not json").expect_err("garbage rejected");
        assert!(matches!(error, PersistenceError::Malformed(_)));
    }

    #[test]
    fn non_json_file_names_are_rejected() {
        let error = read_raw_document(Path::new("graph.txt")).expect_err("wrong type");
        assert!(matches!(error, PersistenceError::NotJson(_)));
    }
}
