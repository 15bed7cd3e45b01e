//! Flattening and unflattening of job item data
//!
//! Job item data is a nested JSON tree. A leaf is either a plain string or an
//! object carrying a `#text` property, optionally with `#translate`,
//! `#escape` and other `#`-prefixed metadata:
//!
//! ```ignore
//! {
//!     "title": { "#text": "Hello", "#label": "Title" },
//!     "body": { "0": { "value": { "#text": "World", "#translate": true } } }
//! }
//! ```
//!
//! Flattening walks the tree in insertion order and produces one entry per
//! translatable leaf, keyed by the path segments joined with `][`
//! (`body][0][value`). Unflattening rebuilds the nested shape from such keys.

use crate::error::{ConnectorError, ConnectorResult};
use crate::escape::EscapeSpan;
use serde_json::{Map, Value, json};

/// Delimiter between path segments of a flattened key
pub const ARRAY_DELIMITER: &str = "][";

/// One translatable leaf of a job item's data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLeaf {
    pub key: String,
    pub text: String,
    /// Spans of `text` that must not be translated
    pub escape: Vec<EscapeSpan>,
}

/// Ordered sequence of translatable leaves
///
/// Order is the traversal order of the source tree and must be kept
/// end-to-end so that translations can be matched back by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedText {
    leaves: Vec<TextLeaf>,
}

impl FlattenedText {
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaves(&self) -> &[TextLeaf] {
        &self.leaves
    }

    pub fn keys(&self) -> Vec<String> {
        self.leaves.iter().map(|leaf| leaf.key.clone()).collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.leaves.iter().map(|leaf| leaf.text.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.leaves
            .iter()
            .map(|leaf| (leaf.key.as_str(), leaf.text.as_str()))
    }
}

/// Split a flattened key into its path segments
pub fn split_key(key: &str) -> Vec<&str> {
    key.split(ARRAY_DELIMITER).collect()
}

/// Flatten nested data into its translatable leaves, in traversal order
pub fn flatten(data: &Value) -> FlattenedText {
    let mut leaves = Vec::new();
    collect_leaves(data, &mut Vec::new(), &mut leaves);
    FlattenedText { leaves }
}

fn collect_leaves(node: &Value, path: &mut Vec<String>, out: &mut Vec<TextLeaf>) {
    match node {
        Value::String(text) => {
            if !path.is_empty() && !text.trim().is_empty() {
                out.push(TextLeaf {
                    key: path.join(ARRAY_DELIMITER),
                    text: text.clone(),
                    escape: Vec::new(),
                });
            }
        }
        Value::Object(map) if map.contains_key("#text") => {
            if let Some(text) = translatable_text(map) {
                out.push(TextLeaf {
                    key: path.join(ARRAY_DELIMITER),
                    text: text.to_string(),
                    escape: EscapeSpan::from_property(map.get("#escape")),
                });
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                if key.starts_with('#') {
                    continue;
                }
                path.push(key.clone());
                collect_leaves(child, path, out);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(index.to_string());
                collect_leaves(child, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

fn translatable_text(leaf: &Map<String, Value>) -> Option<&str> {
    if leaf.get("#translate") == Some(&Value::Bool(false)) {
        return None;
    }
    leaf.get("#text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

/// Rebuild nested data from a key sequence and a positionally aligned
/// sequence of translated texts
///
/// Every key produces a `{"#text": ...}` leaf. The two sequences must have
/// the same length: a short (or long) text sequence means the remote service
/// answered with a malformed result.
///
/// Only the key paths are known here, so `flatten` followed by `unflatten`
/// reproduces trees of `{"#text"}` leaves exactly. Arrays come back as
/// objects keyed by index (`{"tags": {"0": ...}}`) and plain string leaves
/// come back as `{"#text"}` objects. [`node`] resolves the same key in both
/// shapes, which is what committing a translation relies on.
pub fn unflatten(keys: &[String], texts: &[String]) -> ConnectorResult<Value> {
    if keys.len() != texts.len() {
        return Err(ConnectorError::MalformedResponse(format!(
            "expected {} translated texts, received {}",
            keys.len(),
            texts.len()
        )));
    }

    unflatten_map(
        keys.iter()
            .zip(texts)
            .map(|(key, text)| (key.as_str(), json!({ "#text": text }))),
    )
}

/// Rebuild nested data from flattened `(key, leaf)` pairs
///
/// Plain string leaves are normalized to `{"#text": ...}`.
pub fn unflatten_map<'a, I>(pairs: I) -> ConnectorResult<Value>
where
    I: IntoIterator<Item = (&'a str, Value)>,
{
    let mut root = Map::new();

    for (key, leaf) in pairs {
        let leaf = match leaf {
            Value::String(text) => json!({ "#text": text }),
            other => other,
        };
        insert_path(&mut root, &split_key(key), leaf, key)?;
    }

    Ok(Value::Object(root))
}

fn insert_path(
    node: &mut Map<String, Value>,
    segments: &[&str],
    leaf: Value,
    full_key: &str,
) -> ConnectorResult<()> {
    let Some((head, rest)) = segments.split_first() else {
        return Err(ConnectorError::Apply(format!("empty data key '{}'", full_key)));
    };

    if rest.is_empty() {
        if node.contains_key(*head) {
            return Err(ConnectorError::Apply(format!(
                "data key '{}' appears more than once",
                full_key
            )));
        }
        node.insert(head.to_string(), leaf);
        return Ok(());
    }

    let child = node
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match child {
        Value::Object(map) if !map.contains_key("#text") => insert_path(map, rest, leaf, full_key),
        _ => Err(ConnectorError::Apply(format!(
            "data key '{}' descends into a text leaf",
            full_key
        ))),
    }
}

/// Find the node addressed by a flattened key
pub fn node<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    split_key(key)
        .into_iter()
        .try_fold(data, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        })
}

/// Mutable variant of [`node`]
pub fn node_mut<'a>(data: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    split_key(key)
        .into_iter()
        .try_fold(data, |node, segment| match node {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(move |index| items.get_mut(index)),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_plain_fields_in_insertion_order() {
        let data = json!({ "title": "Hello", "body": "World" });
        let flat = flatten(&data);
        assert_eq!(flat.keys(), vec!["title", "body"]);
        assert_eq!(flat.texts(), vec!["Hello", "World"]);
    }

    #[test]
    fn test_flatten_nested_text_leaves() {
        let data = json!({
            "title": { "#label": "Title", "0": { "value": { "#text": "Hello", "#translate": true } } },
            "body": { "0": { "value": { "#text": "<p>World</p>" }, "format": { "#text": "full_html", "#translate": false } } }
        });
        let flat = flatten(&data);
        assert_eq!(flat.keys(), vec!["title][0][value", "body][0][value"]);
        assert_eq!(flat.texts(), vec!["Hello", "<p>World</p>"]);
    }

    #[test]
    fn test_flatten_skips_empty_and_properties() {
        let data = json!({
            "#label": "Node",
            "empty": { "#text": "   " },
            "blank": "",
            "number": 42,
            "kept": { "#text": "x" }
        });
        let flat = flatten(&data);
        assert_eq!(flat.keys(), vec!["kept"]);
    }

    #[test]
    fn test_flatten_arrays_use_indices() {
        let data = json!({ "tags": ["one", "two"] });
        let flat = flatten(&data);
        assert_eq!(flat.keys(), vec!["tags][0", "tags][1"]);
    }

    #[test]
    fn test_flatten_reads_escape_spans() {
        let data = json!({ "title": { "#text": "Use [token] here", "#escape": { "4": { "string": "[token]" } } } });
        let flat = flatten(&data);
        assert_eq!(flat.leaves()[0].escape, vec![EscapeSpan::new(4, "[token]")]);
    }

    #[test]
    fn test_round_trip_with_identity_translation() {
        let data = json!({
            "title": { "#text": "Hello" },
            "body": { "0": { "value": { "#text": "World" }, "summary": { "#text": "Short" } } }
        });
        let flat = flatten(&data);
        let rebuilt = unflatten(&flat.keys(), &flat.texts()).unwrap();
        assert_eq!(rebuilt, data);
    }

    #[test]
    fn test_unflatten_rebuilds_arrays_as_indexed_objects() {
        let data = json!({ "tags": ["one", { "#text": "two" }] });
        let flat = flatten(&data);
        let rebuilt = unflatten(&flat.keys(), &flat.texts()).unwrap();

        assert_eq!(
            rebuilt,
            json!({ "tags": { "0": { "#text": "one" }, "1": { "#text": "two" } } })
        );
        for key in flat.keys() {
            assert!(node(&data, &key).is_some(), "{}", key);
            assert!(node(&rebuilt, &key).is_some(), "{}", key);
        }
    }

    #[test]
    fn test_unflatten_scenario() {
        let keys = vec!["title".to_string(), "body".to_string()];
        let texts = vec!["Bonjour".to_string(), "Monde".to_string()];
        let rebuilt = unflatten(&keys, &texts).unwrap();
        assert_eq!(
            rebuilt,
            json!({ "title": { "#text": "Bonjour" }, "body": { "#text": "Monde" } })
        );
    }

    #[test]
    fn test_unflatten_short_text_sequence_is_reported() {
        let keys = vec!["title".to_string(), "body".to_string()];
        let texts = vec!["Bonjour".to_string()];
        match unflatten(&keys, &texts) {
            Err(ConnectorError::MalformedResponse(msg)) => {
                assert!(msg.contains("expected 2"));
            }
            other => panic!("Expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_unflatten_map_normalizes_strings() {
        let rebuilt = unflatten_map(vec![
            ("5][title", json!("Titre")),
            ("5][body][0][value", json!({ "#text": "Corps" })),
        ])
        .unwrap();
        assert_eq!(
            rebuilt,
            json!({ "5": { "title": { "#text": "Titre" }, "body": { "0": { "value": { "#text": "Corps" } } } } })
        );
    }

    #[test]
    fn test_unflatten_map_rejects_duplicate_and_conflicting_keys() {
        let duplicate = unflatten_map(vec![("a", json!("x")), ("a", json!("y"))]);
        assert!(matches!(duplicate, Err(ConnectorError::Apply(_))));

        let conflicting = unflatten_map(vec![("a", json!("x")), ("a][b", json!("y"))]);
        assert!(matches!(conflicting, Err(ConnectorError::Apply(_))));
    }

    #[test]
    fn test_node_mut_walks_objects_and_arrays() {
        let mut data = json!({ "body": { "0": { "value": { "#text": "x" } } }, "tags": ["a", "b"] });
        assert!(node_mut(&mut data, "body][0][value").is_some());
        assert_eq!(node_mut(&mut data, "tags][1"), Some(&mut json!("b")));
        assert!(node_mut(&mut data, "body][1").is_none());
        assert!(node_mut(&mut data, "tags][x").is_none());
    }
}
