//! `content.json` decoding.
//!
//! The document root is either an array of sheets or an object with a
//! `sheets` array. Parsing goes through [`serde_json::Value`] rather than typed
//! structs so that missing or oddly-typed optional fields are skipped instead
//! of failing the whole document.

use serde_json::{Map, Value};

use super::{GenericNode, GenericSheet, clean_text};
use crate::archive::JSON_CONTENT;
use crate::error::{Error, Result};

/// Fields interpreted by [`parse_topic`]; everything else scalar is passed
/// through as an attribute.
const TOPIC_FIELDS: &[&str] = &[
    "title", "children", "topics", "markers", "labels", "label", "notes", "note", "href", "link",
];

pub(super) fn parse(text: &str) -> Result<Vec<GenericSheet>> {
    let root: Value = serde_json::from_str(text).map_err(|e| Error::MalformedContent {
        member: JSON_CONTENT.to_string(),
        message: without_position(&e),
        line: u32::try_from(e.line()).ok(),
        column: u32::try_from(e.column()).ok(),
    })?;

    let sheets = match &root {
        Value::Array(sheets) => sheets,
        Value::Object(map) => match map.get("sheets") {
            Some(Value::Array(sheets)) => sheets,
            Some(_) => return Err(Error::malformed(JSON_CONTENT, "`sheets` is not an array")),
            None => return Err(Error::malformed(JSON_CONTENT, "object root has no `sheets` field")),
        },
        _ => {
            return Err(Error::malformed(
                JSON_CONTENT,
                "root must be an array of sheets or an object with a `sheets` array",
            ));
        }
    };

    sheets
        .iter()
        .enumerate()
        .map(|(index, sheet)| parse_sheet(index, sheet))
        .collect()
}

fn parse_sheet(index: usize, sheet: &Value) -> Result<GenericSheet> {
    let Value::Object(sheet) = sheet else {
        return Err(Error::malformed(
            JSON_CONTENT,
            format!("sheet {index} is not an object"),
        ));
    };

    let root = sheet
        .get("rootTopic")
        .or_else(|| sheet.get("topic"))
        .and_then(Value::as_object)
        .filter(|topic| !topic.is_empty())
        .map(|topic| parse_topic(topic, 0));

    Ok(GenericSheet {
        title: scalar_field(sheet, "title").unwrap_or_default(),
        root,
    })
}

fn parse_topic(topic: &Map<String, Value>, ordinal: usize) -> GenericNode {
    // Legacy `topics` first, then `children.attached`. Detached (floating)
    // topics are not part of the outline.
    let legacy = topic.get("topics").and_then(Value::as_array);
    let attached = topic
        .get("children")
        .and_then(|c| c.get("attached"))
        .and_then(Value::as_array);
    let children = legacy
        .into_iter()
        .chain(attached)
        .flatten()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(i, child)| parse_topic(child, i))
        .collect();

    let attributes = topic
        .iter()
        .filter(|(key, _)| !TOPIC_FIELDS.contains(&key.as_str()))
        .filter_map(|(key, value)| Some((key.clone(), scalar(value)?)))
        .collect();

    GenericNode {
        title: scalar_field(topic, "title").unwrap_or_default(),
        ordinal,
        children,
        markers: markers(topic),
        labels: labels(topic),
        note: note(topic),
        link: scalar_field(topic, "href").or_else(|| scalar_field(topic, "link")),
        attributes,
    }
}

fn markers(topic: &Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(raw)) = topic.get("markers") else {
        return Vec::new();
    };
    raw.iter()
        .filter_map(|marker| match marker {
            Value::String(id) => Some(clean_text(id)),
            Value::Object(m) => scalar_field(m, "markerId").or_else(|| scalar_field(m, "id")),
            _ => None,
        })
        .filter(|id| !id.is_empty())
        .collect()
}

fn labels(topic: &Map<String, Value>) -> Vec<String> {
    let mut labels: Vec<String> = match topic.get("labels") {
        Some(Value::Array(raw)) => raw.iter().filter_map(scalar).collect(),
        _ => Vec::new(),
    };
    if let Some(joined) = scalar_field(topic, "label") {
        labels.extend(joined.split(',').map(str::to_string));
    }
    labels
        .into_iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .collect()
}

fn note(topic: &Map<String, Value>) -> Option<String> {
    topic
        .get("notes")
        .and_then(|notes| notes.get("plain"))
        .and_then(|plain| plain.get("content"))
        .and_then(scalar)
        .or_else(|| scalar_field(topic, "note"))
        .filter(|note| !note.is_empty())
}

fn scalar_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(scalar)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(clean_text(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// serde_json appends "at line L column C" to its messages; the position is
/// carried separately.
fn without_position(err: &serde_json::Error) -> String {
    let message = err.to_string();
    match message.rfind(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message,
    }
}
