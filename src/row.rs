//! Wire shape of a note and the conversions to and from [`Note`].
//!
//! The spreadsheet stores every field as text: tags as one comma-joined cell
//! and the pin flag as `"true"`/`"false"`. Cells read back through the script
//! may come out as native JSON types, so decoding accepts any scalar.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::note::Note;
use crate::tags::{join_tags, split_tags};

pub const COLUMN_COUNT: usize = 8;

pub const HEADER: [&str; COLUMN_COUNT] = [
    "ID", "Title", "Content", "Category", "Tags", "Created", "Updated", "Pinned",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRow {
    #[serde(default, deserialize_with = "cell")]
    pub id: String,
    #[serde(default, deserialize_with = "cell")]
    pub title: String,
    #[serde(default, deserialize_with = "cell")]
    pub content: String,
    #[serde(default, deserialize_with = "cell")]
    pub category: String,
    #[serde(default, deserialize_with = "cell")]
    pub tags: String,
    #[serde(default, deserialize_with = "cell")]
    pub created_at: String,
    #[serde(default, deserialize_with = "cell")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "cell")]
    pub is_pinned: String,
}

fn cell<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    })
}

impl RemoteRow {
    /// Positional sheet layout: id, title, content, category, tags,
    /// createdAt, updatedAt, isPinned.
    pub fn to_cells(&self) -> [String; COLUMN_COUNT] {
        [
            self.id.clone(),
            self.title.clone(),
            self.content.clone(),
            self.category.clone(),
            self.tags.clone(),
            self.created_at.clone(),
            self.updated_at.clone(),
            self.is_pinned.clone(),
        ]
    }

    pub fn from_cells(cells: [String; COLUMN_COUNT]) -> Self {
        let [id, title, content, category, tags, created_at, updated_at, is_pinned] =
            cells;
        Self { id, title, content, category, tags, created_at, updated_at, is_pinned }
    }

    /// Decode into a [`Note`]. Rows with an empty id are not notes.
    ///
    /// Empty category falls back to `defaults.category`; empty timestamps fall
    /// back to `defaults.timestamp` and are logged as repaired.
    pub fn into_note(self, defaults: &DecodeDefaults) -> Option<Note> {
        if self.id.trim().is_empty() {
            return None;
        }
        let id = self.id;
        let category = if self.category.trim().is_empty() {
            defaults.category.clone()
        } else {
            self.category
        };
        let created_at = or_fallback(self.created_at, &id, "createdAt", defaults);
        let updated_at = or_fallback(self.updated_at, &id, "updatedAt", defaults);
        Some(Note {
            tags: split_tags(&self.tags),
            is_pinned: self.is_pinned == "true",
            id,
            title: self.title,
            content: self.content,
            category,
            created_at,
            updated_at,
        })
    }
}

fn or_fallback(
    value: String,
    id: &str,
    field: &str,
    defaults: &DecodeDefaults,
) -> String {
    if value.trim().is_empty() {
        warn!(note_id = %id, field, "missing timestamp, using current time");
        defaults.timestamp.clone()
    } else {
        value
    }
}

impl From<&Note> for RemoteRow {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            category: note.category.clone(),
            tags: join_tags(&note.tags),
            created_at: note.created_at.clone(),
            updated_at: note.updated_at.clone(),
            is_pinned: note.is_pinned.to_string(),
        }
    }
}

/// Values substituted for absent cells while decoding.
#[derive(Debug, Clone)]
pub struct DecodeDefaults {
    pub category: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> DecodeDefaults {
        DecodeDefaults {
            category: "General".to_string(),
            timestamp: "2030-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn cells(values: [&str; COLUMN_COUNT]) -> [String; COLUMN_COUNT] {
        values.map(str::to_string)
    }

    #[test]
    fn test_encode_new_note_cells() {
        let note = Note {
            id: "ts".into(),
            title: "A".into(),
            content: "B".into(),
            category: "General".into(),
            tags: vec![],
            created_at: "ts".into(),
            updated_at: "ts".into(),
            is_pinned: false,
        };
        let row = RemoteRow::from(&note);
        assert_eq!(
            row.to_cells(),
            cells(["ts", "A", "B", "General", "", "ts", "ts", "false"])
        );
    }

    #[test]
    fn test_decode_applies_default_category() {
        let row = RemoteRow::from_cells(cells([
            "n1",
            "T",
            "C",
            "",
            "tag1, tag2",
            "2024-01-01T00:00:00Z",
            "2024-01-01T00:00:00Z",
            "true",
        ]));
        let note = row.into_note(&defaults()).unwrap();
        assert_eq!(note.category, "General");
        assert_eq!(note.tags, vec!["tag1", "tag2"]);
        assert!(note.is_pinned);
        assert_eq!(note.created_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_decode_pin_only_exact_true() {
        for raw in ["TRUE", "True", "1", "yes", "", "false"] {
            let row = RemoteRow { id: "x".into(), is_pinned: raw.into(), ..Default::default() };
            assert!(!row.into_note(&defaults()).unwrap().is_pinned, "{raw}");
        }
    }

    #[test]
    fn test_decode_empty_id_is_absent() {
        let row = RemoteRow { id: "  ".into(), title: "orphan".into(), ..Default::default() };
        assert!(row.into_note(&defaults()).is_none());
    }

    #[test]
    fn test_decode_missing_timestamps_use_fallback() {
        let row = RemoteRow { id: "x".into(), ..Default::default() };
        let note = row.into_note(&defaults()).unwrap();
        assert_eq!(note.created_at, "2030-01-01T00:00:00.000Z");
        assert_eq!(note.updated_at, "2030-01-01T00:00:00.000Z");
        assert!(note.tags.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let note = Note {
            id: "abc".into(),
            title: "Groceries".into(),
            content: "milk\neggs".into(),
            category: "Personal".into(),
            tags: vec!["home".into(), " weekly ".into(), "".into()],
            created_at: "2024-03-01T10:00:00.000Z".into(),
            updated_at: "2024-03-02T10:00:00.000Z".into(),
            is_pinned: true,
        };
        let back = RemoteRow::from(&note).into_note(&defaults()).unwrap();
        assert_eq!(back.title, note.title);
        assert_eq!(back.content, note.content);
        assert_eq!(back.category, note.category);
        assert_eq!(back.is_pinned, note.is_pinned);
        assert_eq!(back.tags, vec!["home", "weekly"]);
    }

    #[test]
    fn test_deserialize_lenient_cells() {
        let json = r#"{"id": 1700000000000, "title": "T", "content": "C",
            "isPinned": true, "tags": null}"#;
        let row: RemoteRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.id, "1700000000000");
        assert_eq!(row.is_pinned, "true");
        assert_eq!(row.tags, "");
        assert_eq!(row.category, "");
    }

    #[test]
    fn test_serialize_camel_case() {
        let row = RemoteRow { id: "1".into(), is_pinned: "false".into(), ..Default::default() };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["isPinned"], "false");
        assert_eq!(value["createdAt"], "");
    }
}
