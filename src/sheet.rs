//! In-process stand-in for the Apps Script backend.
//!
//! Mirrors what the deployed script does to its sheet: row 1 is the header,
//! lookups are linear scans comparing the id cell, and each action answers
//! with the same JSON envelope the real endpoint sends. It sits behind
//! [`Transport`] so the gateway and store run against it unchanged.
//!
//! This is a test double: the binaries never construct it. It is public so
//! integration tests can drive the store without a network.

use std::cell::{Cell, RefCell};

use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::gateway::{HttpReply, Request, Transport};
use crate::note::{DEFAULT_CATEGORY, timestamp_string};
use crate::row::{COLUMN_COUNT, HEADER, RemoteRow};

type SheetRow = [String; COLUMN_COUNT];

#[derive(Default)]
pub struct MemorySheet {
    rows: RefCell<Vec<SheetRow>>,
    actions: RefCell<Vec<String>>,
    offline: Cell<bool>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sheet that already carries its header row.
    pub fn with_header() -> Self {
        let sheet = Self::new();
        sheet.rows.borrow_mut().push(header_row());
        sheet
    }

    /// Append a raw row, bypassing the script (e.g. hand-edited cells).
    pub fn push_row(&self, cells: [&str; COLUMN_COUNT]) {
        self.rows.borrow_mut().push(cells.map(str::to_string));
    }

    /// Every row, header included.
    pub fn rows(&self) -> Vec<SheetRow> {
        self.rows.borrow().clone()
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> Vec<SheetRow> {
        self.rows.borrow().iter().skip(1).cloned().collect()
    }

    /// Actions received so far, in order.
    pub fn actions(&self) -> Vec<String> {
        self.actions.borrow().clone()
    }

    /// While offline every request fails before reaching the sheet.
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    fn record(&self, action: &str) -> Result<(), GatewayError> {
        self.actions.borrow_mut().push(action.to_string());
        if self.offline.get() {
            return Err(GatewayError::Status {
                status: 503,
                body: "Service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn all_notes(&self) -> Vec<RemoteRow> {
        let rows = self.rows.borrow();
        if rows.len() <= 1 {
            return Vec::new();
        }
        let now = timestamp_string();
        rows.iter()
            .skip(1)
            .filter(|row| !row[0].is_empty())
            .map(|row| {
                let mut row = RemoteRow::from_cells(row.clone());
                fill(&mut row.category, DEFAULT_CATEGORY);
                fill(&mut row.created_at, &now);
                fill(&mut row.updated_at, &now);
                fill(&mut row.is_pinned, "false");
                row
            })
            .collect()
    }

    fn find(&self, id: &str) -> Option<usize> {
        self.rows
            .borrow()
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| row[0] == id)
            .map(|(index, _)| index)
    }

    fn add(&self, note: RemoteRow) -> bool {
        if self.rows.borrow().is_empty() {
            self.initialize();
        }
        self.rows.borrow_mut().push(note.to_cells());
        true
    }

    fn update(&self, id: &str, note: RemoteRow) -> bool {
        match self.find(id) {
            Some(index) => {
                self.rows.borrow_mut()[index] = note.to_cells();
                true
            }
            None => false,
        }
    }

    fn delete(&self, id: &str) -> bool {
        match self.find(id) {
            Some(index) => {
                self.rows.borrow_mut().remove(index);
                true
            }
            None => false,
        }
    }

    fn initialize(&self) -> bool {
        let mut rows = self.rows.borrow_mut();
        let has_header = rows
            .first()
            .is_some_and(|first| first[0].eq_ignore_ascii_case("id"));
        if !has_header {
            if rows.is_empty() {
                rows.push(header_row());
            } else {
                rows[0] = header_row();
            }
        }
        true
    }

    fn dispatch(&self, request: Request) -> Value {
        match request {
            Request::AddNote { note } => json!({ "success": self.add(note) }),
            Request::UpdateNote { note_id, note } => {
                json!({ "success": self.update(&note_id, note) })
            }
            Request::DeleteNote { note_id } => {
                json!({ "success": self.delete(&note_id) })
            }
            Request::InitializeSheet => json!({ "success": self.initialize() }),
        }
    }
}

fn header_row() -> SheetRow {
    HEADER.map(str::to_string)
}

fn fill(cell: &mut String, default: &str) {
    if cell.is_empty() {
        *cell = default.to_string();
    }
}

fn reply(value: Value) -> HttpReply {
    HttpReply::ok(value.to_string())
}

fn invalid_action() -> Value {
    json!({ "error": "Invalid action" })
}

impl Transport for MemorySheet {
    fn get(
        &self,
        _url: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpReply, GatewayError> {
        let action = query
            .iter()
            .find(|(key, _)| *key == "action")
            .map(|(_, value)| *value)
            .unwrap_or_default();
        self.record(action)?;
        let body = match action {
            "getAllNotes" => json!({ "notes": self.all_notes() }),
            "testConnection" => json!({ "success": true }),
            _ => invalid_action(),
        };
        Ok(reply(body))
    }

    fn post_json(&self, _url: &str, body: &Value) -> Result<HttpReply, GatewayError> {
        let action = body
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.record(&action)?;
        if !matches!(
            action.as_str(),
            "addNote" | "updateNote" | "deleteNote" | "initializeSheet"
        ) {
            return Ok(reply(invalid_action()));
        }
        let body = match serde_json::from_value::<Request>(body.clone()) {
            Ok(request) => self.dispatch(request),
            Err(err) => json!({ "error": format!("Error: {err}") }),
        };
        Ok(reply(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(sheet: &MemorySheet, body: Value) -> Value {
        let reply = sheet.post_json("", &body).unwrap();
        serde_json::from_str(&reply.body).unwrap()
    }

    fn get(sheet: &MemorySheet, action: &str) -> Value {
        let reply = sheet.get("", &[("action", action)]).unwrap();
        serde_json::from_str(&reply.body).unwrap()
    }

    fn row(id: &str) -> Value {
        json!({ "id": id, "title": "T", "content": "C", "category": "Work",
                "tags": "", "createdAt": "c", "updatedAt": "u", "isPinned": "false" })
    }

    #[test]
    fn test_header_only_lists_nothing() {
        assert_eq!(get(&MemorySheet::new(), "getAllNotes"), json!({ "notes": [] }));
        assert_eq!(get(&MemorySheet::with_header(), "getAllNotes"), json!({ "notes": [] }));
    }

    #[test]
    fn test_add_initializes_empty_sheet() {
        let sheet = MemorySheet::new();
        let out = post(&sheet, json!({ "action": "addNote", "note": row("n1") }));
        assert_eq!(out, json!({ "success": true }));
        let rows = sheet.rows();
        assert_eq!(rows[0][0], "ID");
        assert_eq!(rows[1][0], "n1");
    }

    #[test]
    fn test_initialize_is_idempotent_and_case_insensitive() {
        let sheet = MemorySheet::new();
        post(&sheet, json!({ "action": "initializeSheet" }));
        let once = sheet.rows();
        post(&sheet, json!({ "action": "initializeSheet" }));
        assert_eq!(sheet.rows(), once);

        let lower = MemorySheet::new();
        lower.push_row(["id", "", "", "", "", "", "", ""]);
        post(&lower, json!({ "action": "initializeSheet" }));
        assert_eq!(lower.rows()[0][0], "id");
    }

    #[test]
    fn test_update_and_delete_scan_past_header() {
        let sheet = MemorySheet::with_header();
        post(&sheet, json!({ "action": "addNote", "note": row("n1") }));
        let missing = post(
            &sheet,
            json!({ "action": "updateNote", "noteId": "ID", "note": row("ID") }),
        );
        assert_eq!(missing, json!({ "success": false }));
        assert_eq!(sheet.rows()[0][0], "ID");

        let deleted = post(&sheet, json!({ "action": "deleteNote", "noteId": "n1" }));
        assert_eq!(deleted, json!({ "success": true }));
        assert!(sheet.data_rows().is_empty());
    }

    #[test]
    fn test_listing_fills_defaults_and_skips_blank_ids() {
        let sheet = MemorySheet::with_header();
        sheet.push_row(["n1", "T", "C", "", "a, b", "", "", ""]);
        sheet.push_row(["", "ghost", "", "", "", "", "", ""]);
        let notes = get(&sheet, "getAllNotes")["notes"].clone();
        assert_eq!(notes.as_array().unwrap().len(), 1);
        assert_eq!(notes[0]["category"], DEFAULT_CATEGORY);
        assert_eq!(notes[0]["isPinned"], "false");
        assert!(!notes[0]["createdAt"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_and_malformed_actions() {
        let sheet = MemorySheet::new();
        assert_eq!(get(&sheet, "dropTable"), invalid_action());
        assert_eq!(post(&sheet, json!({ "action": "nope" })), invalid_action());
        let malformed = post(&sheet, json!({ "action": "deleteNote" }));
        assert!(malformed["error"].as_str().unwrap().starts_with("Error:"));
    }

    #[test]
    fn test_offline_fails_every_request() {
        let sheet = MemorySheet::with_header();
        sheet.set_offline(true);
        assert!(sheet.get("", &[("action", "testConnection")]).is_err());
        assert_eq!(sheet.actions(), vec!["testConnection"]);
    }
}
