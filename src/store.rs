//! Session-local note collection kept in step with the remote sheet.
//!
//! Memory changes only after the gateway acknowledges a write, so the
//! collection always equals the last state the sheet confirmed. Failures
//! leave the collection untouched and are reported once, as a message the
//! caller can show as-is.

use tracing::{debug, error, info, warn};

use crate::error::{GatewayError, NoteAction, SyncError};
use crate::gateway::{Gateway, Transport};
use crate::note::{Note, NoteDraft, generate_id, timestamp_string, touch};
use crate::row::{DecodeDefaults, RemoteRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// What a front end needs after every call.
#[derive(Debug, Clone, Copy)]
pub struct StoreView<'a> {
    pub notes: &'a [Note],
    pub loading: bool,
    pub error: Option<&'a str>,
}

pub struct NoteStore<T: Transport> {
    gateway: Gateway<T>,
    default_category: String,
    notes: Vec<Note>,
    state: LoadState,
    error: Option<String>,
}

impl<T: Transport> NoteStore<T> {
    pub fn new(gateway: Gateway<T>, default_category: impl Into<String>) -> Self {
        Self {
            gateway,
            default_category: default_category.into(),
            notes: Vec::new(),
            state: LoadState::Idle,
            error: None,
        }
    }

    pub fn gateway(&self) -> &Gateway<T> {
        &self.gateway
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn view(&self) -> StoreView<'_> {
        StoreView {
            notes: &self.notes,
            loading: self.state == LoadState::Loading,
            error: self.error(),
        }
    }

    /// Run a full load cycle: connectivity, schema, then every row.
    ///
    /// On failure the previous collection is kept.
    pub fn load(&mut self) -> Result<(), SyncError> {
        self.state = LoadState::Loading;
        self.error = None;
        match self.fetch_all() {
            Ok(notes) => {
                info!(count = notes.len(), "notes loaded");
                self.notes = notes;
                self.state = LoadState::Ready;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "loading notes failed");
                let message = err.to_string();
                self.state = LoadState::Failed(message.clone());
                self.error = Some(message);
                Err(err)
            }
        }
    }

    pub fn refresh(&mut self) -> Result<(), SyncError> {
        self.load()
    }

    fn fetch_all(&self) -> Result<Vec<Note>, SyncError> {
        if !self.gateway.check_connectivity() {
            return Err(SyncError::Unreachable);
        }
        if !self.gateway.ensure_schema()? {
            warn!("sheet initialization was not acknowledged");
        }
        let defaults = DecodeDefaults {
            category: self.default_category.clone(),
            timestamp: timestamp_string(),
        };
        let rows = self.gateway.list_all()?;
        let total = rows.len();
        let notes: Vec<Note> = rows
            .into_iter()
            .filter_map(|row| row.into_note(&defaults))
            .collect();
        if notes.len() != total {
            debug!(skipped = total - notes.len(), "rows without id skipped");
        }
        Ok(notes)
    }

    /// Create a note; it is prepended once the sheet accepts it.
    pub fn add(&mut self, draft: NoteDraft) -> Result<&Note, SyncError> {
        let draft = self.check(draft)?;
        let id = generate_id(|candidate| self.note(candidate).is_some());
        let now = timestamp_string();
        let note = Note::from_draft(id, draft, now.clone(), now);

        let outcome = self.gateway.create(&RemoteRow::from(&note));
        self.settle(NoteAction::Add, &note.id, outcome)?;
        self.notes.insert(0, note);
        Ok(&self.notes[0])
    }

    /// Replace the editable fields of an existing note.
    pub fn update(&mut self, id: &str, draft: NoteDraft) -> Result<&Note, SyncError> {
        let draft = self.check(draft)?;
        let existing = self.require(id)?;
        let note = Note::from_draft(
            id.to_string(),
            draft,
            existing.created_at.clone(),
            touch(&existing.updated_at),
        );
        self.push_update(NoteAction::Update, note)
    }

    pub fn toggle_pin(&mut self, id: &str) -> Result<&Note, SyncError> {
        let existing = self.require(id)?;
        let mut note = existing.clone();
        note.is_pinned = !note.is_pinned;
        note.updated_at = touch(&existing.updated_at);
        self.push_update(NoteAction::Pin, note)
    }

    pub fn delete(&mut self, id: &str) -> Result<(), SyncError> {
        let outcome = self.gateway.delete(id);
        self.settle(NoteAction::Delete, id, outcome)?;
        self.notes.retain(|n| n.id != id);
        Ok(())
    }

    fn push_update(&mut self, action: NoteAction, note: Note) -> Result<&Note, SyncError> {
        let outcome = self.gateway.update(&note.id, &RemoteRow::from(&note));
        self.settle(action, &note.id, outcome)?;
        let index = self
            .notes
            .iter()
            .position(|n| n.id == note.id)
            .ok_or_else(|| SyncError::NotFound(note.id.clone()))?;
        self.notes[index] = note;
        Ok(&self.notes[index])
    }

    fn check(&mut self, draft: NoteDraft) -> Result<NoteDraft, SyncError> {
        draft.validated().map_err(|err| self.fail(err))
    }

    fn require(&mut self, id: &str) -> Result<Note, SyncError> {
        match self.note(id) {
            Some(note) => Ok(note.clone()),
            None => Err(self.fail(SyncError::NotFound(id.to_string()))),
        }
    }

    /// Turn a gateway outcome into success or a recorded failure.
    fn settle(
        &mut self,
        action: NoteAction,
        id: &str,
        outcome: Result<bool, GatewayError>,
    ) -> Result<(), SyncError> {
        match outcome {
            Ok(true) => {
                debug!(%action, note_id = %id, "acknowledged");
                Ok(())
            }
            Ok(false) => {
                error!(%action, note_id = %id, "remote refused the change");
                Err(self.fail(SyncError::Rejected(action)))
            }
            Err(err) => {
                error!(%action, note_id = %id, error = %err, "request failed");
                Err(self.fail(SyncError::Rejected(action)))
            }
        }
    }

    fn fail(&mut self, err: SyncError) -> SyncError {
        self.error = Some(err.to_string());
        err
    }
}
