use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::{Mutex, OnceLock};

use crate::error::SyncError;

pub const DEFAULT_CATEGORY: &str = "General";
pub const ID_TS_WIDTH: usize = 9;
/// How far ahead of the local clock a stored timestamp may be and still be
/// treated as a real edit time when touching a note.
pub const MAX_CLOCK_SKEW_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub is_pinned: bool,
}

/// User-editable part of a note: everything except id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: DEFAULT_CATEGORY.to_string(),
            tags: Vec::new(),
            is_pinned: false,
        }
    }

    /// Trim title and content; both must be non-empty to be persisted.
    pub fn validated(mut self) -> Result<Self, SyncError> {
        self.title = self.title.trim().to_string();
        self.content = self.content.trim().to_string();
        if self.title.is_empty() || self.content.is_empty() {
            return Err(SyncError::Validation(
                "Title and content are required".to_string(),
            ));
        }
        Ok(self)
    }
}

impl From<&Note> for NoteDraft {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            category: note.category.clone(),
            tags: note.tags.clone(),
            is_pinned: note.is_pinned,
        }
    }
}

impl Note {
    pub fn from_draft(
        id: String,
        draft: NoteDraft,
        created_at: String,
        updated_at: String,
    ) -> Self {
        Self {
            id,
            title: draft.title,
            content: draft.content,
            category: draft.category,
            tags: draft.tags,
            created_at,
            updated_at,
            is_pinned: draft.is_pinned,
        }
    }
}

pub fn timestamp_string() -> String {
    format_timestamp(Utc::now())
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A fresh timestamp that sorts strictly after `previous`.
///
/// A `previous` further in the future than [`MAX_CLOCK_SKEW_SECS`] is not
/// honored; the current time is used so the note stops sorting ahead.
pub fn touch(previous: &str) -> String {
    touch_at(previous, Utc::now())
}

fn touch_at(previous: &str, now: DateTime<Utc>) -> String {
    let skew = Duration::seconds(MAX_CLOCK_SKEW_SECS);
    match parse_timestamp(previous) {
        Some(prev) if now <= prev && prev - now <= skew => {
            format_timestamp(prev + Duration::milliseconds(1))
        }
        _ => format_timestamp(now),
    }
}

pub fn cmp_dt(a: &str, b: &str) -> Ordering {
    let a_dt = parse_timestamp(a);
    let b_dt = parse_timestamp(b);
    match (a_dt, b_dt) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[derive(Default)]
struct IdState {
    last_ts: i64,
    counter: u32,
}

/// Generate an id that is unique within this process and not in `taken`.
///
/// The id is the current microsecond timestamp in fixed-width base62. When
/// the clock has not advanced since the last id, a counter suffix keeps
/// successive ids apart.
pub fn generate_id(taken: impl Fn(&str) -> bool) -> String {
    static ID_STATE: OnceLock<Mutex<IdState>> = OnceLock::new();
    let state = ID_STATE.get_or_init(|| Mutex::new(IdState::default()));

    let mut guard = state.lock().unwrap_or_else(|p| p.into_inner());
    loop {
        let now = Utc::now().timestamp_micros();
        let ts = if now <= guard.last_ts { guard.last_ts } else { now };

        if ts == guard.last_ts {
            guard.counter = guard.counter.saturating_add(1);
        } else {
            guard.last_ts = ts;
            guard.counter = 0;
        }

        let ts_enc = encode_base62_width(ts.max(0) as u64, ID_TS_WIDTH);
        let id = if guard.counter == 0 {
            ts_enc
        } else {
            format!("{ts_enc}{}", encode_base62(guard.counter as u64))
        };

        if !taken(&id) {
            return id;
        }
    }
}

fn encode_base62(num: u64) -> String {
    const ALPHABET: &[u8] =
        b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    if num == 0 {
        return "0".to_string();
    }
    let mut n = num;
    let base = ALPHABET.len() as u64;
    let mut out = Vec::new();
    while n > 0 {
        out.push(ALPHABET[(n % base) as usize] as char);
        n /= base;
    }
    out.iter().rev().collect()
}

fn encode_base62_width(num: u64, width: usize) -> String {
    let base = encode_base62(num);
    if base.len() >= width {
        base
    } else {
        format!("{}{}", "0".repeat(width - base.len()), base)
    }
}
