use std::collections::BTreeMap;

use crate::note::{Note, cmp_dt};

/// Search and category narrowing applied to the loaded collection.
#[derive(Debug, Default, Clone)]
pub struct NoteFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

impl NoteFilter {
    pub fn matches(&self, note: &Note) -> bool {
        if self.category.as_ref().is_some_and(|c| &note.category != c) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                note.title.to_lowercase().contains(&q)
                    || note.content.to_lowercase().contains(&q)
                    || note.tags.iter().any(|t| t.to_lowercase().contains(&q))
            }
            _ => true,
        }
    }
}

/// Matching notes, pinned first, then most recently updated.
pub fn visible_notes<'a>(notes: &'a [Note], filter: &NoteFilter) -> Vec<&'a Note> {
    let mut out: Vec<&Note> = notes.iter().filter(|n| filter.matches(n)).collect();
    out.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then_with(|| cmp_dt(&b.updated_at, &a.updated_at))
    });
    out
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub pinned: usize,
    pub categories: BTreeMap<String, usize>,
}

pub fn stats(notes: &[Note]) -> Stats {
    let mut stats = Stats { total: notes.len(), ..Default::default() };
    for note in notes {
        if note.is_pinned {
            stats.pinned += 1;
        }
        *stats.categories.entry(note.category.clone()).or_default() += 1;
    }
    stats
}
