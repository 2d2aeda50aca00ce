use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::note::{Note, parse_timestamp};

pub const TAG_SEPARATOR: &str = ", ";

/// Split a comma-joined tag cell into trimmed, non-empty tags.
pub fn split_tags(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_tags(tags: &[String]) -> String {
    tags.join(TAG_SEPARATOR)
}

/// Add a tag unless it is empty, would break the comma-joined cell, or is
/// already present. Returns whether the tag was added.
pub fn add_tag(tags: &mut Vec<String>, input: &str) -> bool {
    let tag = input.trim();
    if tag.is_empty() || tag.contains(',') || tags.iter().any(|t| t == tag) {
        return false;
    }
    tags.push(tag.to_string());
    true
}

pub fn remove_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let before = tags.len();
    tags.retain(|t| t != tag.trim());
    tags.len() != before
}

#[derive(Default, Clone, Debug)]
pub struct TagStat {
    pub count: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

/// Usage count per tag with the earliest creation and latest update seen.
pub fn tag_stats(notes: &[Note]) -> BTreeMap<String, TagStat> {
    let mut stats: BTreeMap<String, TagStat> = BTreeMap::new();
    for note in notes {
        let created = parse_timestamp(&note.created_at);
        let updated = parse_timestamp(&note.updated_at);
        for tag in &note.tags {
            let entry = stats.entry(tag.clone()).or_default();
            entry.count += 1;
            if let Some(c) = created {
                entry.first = Some(entry.first.map_or(c, |f| f.min(c)));
            }
            if let Some(u) = updated {
                entry.last = Some(entry.last.map_or(u, |l| l.max(u)));
            }
        }
    }
    stats
}

/// Hash a tag for deterministic color selection
pub fn hash_tag(tag: &str) -> u64 {
    let mut h: u64 = 5381;
    for b in tag.bytes() {
        h = (h.wrapping_shl(5)).wrapping_add(h) ^ u64::from(b);
    }
    h
}

pub fn color_for_tag(tag: &str) -> (u8, u8, u8) {
    const PALETTE: &[(u8, u8, u8)] = &[
        (137, 180, 250),
        (166, 227, 161),
        (249, 226, 175),
        (245, 194, 231),
        (255, 169, 167),
        (148, 226, 213),
        (198, 160, 246),
        (240, 198, 198),
        (181, 232, 224),
        (183, 189, 248),
        (255, 214, 165),
        (179, 255, 171),
    ];
    PALETTE[(hash_tag(tag) as usize) % PALETTE.len()]
}
