use chrono::{DateTime, Local, Utc};
use yansi::Paint;

/// Color palette for consistent theming
pub struct ColorPalette {
    pub primary: (u8, u8, u8),   // IDs, muted text
    pub secondary: (u8, u8, u8), // Headers, emphasis
    pub timestamp: (u8, u8, u8), // Timestamps
    pub highlight: (u8, u8, u8), // Search matches
    pub pin: (u8, u8, u8),       // Pinned marker
    pub category: (u8, u8, u8),  // Category names
}

impl ColorPalette {
    pub const CATPPUCCIN: Self = Self {
        primary: (108, 112, 134),   // Gray
        secondary: (148, 226, 213), // Teal
        timestamp: (137, 180, 250), // Blue
        highlight: (243, 139, 168), // Pink
        pin: (249, 226, 175),       // Yellow
        category: (203, 166, 247),  // Mauve
    };
}

pub const PIN_MARKER: &str = "*";

/// Formatting context passed through rendering pipeline
pub struct FormatContext {
    pub use_color: bool,
    pub palette: ColorPalette,
}

impl FormatContext {
    pub fn new(use_color: bool) -> Self {
        Self { use_color, palette: ColorPalette::CATPPUCCIN }
    }

    /// Colors stay off when `NO_COLOR` is set or `--plain` was passed.
    pub fn from_env(plain: bool) -> Self {
        let use_color = !plain && std::env::var("NO_COLOR").is_err();
        Self::new(use_color)
    }

    fn paint(&self, text: &str, (r, g, b): (u8, u8, u8)) -> String {
        if self.use_color {
            Paint::rgb(text, r, g, b).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn format_id(&self, id: &str) -> String {
        self.paint(id, self.palette.primary)
    }

    pub fn format_header(&self, text: &str) -> String {
        if self.use_color {
            let (r, g, b) = self.palette.secondary;
            Paint::rgb(text, r, g, b).bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn format_timestamp(&self, ts: &str) -> String {
        self.paint(ts, self.palette.timestamp)
    }

    pub fn format_category(&self, category: &str) -> String {
        self.paint(category, self.palette.category)
    }

    pub fn format_pin(&self, pinned: bool) -> String {
        if pinned {
            self.paint(PIN_MARKER, self.palette.pin)
        } else {
            " ".to_string()
        }
    }

    pub fn format_tag(&self, tag: &str) -> String {
        if self.use_color {
            let (r, g, b) = crate::tags::color_for_tag(tag);
            Paint::rgb(tag, r, g, b).bold().to_string()
        } else {
            tag.to_string()
        }
    }

    pub fn format_tags(&self, tags: &[String]) -> String {
        tags.iter()
            .map(|t| self.format_tag(t))
            .collect::<Vec<_>>()
            .join(crate::tags::TAG_SEPARATOR)
    }

    pub fn highlight_match(&self, text: &str, query: Option<&str>) -> String {
        let Some(q) = query else { return text.to_string() };
        if q.is_empty() || !self.use_color {
            return text.to_string();
        }

        let needle: Vec<char> = q.chars().flat_map(char::to_lowercase).collect();
        let mut out = String::new();
        let mut plain_start = 0;
        let mut pos = 0;
        while pos < text.len() {
            let rest = &text[pos..];
            if let Some(len) = folded_prefix_len(rest, &needle) {
                out.push_str(&text[plain_start..pos]);
                out.push_str(&self.paint(&rest[..len], self.palette.highlight));
                pos += len;
                plain_start = pos;
            } else {
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
        out.push_str(&text[plain_start..]);
        out
    }
}

/// Byte length of the shortest prefix of `text` whose lowercase form is
/// exactly `needle`. Always ends on a char boundary of `text`.
fn folded_prefix_len(text: &str, needle: &[char]) -> Option<usize> {
    let mut folded: Vec<char> = Vec::with_capacity(needle.len());
    for (idx, ch) in text.char_indices() {
        folded.extend(ch.to_lowercase());
        if !needle.starts_with(&folded) {
            return None;
        }
        if folded.len() == needle.len() {
            return Some(idx + ch.len_utf8());
        }
    }
    None
}

/// Timestamp formatting with relative/absolute modes
pub struct TimeFormatter {
    relative_mode: bool,
    now: DateTime<Utc>,
}

impl TimeFormatter {
    pub fn new(relative_mode: bool, now: DateTime<Utc>) -> Self {
        Self { relative_mode, now }
    }

    /// Unparseable stored values are shown as-is.
    pub fn format(&self, ts: &str) -> String {
        match crate::note::parse_timestamp(ts) {
            Some(dt) if self.relative_mode => self.format_relative(dt),
            Some(dt) => dt.with_timezone(&Local).format("%d%b%y %H:%M").to_string(),
            None => ts.to_string(),
        }
    }

    pub fn format_relative(&self, dt: DateTime<Utc>) -> String {
        let dur = self.now.signed_duration_since(dt);
        let total_minutes = dur.num_minutes().max(0);
        let total_hours = dur.num_hours().max(0);
        let total_days = dur.num_days().max(0);

        if total_hours == 0 {
            if total_minutes == 0 {
                return "just now".to_string();
            }
            return format!("{}m ago", total_minutes);
        }
        if total_days < 30 {
            if total_days == 0 {
                return format!("{}h ago", total_hours);
            }
            let hours = total_hours - total_days * 24;
            if hours > 0 {
                format!("{}d {}h ago", total_days, hours)
            } else {
                format!("{}d ago", total_days)
            }
        } else if total_days < 365 {
            let months = total_days / 30;
            let days = total_days % 30;
            if days > 0 {
                format!("{}mo {}d ago", months, days)
            } else {
                format!("{}mo ago", months)
            }
        } else {
            let years = total_days / 365;
            let months = (total_days % 365) / 30;
            if months > 0 {
                format!("{}y {}mo ago", years, months)
            } else {
                format!("{}y ago", years)
            }
        }
    }

    pub fn format_label(&self, base: &str) -> String {
        if self.relative_mode {
            base.to_string()
        } else {
            format!("{} ({})", base, self.now.with_timezone(&Local).offset())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_context_no_color() {
        let ctx = FormatContext::new(false);
        assert_eq!(ctx.format_id("abc123"), "abc123");
        assert_eq!(ctx.format_header("Header"), "Header");
        assert_eq!(ctx.format_category("Work"), "Work");
        assert_eq!(ctx.format_pin(true), PIN_MARKER);
        assert_eq!(ctx.format_pin(false), " ");
        let tags = vec!["a".to_string(), "b".to_string()];
        assert_eq!(ctx.format_tags(&tags), "a, b");
    }

    #[test]
    fn test_format_context_with_color() {
        let ctx = FormatContext::new(true);
        let id = ctx.format_id("abc123");
        assert!(id.contains("abc123"));
        assert!(id.len() > "abc123".len()); // Has ANSI codes
    }

    #[test]
    fn test_plain_disables_color() {
        assert!(!FormatContext::from_env(true).use_color);
    }

    #[test]
    fn test_highlight_match() {
        let ctx = FormatContext::new(false);
        assert_eq!(ctx.highlight_match("hello world", Some("world")), "hello world");

        let ctx = FormatContext::new(true);
        let result = ctx.highlight_match("hello World", Some("world"));
        assert!(result.contains("World"));
        assert!(result.len() > "hello World".len());
    }

    #[test]
    fn test_highlight_match_mixed_width_case_mappings() {
        let ctx = FormatContext::new(true);
        // 'İ' lowercases to three bytes, the Kelvin sign to one.
        let text = "İİ\u{212A}x";
        let result = ctx.highlight_match(text, Some("k"));
        assert!(result.starts_with("İİ"));
        assert!(result.contains("\u{212A}"));
        assert!(result.ends_with('x'));
        assert!(result.len() > text.len());

        assert_eq!(ctx.highlight_match("İstanbul", Some("zzz")), "İstanbul");
        let plain = FormatContext::new(false);
        assert_eq!(plain.highlight_match(text, Some("k")), text);
    }

    #[test]
    fn test_time_formatter_relative() {
        let now = Utc::now();
        let formatter = TimeFormatter::new(true, now);
        assert_eq!(formatter.format_relative(now), "just now");
        assert_eq!(formatter.format_relative(now - Duration::minutes(5)), "5m ago");
        assert_eq!(formatter.format_relative(now - Duration::hours(3)), "3h ago");
        assert_eq!(
            formatter.format_relative(now - Duration::hours(50)),
            "2d 2h ago"
        );
        assert_eq!(formatter.format_relative(now - Duration::days(400)), "1y 1mo ago");
    }

    #[test]
    fn test_time_formatter_passes_through_garbage() {
        let formatter = TimeFormatter::new(false, Utc::now());
        assert_eq!(formatter.format("not a date"), "not a date");
        assert!(!formatter.format("2024-12-15T14:30:00.000Z").is_empty());
    }

    #[test]
    fn test_time_formatter_label() {
        let now = Utc::now();
        let formatter = TimeFormatter::new(true, now);
        assert_eq!(formatter.format_label("Updated"), "Updated");

        let formatter = TimeFormatter::new(false, now);
        let label = formatter.format_label("Updated");
        assert!(label.starts_with("Updated ("));
    }
}
