//! Table and text layout helpers used by the CLI.
//! Width calculations ignore ANSI color codes.

const FALLBACK_WIDTH: usize = 100;

/// Render a text table. Column widths come from the widest cell (header or
/// row) by visible length.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| display_len(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_len(cell));
        }
    }

    let header_line = format_row(headers, &widths);
    let mut out = String::new();
    out.push_str(&header_line);
    out.push('\n');
    out.push_str(&"=".repeat(display_len(&header_line)));
    for row in rows {
        out.push('\n');
        out.push_str(&format_row(row, &widths));
    }
    out
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    row.iter()
        .zip(widths)
        .map(|(cell, width)| pad_field(cell, *width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

/// Right-pad a field to `target` visible columns.
pub fn pad_field(display: &str, target: usize) -> String {
    let padding = target.saturating_sub(display_len(display));
    format!("{display}{}", " ".repeat(padding))
}

/// Truncate text to a width, appending an ellipsis when needed. Newlines
/// collapse to spaces so previews stay on one line.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    let flat: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if max_width == 0 {
        return String::new();
    }
    if flat.chars().count() <= max_width {
        return flat;
    }
    if max_width == 1 {
        return "…".to_string();
    }
    let mut out: String = flat.chars().take(max_width - 1).collect();
    out.push('…');
    out
}

/// Visible length of a string, ignoring ANSI escape sequences.
pub fn display_len(s: &str) -> usize {
    let mut len = 0;
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
            continue;
        }
        len += 1;
    }
    len
}

/// Columns available on stdout, or a fixed width when not a terminal.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| usize::from(w))
        .unwrap_or(FALLBACK_WIDTH)
}

/// Width left for a free-text column after the fixed ones are laid out.
pub fn preview_width(total: usize, fixed: &[usize]) -> usize {
    let separators = fixed.len() * 3;
    let used: usize = fixed.iter().sum::<usize>() + separators;
    total.saturating_sub(used).clamp(12, 80)
}
