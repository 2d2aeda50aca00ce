pub mod args;
pub mod config;
pub mod error;
pub mod formatting;
pub mod gateway;
pub mod logging;
pub mod note;
pub mod row;
pub mod sheet;
pub mod store;
pub mod table;
pub mod tags;
pub mod view;

use chrono::Utc;
use std::env;
use std::error::Error;
use std::io::{self, BufRead, Write};

use args::{AddFlags, EditFlags, ListFlags};
use config::Config;
use error::SyncError;
use formatting::{FormatContext, TimeFormatter};
use gateway::{Gateway, Transport};
use note::NoteDraft;
use store::NoteStore;
use table::{display_len, pad_field, preview_width, render_table, terminal_width};
use view::NoteFilter;

const RETRY_HINT: &str = "Re-run the command to retry.";

/// Commands that work on the loaded note collection.
#[derive(Debug, PartialEq, Eq)]
pub enum NoteCommand {
    List(ListFlags),
    View(String),
    Add(AddFlags),
    Edit(EditFlags),
    Pin(String),
    Delete { id: String, yes: bool },
    Tags,
    Stats,
}

impl NoteCommand {
    /// Parse a command's arguments; `None` when `cmd` is not a note command.
    pub fn parse(
        cmd: &str,
        args: Vec<String>,
        config: &Config,
    ) -> Option<Result<Self, Box<dyn Error>>> {
        let parsed = match cmd {
            "list" | "ls" => args::parse_list(args, config).map(Self::List),
            "view" | "show" => args::parse_id(args, cmd).map(Self::View),
            "add" => args::parse_add(args, config).map(Self::Add),
            "edit" => args::parse_edit(args, config).map(Self::Edit),
            "pin" => args::parse_id(args, cmd).map(Self::Pin),
            "delete" | "rm" => {
                args::parse_delete(args).map(|(id, yes)| Self::Delete { id, yes })
            }
            "tags" => args::expect_none(args, cmd).map(|_| Self::Tags),
            "stats" => args::expect_none(args, cmd).map(|_| Self::Stats),
            _ => return None,
        };
        Some(parsed)
    }
}

pub fn entry() -> Result<(), Box<dyn Error>> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let plain = args::take_plain_flag(&mut args);
    if args.is_empty() {
        print_help();
        return Ok(());
    }

    let cmd = args.remove(0);
    if matches!(cmd.as_str(), "help" | "-h" | "--help") {
        print_help();
        return Ok(());
    }

    let config = Config::load()?;
    let ctx = FormatContext::from_env(plain);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cmd.as_str() {
        "config" => {
            args::expect_none(args, &cmd)?;
            show_config(&config, &mut out)?;
        }
        "categories" => {
            args::expect_none(args, &cmd)?;
            list_categories(&config, &ctx, &mut out)?;
        }
        "ping" => {
            args::expect_none(args, &cmd)?;
            ping(&Gateway::http(config.endpoint()?), &mut out)?;
        }
        "init" => {
            args::expect_none(args, &cmd)?;
            init_sheet(&Gateway::http(config.endpoint()?), &mut out)?;
        }
        other => {
            let Some(parsed) = NoteCommand::parse(other, args, &config) else {
                return Err(format!(
                    "Unknown command: {other}. Run `sheet_notes help` for usage."
                )
                .into());
            };
            let command = parsed?;
            let gateway = Gateway::http(config.endpoint()?);
            let mut store = NoteStore::new(gateway, config.default_category.clone());
            load(&mut store)?;
            run(command, &mut store, &config, &ctx, &mut out, &mut confirm_on_stdin)?;
        }
    }
    Ok(())
}

fn print_help() {
    println!(
        "\
Sheet Notes CLI
Notes kept in a Google Sheet behind an Apps Script web app.

Usage:
  sn list [-s|--search <text>] [-c|--category <name>] [-r|--relative] [--json]
                                  List notes (pinned first, then most recently updated)
  sn view <id>                    Show a note
  sn add <title> <content...> [-c <category>] [-t|--tag <tag>]... [--pin]
                                  Add a note
  sn edit <id> [--title <t>] [--content <c>] [-c <category>] [-t <tag>]... [--untag <tag>]... [--pin|--unpin]
                                  Change a note
  sn pin <id>                     Toggle the pinned flag
  sn delete <id> [-y|--yes]       Delete a note (asks for confirmation unless --yes)
  sn tags                         List tags with counts and first/last use
  sn stats                        Count notes per category
  sn categories                   List the configured categories
  sn init                         Write the header row to the sheet if missing
  sn ping                         Check that the endpoint answers
  sn config                       Show the effective configuration
  sn help                         Show this message

Global flags:
  --plain                         Disable colors

Environment:
  SHEET_NOTES_ENDPOINT            Apps Script web app URL (https://script.google.com/macros/s/<id>/exec)
  SHEET_NOTES_CONFIG              Config file (default: ~/.config/sheet_notes/config.toml)
  SHEET_NOTES_CATEGORIES          Comma-separated category list
  SHEET_NOTES_DEFAULT_CATEGORY    Category for new notes (default: General)
  SHEET_NOTES_LOG                 Log filter, e.g. debug (default: warn)
  NO_COLOR                        Disable colors
"
    );
}

/// Load the collection, adding a retry hint to the failure message.
pub fn load<T: Transport>(store: &mut NoteStore<T>) -> Result<(), Box<dyn Error>> {
    store
        .load()
        .map_err(|err| format!("{err}\n{RETRY_HINT}").into())
}

/// Run one note command against an already loaded store.
pub fn run<T: Transport>(
    command: NoteCommand,
    store: &mut NoteStore<T>,
    config: &Config,
    ctx: &FormatContext,
    out: &mut impl Write,
    confirm: &mut dyn FnMut(&str) -> io::Result<bool>,
) -> Result<(), Box<dyn Error>> {
    match command {
        NoteCommand::List(flags) => list_notes(store, &flags, ctx, out),
        NoteCommand::View(id) => view_note(store, &id, ctx, out),
        NoteCommand::Add(flags) => add_note(store, flags, config, ctx, out),
        NoteCommand::Edit(flags) => edit_note(store, flags, ctx, out),
        NoteCommand::Pin(id) => {
            let note = store.toggle_pin(&id)?;
            let verb = if note.is_pinned { "Pinned" } else { "Unpinned" };
            writeln!(out, "{} {} ({})", verb, ctx.format_id(&note.id), note.title)?;
            Ok(())
        }
        NoteCommand::Delete { id, yes } => delete_note(store, &id, yes, out, confirm),
        NoteCommand::Tags => list_tags(store.notes(), ctx, out),
        NoteCommand::Stats => show_stats(store.notes(), config, ctx, out),
    }
}

fn list_notes<T: Transport>(
    store: &NoteStore<T>,
    flags: &ListFlags,
    ctx: &FormatContext,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let filter = NoteFilter { search: flags.search.clone(), category: flags.category.clone() };
    let notes = view::visible_notes(store.notes(), &filter);

    if flags.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&notes)?)?;
        return Ok(());
    }
    if notes.is_empty() {
        if store.notes().is_empty() {
            writeln!(out, "No notes yet. Try `sn add <title> <content>`.")?;
        } else {
            writeln!(out, "No notes match.")?;
        }
        return Ok(());
    }

    let time = TimeFormatter::new(flags.relative_time, Utc::now());
    let search = flags.search.as_deref().map(str::trim);
    let updated_label = time.format_label("Updated");
    let mut headers: Vec<String> = ["", "ID", updated_label.as_str(), "Category", "Title", "Tags"]
        .iter()
        .map(|h| ctx.format_header(h))
        .collect();

    let mut rows: Vec<Vec<String>> = notes
        .iter()
        .map(|n| {
            vec![
                ctx.format_pin(n.is_pinned),
                ctx.format_id(&n.id),
                ctx.format_timestamp(&time.format(&n.updated_at)),
                ctx.format_category(&n.category),
                ctx.highlight_match(&n.title, search),
                ctx.format_tags(&n.tags),
            ]
        })
        .collect();

    let fixed: Vec<usize> = (0..headers.len())
        .map(|i| {
            rows.iter()
                .map(|r| display_len(&r[i]))
                .chain(std::iter::once(display_len(&headers[i])))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let width = preview_width(terminal_width(), &fixed);

    headers.push(ctx.format_header("Preview"));
    for (row, note) in rows.iter_mut().zip(&notes) {
        let preview = table::truncate_with_ellipsis(&note.content, width);
        row.push(ctx.highlight_match(&preview, search));
    }
    writeln!(out, "{}", render_table(&headers, &rows))?;
    Ok(())
}

fn view_note<T: Transport>(
    store: &NoteStore<T>,
    id: &str,
    ctx: &FormatContext,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let note = store
        .note(id)
        .ok_or_else(|| SyncError::NotFound(id.to_string()))?;
    let time = TimeFormatter::new(false, Utc::now());
    let pinned = if note.is_pinned { " [pinned]" } else { "" };
    writeln!(out, "# {} ({}){}", note.title, ctx.format_id(&note.id), pinned)?;
    writeln!(out, "Category: {}", ctx.format_category(&note.category))?;
    if !note.tags.is_empty() {
        writeln!(out, "Tags: {}", ctx.format_tags(&note.tags))?;
    }
    writeln!(out, "Created: {}", ctx.format_timestamp(&time.format(&note.created_at)))?;
    writeln!(out, "Updated: {}", ctx.format_timestamp(&time.format(&note.updated_at)))?;
    writeln!(out, "\n{}", note.content)?;
    Ok(())
}

fn add_note<T: Transport>(
    store: &mut NoteStore<T>,
    flags: AddFlags,
    config: &Config,
    ctx: &FormatContext,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let mut draft = NoteDraft::new(flags.title, flags.content);
    draft.category = flags.category.unwrap_or_else(|| config.default_category.clone());
    draft.tags = flags.tags;
    draft.is_pinned = flags.pin;
    let note = store.add(draft)?;
    writeln!(out, "Added note {} ({})", ctx.format_id(&note.id), note.title)?;
    Ok(())
}

/// Merge the given flags over the current note.
fn edit_note<T: Transport>(
    store: &mut NoteStore<T>,
    flags: EditFlags,
    ctx: &FormatContext,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let id = flags.id;
    let current = store
        .note(&id)
        .ok_or_else(|| SyncError::NotFound(id.clone()))?;
    let mut draft = NoteDraft::from(current);
    if let Some(title) = flags.title {
        draft.title = title;
    }
    if let Some(content) = flags.content {
        draft.content = content;
    }
    if let Some(category) = flags.category {
        draft.category = category;
    }
    for tag in &flags.remove_tags {
        if !tags::remove_tag(&mut draft.tags, tag) {
            return Err(format!("Note {id} has no tag '{tag}'").into());
        }
    }
    for tag in &flags.add_tags {
        if !tags::add_tag(&mut draft.tags, tag) {
            return Err(format!("Note {id} already has tag '{tag}'").into());
        }
    }
    if let Some(pin) = flags.pin {
        draft.is_pinned = pin;
    }
    let note = store.update(&id, draft)?;
    writeln!(out, "Updated note {} ({})", ctx.format_id(&note.id), note.title)?;
    Ok(())
}

fn delete_note<T: Transport>(
    store: &mut NoteStore<T>,
    id: &str,
    yes: bool,
    out: &mut impl Write,
    confirm: &mut dyn FnMut(&str) -> io::Result<bool>,
) -> Result<(), Box<dyn Error>> {
    if !yes {
        let label = match store.note(id) {
            Some(note) => format!("Delete \"{}\" ({})?", note.title, id),
            None => format!("Delete note {id}?"),
        };
        if !confirm(&label)? {
            writeln!(out, "Nothing deleted.")?;
            return Ok(());
        }
    }
    store.delete(id)?;
    writeln!(out, "Deleted {id}")?;
    Ok(())
}

fn confirm_on_stdin(prompt: &str) -> io::Result<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "{prompt} [y/N] ")?;
    stderr.flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn list_tags(
    notes: &[note::Note],
    ctx: &FormatContext,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let stats = tags::tag_stats(notes);
    if stats.is_empty() {
        writeln!(out, "No tags found.")?;
        return Ok(());
    }
    for (tag, stat) in stats {
        let first = stat
            .first
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "n/a".to_string());
        let last = stat
            .last
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "n/a".to_string());
        writeln!(
            out,
            "{} | count {:4} | first {} | last {}",
            pad_field(&ctx.format_tag(&tag), 15),
            stat.count,
            first,
            last
        )?;
    }
    Ok(())
}

fn show_stats(
    notes: &[note::Note],
    config: &Config,
    ctx: &FormatContext,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let stats = view::stats(notes);
    writeln!(out, "Notes:  {}", stats.total)?;
    writeln!(out, "Pinned: {}", stats.pinned)?;
    writeln!(out, "\n{}", ctx.format_header("By category"))?;
    let extra = stats
        .categories
        .keys()
        .filter(|c| !config.categories.contains(c));
    for category in config.categories.iter().chain(extra) {
        let count = stats.categories.get(category).copied().unwrap_or(0);
        writeln!(out, "  {} {:4}", pad_field(&ctx.format_category(category), 15), count)?;
    }
    Ok(())
}

fn list_categories(
    config: &Config,
    ctx: &FormatContext,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    for category in &config.categories {
        if category == &config.default_category {
            writeln!(out, "{} (default)", ctx.format_category(category))?;
        } else {
            writeln!(out, "{}", ctx.format_category(category))?;
        }
    }
    Ok(())
}

fn show_config(config: &Config, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let file = config::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none, using defaults)".to_string());
    let endpoint = match (&config.endpoint, config.endpoint()) {
        (_, Ok(endpoint)) => endpoint.as_str().to_string(),
        (None, Err(_)) => "(not set)".to_string(),
        (Some(raw), Err(err)) => format!("{raw} (invalid: {err})"),
    };
    writeln!(out, "Config file:      {file}")?;
    writeln!(out, "Endpoint:         {endpoint}")?;
    writeln!(out, "Default category: {}", config.default_category)?;
    writeln!(out, "Categories:       {}", config.categories.join(", "))?;
    Ok(())
}

fn ping<T: Transport>(gateway: &Gateway<T>, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    if !gateway.check_connectivity() {
        return Err(SyncError::Unreachable.into());
    }
    writeln!(out, "Connected to {}", gateway.endpoint().as_str())?;
    Ok(())
}

fn init_sheet<T: Transport>(
    gateway: &Gateway<T>,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    if !gateway.ensure_schema()? {
        return Err("The sheet did not confirm initialization".into());
    }
    writeln!(out, "Sheet is ready.")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Endpoint;
    use crate::sheet::MemorySheet;

    const URL: &str = "https://script.google.com/macros/s/test/exec";

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn loaded(sheet: &MemorySheet) -> NoteStore<&MemorySheet> {
        let gateway = Gateway::new(Endpoint::parse(URL).unwrap(), sheet);
        let mut store = NoteStore::new(gateway, "General");
        load(&mut store).unwrap();
        store
    }

    fn exec(store: &mut NoteStore<&MemorySheet>, cmd: &str, list: &[&str]) -> String {
        let config = Config::default();
        let command = NoteCommand::parse(cmd, args(list), &config).unwrap().unwrap();
        let mut out = Vec::new();
        run(
            command,
            store,
            &config,
            &FormatContext::new(false),
            &mut out,
            &mut |_| Ok(false),
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(NoteCommand::parse("frobnicate", vec![], &Config::default()).is_none());
        assert_eq!(
            NoteCommand::parse("tags", vec![], &Config::default()).unwrap().unwrap(),
            NoteCommand::Tags
        );
    }

    #[test]
    fn test_add_then_list() {
        let sheet = MemorySheet::with_header();
        let mut store = loaded(&sheet);
        let added = exec(&mut store, "add", &["Groceries", "milk", "-c", "todo", "-t", "home"]);
        assert!(added.starts_with("Added note "));
        assert_eq!(sheet.data_rows()[0][3], "Todo");
        assert_eq!(sheet.data_rows()[0][4], "home");

        let listed = exec(&mut store, "list", &[]);
        assert!(listed.contains("Groceries"));
        assert!(listed.contains("milk"));

        let none = exec(&mut store, "list", &["-s", "bread"]);
        assert_eq!(none.trim(), "No notes match.");
    }

    #[test]
    fn test_list_json() {
        let sheet = MemorySheet::with_header();
        sheet.push_row(["n1", "T", "C", "Work", "a, b", "2024-01-01T00:00:00.000Z",
                        "2024-01-02T00:00:00.000Z", "true"]);
        let mut store = loaded(&sheet);
        let out = exec(&mut store, "list", &["--json"]);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["id"], "n1");
        assert_eq!(value[0]["isPinned"], true);
        assert_eq!(value[0]["tags"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_edit_merges_flags() {
        let sheet = MemorySheet::with_header();
        sheet.push_row(["n1", "T", "C", "Work", "old", "2024-01-01T00:00:00.000Z",
                        "2024-01-01T00:00:00.000Z", "false"]);
        let mut store = loaded(&sheet);
        exec(&mut store, "edit", &["n1", "--untag", "old", "-t", "new", "--pin"]);
        let row = &sheet.data_rows()[0];
        assert_eq!(row[1], "T");
        assert_eq!(row[4], "new");
        assert_eq!(row[5], "2024-01-01T00:00:00.000Z");
        assert_ne!(row[6], "2024-01-01T00:00:00.000Z");
        assert_eq!(row[7], "true");
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let sheet = MemorySheet::with_header();
        sheet.push_row(["n1", "T", "C", "Work", "", "", "", "false"]);
        let mut store = loaded(&sheet);
        let declined = exec(&mut store, "delete", &["n1"]);
        assert_eq!(declined.trim(), "Nothing deleted.");
        assert_eq!(sheet.data_rows().len(), 1);

        exec(&mut store, "delete", &["n1", "--yes"]);
        assert!(sheet.data_rows().is_empty());
        assert!(store.notes().is_empty());
    }

    #[test]
    fn test_tags_and_stats() {
        let sheet = MemorySheet::with_header();
        sheet.push_row(["n1", "T", "C", "Work", "rust, cli", "", "", "true"]);
        sheet.push_row(["n2", "T", "C", "Work", "rust", "", "", "false"]);
        let mut store = loaded(&sheet);
        let tags = exec(&mut store, "tags", &[]);
        assert!(tags.lines().any(|l| l.starts_with("rust") && l.contains("count    2")));
        let stats = exec(&mut store, "stats", &[]);
        assert!(stats.contains("Notes:  2"));
        assert!(stats.contains("Pinned: 1"));
    }

    #[test]
    fn test_view_unknown_note() {
        let sheet = MemorySheet::with_header();
        let mut store = loaded(&sheet);
        let config = Config::default();
        let command = NoteCommand::parse("view", args(&["missing"]), &config).unwrap().unwrap();
        let mut out = Vec::new();
        let err = run(command, &mut store, &config, &FormatContext::new(false), &mut out, &mut |_| Ok(true))
            .unwrap_err();
        assert_eq!(err.to_string(), "Note missing not found");
    }

    #[test]
    fn test_load_failure_has_retry_hint() {
        let sheet = MemorySheet::with_header();
        sheet.set_offline(true);
        let gateway = Gateway::new(Endpoint::parse(URL).unwrap(), &sheet);
        let mut store = NoteStore::new(gateway, "General");
        let err = load(&mut store).unwrap_err().to_string();
        assert!(err.starts_with("Could not connect to the notes spreadsheet."));
        assert!(err.ends_with(RETRY_HINT));
    }
}
