use std::error::Error;

use crate::config::Config;

pub struct ArgParser {
    iter: std::vec::IntoIter<String>,
    command_name: String,
}

impl ArgParser {
    pub fn new(args: Vec<String>, command_name: &str) -> Self {
        Self { iter: args.into_iter(), command_name: command_name.to_string() }
    }

    /// Extract a single tag from -t/--tag or --untag
    pub fn extract_tag(&mut self, flag: &str) -> Result<String, Box<dyn Error>> {
        let raw = self.extract_value(flag)?;
        let tag = raw.trim();
        if tag.is_empty() || tag.contains(',') {
            return Err(format!(
                "Invalid tag '{}' provided to {} (tags cannot be empty or contain commas)",
                raw, self.command_name
            )
            .into());
        }
        Ok(tag.to_string())
    }

    /// Extract a category and resolve it against the configured list
    pub fn extract_category(
        &mut self,
        flag: &str,
        config: &Config,
    ) -> Result<String, Box<dyn Error>> {
        let raw = self.extract_value(flag)?;
        config
            .resolve_category(&raw)
            .map(str::to_string)
            .ok_or_else(|| {
                format!(
                    "Unknown category '{}'. Choose one of: {}",
                    raw.trim(),
                    config.categories.join(", ")
                )
                .into()
            })
    }

    /// Extract a string value for a flag
    pub fn extract_value(&mut self, flag: &str) -> Result<String, Box<dyn Error>> {
        self.iter.next().ok_or_else(|| {
            format!("Provide a value after {} for {}", flag, self.command_name).into()
        })
    }

    /// Check if there are remaining arguments
    pub fn has_more(&self) -> bool {
        self.iter.len() > 0
    }

    /// Get next positional argument
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<String> {
        self.iter.next()
    }

    /// Collect remaining args
    pub fn collect_remaining(self) -> Vec<String> {
        self.iter.collect()
    }

    fn by_ref_remaining(&mut self) -> Vec<String> {
        self.iter.by_ref().collect()
    }

    fn unexpected(&self, arg: &str) -> Box<dyn Error> {
        format!("Unknown flag for {}: {}", self.command_name, arg).into()
    }

    fn expect_id(&mut self) -> Result<String, Box<dyn Error>> {
        match self.next() {
            Some(id) if !id.starts_with('-') => Ok(id),
            _ => Err(format!("Usage: {} <id>", self.command_name).into()),
        }
    }
}

/// Remove the global `--plain` flag wherever it appears.
pub fn take_plain_flag(args: &mut Vec<String>) -> bool {
    let before = args.len();
    args.retain(|a| a != "--plain");
    args.len() != before
}

#[derive(Default, Debug, PartialEq, Eq)]
pub struct ListFlags {
    pub search: Option<String>,
    pub category: Option<String>,
    pub relative_time: bool,
    pub json: bool,
}

pub fn parse_list(args: Vec<String>, config: &Config) -> Result<ListFlags, Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "list");
    let mut flags = ListFlags::default();
    while let Some(arg) = parser.next() {
        match arg.as_str() {
            "-s" | "--search" => flags.search = Some(parser.extract_value(&arg)?),
            "-c" | "--category" => {
                flags.category = Some(parser.extract_category(&arg, config)?)
            }
            "-r" | "--relative" => flags.relative_time = true,
            "--json" => flags.json = true,
            other => return Err(parser.unexpected(other)),
        }
    }
    Ok(flags)
}

#[derive(Debug, PartialEq, Eq)]
pub struct AddFlags {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub pin: bool,
}

/// `add <title> <content...>`; content words are joined with spaces.
pub fn parse_add(args: Vec<String>, config: &Config) -> Result<AddFlags, Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "add");
    let mut positional = Vec::new();
    let mut category = None;
    let mut tags: Vec<String> = Vec::new();
    let mut pin = false;
    while let Some(arg) = parser.next() {
        match arg.as_str() {
            "-c" | "--category" => category = Some(parser.extract_category(&arg, config)?),
            "-t" | "--tag" => {
                let tag = parser.extract_tag(&arg)?;
                if !crate::tags::add_tag(&mut tags, &tag) {
                    return Err(format!("Tag '{}' given more than once", tag).into());
                }
            }
            "--pin" => pin = true,
            "--" => positional.extend(parser.by_ref_remaining()),
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(parser.unexpected(other));
            }
            _ => positional.push(arg),
        }
    }
    let mut positional = positional.into_iter();
    let (Some(title), content) = (positional.next(), positional.collect::<Vec<_>>()) else {
        return Err("Usage: add <title> <content...> [-c category] [-t tag]... [--pin]".into());
    };
    Ok(AddFlags { title, content: content.join(" "), category, tags, pin })
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct EditFlags {
    pub id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
    pub pin: Option<bool>,
}

impl EditFlags {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.add_tags.is_empty()
            && self.remove_tags.is_empty()
            && self.pin.is_none()
    }
}

pub fn parse_edit(args: Vec<String>, config: &Config) -> Result<EditFlags, Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "edit");
    let mut flags = EditFlags { id: parser.expect_id()?, ..Default::default() };
    while let Some(arg) = parser.next() {
        match arg.as_str() {
            "--title" => flags.title = Some(parser.extract_value(&arg)?),
            "--content" => flags.content = Some(parser.extract_value(&arg)?),
            "-c" | "--category" => {
                flags.category = Some(parser.extract_category(&arg, config)?)
            }
            "-t" | "--tag" => flags.add_tags.push(parser.extract_tag(&arg)?),
            "--untag" => flags.remove_tags.push(parser.extract_tag(&arg)?),
            "--pin" => flags.pin = Some(true),
            "--unpin" => flags.pin = Some(false),
            other => return Err(parser.unexpected(other)),
        }
    }
    if flags.is_empty() {
        return Err("Nothing to change. Pass --title, --content, -c, -t, --untag, --pin or --unpin".into());
    }
    Ok(flags)
}

/// Commands taking a single note id.
pub fn parse_id(args: Vec<String>, command: &str) -> Result<String, Box<dyn Error>> {
    let mut parser = ArgParser::new(args, command);
    let id = parser.expect_id()?;
    if let Some(extra) = parser.next() {
        return Err(parser.unexpected(&extra));
    }
    Ok(id)
}

/// `delete <id> [--yes]`
pub fn parse_delete(args: Vec<String>) -> Result<(String, bool), Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "delete");
    let id = parser.expect_id()?;
    let mut yes = false;
    while let Some(arg) = parser.next() {
        match arg.as_str() {
            "-y" | "--yes" => yes = true,
            other => return Err(parser.unexpected(other)),
        }
    }
    Ok((id, yes))
}

/// Reject arguments for commands that take none.
pub fn expect_none(args: Vec<String>, command: &str) -> Result<(), Box<dyn Error>> {
    let parser = ArgParser::new(args, command);
    match parser.collect_remaining().first() {
        Some(extra) => Err(format!("Unexpected argument for {}: {}", command, extra).into()),
        None => Ok(()),
    }
}
