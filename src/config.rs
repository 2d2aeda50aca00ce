use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, GatewayError};
use crate::gateway::Endpoint;
use crate::note::DEFAULT_CATEGORY;

pub const ENDPOINT_VAR: &str = "SHEET_NOTES_ENDPOINT";
pub const CONFIG_VAR: &str = "SHEET_NOTES_CONFIG";
pub const CATEGORIES_VAR: &str = "SHEET_NOTES_CATEGORIES";
pub const DEFAULT_CATEGORY_VAR: &str = "SHEET_NOTES_DEFAULT_CATEGORY";

const DEFAULT_CATEGORIES: &[&str] =
    &["General", "Work", "Personal", "Project", "Ideas", "Todo"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub endpoint: Option<String>,
    pub default_category: String,
    pub categories: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            default_category: DEFAULT_CATEGORY.to_string(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Config {
    /// File (when present) overridden by environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.normalize();
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup(ENDPOINT_VAR) {
            self.endpoint = Some(endpoint);
        }
        if let Some(list) = lookup(CATEGORIES_VAR) {
            self.categories = list
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
        if let Some(default) = lookup(DEFAULT_CATEGORY_VAR) {
            self.default_category = default;
        }
        self.normalize();
    }

    /// The default category is always selectable.
    fn normalize(&mut self) {
        self.default_category = self.default_category.trim().to_string();
        if self.default_category.is_empty() {
            self.default_category = DEFAULT_CATEGORY.to_string();
        }
        if !self.categories.iter().any(|c| c == &self.default_category) {
            self.categories.insert(0, self.default_category.clone());
        }
    }

    pub fn endpoint(&self) -> Result<Endpoint, GatewayError> {
        match self.endpoint.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Endpoint::parse(url),
            _ => Err(GatewayError::Configuration(format!(
                "set {ENDPOINT_VAR} or `endpoint` in the config file to your \
                 Apps Script web app URL"
            ))),
        }
    }

    /// Match a category case-insensitively, returning the configured spelling.
    pub fn resolve_category(&self, input: &str) -> Option<&str> {
        let wanted = input.trim();
        self.categories
            .iter()
            .find(|c| c.to_lowercase() == wanted.to_lowercase())
            .map(String::as_str)
    }
}

/// `$SHEET_NOTES_CONFIG`, else `~/.config/sheet_notes/config.toml`; only
/// returned when the file exists.
pub fn config_path() -> Option<PathBuf> {
    let path = match std::env::var(CONFIG_VAR) {
        Ok(path) => PathBuf::from(path),
        Err(_) => PathBuf::from(std::env::var("HOME").ok()?)
            .join(".config")
            .join("sheet_notes")
            .join("config.toml"),
    };
    path.exists().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_category, "General");
        assert_eq!(config.categories.len(), 6);
        assert!(config.endpoint().is_err());
    }

    #[test]
    fn test_from_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            "endpoint = \"https://script.google.com/macros/s/abc/exec\"\n\
             default_category = \"Inbox\"\n\
             categories = [\"Work\", \"Home\"]\n",
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.categories, vec!["Inbox", "Work", "Home"]);
        assert!(config.endpoint().is_ok());
    }

    #[test]
    fn test_from_file_errors() {
        let tmp = tempdir().unwrap();
        let missing = Config::from_file(&tmp.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let path = tmp.path().join("bad.toml");
        fs::write(&path, "endpoints = 3").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENDPOINT_VAR, "YOUR_WEB_APP_URL"),
            (CATEGORIES_VAR, "Work, ,Travel"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.categories, vec!["General", "Work", "Travel"]);
        assert!(matches!(
            config.endpoint(),
            Err(GatewayError::Configuration(_))
        ));
    }

    #[test]
    fn test_resolve_category() {
        let config = Config::default();
        assert_eq!(config.resolve_category(" work "), Some("Work"));
        assert_eq!(config.resolve_category("Chores"), None);
    }
}
