use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the remote notes endpoint.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Notes endpoint is not configured correctly: {0}")]
    Configuration(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error! status: {status}, response: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid JSON response: {0}")]
    Protocol(String),
    #[error("{0}")]
    Remote(String),
}

impl GatewayError {
    /// Network failures and non-success HTTP statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Network(_) | GatewayError::Status { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteAction {
    Add,
    Update,
    Delete,
    Pin,
}

impl NoteAction {
    fn verb(self) -> &'static str {
        match self {
            NoteAction::Add => "adding",
            NoteAction::Update => "updating",
            NoteAction::Delete => "deleting",
            NoteAction::Pin => "pinning",
        }
    }
}

impl std::fmt::Display for NoteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

/// Failures surfaced by the note store. `Display` is the user-facing message.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(
        "Could not connect to the notes spreadsheet. Check your internet connection."
    )]
    Unreachable,
    #[error("{0}")]
    Validation(String),
    #[error("Note {0} not found")]
    NotFound(String),
    #[error("Something went wrong while {0} the note")]
    Rejected(NoteAction),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_class() {
        let status = GatewayError::Status { status: 500, body: "boom".into() };
        assert!(status.is_transport());
        assert!(!GatewayError::Protocol("x".into()).is_transport());
        assert!(!GatewayError::Remote("x".into()).is_transport());
    }

    #[test]
    fn test_remote_error_is_verbatim() {
        let err = GatewayError::Remote("Sheet not found".into());
        assert_eq!(err.to_string(), "Sheet not found");
        let sync: SyncError = err.into();
        assert_eq!(sync.to_string(), "Sheet not found");
    }

    #[test]
    fn test_rejected_message() {
        let err = SyncError::Rejected(NoteAction::Add);
        assert_eq!(err.to_string(), "Something went wrong while adding the note");
    }
}
