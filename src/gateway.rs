//! HTTP gateway to the Apps Script endpoint that fronts the notes sheet.
//!
//! Every operation is one request with no retries. Reads go out as
//! `GET ?action=...`, writes as a JSON `POST` carrying an `action` field, and
//! every reply is an envelope with `notes`, `success` or `error`.

use reqwest::blocking::Client;
use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::row::RemoteRow;

const ENDPOINT_PREFIX: &str = "https://script.google.com/macros/s/";
const ENDPOINT_SUFFIX: &str = "/exec";
const SNIPPET_LEN: usize = 200;

/// A validated script deployment URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self, GatewayError> {
        let url = url.trim();
        let deployment = url
            .strip_prefix(ENDPOINT_PREFIX)
            .and_then(|rest| rest.strip_suffix(ENDPOINT_SUFFIX));
        match deployment {
            Some(id) if !id.is_empty() && !id.contains('/') => {
                Ok(Self(url.to_string()))
            }
            _ => Err(GatewayError::Configuration(format!(
                "'{url}' is not an Apps Script web app URL \
                 ({ENDPOINT_PREFIX}<deployment>{ENDPOINT_SUFFIX})"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Raw result of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into() }
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single HTTP exchange against the endpoint.
pub trait Transport {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpReply, GatewayError>;

    fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, GatewayError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpReply, GatewayError> {
        (**self).get(url, query)
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, GatewayError> {
        (**self).post_json(url, body)
    }
}

/// Blocking `reqwest` transport. Redirects issued by the script host are
/// followed by the client.
pub struct HttpTransport {
    client: Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpReply, GatewayError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header(header::CONTENT_TYPE, "application/json")
            .send()?;
        let status = response.status().as_u16();
        Ok(HttpReply { status, body: response.text()? })
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, GatewayError> {
        let response = self.client.post(url).json(body).send()?;
        let status = response.status().as_u16();
        Ok(HttpReply { status, body: response.text()? })
    }
}

/// Write requests understood by the script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    AddNote {
        note: RemoteRow,
    },
    UpdateNote {
        #[serde(rename = "noteId")]
        note_id: String,
        note: RemoteRow,
    },
    DeleteNote {
        #[serde(rename = "noteId")]
        note_id: String,
    },
    InitializeSheet,
}

impl Request {
    fn name(&self) -> &'static str {
        match self {
            Request::AddNote { .. } => "addNote",
            Request::UpdateNote { .. } => "updateNote",
            Request::DeleteNote { .. } => "deleteNote",
            Request::InitializeSheet => "initializeSheet",
        }
    }
}

/// Reply envelope shared by every action.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    notes: Option<Vec<RemoteRow>>,
    #[serde(default)]
    success: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl Envelope {
    /// The script reports failures as a truthy `error` field.
    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn succeeded(&self) -> bool {
        matches!(self.success, Some(Value::Bool(true)))
    }
}

pub struct Gateway<T: Transport = HttpTransport> {
    endpoint: Endpoint,
    transport: T,
}

impl Gateway<HttpTransport> {
    pub fn http(endpoint: Endpoint) -> Self {
        Self::new(endpoint, HttpTransport::new())
    }
}

impl<T: Transport> Gateway<T> {
    pub fn new(endpoint: Endpoint, transport: T) -> Self {
        Self { endpoint, transport }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Every stored row. A sheet holding only its header yields no rows.
    pub fn list_all(&self) -> Result<Vec<RemoteRow>, GatewayError> {
        let envelope = self.fetch("getAllNotes")?;
        if let Some(message) = envelope.error_message() {
            return Err(GatewayError::Remote(message));
        }
        let rows = envelope.notes.unwrap_or_default();
        debug!(count = rows.len(), "fetched rows");
        Ok(rows)
    }

    pub fn create(&self, row: &RemoteRow) -> Result<bool, GatewayError> {
        self.write(&Request::AddNote { note: row.clone() })
    }

    /// `Ok(false)` when no row carries `id`.
    pub fn update(&self, id: &str, row: &RemoteRow) -> Result<bool, GatewayError> {
        self.write(&Request::UpdateNote {
            note_id: id.to_string(),
            note: row.clone(),
        })
    }

    pub fn delete(&self, id: &str) -> Result<bool, GatewayError> {
        self.write(&Request::DeleteNote { note_id: id.to_string() })
    }

    /// Create the header row if missing. Safe to repeat.
    pub fn ensure_schema(&self) -> Result<bool, GatewayError> {
        self.write(&Request::InitializeSheet)
    }

    /// Side-effect-free round trip; any failure reads as unreachable.
    pub fn check_connectivity(&self) -> bool {
        match self.fetch("testConnection") {
            Ok(envelope) => {
                if let Some(message) = envelope.error_message() {
                    warn!(%message, "connection test rejected");
                    return false;
                }
                envelope.succeeded()
            }
            Err(err) => {
                warn!(error = %err, "connection test failed");
                false
            }
        }
    }

    fn fetch(&self, action: &str) -> Result<Envelope, GatewayError> {
        debug!(action, "GET");
        let reply = self
            .transport
            .get(self.endpoint.as_str(), &[("action", action)])?;
        decode(reply)
    }

    fn write(&self, request: &Request) -> Result<bool, GatewayError> {
        let action = request.name();
        debug!(action, "POST");
        let body = serde_json::to_value(request)
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;
        let envelope = decode(self.transport.post_json(self.endpoint.as_str(), &body)?)?;
        if let Some(message) = envelope.error_message() {
            warn!(action, %message, "remote reported an error");
            return Ok(false);
        }
        Ok(envelope.succeeded())
    }
}

fn decode(reply: HttpReply) -> Result<Envelope, GatewayError> {
    if !reply.is_success() {
        return Err(GatewayError::Status {
            status: reply.status,
            body: snippet(&reply.body),
        });
    }
    serde_json::from_str(&reply.body)
        .map_err(|_| GatewayError::Protocol(snippet(&reply.body)))
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_LEN).collect()
}
