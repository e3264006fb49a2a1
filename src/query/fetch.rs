//! JSON over HTTP for the polling loops and the config loader

use std::time::Duration;
use thiserror::Error;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{url} :: timeout")]
    Timeout { url: String },

    #[error("{url} :: connection failed")]
    Connect { url: String },

    #[error("{url} :: {status}{}", message_suffix(.message))]
    Status {
        url: String,
        status: u16,
        message: Option<String>,
    },

    #[error("{url} :: invalid JSON: {reason}")]
    Decode { url: String, reason: String },

    #[error("{url} :: response has no `{field}` field")]
    MissingField { url: String, field: &'static str },

    #[error("failed to create HTTP client: {0}")]
    Client(String),

    #[error("{url} :: {reason}")]
    Other { url: String, reason: String },
}

/// Anything that can GET a URL and hand back parsed JSON
pub trait JsonFetcher: Send + Sync + 'static {
    fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError>;
}

/// Blocking reqwest client, meant to be called from the polling threads
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl JsonFetcher for HttpFetcher {
    fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| classify(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        let body = response.text().map_err(|e| classify(url, &e))?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" :: {}", m))
        .unwrap_or_default()
}

fn classify(url: &str, e: &reqwest::Error) -> FetchError {
    let url = url.to_string();
    if e.is_timeout() {
        FetchError::Timeout { url }
    } else if e.is_connect() {
        FetchError::Connect { url }
    } else {
        FetchError::Other {
            url,
            reason: e.to_string(),
        }
    }
}

/// Extract error message from a JSON error body
fn extract_error_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    if let Some(error) = json.get("error") {
        if let Some(msg) = error.get("message") {
            return msg.as_str().map(|s| s.to_string());
        }
        if error.is_string() {
            return error.as_str().map(|s| s.to_string());
        }
    }
    json.get("message")
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}
