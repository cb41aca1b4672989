use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    ParseError(String),
    NetworkError(String),
    Http { status: u16, detail: Option<String> },
    SecurityError(String),
    IoError(String),
    ConfigError(String),
    Unauthenticated,
    Cancelled,
    /// Normalized failure surfaced to the view layer. Displays as the bare message.
    Request(String),
}

impl AppError {
    /// Message shown to the user for this failure.
    ///
    /// A detail supplied by the server wins; local validation failures and
    /// already normalized request errors keep their message; everything else
    /// collapses to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AppError::Http {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            AppError::Request(msg) | AppError::ValidationError(msg) => msg.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Normalizes this error into `AppError::Request` using `fallback`.
    pub fn into_request(self, fallback: &str) -> AppError {
        AppError::Request(self.user_message(fallback))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            AppError::Http {
                status,
                detail: Some(detail),
            } => write!(f, "HTTP {}: {}", status, detail),
            AppError::Http { status, detail: None } => write!(f, "HTTP {}", status),
            AppError::SecurityError(msg) => write!(f, "Security error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::Unauthenticated => write!(f, "Not signed in"),
            AppError::Cancelled => write!(f, "Request cancelled"),
            AppError::Request(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| match &err.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        AppError::ValidationError(messages.join("; "))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
