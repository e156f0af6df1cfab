use std::{fmt, io};

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum NavigationError {
    #[error("Navigation tree cannot hold more than {0} nodes")]
    Capacity(usize),
    #[error("Navigation configuration error: {0}")]
    Configuration(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("Navigation extension '{module}' failed: {message}")]
    Extension { module: String, message: String },
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("Repository error: {0}")]
    Repository(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Stale node reference: {0}")]
    StaleNode(String),
}

impl NavigationError {
    pub fn not_found(what: impl fmt::Display) -> Self {
        NavigationError::NotFound(what.to_string())
    }

    pub fn configuration(what: impl fmt::Display) -> Self {
        NavigationError::Configuration(what.to_string())
    }

    /// Whether the failure only concerns a missing record, as opposed to a broken collaborator.
    pub fn is_not_found(&self) -> bool {
        matches!(self, NavigationError::NotFound(_))
    }
}

impl From<toml::de::Error> for NavigationError {
    fn from(src: toml::de::Error) -> NavigationError {
        NavigationError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for NavigationError {
    fn from(src: toml::ser::Error) -> NavigationError {
        NavigationError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for NavigationError {
    fn from(src: JsonError) -> NavigationError {
        NavigationError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<UrlParseError> for NavigationError {
    fn from(src: UrlParseError) -> NavigationError {
        NavigationError::Serialization(format!("Invalid locator: {src}"))
    }
}

impl From<io::Error> for NavigationError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => NavigationError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => NavigationError::PermissionDenied,
            _ => NavigationError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for NavigationError {
    fn from(x: fmt::Error) -> Self {
        NavigationError::Custom(format!("{x}"))
    }
}
