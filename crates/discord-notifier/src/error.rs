use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Field-level problems found while validating agent options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.iter().any(|m| m.contains(needle))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid agent options: {0}")]
    InvalidOptions(ValidationErrors),

    #[error("request to Discord failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{context} ({}): {source}", .path.display())]
    Store {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn store(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Store {
            context,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
