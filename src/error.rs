// src/error.rs

//! Error types for repository loading and checking

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a run before any verdict is produced
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while opening or reading an input
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed metadata content
    #[error("parse error: {0}")]
    Parse(String),

    /// A repository could not be added to the pool
    #[error("could not add repo {repo}: {message}")]
    Repo { repo: String, message: String },
}

impl Error {
    /// Attach the repository name to a loader error.
    pub fn in_repo(self, repo: &str) -> Self {
        match self {
            Error::Repo { .. } => self,
            other => Error::Repo {
                repo: repo.to_string(),
                message: other.to_string(),
            },
        }
    }
}
