//! Error types for the low-memory killer library.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum LmkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("Failed to signal pid {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: io::Error,
    },

    #[error("Failed to reclaim memory of pid {pid}: {source}")]
    Reclaim {
        pid: i32,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported on this host: {0}")]
    Unsupported(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LmkError {
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        LmkError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        LmkError::Parse {
            what,
            detail: detail.into(),
        }
    }
}
