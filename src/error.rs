//! Startup errors. Any of these aborts the process before mirroring begins.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("{key} must be between {min} and {max} seconds, got {value}")]
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("REPOS environment variable must be set")]
    NoJobs,

    #[error("Could not parse REPOS: {0}")]
    ParseJobs(#[from] serde_json::Error),

    #[error("Missing ID for job #{index}")]
    MissingId { index: usize },

    #[error("Empty from or to for job {id:?}")]
    MissingEndpoint { id: String },

    #[error("Job ID {id:?} cannot be used as a directory name")]
    InvalidId { id: String },

    #[error("Duplicate job ID {0:?}")]
    DuplicateId(String),

    #[error("Could not get project metadata value {key:?}: {message}")]
    Metadata { key: String, message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
