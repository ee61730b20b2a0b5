use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::vcs::VcsError;

/// One source to destination pair as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(default, rename = "id", alias = "ID", alias = "Id")]
    pub id: String,
    #[serde(default, rename = "from", alias = "From")]
    pub from: String,
    #[serde(default, rename = "to", alias = "To")]
    pub to: String,
}

impl JobSpec {
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Point-in-time copy of a job's public status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub ok: bool,
    pub time: DateTime<Utc>,
    pub message: String,
}

/// Supplementary values attached to a status update. Only ever logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusDetail {
    pub error: Option<String>,
    pub output: Option<Vec<u8>>,
}

impl StatusDetail {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn output(output: impl Into<Vec<u8>>) -> Self {
        let output = output.into();
        Self {
            error: None,
            output: (!output.is_empty()).then_some(output),
        }
    }

    pub fn message(error: impl std::fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            output: None,
        }
    }

    pub fn from_vcs(error: &VcsError) -> Self {
        Self {
            error: Some(error.to_string()),
            output: error.output().map(<[u8]>::to_vec),
        }
    }

    /// Label, then error, then output, one per line.
    pub fn render(&self, label: &str) -> String {
        let mut buf = String::with_capacity(label.len() + 1);
        buf.push_str(label);
        buf.push('\n');

        if let Some(error) = &self.error {
            buf.push_str(error);
            buf.push('\n');
        }

        if let Some(output) = &self.output {
            buf.push_str(&String::from_utf8_lossy(output));
            if !buf.ends_with('\n') {
                buf.push('\n');
            }
        }

        buf
    }
}
