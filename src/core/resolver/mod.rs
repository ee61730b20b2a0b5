//! Turns configured job definitions into validated, concrete job specs.
//!
//! Jobs come from the config file, the `REPOS` JSON variable, or the legacy
//! `FROM_REPO`/`TO_REPO` pair. Any value starting with `metadata:` is looked
//! up through a [`MetadataSource`] before use.

mod metadata;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use std::collections::HashSet;

use crate::core::models::JobSpec;
use crate::error::{ConfigError, Result};

pub use metadata::{DEFAULT_METADATA_URL, GceMetadata};

pub const METADATA_PREFIX: &str = "metadata:";
pub const LEGACY_JOB_ID: &str = "default";

/// Lookup of project-level attributes.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn project_attribute(&self, name: &str) -> AnyResult<String>;
}

/// Where the job list was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    Configured(Vec<JobSpec>),
    Json(String),
    Legacy { from: String, to: String },
}

impl JobSource {
    /// Pick the job source: config file jobs first, then `REPOS`, then the
    /// legacy pair. `lookup` reads environment variables.
    pub fn discover<F>(configured: Option<Vec<JobSpec>>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(jobs) = configured.filter(|jobs| !jobs.is_empty()) {
            return Ok(JobSource::Configured(jobs));
        }

        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(spec) = var("REPOS") {
            return Ok(JobSource::Json(spec));
        }

        match (var("FROM_REPO"), var("TO_REPO")) {
            (Some(from), Some(to)) => Ok(JobSource::Legacy { from, to }),
            _ => Err(ConfigError::NoJobs),
        }
    }
}

pub struct JobResolver<'a> {
    metadata: &'a dyn MetadataSource,
}

impl<'a> JobResolver<'a> {
    pub fn new(metadata: &'a dyn MetadataSource) -> Self {
        Self { metadata }
    }

    /// Resolve `value` through the metadata service if it carries the
    /// `metadata:` prefix, otherwise return it unchanged.
    pub async fn reconcile(&self, value: &str) -> Result<String> {
        let Some(key) = value.strip_prefix(METADATA_PREFIX) else {
            return Ok(value.to_string());
        };

        self.metadata
            .project_attribute(key)
            .await
            .map_err(|e| ConfigError::Metadata {
                key: value.to_string(),
                message: format!("{:#}", e),
            })
    }

    pub async fn resolve(&self, source: JobSource) -> Result<Vec<JobSpec>> {
        let specs = match source {
            JobSource::Configured(specs) => specs,
            JobSource::Json(raw) => {
                let raw = self.reconcile(&raw).await?;
                serde_json::from_str(&raw)?
            }
            JobSource::Legacy { from, to } => vec![JobSpec::new(LEGACY_JOB_ID, from, to)],
        };

        if specs.is_empty() {
            return Err(ConfigError::NoJobs);
        }
        validate(&specs)?;

        let mut resolved = Vec::with_capacity(specs.len());
        for spec in specs {
            let from = self.reconcile(&spec.from).await?;
            let to = self.reconcile(&spec.to).await?;
            resolved.push(JobSpec::new(spec.id, from, to));
        }

        validate(&resolved)?;
        Ok(resolved)
    }
}

/// Check every job has an ID, a source and a destination, and that IDs are
/// unique and usable as directory names.
pub fn validate(specs: &[JobSpec]) -> Result<()> {
    let mut seen = HashSet::new();

    for (index, spec) in specs.iter().enumerate() {
        if spec.id.is_empty() {
            return Err(ConfigError::MissingId { index });
        }
        if spec.from.is_empty() || spec.to.is_empty() {
            return Err(ConfigError::MissingEndpoint {
                id: spec.id.clone(),
            });
        }
        if spec.id == "."
            || spec.id == ".."
            || spec.id.contains(['/', '\\'])
            || spec.id.contains('\0')
        {
            return Err(ConfigError::InvalidId {
                id: spec.id.clone(),
            });
        }
        if !seen.insert(spec.id.as_str()) {
            return Err(ConfigError::DuplicateId(spec.id.clone()));
        }
    }

    Ok(())
}
