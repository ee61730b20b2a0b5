use std::sync::Arc;

use super::job::Job;
use super::models::JobSpec;
use super::resolver;
use crate::error::Result;

/// The fixed set of jobs for this process, in declaration order.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Vec<Arc<Job>>,
}

impl JobRegistry {
    /// Build the registry, rejecting missing fields and duplicate IDs.
    pub fn new(specs: Vec<JobSpec>) -> Result<Self> {
        resolver::validate(&specs)?;

        Ok(Self {
            jobs: specs.into_iter().map(|s| Arc::new(Job::new(s))).collect(),
        })
    }

    pub fn jobs(&self) -> &[Arc<Job>] {
        &self.jobs
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Job>> {
        self.jobs.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Job>> {
        self.jobs.iter().find(|job| job.id() == id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
