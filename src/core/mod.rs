pub mod job;
pub mod mirror;
pub mod models;
pub mod orchestrator;
pub mod pacing;
pub mod registry;
pub mod resolver;
pub mod vcs;

pub use job::Job;
pub use mirror::{Mirror, MirrorPhase, MirrorSettings, SyncOutcome, SyncStep};
pub use models::{JobSpec, JobStatus, StatusDetail};
pub use orchestrator::Orchestrator;
pub use pacing::{Cancelled, RetryPolicy, SyncLimiter, Timer, TokenBucket, TokioTimer};
pub use registry::JobRegistry;
pub use vcs::{PushRefs, Vcs, VcsError, VcsResult};
