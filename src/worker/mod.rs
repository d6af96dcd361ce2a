//! Process execution for admitted jobs.
//!
//! - [`ProcessRunner`]: the seam the lifecycle controller calls
//! - [`CommandRunner`]: spawns the job's argv with `tokio::process`
//!
//! Output routing is controlled by [`RunnerConfig`](crate::config::RunnerConfig):
//! either the child inherits our stdout/stderr, or stdout is dropped and the
//! last stderr line is folded into the failure description. The outcome is
//! decided when the child exits, even if a grandchild still holds stderr.

pub mod executor;

pub use executor::{CommandRunner, ProcessRunner, RunOutcome};
