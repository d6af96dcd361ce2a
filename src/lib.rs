pub mod config;
pub mod dashboard;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod shutdown;
pub mod store;
pub mod viewer;
pub mod worker;

pub use error::{CronlockError, Result};
pub use lifecycle::{JobController, JobOutcome};
