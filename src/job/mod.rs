pub mod fingerprint;
pub mod record;

pub use fingerprint::fingerprint;
pub use record::{JobRecord, JobStatus};
