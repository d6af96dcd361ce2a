use thiserror::Error;

/// Hard errors. A skipped invocation or a failed job are normal outcomes and
/// never surface here.
#[derive(Error, Debug)]
pub enum CronlockError {
    #[error("No command given")]
    EmptyCommand,

    #[error("Store unavailable after {attempts} attempt(s): {reason}")]
    StoreUnavailable { attempts: u32, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Invalid key pattern: {0}")]
    InvalidPattern(#[from] glob::PatternError),

    #[error("Malformed job record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CronlockError>;
