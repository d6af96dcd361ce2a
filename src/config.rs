use std::time::Duration;

/// Connection settings for the Redis backend.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    /// Logical database index (`SELECT n`).
    pub database: u32,
    /// Connection attempts before giving up. Always at least one attempt is made.
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
    /// Longest wait for a reply to any single command, including the
    /// initial `PING`.
    pub response_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            database: 0,
            retry_attempts: 5,
            retry_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Expiry policy for job records.
///
/// The lock TTL bounds how long a RUNNING record blocks other invocations of
/// the same job. Once the job finishes the record is rewritten with the
/// retention TTL instead.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Seconds the RUNNING record lives. 0 means it never expires on its own.
    pub lock_ttl_secs: u64,
    /// Keep finished records forever instead of expiring them.
    pub keep_history: bool,
    /// Seconds a finished record stays visible when history is not kept.
    pub grace_period_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: 3600,
            keep_history: false,
            grace_period_secs: 5,
        }
    }
}

impl LockConfig {
    pub fn lock_ttl(&self) -> Option<Duration> {
        ttl_from_secs(self.lock_ttl_secs)
    }

    pub fn retention_ttl(&self) -> Option<Duration> {
        if self.keep_history {
            None
        } else {
            ttl_from_secs(self.grace_period_secs)
        }
    }
}

fn ttl_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

/// How the job's own output is routed.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Let the child write straight to our stdout/stderr.
    pub print_output: bool,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
        }
    }
}

impl DashboardConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
