use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use cronlock::config::{DashboardConfig, LockConfig, RunnerConfig, StoreConfig};
use cronlock::dashboard::{self, DashboardState};
use cronlock::shutdown::install_shutdown_handler;
use cronlock::store::RedisStore;
use cronlock::viewer::{self, JobRow};
use cronlock::worker::CommandRunner;
use cronlock::{JobController, JobOutcome};

#[derive(Parser, Debug)]
#[command(name = "cronlock")]
#[command(version)]
#[command(about = "Distributed lock for cron jobs, backed by Redis")]
#[command(propagate_version = true)]
struct Args {
    #[command(flatten)]
    store: StoreArgs,

    /// Enable debug logging
    #[arg(long, global = true, env = "CRONLOCK_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a command unless another invocation of it holds the lock
    Run(RunArgs),

    /// List job records
    List {
        /// Output format
        #[arg(long, short = 'o', default_value = "table")]
        output: OutputFormat,
    },

    /// Serve the web dashboard
    Web(WebArgs),
}

// =============================================================================
// Arguments
// =============================================================================

#[derive(clap::Args, Debug)]
struct StoreArgs {
    /// Redis host
    #[arg(long, global = true, env = "CRONLOCK_REDIS_HOST", default_value = "localhost")]
    redis_host: String,

    /// Redis port
    #[arg(long, global = true, env = "CRONLOCK_REDIS_PORT", default_value = "6379")]
    redis_port: u16,

    /// Redis logical database index
    #[arg(long, global = true, env = "CRONLOCK_REDIS_DATABASE", default_value = "0")]
    redis_db: u32,

    /// Connection attempts before giving up
    #[arg(long, global = true, env = "CRONLOCK_RETRY_ATTEMPTS", default_value = "5")]
    retry_attempts: u32,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Seconds the lock is held before it auto-expires (0 = never)
    #[arg(long, env = "CRONLOCK_TIMEOUT", default_value = "3600")]
    timeout: u64,

    /// Keep finished records forever
    #[arg(long, env = "CRONLOCK_KEEP_HISTORY")]
    keep_history: bool,

    /// Seconds a finished record stays visible when history is not kept
    #[arg(long, env = "CRONLOCK_GRACE_PERIOD", default_value = "5")]
    grace_period: u64,

    /// Pass the job's stdout/stderr through
    #[arg(long, env = "CRONLOCK_PRINT_STDOUT")]
    print_stdout: bool,

    /// Log the job's arguments before running
    #[arg(long, env = "CRONLOCK_PRINT_ARGS")]
    print_args: bool,

    /// The command to run and its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    argv: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct WebArgs {
    /// Address to bind
    #[arg(long, env = "CRONWEB_HOST", default_value = "localhost")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "CRONWEB_PORT", default_value = "8080")]
    port: u16,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl StoreArgs {
    fn config(&self) -> StoreConfig {
        StoreConfig {
            host: self.redis_host.clone(),
            port: self.redis_port,
            database: self.redis_db,
            retry_attempts: self.retry_attempts,
            ..StoreConfig::default()
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn handle_run(store: StoreConfig, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.print_args {
        tracing::info!(args = ?args.argv, "Job arguments");
    }

    let redis = RedisStore::connect(&store).await?;

    let lock = LockConfig {
        lock_ttl_secs: args.timeout,
        keep_history: args.keep_history,
        grace_period_secs: args.grace_period,
    };
    let runner = CommandRunner::new(RunnerConfig {
        print_output: args.print_stdout,
    });
    let controller = JobController::new(Arc::new(redis), Arc::new(runner), lock);

    match controller.run(args.argv).await? {
        JobOutcome::Finished(record) => {
            tracing::debug!(
                fingerprint = %record.fingerprint,
                status = %record.status,
                "Invocation finished"
            );
        }
        JobOutcome::Skipped(record) => {
            tracing::debug!(fingerprint = %record.fingerprint, "Invocation skipped");
        }
    }
    Ok(())
}

async fn handle_list(
    store: StoreConfig,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let redis = RedisStore::connect(&store).await?;
    let now = chrono::Utc::now().timestamp();
    let rows = viewer::list_jobs(&redis, now).await?;

    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => print_table(&rows),
    }
    Ok(())
}

fn print_table(rows: &[JobRow]) {
    if rows.is_empty() {
        println!("No jobs found.");
        return;
    }

    println!(
        "{:<34} {:<10} {:<21} {:>8}  COMMAND",
        "HASH", "STATUS", "STARTED", "DURATION"
    );
    println!("{}", "-".repeat(96));
    for row in rows {
        // Truncate command if too long
        let cmd_display = if row.command.chars().count() > 40 {
            format!("{}...", row.command.chars().take(37).collect::<String>())
        } else {
            row.command.clone()
        };
        println!(
            "{:<34} {:<10} {:<21} {:>7}s  {}",
            row.fingerprint,
            row.status.to_string(),
            row.started,
            row.duration_secs,
            cmd_display
        );
        if !row.error.is_empty() {
            println!("{:<34} error: {}", "", row.error);
        }
    }
    println!();
    println!("{} job(s)", rows.len());
}

async fn handle_web(store: StoreConfig, args: WebArgs) -> Result<(), Box<dyn std::error::Error>> {
    let redis = RedisStore::connect(&store).await?;
    let config = DashboardConfig {
        host: args.host,
        port: args.port,
    };

    let shutdown = install_shutdown_handler("dashboard")?;
    let state = DashboardState {
        store: Arc::new(redis),
    };
    dashboard::run_dashboard(&config.addr(), state, shutdown).await?;
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.debug);

    let store = args.store.config();
    match args.command {
        Commands::Run(run_args) => handle_run(store, run_args).await?,
        Commands::List { output } => handle_list(store, output).await?,
        Commands::Web(web_args) => handle_web(store, web_args).await?,
    }

    Ok(())
}
