use anyhow::{Context, Result};
use azinv::azure::client::ArmClient;
use azinv::azure::http::format_arm_error;
use azinv::azure::resource_groups;
use azinv::cancel;
use azinv::config::ConnectionConfig;
use azinv::ratelimit::get_registry;
use azinv::retry::RetryPolicy;
use azinv::scope::QueryScope;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Retry, rate-limit and resource group scoping for Azure inventory
#[derive(Parser, Debug)]
#[command(name = "azinv", version, about, long_about = None)]
struct Args {
    /// Connection config file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the retry backoff schedule for the connection
    Backoff,

    /// List the built-in rate limiter definitions
    Limiters,

    /// Resolve the connection's effective resource groups
    Scope {
        /// Bearer token for ARM (defaults to AZURE_ACCESS_TOKEN)
        #[arg(long, env = "AZURE_ACCESS_TOKEN", hide_env_values = true)]
        token: String,

        /// Abort the query after this many seconds
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("azinv started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("azinv").join("azinv.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".azinv").join("azinv.log");
    }
    PathBuf::from("azinv.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let config = match &args.config {
        Some(path) => ConnectionConfig::load_from(path)?,
        None => ConnectionConfig::load()?,
    };

    match args.command {
        Command::Backoff => print_backoff(&config),
        Command::Limiters => print_limiters(),
        Command::Scope { token, timeout } => {
            resolve_scope(&config, &token, Duration::from_secs(timeout)).await?
        }
    }

    Ok(())
}

fn print_backoff(config: &ConnectionConfig) {
    let policy = RetryPolicy::from_config(&config.retry_config());
    println!(
        "max attempts: {}, base delay: {:?}",
        policy.max_attempts(),
        policy.base_delay()
    );
    println!("{:<6} {:>14} {:>14}", "RETRY", "MIN", "MAX");
    for retry in 0..policy.max_attempts() {
        println!(
            "{:<6} {:>14?} {:>14?}",
            retry,
            policy.delay_with_jitter(retry, azinv::retry::policy::JITTER_MIN),
            policy.delay_with_jitter(retry, azinv::retry::policy::JITTER_MAX),
        );
    }
}

fn print_limiters() {
    for def in get_registry().definitions() {
        println!(
            "{:<40} fill={:<6} burst={:<6} scope=[{}]",
            def.name,
            def.fill_rate,
            def.bucket_size,
            def.scope.join(", ")
        );
        println!("    where {}", def.selector);
    }
}

async fn resolve_scope(config: &ConnectionConfig, token: &str, timeout: Duration) -> Result<()> {
    let client = ArmClient::new(config, token)?;
    let (canceller, signal) = cancel::pair();

    // Query timeout and Ctrl-C both cancel in-flight calls and backoffs
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => tracing::warn!("Query timed out after {:?}", timeout),
            _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
        }
        canceller.cancel();
    });

    let query = QueryScope::new();
    let filter = config.resource_group_filter();

    match resource_groups::resolve_scope(&client, &query, &filter, &signal).await {
        Ok(scope) if scope.is_unrestricted() => println!("(all resource groups)"),
        Ok(scope) => {
            for rg in scope.iter() {
                println!("{}", rg);
            }
        }
        Err(e) => {
            tracing::error!("Scope resolution failed: {}", e);
            anyhow::bail!("{}", format_arm_error(&e));
        }
    }

    Ok(())
}
