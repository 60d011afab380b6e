/// Version injected at compile time via DSPC_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("DSPC_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dspc::{
    CallContext, DspcClient, Instance, ProviderConfig, ResourceState, VirtualMachineResource,
    VmRecord,
};
use futures::future::join_all;
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Manage DSPC virtual machines declaratively
#[derive(Parser, Debug)]
#[command(name = "dspc", version = VERSION, about, long_about = None)]
struct Args {
    /// DSPC API endpoint (falls back to DSPC_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// API key (falls back to DSPC_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Request timeout in seconds (falls back to DSPC_TIMEOUT, then 30)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all virtual machines
    List,
    /// Show one virtual machine
    Get { name: String },
    /// Create virtual machines
    Create {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Delete virtual machines
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Import an existing virtual machine as a tracked record
    Import { name: String },
    /// Refresh a tracked VM, plan the change to the desired name, and apply it
    Apply {
        /// Name of the currently tracked VM, if any
        #[arg(long)]
        current: Option<String>,
        /// Desired VM name; omit to destroy
        #[arg(long)]
        desired: Option<String>,
        /// Only show the plan
        #[arg(long)]
        dry_run: bool,
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

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Serialize)]
struct ApplyReport {
    plan: String,
    applied: bool,
    state: ResourceState,
    record: Option<VmRecord>,
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
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

    tracing::info!("dspc started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("dspc").join("dspc.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".dspc").join("dspc.log");
    }
    PathBuf::from("dspc.log")
}

fn emit<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let config = ProviderConfig {
        endpoint: args.endpoint.clone(),
        api_key: args.api_key.clone(),
        timeout_secs: args.timeout,
    }
    .resolve()
    .context("Provider configuration error")?;

    let client = DspcClient::new(&config)?;
    let resource = VirtualMachineResource::new(client);

    // Ctrl-C cancels every in-flight call
    let interrupt = CancellationToken::new();
    let ctx = CallContext::with_token(interrupt.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight requests");
            interrupt.cancel();
        }
    });

    let result = run(&resource, &ctx, args.command, args.output).await;
    if ctx.is_cancelled() {
        return result.context("Interrupted");
    }
    result
}

async fn run(
    resource: &VirtualMachineResource,
    ctx: &CallContext,
    command: Command,
    output: OutputFormat,
) -> Result<()> {
    match command {
        Command::List => {
            let records = resource
                .read_only()
                .list(ctx)
                .await
                .context("Error listing VMs")?;
            emit(output, &records)
        }
        Command::Get { name } => {
            let record = resource
                .read_only()
                .get(ctx, &name)
                .await
                .context("Error reading VM")?;
            emit(output, &record)
        }
        Command::Import { name } => {
            let instance = Instance::import(resource, ctx, &name)
                .await
                .context("Error importing VM")?;
            emit(output, &instance.record())
        }
        Command::Create { names } => {
            let results = join_all(names.iter().map(|name| resource.create(ctx, name))).await;
            report_batch("create", &names, results, output)
        }
        Command::Delete { names } => {
            let results = join_all(names.iter().map(|name| async move {
                resource
                    .delete(ctx, &VmRecord::new(name.as_str()))
                    .await
                    .map(|_| VmRecord::new(name.as_str()))
            }))
            .await;
            report_batch("delete", &names, results, output)
        }
        Command::Apply {
            current,
            desired,
            dry_run,
        } => apply(resource, ctx, current, desired, dry_run, output).await,
    }
}

/// Print every success; fail if any item failed.
fn report_batch(
    verb: &str,
    names: &[String],
    results: Vec<dspc::Result<VmRecord>>,
    output: OutputFormat,
) -> Result<()> {
    let mut succeeded = Vec::new();
    let mut failed = 0usize;

    for (name, result) in names.iter().zip(results) {
        match result {
            Ok(record) => succeeded.push(record),
            Err(e) => {
                failed += 1;
                eprintln!("Error: could not {verb} VM '{name}': {e}");
            }
        }
    }

    emit(output, &succeeded)?;

    if failed > 0 {
        anyhow::bail!("{failed} of {} {verb} operations failed", names.len());
    }
    Ok(())
}

async fn apply(
    resource: &VirtualMachineResource,
    ctx: &CallContext,
    current: Option<String>,
    desired: Option<String>,
    dry_run: bool,
    output: OutputFormat,
) -> Result<()> {
    let mut instance = match current {
        Some(name) => {
            let mut instance = Instance::present(VmRecord::new(name));
            instance
                .refresh(resource, ctx)
                .await
                .context("Error refreshing VM")?;
            instance
        }
        None => Instance::planned(),
    };

    let action = instance.plan(desired.as_deref());
    tracing::info!("Plan: {}", action);

    if !dry_run {
        instance
            .apply(resource, ctx, &action)
            .await
            .with_context(|| format!("Error applying plan ({action})"))?;
    }

    emit(
        output,
        &ApplyReport {
            plan: action.to_string(),
            applied: !dry_run,
            state: instance.state(),
            record: instance.record().cloned(),
        },
    )
}
