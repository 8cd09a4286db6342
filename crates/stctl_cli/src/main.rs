use std::{io::Write, path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use stctl_control::{
    format_elapsed, parse_duration, ApiSettings, StctlFile, TransferControl, TransferSettings,
};
use stctl_transfer::{RestConfig, RestTransferJobs, DEFAULT_ENDPOINT};
use tracing::{error, info};

const DEFAULT_TIMEOUT: &str = "5m";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Create, disable, list and reconcile Storage Transfer Service jobs"
)]
struct Cli {
    /// GCP project that owns the transfer jobs.
    #[arg(long, env = "PROJECT_ID", global = true)]
    project_id: Option<String>,
    /// Optional TOML file with `[api]` and `[transfer]` sections.
    #[arg(long, env = "STCTL_CONFIG", global = true)]
    config: Option<PathBuf>,
    #[arg(long, env = "STCTL_ENDPOINT", global = true)]
    endpoint: Option<String>,
    /// Bearer token. Defaults to `gcloud auth print-access-token`.
    #[arg(long, env = "STCTL_ACCESS_TOKEN", global = true, hide_env_values = true)]
    access_token: Option<String>,
    /// Deadline for the whole command, e.g. `5m` or `90s`.
    #[arg(long, env = "TIMEOUT", global = true)]
    timeout: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List enabled transfer jobs.
    List,
    /// List past transfer operations of a job.
    Operations {
        name: String,
        /// Only list operations that started at or after this RFC 3339
        /// timestamp or YYYY-MM-DD date.
        #[arg(long, env = "AFTER", value_parser = parse_after)]
        after: Option<DateTime<Utc>>,
    },
    /// Create a new transfer job unconditionally.
    Create(TransferArgs),
    /// Make sure exactly one enabled job matches the given settings.
    Sync(TransferArgs),
    /// Disable the named transfer job.
    Disable { name: String },
}

#[derive(Debug, Clone, Default, Args)]
struct TransferArgs {
    #[arg(long, alias = "gcs.source", env = "GCS_SOURCE")]
    source: Option<String>,
    #[arg(long, alias = "gcs.target", env = "GCS_TARGET")]
    target: Option<String>,
    /// Only transfer objects with this prefix. Repeatable.
    #[arg(long, env = "INCLUDE", value_delimiter = ',')]
    include: Vec<String>,
    /// Daily start time, HH:MM:SS (UTC).
    #[arg(long, env = "TIME")]
    time: Option<String>,
    /// Interval between scheduled runs, e.g. `86400s`.
    #[arg(long, env = "INTERVAL")]
    interval: Option<String>,
    #[arg(long, alias = "minFileAge", env = "MIN_FILE_AGE")]
    min_file_age: Option<String>,
    #[arg(long, alias = "maxFileAge", env = "MAX_FILE_AGE")]
    max_file_age: Option<String>,
    /// Delete source objects once transferred. `--delete-after-transfer=false`
    /// overrides a config file.
    #[arg(
        long,
        alias = "deleteAfterTransfer",
        env = "DELETE_AFTER_TRANSFER",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    delete_after_transfer: Option<bool>,
}

impl TransferArgs {
    fn into_settings(self) -> TransferSettings {
        TransferSettings {
            source: self.source,
            target: self.target,
            include: self.include,
            time: self.time,
            interval: self.interval,
            min_file_age: self.min_file_age,
            max_file_age: self.max_file_age,
            delete_after_transfer: self.delete_after_transfer,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file = match &cli.config {
        Some(path) => StctlFile::load(path)?,
        None => StctlFile::default(),
    };
    let api = file.api.overlay(ApiSettings {
        endpoint: cli.endpoint,
        access_token: cli.access_token,
        timeout: cli.timeout,
    });
    let project = cli
        .project_id
        .or(file.project_id)
        .filter(|project| !project.trim().is_empty())
        .context("--project-id is required")?;
    let timeout = parse_timeout(api.timeout.as_deref())?;

    let client = RestTransferJobs::new(RestConfig {
        project: project.clone(),
        endpoint: api.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        access_token: api.access_token,
        request_timeout: timeout,
    })
    .context("failed to build transfer service client")?;
    let control = TransferControl::new(Arc::new(client), project);

    tokio::time::timeout(timeout, execute(&control, cli.command, file.transfer))
        .await
        .map_err(|_| anyhow!("stctl timed out after {}", format_elapsed(timeout)))?
}

async fn execute(
    control: &TransferControl,
    command: Command,
    file: TransferSettings,
) -> Result<()> {
    let mut out = std::io::stdout();
    match command {
        Command::List => {
            let count = control
                .list_jobs(&mut out)
                .await
                .context("failed to list jobs")?;
            info!(count, "listed transfer jobs");
        }
        Command::Operations { name, after } => {
            let count = control
                .list_operations(&name, after, &mut out)
                .await
                .with_context(|| format!("failed to list operations for {name:?}"))?;
            info!(count, name = %name, "listed transfer operations");
        }
        Command::Create(args) => {
            let config = file
                .overlay(args.into_settings())
                .resolve(control.project())?;
            let job = control.create(&config).await.context("failed to create")?;
            print_pretty(&mut out, &job)?;
        }
        Command::Sync(args) => {
            let config = file
                .overlay(args.into_settings())
                .resolve(control.project())?;
            let outcome = control.sync(&config).await.context("failed to sync")?;
            info!(action = outcome.action(), name = %outcome.job().name, "sync finished");
            print_pretty(&mut out, outcome.job())?;
        }
        Command::Disable { name } => {
            let job = match control.disable(&name).await {
                Ok(job) => job,
                Err(err) if err.is_not_found() => {
                    return Err(anyhow::Error::new(err).context(format!(
                        "no transfer job {name:?} in project {}",
                        control.project()
                    )))
                }
                Err(err) => {
                    return Err(
                        anyhow::Error::new(err).context(format!("failed to disable {name:?}"))
                    )
                }
            };
            print_pretty(&mut out, &job)?;
        }
    }
    Ok(())
}

fn print_pretty<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to encode output")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}

fn parse_timeout(raw: Option<&str>) -> Result<Duration> {
    let raw = raw.unwrap_or(DEFAULT_TIMEOUT);
    let timeout = parse_duration(raw).with_context(|| format!("invalid timeout {raw:?}"))?;
    if timeout.is_zero() {
        return Err(anyhow!("timeout must be positive"));
    }
    Ok(timeout)
}

fn parse_after(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| format!("{raw:?} is neither an RFC 3339 timestamp nor a YYYY-MM-DD date"))
}
