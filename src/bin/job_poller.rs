use clap::{Parser, Subcommand};
use keyword_job_poller::{
    config::AppConfig,
    models::job::JobSnapshot,
    models::outcome::PollOutcome,
    services::{
        poller::JobPoller,
        sink::{StatusSink, TracingSink},
        status_client::HttpJobStatusClient,
    },
    telemetry, JobId, StatusUpdate,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

const EXIT_SOME_FAILED: u8 = 1;
const EXIT_TIMED_OUT: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "job-poller", version, about = "Track keyword-expansion jobs")]
struct Cli {
    /// Human-readable log lines instead of JSON
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Poll jobs until they finish or the wait budget runs out
    Track {
        /// Job ids returned by the expansion endpoints
        #[arg(required = true)]
        job_ids: Vec<String>,

        /// Text used in progress messages
        #[arg(long)]
        label: Option<String>,

        #[arg(long, env = "POLL_INTERVAL_MS")]
        interval_ms: Option<u64>,

        #[arg(long, env = "MAX_WAIT_SECS")]
        max_wait_secs: Option<u64>,
    },
    /// Print the most recent jobs
    Jobs {
        #[arg(long)]
        limit: Option<u32>,
    },
}

/// Prints each update on stdout and forwards it to the log.
struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn report(&self, update: &StatusUpdate) {
        TracingSink.report(update);
        println!("{}", update);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init_logging(cli.pretty);
    telemetry::describe_metrics();

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "job-poller failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let client = Arc::new(HttpJobStatusClient::new(
        &config.api_base_url,
        config.request_timeout(),
    )?);

    match command {
        Command::Track {
            job_ids,
            label,
            interval_ms,
            max_wait_secs,
        } => {
            let mut settings = config.poller_settings();
            if let Some(ms) = interval_ms {
                settings.poll_interval = Duration::from_millis(ms.max(1));
            }
            if let Some(secs) = max_wait_secs {
                settings.max_wait = Duration::from_secs(secs);
            }

            let job_ids: Vec<JobId> = job_ids.into_iter().map(JobId::from).collect();
            let label = label.unwrap_or_else(|| match job_ids.as_slice() {
                [single] => format!("job #{}", single),
                many => format!("{} jobs", many.len()),
            });

            tracing::info!(
                api = %config.api_base_url,
                jobs = job_ids.len(),
                "Starting job tracking"
            );

            let poller = JobPoller::with_shared_client(Arc::clone(&client), settings);
            let handle = poller.spawn(job_ids, label, Arc::new(ConsoleSink))?;
            let token = handle.cancellation_token();

            // Ctrl-C abandons the session through its handle.
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    token.cancel();
                }
            });

            let outcome = handle.outcome().await?;
            Ok(match outcome {
                PollOutcome::Converged(summary) if summary.all_succeeded() => ExitCode::SUCCESS,
                PollOutcome::Converged(_) => ExitCode::from(EXIT_SOME_FAILED),
                PollOutcome::TimedOut { .. } => {
                    print_overview(&client, config.jobs_overview_limit).await;
                    ExitCode::from(EXIT_TIMED_OUT)
                }
                PollOutcome::Cancelled { .. } => ExitCode::from(EXIT_INTERRUPTED),
            })
        }
        Command::Jobs { limit } => {
            let jobs = client
                .list_jobs(limit.unwrap_or(config.jobs_overview_limit))
                .await?;
            print_jobs(&jobs);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn print_overview(client: &HttpJobStatusClient, limit: u32) {
    match client.list_jobs(limit).await {
        Ok(jobs) => print_jobs(&jobs),
        Err(e) => tracing::warn!(error = %e, "Could not load jobs overview"),
    }
}

fn print_jobs(jobs: &[JobSnapshot]) {
    println!(
        "{:>8}  {:<16}  {:<10}  {:>8}  {:>6}  SEED",
        "ID", "TYPE", "STATUS", "PROGRESS", "FOUND"
    );
    for job in jobs {
        println!(
            "{:>8}  {:<16}  {:<10}  {:>7.0}%  {:>6}  {}",
            job.id,
            job.job_type
                .as_ref()
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "-".to_string()),
            job.status.to_string(),
            job.progress_percent(),
            job.keywords_found.unwrap_or(0),
            job.seed_keyword.as_deref().or(job.target.as_deref()).unwrap_or("-")
        );
    }
}
