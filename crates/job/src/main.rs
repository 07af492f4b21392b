use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use ufbatch_core::{JobContext, JobParameters};
use ufbatch_infra::config::DEFAULT_PROFILE;
use ufbatch_infra::{CommonApi, LocalArtifactSink, RetryExecutor, Settings};
use ufbatch_job::steps::JOB_NAME;
use ufbatch_job::{Collaborators, FlowController};
use ufbatch_observability::JobListener;

#[derive(Debug, Parser)]
#[command(name = "ufbatch", about = "Export underground facility attributes for one task")]
struct Cli {
    /// Identifier of the output task to process.
    #[arg(long, env = "UFBATCH_TASK_ID")]
    task_id: Option<String>,

    /// Configuration profile, resolved to `config/<profile>.toml`.
    #[arg(long, env = "UFBATCH_PROFILE", default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Explicit configuration file; overrides the profile lookup.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    ufbatch_observability::init();
    JobListener::new(JOB_NAME).on_boot();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "job could not be started");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = Settings::load(&cli.profile, cli.config.as_deref())
        .with_context(|| format!("failed to load settings for profile {}", cli.profile))?;

    let api = Arc::new(CommonApi::new(&settings.api).context("failed to build http client")?);
    let collaborators = Collaborators {
        registry: api.clone(),
        attributes: api.clone(),
        artifacts: Arc::new(LocalArtifactSink::new()),
        uploader: api,
    };

    let controller = FlowController::new(collaborators, RetryExecutor::new(settings.retry.policy()));
    let mut ctx = JobContext::new(JobParameters::new(cli.task_id), &settings.batch.export_path);

    let report = controller.run(&mut ctx);
    Ok(ExitCode::from(report.status.exit_code()))
}
