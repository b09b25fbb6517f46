use crate::{
    auditor::{Auditor, lighthouse::LighthouseAuditor},
    catalog::Catalog,
    config::Config,
    dispatcher::Dispatcher,
    naming::{Clock, job_id},
    runner::AuditRunner,
    secret::Secret,
    server::{self, AppState},
    util::ensure_dir,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lighthouse-batch")]
#[command(about = "Batch Lighthouse audit orchestrator (desktop + mobile reports per URL)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./lighthouse-batch.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the submission API and report browser.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Audit URLs in the foreground as a new job.
    Run {
        #[arg(long = "url", required = true)]
        urls: Vec<String>,
    },
    /// List job ids, newest first.
    List {},
    /// List the reports of one job.
    Reports { job_id: String },
    /// Delete a job and all of its reports.
    Delete { job_id: String },
    /// Check the lighthouse executable and profile configs.
    Doctor {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    // Read the local offset while the process is still single-threaded.
    let clock = Clock::detect(cfg.naming.use_utc);

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
    if clock.fell_back() {
        warn!("local UTC offset unavailable; job ids use UTC");
    }

    match &args.cmd {
        Command::Serve { host, port } => serve(&cfg, clock, host.clone(), *port),
        Command::Run { urls } => run(&cfg, clock, urls),
        Command::List {} => {
            let jobs = Catalog::new(cfg.results_dir()).list_jobs()?;
            println!("{}", serde_json::to_string_pretty(&jobs)?);
            Ok(())
        }
        Command::Reports { job_id } => {
            let files = Catalog::new(cfg.results_dir()).list_reports(job_id)?;
            println!("{}", serde_json::to_string_pretty(&files)?);
            Ok(())
        }
        Command::Delete { job_id } => {
            Catalog::new(cfg.results_dir())
                .delete_job(job_id)
                .with_context(|| format!("deleting job {job_id}"))?;
            Ok(())
        }
        Command::Doctor {} => doctor(&cfg),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    ["lighthouse-batch.toml", "lighthouse-batch.example.toml"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file || cfg.logging.file_path.is_empty() {
        return None;
    }
    Some(PathBuf::from(&cfg.logging.file_path))
}

fn build_runner(cfg: &Config) -> AuditRunner {
    let auditor: Arc<dyn Auditor> = Arc::new(LighthouseAuditor::new(cfg));
    AuditRunner::new(cfg.results_dir(), auditor)
}

fn serve(cfg: &Config, clock: Clock, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(host) = host {
        cfg.server.host = host;
    }
    if let Some(port) = port {
        cfg.server.port = port;
    }

    let results_dir = cfg.results_dir();
    ensure_dir(&results_dir)?;

    let secret = Secret::generate(cfg.security.secret_bytes);
    println!("Generated Secret Key: {}", secret.expose());

    let state = AppState {
        catalog: Catalog::new(&results_dir),
        dispatcher: Dispatcher::new(secret, clock, build_runner(&cfg)),
    };
    info!("results_dir={}", results_dir.display());

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .with_context(|| "building tokio runtime")?;
    let served = rt.block_on(server::serve(&cfg, state));
    // Detached jobs are not awaited on shutdown.
    rt.shutdown_timeout(Duration::from_secs(1));
    served
}

fn run(cfg: &Config, clock: Clock, urls: &[String]) -> Result<()> {
    ensure_dir(&cfg.results_dir())?;
    let job = job_id(clock.now());
    let summary = build_runner(cfg).run_job(&job, urls)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    let diag = LighthouseAuditor::new(cfg).doctor()?;
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}
