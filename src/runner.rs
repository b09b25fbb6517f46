use crate::{
    auditor::{AuditRequest, Auditor},
    naming::{JobId, Profile, report_filename},
    util::ensure_dir,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of one job. Logged when the job finishes; never written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub attempted: usize,
    pub produced: usize,
    pub failures: Vec<FailedAudit>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAudit {
    pub url: String,
    pub profile: Profile,
    pub reason: String,
}

#[derive(Clone)]
pub struct AuditRunner {
    results_dir: PathBuf,
    auditor: Arc<dyn Auditor>,
}

impl AuditRunner {
    pub fn new(results_dir: impl Into<PathBuf>, auditor: Arc<dyn Auditor>) -> Self {
        Self {
            results_dir: results_dir.into(),
            auditor,
        }
    }

    /// Audits every URL under every profile, one invocation at a time.
    /// Only failing to create the job directory aborts the job.
    pub fn run_job(&self, job_id: &JobId, urls: &[String]) -> Result<JobSummary> {
        let started = Instant::now();
        let job_dir = self.results_dir.join(job_id);
        ensure_dir(&job_dir)?;
        info!("job {job_id} started: {} urls -> {}", urls.len(), job_dir.display());

        let mut summary = JobSummary {
            job_id: job_id.clone(),
            attempted: 0,
            produced: 0,
            failures: Vec::new(),
            elapsed_ms: 0,
        };

        for url in urls {
            for profile in Profile::ALL {
                let req = AuditRequest {
                    url: url.clone(),
                    profile,
                    output_path: job_dir.join(report_filename(url, profile)),
                };
                summary.attempted += 1;

                match self.auditor.audit(&req) {
                    Ok(outcome) => {
                        summary.produced += 1;
                        info!(
                            "job {job_id} {url} ({profile}) done in {}ms",
                            outcome.elapsed_ms
                        );
                    }
                    Err(err) => {
                        warn!("job {job_id} {url} ({profile}) failed: {err:#}");
                        summary.failures.push(FailedAudit {
                            url: url.clone(),
                            profile,
                            reason: format!("{err:#}"),
                        });
                    }
                }
            }
        }

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "job {job_id} complete: {}/{} reports, {} failures",
            summary.produced,
            summary.attempted,
            summary.failures.len()
        );
        Ok(summary)
    }
}
