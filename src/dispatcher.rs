use crate::{
    error::DispatchError,
    naming::{Clock, JobId, job_id},
    runner::AuditRunner,
    secret::Secret,
};
use time::OffsetDateTime;
use tracing::{error, info};

/// Validates submissions and starts one detached runner per accepted job.
#[derive(Clone)]
pub struct Dispatcher {
    secret: Secret,
    clock: Clock,
    runner: AuditRunner,
}

impl Dispatcher {
    pub fn new(secret: Secret, clock: Clock, runner: AuditRunner) -> Self {
        Self {
            secret,
            clock,
            runner,
        }
    }

    pub fn dispatch(
        &self,
        secret: Option<&str>,
        urls: Option<Vec<String>>,
    ) -> Result<JobId, DispatchError> {
        self.dispatch_at(self.clock.now(), secret, urls)
    }

    /// Must be called from within a tokio runtime. Returns as soon as the job is
    /// handed to the blocking pool; the caller polls the catalog for reports.
    pub fn dispatch_at(
        &self,
        now: OffsetDateTime,
        secret: Option<&str>,
        urls: Option<Vec<String>>,
    ) -> Result<JobId, DispatchError> {
        let urls = validate(&self.secret, secret, urls)?;
        let job = job_id(now);

        info!("dispatching job {job} with {} urls", urls.len());
        let runner = self.runner.clone();
        let id = job.clone();
        // Fire and forget: the handle is dropped, so the job cannot be joined or cancelled.
        drop(tokio::task::spawn_blocking(move || {
            if let Err(err) = runner.run_job(&id, &urls) {
                error!("job {id} failed to start: {err:#}");
            }
        }));

        Ok(job)
    }
}

pub fn validate(
    expected: &Secret,
    secret: Option<&str>,
    urls: Option<Vec<String>>,
) -> Result<Vec<String>, DispatchError> {
    match secret {
        Some(s) if expected.matches(s) => {}
        _ => return Err(DispatchError::Unauthorized),
    }

    let urls = match urls {
        Some(urls) if !urls.is_empty() => urls,
        _ => return Err(DispatchError::MissingUrls),
    };

    if let Some(bad) = urls
        .iter()
        .find(|u| u.trim().is_empty() || u.starts_with('-'))
    {
        return Err(DispatchError::InvalidUrl(bad.clone()));
    }

    Ok(urls)
}
