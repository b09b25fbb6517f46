use crate::{error::CatalogError, naming::JobId};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Read/delete view over `<root>/<job_id>/<report>`. The directory tree is the
/// only index; nothing is cached.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job: &JobId) -> PathBuf {
        self.root.join(job)
    }

    /// Newest first; ids are time-sortable strings.
    pub fn list_jobs(&self) -> CatalogResult<Vec<JobId>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CatalogError::from_io(&self.root, e)),
        };

        let mut jobs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CatalogError::from_io(&self.root, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| CatalogError::from_io(entry.path(), e))?
                .is_dir();
            if !is_dir {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(JobId::parse) {
                jobs.push(id);
            }
        }
        jobs.sort_by(|a, b| b.cmp(a));
        Ok(jobs)
    }

    pub fn list_reports(&self, job_id: &str) -> CatalogResult<Vec<String>> {
        let job = parse_job(job_id)?;
        let dir = self.job_dir(&job);
        let entries = std::fs::read_dir(&dir).map_err(|e| CatalogError::from_io(&dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CatalogError::from_io(&dir, e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| CatalogError::from_io(entry.path(), e))?
                .is_file();
            if !is_file {
                continue;
            }
            // Only names fetch_report can serve back are listed.
            match entry.file_name().into_string() {
                Ok(name) if crate::naming::is_safe_segment(&name) => files.push(name),
                Ok(name) => warn!("skipping unservable report name {name:?}"),
                Err(raw) => warn!("skipping non-UTF-8 report name {raw:?}"),
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn fetch_report(&self, job_id: &str, filename: &str) -> CatalogResult<Vec<u8>> {
        let job = parse_job(job_id)?;
        if !crate::naming::is_safe_segment(filename) {
            return Err(CatalogError::InvalidName(filename.to_string()));
        }
        let path = self.job_dir(&job).join(filename);
        if path.is_dir() {
            return Err(CatalogError::NotFound(path.display().to_string()));
        }
        std::fs::read(&path).map_err(|e| CatalogError::from_io(&path, e))
    }

    /// Removes every file of the job, then the job directory itself. A job that
    /// disappears mid-way (concurrent delete) reports `NotFound`.
    pub fn delete_job(&self, job_id: &str) -> CatalogResult<()> {
        let job = parse_job(job_id)?;
        let dir = self.job_dir(&job);
        let entries = std::fs::read_dir(&dir).map_err(|e| CatalogError::from_io(&dir, e))?;

        let mut removed = 0usize;
        for entry in entries {
            let entry = entry.map_err(|e| CatalogError::from_io(&dir, e))?;
            let path = entry.path();
            std::fs::remove_file(&path).map_err(|e| CatalogError::from_io(&path, e))?;
            debug!("removed {}", path.display());
            removed += 1;
        }
        std::fs::remove_dir(&dir).map_err(|e| CatalogError::from_io(&dir, e))?;

        info!("deleted job {job} ({removed} reports)");
        Ok(())
    }
}

fn parse_job(raw: &str) -> CatalogResult<JobId> {
    JobId::parse(raw).ok_or_else(|| CatalogError::InvalidName(raw.to_string()))
}
