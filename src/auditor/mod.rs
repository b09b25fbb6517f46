pub mod lighthouse;
pub mod types;

use anyhow::Result;

pub use types::{AuditOutcome, AuditRequest, ToolDiag};

/// One out-of-process audit per call. Implementations block until the tool exits.
pub trait Auditor: Send + Sync {
    fn doctor(&self) -> Result<ToolDiag>;
    fn audit(&self, req: &AuditRequest) -> Result<AuditOutcome>;
}
