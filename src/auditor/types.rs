use crate::naming::Profile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRequest {
    pub url: String,
    pub profile: Profile,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub exit_code: Option<i32>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDiag {
    pub executable: String,
    pub version: Option<String>,
    pub profile_configs: Vec<ProfileConfigDiag>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfigDiag {
    pub profile: Profile,
    pub path: PathBuf,
    pub exists: bool,
}
