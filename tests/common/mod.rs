#![allow(dead_code)]

use anyhow::{Result, anyhow};
use lighthouse_batch::{
    auditor::{AuditOutcome, AuditRequest, Auditor, ToolDiag},
    naming::Profile,
};
use std::sync::Mutex;

/// Writes a small HTML file instead of launching lighthouse.
#[derive(Default)]
pub struct FakeAuditor {
    pub fail_urls: Vec<String>,
    pub calls: Mutex<Vec<(String, Profile)>>,
}

impl FakeAuditor {
    pub fn failing(urls: &[&str]) -> Self {
        Self {
            fail_urls: urls.iter().map(|u| u.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Profile)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Auditor for FakeAuditor {
    fn doctor(&self) -> Result<ToolDiag> {
        Ok(ToolDiag {
            executable: "fake".into(),
            version: Some("0.0.0".into()),
            profile_configs: Vec::new(),
            ok: true,
            error: None,
        })
    }

    fn audit(&self, req: &AuditRequest) -> Result<AuditOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push((req.url.clone(), req.profile));
        if self.fail_urls.contains(&req.url) {
            return Err(anyhow!("simulated failure for {}", req.url));
        }
        std::fs::write(
            &req.output_path,
            format!("<html>{} {}</html>", req.url, req.profile),
        )?;
        Ok(AuditOutcome {
            exit_code: Some(0),
            elapsed_ms: 1,
        })
    }
}
