use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub auditor: Auditor,
    #[serde(default)]
    pub naming: Naming,
    #[serde(default)]
    pub security: Security,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    pub fn results_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.results_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}
impl Default for Server {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub results_dir: String,
    /// Directory holding `desktop.json` / `mobile.json`.
    pub profiles_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            results_dir: "lighthouse_results".into(),
            profiles_dir: ".".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auditor {
    pub executable: String,
    pub output: String,
    pub quiet: bool,
    pub disable_error_reporting: bool,
    pub chrome_flags: Vec<String>,
    pub window_width: u32,
    pub window_height: u32,
    pub locale: String,
    /// 0 disables the per-invocation timeout.
    pub timeout_seconds: u64,
    #[serde(default)]
    pub extra_args: Vec<String>,
}
impl Default for Auditor {
    fn default() -> Self {
        Self {
            executable: "lighthouse".into(),
            output: "html".into(),
            quiet: true,
            disable_error_reporting: true,
            chrome_flags: vec!["--headless".into()],
            window_width: 1920,
            window_height: 1080,
            locale: "ko".into(),
            timeout_seconds: 0,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Naming {
    pub use_utc: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub secret_bytes: usize,
}
impl Default for Security {
    fn default() -> Self {
        Self { secret_bytes: 24 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "logs/lighthouse-batch.log".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub keep_tool_stderr: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_tool_stderr: true,
        }
    }
}
