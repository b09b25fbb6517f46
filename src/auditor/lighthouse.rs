use super::{
    Auditor,
    types::{AuditOutcome, AuditRequest, ProfileConfigDiag, ToolDiag},
};
use crate::{config::Config, naming::Profile};
use anyhow::{Context, Result, anyhow};
use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct LighthouseAuditor {
    cfg: Config,
    executable: PathBuf,
    profiles_dir: PathBuf,
}

impl LighthouseAuditor {
    pub fn new(cfg: &Config) -> Self {
        Self {
            cfg: cfg.clone(),
            executable: expand_tilde(cfg.auditor.executable.trim()),
            profiles_dir: expand_tilde(&cfg.paths.profiles_dir),
        }
    }

    fn profile_config(&self, profile: Profile) -> PathBuf {
        self.profiles_dir.join(profile.config_file())
    }

    /// Arguments passed after the executable, one argv entry each.
    pub fn command_args(&self, req: &AuditRequest) -> Vec<OsString> {
        let a = &self.cfg.auditor;
        let mut args: Vec<OsString> = vec![
            req.url.clone().into(),
            format!("--output={}", a.output).into(),
        ];

        let mut output_path = OsString::from("--output-path=");
        output_path.push(&req.output_path);
        args.push(output_path);

        if a.quiet {
            args.push("--quiet".into());
        }
        if a.disable_error_reporting {
            args.push("--no-enable-error-reporting".into());
        }

        let mut chrome_flags = a.chrome_flags.clone();
        chrome_flags.push(format!("--window-size={},{}", a.window_width, a.window_height));
        args.push(format!("--chrome-flags={}", chrome_flags.join(" ")).into());

        let mut config_path = OsString::from("--config-path=");
        config_path.push(self.profile_config(req.profile));
        args.push(config_path);

        args.push(format!("--locale={}", a.locale).into());
        args.extend(a.extra_args.iter().map(OsString::from));
        args
    }
}

impl Auditor for LighthouseAuditor {
    fn doctor(&self) -> Result<ToolDiag> {
        let profile_configs: Vec<ProfileConfigDiag> = Profile::ALL
            .iter()
            .map(|&profile| {
                let path = self.profile_config(profile);
                ProfileConfigDiag {
                    profile,
                    exists: path.is_file(),
                    path,
                }
            })
            .collect();

        let version = Command::new(&self.executable)
            .arg("--version")
            .stdin(Stdio::null())
            .output();

        let (version, error) = match version {
            Ok(out) if out.status.success() => (
                Some(String::from_utf8_lossy(&out.stdout).trim().to_string()),
                None,
            ),
            Ok(out) => (
                None,
                Some(format!(
                    "--version exited with {}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                )),
            ),
            Err(e) => (None, Some(format!("spawn failed: {e}"))),
        };

        let ok = version.is_some() && profile_configs.iter().all(|p| p.exists);
        Ok(ToolDiag {
            executable: self.executable.display().to_string(),
            version,
            profile_configs,
            ok,
            error,
        })
    }

    fn audit(&self, req: &AuditRequest) -> Result<AuditOutcome> {
        let timeout = match self.cfg.auditor.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        debug!(
            "lighthouse {} profile={} out={} timeout={:?}",
            req.url,
            req.profile,
            req.output_path.display(),
            timeout
        );

        let keep_stderr = self.cfg.debug.keep_tool_stderr;
        let mut cmd = Command::new(&self.executable);
        cmd.args(self.command_args(req));
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(if keep_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        #[cfg(unix)]
        if timeout.is_some() {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let started = Instant::now();
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", self.executable.display()))?;

        let (status, stderr) = wait_with_timeout(&mut child, timeout)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if keep_stderr && !stderr.is_empty() {
            debug!(
                "lighthouse stderr {} {}: {}",
                req.url,
                req.profile,
                String::from_utf8_lossy(&stderr).trim()
            );
        }

        if !status.success() {
            return Err(anyhow!(
                "lighthouse exited with {status} for {} ({})",
                req.url,
                req.profile
            ));
        }
        if !req.output_path.is_file() {
            return Err(anyhow!(
                "lighthouse produced no report at {}",
                req.output_path.display()
            ));
        }

        Ok(AuditOutcome {
            exit_code: status.code(),
            elapsed_ms,
        })
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// How long stderr is collected after the tool exits or is killed.
const STDERR_GRACE: Duration = Duration::from_secs(2);

fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> Result<(ExitStatus, Vec<u8>)> {
    // Drain stderr while waiting so a chatty browser can't block on a full pipe.
    // The buffer comes back over a channel so a pipe still held open by an
    // orphaned grandchild can't stall the caller.
    let stderr_reader = child.stderr.take();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            let _ = err.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    let collect_stderr = || rx.recv_timeout(STDERR_GRACE).unwrap_or_default();

    let Some(timeout) = timeout else {
        let status = child.wait().with_context(|| "waiting for lighthouse")?;
        return Ok((status, collect_stderr()));
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            return Ok((status, collect_stderr()));
        }

        if start.elapsed() > timeout {
            warn!("lighthouse timed out after {:?}", timeout);
            kill_tree(child);
            child.wait().with_context(|| "wait after kill")?;
            let stderr = collect_stderr();
            return Err(anyhow!(
                "lighthouse exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&stderr).trim()
            ));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Kills the tool and the browser it launched. On unix the tool leads its own
/// process group (see `audit`), so the whole group is signalled.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: killpg only sends a signal; pgid is the group this child leads.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
}
