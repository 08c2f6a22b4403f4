//! Remote command execution.
//!
//! Everything the collectors do on the testbed goes through [`RemoteShell`].
//! [`SshShell`] runs commands with the system `ssh`/`scp` binaries; tests
//! substitute a scripted implementation.

use std::{
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{debug, warn};

use crate::types::{BenchmarkError, BenchmarkResult};

/// Exit status of coreutils `timeout` when the command timed out.
const TIMEOUT_EXIT_STATUS: i32 = 124;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Fails with [`BenchmarkError::Remote`] unless the command succeeded.
    pub fn into_success(self, host: &str, command: &str) -> BenchmarkResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(BenchmarkError::remote(
                host,
                format!(
                    "'{}' exited with {}: {}",
                    first_line(command),
                    self.status
                        .map_or_else(|| "a signal".to_string(), |s| format!("status {s}")),
                    self.stderr.trim()
                ),
            ))
        }
    }
}

fn first_line(command: &str) -> &str {
    command.trim().lines().next().unwrap_or_default().trim()
}

/// Runs commands on testbed machines.
pub trait RemoteShell {
    /// Runs `command` on `host` and waits for it. A non-zero exit status is
    /// not an error at this level.
    fn run(&self, host: &str, command: &str) -> BenchmarkResult<CommandOutput>;

    /// Like [`RemoteShell::run`], killing the command after `timeout`.
    fn run_with_timeout(
        &self,
        host: &str,
        command: &str,
        timeout: Duration,
    ) -> BenchmarkResult<CommandOutput>;

    /// Starts `command` on `host` without waiting for it; output is discarded.
    fn spawn(&self, host: &str, command: &str) -> BenchmarkResult<()>;

    /// Copies a local file to `remote` on `host`.
    fn copy_to(&self, host: &str, local: &Path, remote: &str) -> BenchmarkResult<()>;

    /// Runs `command` and fails unless it exits successfully.
    fn check(&self, host: &str, command: &str) -> BenchmarkResult<CommandOutput> {
        self.run(host, command)?.into_success(host, command)
    }
}

/// [`RemoteShell`] over the system `ssh` client.
///
/// Background `ssh` processes started by [`RemoteShell::spawn`] are reaped
/// on later calls and killed when the shell is dropped.
#[derive(Debug)]
pub struct SshShell {
    ssh: PathBuf,
    scp: PathBuf,
    timeout: Option<PathBuf>,
    children: Mutex<Vec<Child>>,
}

impl SshShell {
    /// Locates `ssh`, `scp` and `timeout` on the `PATH`.
    pub fn new() -> BenchmarkResult<Self> {
        let find = |binary: &str| {
            which::which(binary).map_err(|e| {
                BenchmarkError::Initialization(format!("Cannot find '{binary}': {e}"))
            })
        };

        Ok(Self {
            ssh: find("ssh")?,
            scp: find("scp")?,
            timeout: which::which("timeout").ok(),
            children: Mutex::default(),
        })
    }

    fn children(&self) -> MutexGuard<'_, Vec<Child>> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits on background processes that have exited.
    fn reap(&self) {
        self.children().retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Background ssh {} exited with {status}", child.id());
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("Cannot poll background ssh {}: {e}", child.id());
                false
            }
        });
    }

    fn ssh_command(&self, host: &str, command: &str) -> Command {
        let mut cmd = Command::new(&self.ssh);
        cmd.arg("-q").arg(host).arg(command);
        cmd
    }

    fn output(host: &str, mut cmd: Command) -> BenchmarkResult<CommandOutput> {
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| BenchmarkError::remote(host, format!("failed to start ssh: {e}")))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl RemoteShell for SshShell {
    fn run(&self, host: &str, command: &str) -> BenchmarkResult<CommandOutput> {
        self.reap();
        debug!("{host}$ {}", command.trim());
        Self::output(host, self.ssh_command(host, command))
    }

    fn run_with_timeout(
        &self,
        host: &str,
        command: &str,
        timeout: Duration,
    ) -> BenchmarkResult<CommandOutput> {
        let Some(timeout_bin) = &self.timeout else {
            return self.run(host, command);
        };

        self.reap();
        debug!("{host}$ {} (timeout {timeout:?})", command.trim());
        let mut cmd = Command::new(timeout_bin);
        cmd.arg(timeout.as_secs().max(1).to_string())
            .arg(&self.ssh)
            .arg("-q")
            .arg(host)
            .arg(command);

        let output = Self::output(host, cmd)?;
        if output.status == Some(TIMEOUT_EXIT_STATUS) {
            return Err(BenchmarkError::Timeout {
                host: host.to_string(),
                timeout,
            });
        }
        Ok(output)
    }

    fn spawn(&self, host: &str, command: &str) -> BenchmarkResult<()> {
        self.reap();
        debug!("{host}$ {} &", command.trim());
        let child = self
            .ssh_command(host, command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BenchmarkError::remote(host, format!("failed to start ssh: {e}")))?;
        self.children().push(child);
        Ok(())
    }

    fn copy_to(&self, host: &str, local: &Path, remote: &str) -> BenchmarkResult<()> {
        self.reap();
        debug!("scp {} {host}:{remote}", local.display());
        let mut cmd = Command::new(&self.scp);
        cmd.arg("-q").arg(local).arg(format!("{host}:{remote}"));
        Self::output(host, cmd)?.into_success(host, "scp")?;
        Ok(())
    }
}

impl Drop for SshShell {
    fn drop(&mut self) {
        let children = self
            .children
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for mut child in children.drain(..) {
            // Already exited children make kill fail; wait still reaps them.
            let _ = child.kill();
            if let Err(e) = child.wait() {
                warn!("Cannot reap background ssh {}: {e}", child.id());
            }
        }
    }
}
