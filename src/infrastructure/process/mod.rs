//! Supervision of the application process.
//!
//! The application runs under PHP's built-in web server. Its configuration
//! is passed as environment variables on the spawn call itself, and a
//! dedicated task owns the child until it exits or is told to stop.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::domain::app::{AdminCredentials, AppEnvironment, DATA_SUBDIRS, ENV_PREFIX};
use crate::domain::storage::ConnectionConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::infrastructure::workspace::TemporaryWorkspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running,
    Stopped,
}

/// Everything needed to launch the application except per-fixture inputs
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Application checkout; becomes the working directory
    pub root: PathBuf,
    pub credentials: AdminCredentials,
    pub php_binary: PathBuf,
    pub php_ini: Option<PathBuf>,
    pub temp_root: PathBuf,
    pub log_level: String,
    pub public: bool,
}

pub struct AppProcess {
    settings: AppSettings,
    state: ProcessState,
    address: Option<SocketAddr>,
    pid: Option<u32>,
    stop: Option<oneshot::Sender<()>>,
    supervisor: Option<JoinHandle<std::io::Result<ExitStatus>>>,
    exit: Option<watch::Receiver<Option<ExitStatus>>>,
    workspace: Option<TemporaryWorkspace>,
}

impl AppProcess {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings,
            state: ProcessState::NotStarted,
            address: None,
            pid: None,
            stop: None,
            supervisor: None,
            exit: None,
            workspace: None,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn base_url(&self) -> Option<String> {
        self.address.map(|addr| format!("http://{}", addr))
    }

    fn program(&self) -> String {
        self.settings.php_binary.display().to_string()
    }

    /// Builds the child's environment inside a fresh workspace
    fn prepare(&mut self, storage: &ConnectionConfig) -> HarnessResult<AppEnvironment> {
        let workspace = TemporaryWorkspace::create(&self.settings.temp_root, "selfoss-app-")?;
        let data_dir = workspace.create_dir("data")?;
        for subdir in DATA_SUBDIRS {
            workspace.create_dir(format!("data/{}", subdir))?;
        }
        self.workspace = Some(workspace);

        let digest = self.settings.credentials.password_digest()?;

        Ok(AppEnvironment::builder()
            .data_dir(&data_dir)
            .logger(&self.settings.log_level)
            .admin(&self.settings.credentials, digest)
            .public(self.settings.public)
            .storage(storage)
            .build())
    }

    /// Spawns the application bound to `address`.
    ///
    /// Takes the backend's connection settings by value: they are consumed by
    /// this spawn and nothing else.
    pub async fn start(
        &mut self,
        address: SocketAddr,
        storage: ConnectionConfig,
    ) -> HarnessResult<()> {
        if self.state != ProcessState::NotStarted {
            return Err(HarnessError::Config(format!(
                "application process cannot be started from state {:?}",
                self.state
            )));
        }

        let env = self.prepare(&storage)?;
        let program = self.program();

        let mut cmd = Command::new(&self.settings.php_binary);
        // Reading configuration from the environment needs E in variables_order.
        cmd.arg("-d")
            .arg("variables_order=EGPCS")
            .arg("-S")
            .arg(address.to_string());
        if let Some(ini) = &self.settings.php_ini {
            cmd.arg("-c").arg(ini);
        }
        cmd.arg(self.settings.root.join("run.php"))
            .current_dir(&self.settings.root)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        for (key, _) in std::env::vars_os() {
            if key.to_string_lossy().starts_with(ENV_PREFIX) {
                cmd.env_remove(&key);
            }
        }
        cmd.envs(env.iter());

        tracing::info!(program = %program, %address, root = %self.settings.root.display(), "Spawning application");
        tracing::debug!(vars = env.len(), db_type = %storage.db_type(), "Application environment");

        let mut child = cmd.spawn().map_err(|source| {
            tracing::error!(program = %program, error = %source, "Failed to spawn application");
            HarnessError::ProcessSpawn {
                program: program.clone(),
                source,
            }
        })?;
        self.pid = child.id();
        tracing::info!(pid = ?self.pid, "Application process spawned");

        let (stop, stop_requested) = oneshot::channel::<()>();
        let (exit_tx, exit_rx) = watch::channel(None);
        let supervisor = tokio::spawn(async move {
            let exited = tokio::select! {
                status = child.wait() => Some(status),
                _ = stop_requested => None,
            };
            let status = match exited {
                Some(status) => status,
                None => {
                    child.kill().await?;
                    child.wait().await
                }
            }?;
            exit_tx.send_replace(Some(status));
            Ok::<_, std::io::Error>(status)
        });

        self.address = Some(address);
        self.stop = Some(stop);
        self.supervisor = Some(supervisor);
        self.exit = Some(exit_rx);
        self.state = ProcessState::Running;
        Ok(())
    }

    /// Exit status of the child, once it has been reaped
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit.as_ref().and_then(|exit| *exit.borrow())
    }

    /// Whether the child has already exited on its own
    pub fn has_exited(&self) -> bool {
        self.exit_status().is_some()
            || self
                .supervisor
                .as_ref()
                .is_some_and(|supervisor| supervisor.is_finished())
    }

    /// Fails if the child died while it was supposed to be serving
    pub fn ensure_alive(&self) -> HarnessResult<()> {
        if self.state == ProcessState::Running && self.has_exited() {
            let status = self
                .exit_status()
                .map(|status| status.to_string())
                .unwrap_or_else(|| "unknown status".to_string());
            return Err(HarnessError::ProcessExited {
                program: self.program(),
                status,
            });
        }
        Ok(())
    }

    /// Force-terminates the child and removes its workspace. Safe in any state.
    pub async fn stop(&mut self) -> HarnessResult<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }

        let mut result = Ok(());
        if let Some(supervisor) = self.supervisor.take() {
            match supervisor.await {
                Ok(Ok(status)) => {
                    tracing::info!(pid = ?self.pid, %status, "Application process stopped")
                }
                Ok(Err(e)) => {
                    tracing::error!(pid = ?self.pid, error = %e, "Failed to terminate application");
                    result = Err(HarnessError::Io(e));
                }
                Err(join_error) => {
                    result = Err(HarnessError::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        join_error.to_string(),
                    )));
                }
            }
        }

        if let Some(mut workspace) = self.workspace.take() {
            let cleanup = workspace.close();
            result = result.and(cleanup);
        }

        self.state = ProcessState::Stopped;
        result
    }
}

impl Drop for AppProcess {
    fn drop(&mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            tracing::warn!(pid = ?self.pid, "Killing orphaned application process on drop");
            // Dropping the supervisor's future drops the child, which kills it.
            supervisor.abort();
        }
    }
}
