use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

use super::admin::{probe_command, run_admin_command, run_blocking};
use super::BackendOptions;
use crate::domain::storage::{
    BackendKind, ConnectionConfig, ServerConnection, ServerEndpoint, ServerEngine, StorageBackend,
};
use crate::error::{HarnessError, HarnessResult};
use crate::infrastructure::db::check_connection;
use crate::infrastructure::readiness::wait_until_ready;
use crate::infrastructure::workspace::TemporaryWorkspace;

const USER: &str = "selfoss";
const PASSWORD: &str = "password";
const DATABASE: &str = "selfoss";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// MySQL/MariaDB server listening only on a private unix socket.
pub struct MySqlBackend {
    workspace: TemporaryWorkspace,
    data_dir: PathBuf,
    socket_path: PathBuf,
    pid_file: PathBuf,
    ready_timeout: Duration,
    server: Option<Child>,
}

impl MySqlBackend {
    pub fn new(options: &BackendOptions) -> HarnessResult<Self> {
        let workspace = TemporaryWorkspace::create(&options.temp_root, "selfoss-mysql-")?;
        let data_dir = workspace.create_dir("data")?;
        workspace.restrict("data", 0o750)?;
        let socket_path = workspace.join("mysqld.sock");
        let pid_file = workspace.join("mysqld.pid");

        Ok(Self {
            workspace,
            data_dir,
            socket_path,
            pid_file,
            ready_timeout: options.ready_timeout,
            server: None,
        })
    }

    fn socket_arg(&self) -> String {
        format!("--socket={}", self.socket_path.display())
    }

    async fn execute(&self, statement: &str) -> HarnessResult<()> {
        run_admin_command(
            "mysql",
            [
                "--no-defaults".to_string(),
                "--wait".to_string(),
                self.socket_arg(),
                format!("--execute={}", statement),
            ],
        )
        .await
    }

    fn connection(&self) -> ServerConnection {
        ServerConnection {
            engine: ServerEngine::MySql,
            endpoint: ServerEndpoint::Socket(self.socket_path.clone()),
            username: USER.to_string(),
            password: Some(PASSWORD.to_string()),
            database: DATABASE.to_string(),
        }
    }

    /// Pid of the `mysqld` spawned by `mysqld_safe`, if it wrote one
    fn server_pid(&self) -> Option<String> {
        let pid = std::fs::read_to_string(&self.pid_file).ok()?;
        let pid = pid.trim();
        (!pid.is_empty() && pid.bytes().all(|b| b.is_ascii_digit())).then(|| pid.to_string())
    }

    /// Killing `mysqld_safe` leaves its `mysqld` running; finish it off.
    async fn kill_orphaned_server(&self) {
        let Some(pid) = self.server_pid() else {
            return;
        };
        tracing::warn!(%pid, "Killing mysqld left behind by a failed shutdown");
        if let Err(e) = run_admin_command("kill", ["-KILL".to_string(), pid]).await {
            tracing::debug!(error = %e, "mysqld was already gone");
        }
    }

    async fn shutdown_server(&mut self) -> HarnessResult<()> {
        let Some(mut server) = self.server.take() else {
            return Ok(());
        };

        let result = run_admin_command(
            "mysqladmin",
            ["--no-defaults".to_string(), self.socket_arg(), "shutdown".to_string()],
        )
        .await;
        let mut forced = result.is_err();

        match tokio::time::timeout(SHUTDOWN_GRACE, server.wait()).await {
            Ok(Ok(status)) => tracing::debug!(%status, "mysqld_safe exited"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to reap mysqld_safe"),
            Err(_) => {
                tracing::warn!("mysqld_safe did not exit in time, killing it");
                if let Err(e) = server.kill().await {
                    tracing::warn!(error = %e, "Failed to kill mysqld_safe");
                }
                forced = true;
            }
        }

        if forced {
            self.kill_orphaned_server().await;
        }

        result
    }
}

#[async_trait]
impl StorageBackend for MySqlBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    async fn start(&mut self) -> HarnessResult<()> {
        tracing::info!(socket = %self.socket_path.display(), "Provisioning MySQL server");

        run_admin_command(
            "mysql_install_db",
            [
                // Prevent defaulting to --user=mysql.
                "--no-defaults".to_string(),
                format!("--datadir={}", self.data_dir.display()),
            ],
        )
        .await?;

        let server = Command::new("mysqld_safe")
            .arg("--no-defaults")
            .arg(format!("--datadir={}", self.data_dir.display()))
            .arg(self.socket_arg())
            .arg(format!("--pid-file={}", self.pid_file.display()))
            .arg("--skip-networking")
            .arg("--no-auto-restart")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HarnessError::Provisioning(format!("could not run mysqld_safe: {}", e)))?;
        tracing::debug!(pid = ?server.id(), "mysqld_safe spawned");
        self.server = Some(server);

        let ping_args = vec![
            "--no-defaults".to_string(),
            self.socket_arg(),
            "ping".to_string(),
        ];
        wait_until_ready("mysql", self.ready_timeout, || {
            probe_command("mysqladmin", ping_args.clone())
        })
        .await?;

        self.execute(&format!(
            "CREATE USER '{}'@'localhost' IDENTIFIED BY '{}';",
            USER, PASSWORD
        ))
        .await?;
        self.execute(&format!("CREATE DATABASE {};", DATABASE))
            .await?;
        self.execute(&format!(
            "GRANT ALL PRIVILEGES ON *.* TO '{}'@'localhost';",
            USER
        ))
        .await?;

        check_connection(&self.connection()).await?;
        tracing::info!("MySQL server provisioned");

        Ok(())
    }

    async fn stop(&mut self) -> HarnessResult<()> {
        let shutdown = self.shutdown_server().await;
        let cleanup = self.workspace.close();
        shutdown.and(cleanup)
    }

    fn config(&self) -> ConnectionConfig {
        ConnectionConfig::NetworkedServer(self.connection())
    }
}

impl Drop for MySqlBackend {
    fn drop(&mut self) {
        if self.server.is_some() {
            tracing::warn!(socket = %self.socket_path.display(), "Shutting down orphaned MySQL server");
            run_blocking(
                "mysqladmin",
                ["--no-defaults".to_string(), self.socket_arg(), "shutdown".to_string()],
            );
            // A clean shutdown removes the pid file.
            if let Some(pid) = self.server_pid() {
                run_blocking("kill", ["-KILL".to_string(), pid]);
            }
        }
    }
}
