use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use super::admin::{probe_command, run_admin_command, run_blocking};
use super::BackendOptions;
use crate::domain::storage::{
    BackendKind, ConnectionConfig, ServerConnection, ServerEndpoint, ServerEngine, StorageBackend,
};
use crate::error::HarnessResult;
use crate::infrastructure::db::check_connection;
use crate::infrastructure::readiness::wait_until_ready;
use crate::infrastructure::workspace::TemporaryWorkspace;

const USER: &str = "selfoss";
const DATABASE: &str = "selfoss";

/// PostgreSQL cluster with networking disabled; the workspace directory
/// doubles as the unix socket directory.
pub struct PostgresBackend {
    workspace: TemporaryWorkspace,
    data_dir: PathBuf,
    socket_dir: PathBuf,
    ready_timeout: Duration,
    running: bool,
}

impl PostgresBackend {
    pub fn new(options: &BackendOptions) -> HarnessResult<Self> {
        let workspace = TemporaryWorkspace::create(&options.temp_root, "selfoss-pgsql-")?;
        let data_dir = workspace.create_dir("data")?;
        workspace.restrict("data", 0o750)?;
        let socket_dir = workspace.path().to_path_buf();

        Ok(Self {
            workspace,
            data_dir,
            socket_dir,
            ready_timeout: options.ready_timeout,
            running: false,
        })
    }

    fn pgdata_arg(&self) -> String {
        format!("--pgdata={}", self.data_dir.display())
    }

    fn host_arg(&self) -> String {
        format!("--host={}", self.socket_dir.display())
    }

    async fn psql(&self, command: &str) -> HarnessResult<()> {
        // template1 is guaranteed to exist in a fresh cluster.
        run_admin_command(
            "psql",
            [
                self.host_arg(),
                "--dbname=template1".to_string(),
                "--tuples-only".to_string(),
                "--no-align".to_string(),
                format!("--command={}", command),
            ],
        )
        .await
    }

    fn connection(&self) -> ServerConnection {
        ServerConnection {
            engine: ServerEngine::PostgreSql,
            endpoint: ServerEndpoint::SocketDir(self.socket_dir.clone()),
            username: USER.to_string(),
            password: None,
            database: DATABASE.to_string(),
        }
    }
}

#[async_trait]
impl StorageBackend for PostgresBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::PostgreSql
    }

    async fn start(&mut self) -> HarnessResult<()> {
        tracing::info!(socket_dir = %self.socket_dir.display(), "Provisioning PostgreSQL cluster");

        run_admin_command("initdb", [self.pgdata_arg(), "--auth=trust".to_string()]).await?;

        // pg_ctl hands --options to the server command line verbatim.
        self.running = true;
        run_admin_command(
            "pg_ctl",
            [
                "start".to_string(),
                self.pgdata_arg(),
                format!("--log={}", self.workspace.join("postgres.log").display()),
                format!(
                    "--options=-k '{}' -c listen_addresses=",
                    self.socket_dir.display()
                ),
            ],
        )
        .await?;

        let ready_args = vec![self.host_arg(), "--dbname=template1".to_string()];
        wait_until_ready("postgresql", self.ready_timeout, || {
            probe_command("pg_isready", ready_args.clone())
        })
        .await?;

        self.psql(&format!("CREATE USER \"{}\"", USER)).await?;
        self.psql(&format!(
            "CREATE DATABASE \"{}\" WITH OWNER = \"{}\"",
            DATABASE, USER
        ))
        .await?;

        check_connection(&self.connection()).await?;
        tracing::info!("PostgreSQL cluster provisioned");

        Ok(())
    }

    async fn stop(&mut self) -> HarnessResult<()> {
        let shutdown = if self.running {
            self.running = false;
            run_admin_command(
                "pg_ctl",
                ["stop".to_string(), self.pgdata_arg(), "--mode=fast".to_string()],
            )
            .await
        } else {
            Ok(())
        };
        let cleanup = self.workspace.close();
        shutdown.and(cleanup)
    }

    fn config(&self) -> ConnectionConfig {
        ConnectionConfig::NetworkedServer(self.connection())
    }
}

impl Drop for PostgresBackend {
    fn drop(&mut self) {
        if self.running {
            tracing::warn!(pgdata = %self.data_dir.display(), "Shutting down orphaned PostgreSQL cluster");
            run_blocking(
                "pg_ctl",
                ["stop".to_string(), self.pgdata_arg(), "--mode=immediate".to_string()],
            );
        }
    }
}
