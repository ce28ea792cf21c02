use crate::e2e::helpers;

use helpers::{command_available, init_tracing};
use selfoss_harness::domain::storage::{BackendKind, ConnectionConfig, ServerEndpoint};
use selfoss_harness::infrastructure::storage::{BackendOptions, BackendRegistry};
use std::time::Duration;
use tempfile::TempDir;

fn options(root: &TempDir) -> BackendOptions {
    BackendOptions {
        temp_root: root.path().to_path_buf(),
        ready_timeout: Duration::from_secs(60),
    }
}

fn running_as_root() -> bool {
    std::process::Command::new("id")
        .arg("-u")
        .output()
        .map(|out| String::from_utf8_lossy(&out.stdout).trim() == "0")
        .unwrap_or(false)
}

fn entries(root: &TempDir) -> usize {
    std::fs::read_dir(root.path()).unwrap().count()
}

#[tokio::test]
async fn it_should_provision_embedded_storage_in_private_workspace() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let mut backend = BackendRegistry::default()
        .create("sqlite", &options(&root))
        .unwrap();

    backend.start().await.unwrap();
    assert_eq!(backend.kind(), BackendKind::Sqlite);
    let ConnectionConfig::EmbeddedFile { file } = backend.config() else {
        panic!("Embedded backend should expose a file");
    };
    assert!(file.starts_with(root.path()));
    assert_eq!(entries(&root), 1);

    backend.stop().await.unwrap();
    assert_eq!(entries(&root), 0);
}

#[tokio::test]
async fn it_should_isolate_concurrent_backends() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let registry = BackendRegistry::default();

    let mut a = registry.create("sqlite", &options(&root)).unwrap();
    let mut b = registry.create("sqlite", &options(&root)).unwrap();
    let (started_a, started_b) = tokio::join!(a.start(), b.start());
    started_a.unwrap();
    started_b.unwrap();

    assert_ne!(a.config(), b.config());
    assert_eq!(entries(&root), 2);

    a.stop().await.unwrap();
    b.stop().await.unwrap();
    assert_eq!(entries(&root), 0);
}

#[tokio::test]
async fn it_should_provision_postgresql_over_private_socket() {
    init_tracing();
    if !command_available("initdb") || !command_available("pg_ctl") || running_as_root() {
        eprintln!("skipping: PostgreSQL server tools not usable here");
        return;
    }
    let root = TempDir::new().unwrap();
    let mut backend = BackendRegistry::default()
        .create("postgresql", &options(&root))
        .unwrap();

    let started = backend.start().await;
    let config = backend.config();
    backend.stop().await.unwrap();
    started.unwrap();

    let ConnectionConfig::NetworkedServer(server) = config else {
        panic!("PostgreSQL should be a networked server");
    };
    assert!(matches!(server.endpoint, ServerEndpoint::SocketDir(ref dir) if dir.starts_with(root.path())));
    assert_eq!(server.database, "selfoss");
    assert_eq!(entries(&root), 0);
}

#[tokio::test]
async fn it_should_provision_mysql_over_private_socket() {
    init_tracing();
    if !command_available("mysql_install_db") || !command_available("mysqld_safe") {
        eprintln!("skipping: MySQL server tools not usable here");
        return;
    }
    let root = TempDir::new().unwrap();
    let mut backend = BackendRegistry::default()
        .create("mysql", &options(&root))
        .unwrap();

    let started = backend.start().await;
    let config = backend.config();
    backend.stop().await.unwrap();
    started.unwrap();

    let ConnectionConfig::NetworkedServer(server) = config else {
        panic!("MySQL should be a networked server");
    };
    assert!(matches!(server.endpoint, ServerEndpoint::Socket(ref path) if path.starts_with(root.path())));
    assert!(server.password.is_some());
    assert_eq!(entries(&root), 0);
}
