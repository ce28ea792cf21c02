use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use crate::domain::storage::{ServerConnection, ServerEndpoint, ServerEngine};

/// Connects with the application's credentials and runs a trivial query.
///
/// Verifies that the role and database a backend just provisioned are
/// actually usable over the private socket.
pub async fn check_connection(server: &ServerConnection) -> Result<(), sqlx::Error> {
    let socket = match &server.endpoint {
        ServerEndpoint::Socket(path) | ServerEndpoint::SocketDir(path) => path,
    };

    match server.engine {
        ServerEngine::PostgreSql => {
            let options = PgConnectOptions::new()
                .socket(socket)
                .username(&server.username)
                .database(&server.database);
            let options = match &server.password {
                Some(password) => options.password(password),
                None => options,
            };
            let mut conn = PgConnection::connect_with(&options).await?;
            sqlx::query("SELECT 1").fetch_one(&mut conn).await?;
            conn.close().await?;
        }
        ServerEngine::MySql => {
            let options = MySqlConnectOptions::new()
                .socket(socket)
                .username(&server.username)
                .database(&server.database);
            let options = match &server.password {
                Some(password) => options.password(password),
                None => options,
            };
            let mut conn = MySqlConnection::connect_with(&options).await?;
            sqlx::query("SELECT 1").fetch_one(&mut conn).await?;
            conn.close().await?;
        }
    }

    Ok(())
}
