use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{Client, Collection, ConnectOptions, ConnectionTarget, Connector, Credentials, Database, DbError};
use crate::config::DatabaseConfig;

struct LiveConnection {
    client: Arc<dyn Client>,
    database: Arc<Database>,
}

/// The process-wide connection: connects lazily, reuses a live connection and
/// replaces one that fails its liveness probe.
pub struct DbConnection {
    connector: Arc<dyn Connector>,
    config: DatabaseConfig,
    development: bool,
    live: Mutex<Option<LiveConnection>>,
}

impl DbConnection {
    pub fn new(connector: Arc<dyn Connector>, config: DatabaseConfig, development: bool) -> Self {
        Self {
            connector,
            config,
            development,
            live: Mutex::new(None),
        }
    }

    pub async fn connect(&self) -> Result<Arc<Database>, DbError> {
        let mut live = self.live.lock().await;

        if let Some(conn) = live.as_ref() {
            if conn.client.ping().await.is_ok() {
                info!("Database already connected");
                return Ok(Arc::clone(&conn.database));
            }
        }

        if let Some(dead) = live.take() {
            warn!("Database connection lost, reconnecting...");
            if let Err(e) = dead.client.close().await {
                warn!(error = %e, "Failed to close dead database connection");
            }
        }

        let target = build_connection_target(&self.config, self.development)?;
        let options = self.connect_options();

        info!(
            mode = if self.development { "dev" } else { "prod" },
            target = %target.sanitized(),
            "Connecting to database"
        );

        let client = match self.connector.connect(&target, &options).await {
            Ok(client) => client,
            Err(e) => {
                error!(target = %target.sanitized(), error = %e, "Failed to connect to database server");
                if matches!(e, DbError::Connection(_)) {
                    error!("Make sure the database server is running and reachable");
                    error!("Outside development set DATABASE_URL; in development check DATABASE_HOST and DATABASE_PORT");
                }
                return Err(e);
            }
        };

        let database = Arc::new(Database::new());
        database.set_database(client.database(&self.config.name)?)?;

        info!(database = %self.config.name, "Database connected successfully");
        if self.development && options.credentials.is_none() {
            warn!("You're not making a secure database connection!");
        }

        *live = Some(LiveConnection {
            client,
            database: Arc::clone(&database),
        });
        Ok(database)
    }

    pub async fn disconnect(&self) -> Result<(), DbError> {
        let mut live = self.live.lock().await;
        match live.take() {
            Some(conn) => {
                conn.client.close().await?;
                info!("Database disconnected successfully");
            }
            None => info!("Database already disconnected"),
        }
        Ok(())
    }

    /// The currently bound database, without connecting.
    pub async fn database(&self) -> Result<Arc<Database>, DbError> {
        self.live
            .lock()
            .await
            .as_ref()
            .map(|conn| Arc::clone(&conn.database))
            .ok_or(DbError::NotConnected)
    }

    pub async fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, DbError> {
        self.database().await?.collection(name)
    }

    pub async fn is_connected(&self) -> bool {
        self.live.lock().await.is_some()
    }

    fn connect_options(&self) -> ConnectOptions {
        // Full connection strings carry their own auth; host:port needs it separately.
        let credentials = match (&self.config.user, &self.config.password) {
            (Some(username), Some(password)) if self.development => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        ConnectOptions {
            credentials,
            timeout: self.development.then_some(Duration::from_secs(5)),
        }
    }
}

/// Full connection string outside development when present, `host:port` otherwise.
pub fn build_connection_target(
    config: &DatabaseConfig,
    development: bool,
) -> Result<ConnectionTarget, DbError> {
    if !development {
        if let Some(url) = config.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(ConnectionTarget::Url(url.to_string()));
        }
    }

    if config.host.trim().is_empty() || config.port == 0 {
        let message = if development {
            "Database connection URL is not set. Please set DATABASE_HOST and DATABASE_PORT environment variables."
        } else {
            "Database connection URL is not set. Please set DATABASE_URL environment variable for production."
        };
        error!("{message}");
        return Err(DbError::Config(message.to_string()));
    }

    Ok(ConnectionTarget::HostPort {
        host: config.host.clone(),
        port: config.port,
    })
}
