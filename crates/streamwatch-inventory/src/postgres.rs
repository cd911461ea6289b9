//! PostgreSQL inventory backend.
//!
//! Connection parameters come from the environment and are re-read on every
//! [`InventoryProvider::list_streams`] call, so fixing a missing variable
//! takes effect on the next cycle without a restart.

use std::time::Duration;

use async_trait::async_trait;
use tokio_postgres::config::SslMode;
use tokio_postgres::NoTls;
use tracing::{debug, instrument, warn};

use crate::error::InventoryError;
use crate::provider::{InventoryProvider, InventoryResult};
use crate::schema::Stream;

/// Default table holding the stream inventory.
pub const DEFAULT_TABLE: &str = "cameras";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// PostgreSQL connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl std::fmt::Debug for PgConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .finish()
    }
}

impl PgConfig {
    /// Create from environment variables
    ///
    /// Reads:
    /// - POSTGRES_USER (required)
    /// - POSTGRES_PASSWORD (required)
    /// - POSTGRES_DB (required)
    /// - POSTGRES_HOST (optional, default: "localhost")
    /// - POSTGRES_PORT (optional, default: 5432)
    pub fn from_env() -> InventoryResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// Empty values count as missing. All missing required variables are
    /// reported together.
    pub fn from_lookup<F>(lookup: F) -> InventoryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let user = get("POSTGRES_USER");
        let password = get("POSTGRES_PASSWORD");
        let dbname = get("POSTGRES_DB");

        let missing: Vec<String> = [
            ("POSTGRES_USER", user.is_none()),
            ("POSTGRES_PASSWORD", password.is_none()),
            ("POSTGRES_DB", dbname.is_none()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| name.to_string())
        .collect();

        let (Some(user), Some(password), Some(dbname)) = (user, password, dbname) else {
            return Err(InventoryError::MissingConfig { vars: missing });
        };

        let host = get("POSTGRES_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get("POSTGRES_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                InventoryError::InvalidConfig(format!("POSTGRES_PORT is not a valid port: {raw}"))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host,
            port,
            user,
            password,
            dbname,
        })
    }

    fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .password(&self.password)
            .dbname(&self.dbname)
            .ssl_mode(SslMode::Disable)
            .connect_timeout(CONNECT_TIMEOUT);
        config
    }
}

/// Check that `name` is a plain or schema-qualified SQL identifier.
///
/// The table name is interpolated into the query text, so anything outside
/// `[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?` is rejected.
pub fn validate_table_name(name: &str) -> InventoryResult<()> {
    let parts: Vec<&str> = name.split('.').collect();
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
        return Err(InventoryError::InvalidConfig(format!(
            "invalid inventory table name: {name:?}"
        )));
    }
    Ok(())
}

/// Inventory backed by a PostgreSQL table with columns `(id, name, source_url)`.
#[derive(Debug, Clone)]
pub struct PostgresInventory {
    table: String,
    config: Option<PgConfig>,
}

impl PostgresInventory {
    /// Read connection parameters from the environment on every call.
    pub fn from_env(table: impl Into<String>) -> InventoryResult<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self {
            table,
            config: None,
        })
    }

    /// Use a fixed connection configuration.
    pub fn with_config(config: PgConfig, table: impl Into<String>) -> InventoryResult<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self {
            table,
            config: Some(config),
        })
    }

    /// Table this provider reads from.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn query_text(&self) -> String {
        format!(
            "SELECT id::bigint AS id, name, source_url FROM {} ORDER BY id",
            self.table
        )
    }

    fn resolve_config(&self) -> InventoryResult<PgConfig> {
        match &self.config {
            Some(config) => Ok(config.clone()),
            None => PgConfig::from_env(),
        }
    }
}

#[async_trait]
impl InventoryProvider for PostgresInventory {
    #[instrument(skip(self), fields(table = %self.table))]
    async fn list_streams(&self) -> InventoryResult<Vec<Stream>> {
        let config = self.resolve_config()?;
        debug!(host = %config.host, port = config.port, db = %config.dbname, "connecting to inventory");

        let (client, connection) = config
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| InventoryError::Connection(e.to_string()))?;

        let conn_task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "inventory connection closed with error");
            }
        });

        let rows = client.query(self.query_text().as_str(), &[]).await;
        drop(client);
        let _ = conn_task.await;
        let rows = rows?;

        let mut streams = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row
                .try_get("id")
                .map_err(|e| InventoryError::Decode(format!("id: {e}")))?;
            let name: String = row
                .try_get("name")
                .map_err(|e| InventoryError::Decode(format!("name of stream {id}: {e}")))?;
            let source_url: String = row
                .try_get("source_url")
                .map_err(|e| InventoryError::Decode(format!("source_url of stream {id}: {e}")))?;
            streams.push(Stream {
                id,
                name,
                source_url,
            });
        }

        debug!(count = streams.len(), "inventory loaded");
        Ok(streams)
    }

    fn describe(&self) -> String {
        match &self.config {
            Some(config) => format!(
                "postgres://{}:{}/{} ({})",
                config.host, config.port, config.dbname, self.table
            ),
            None => format!("postgres (env, {})", self.table),
        }
    }
}
