use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument};

use super::schema;

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let mut connect_options = PgConnectOptions::from_str(database_url)?;

        // Be explicit about TLS when the DSN asks for it.
        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        // One writer, one reader, strictly serial: the whole run shares a
        // single connection.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(connect_options)
            .await?;
        info!("connected to db");
        Ok(Self { pool })
    }

    /// Open the per-file transaction. Dropping it without commit rolls the
    /// file's work back.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Apply the star-schema DDL. Every statement is idempotent, so this is
    /// safe against a database that already has the tables.
    pub async fn ensure_schema(&self) -> Result<()> {
        for stmt in schema::CREATE_TABLES {
            sqlx::raw_sql(stmt).execute(&self.pool).await?;
        }
        info!("schema ensured ({} tables)", schema::CREATE_TABLES.len());
        Ok(())
    }
}
