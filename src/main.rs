use std::path::Path;

use anyhow::{Context, Result};
use playlog_etl::database_ops::db::Db;
use playlog_etl::util::env as env_util;
use playlog_etl::{logging, pipeline};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    logging::init_tracing("info,sqlx=warn")?;

    let database_url = env_util::db_url();
    let db = Db::connect(&database_url)
        .await
        .context("Db::connect failed")?;

    // Idempotent DDL; disable with AUTO_MIGRATE=0 when the schema is managed
    // elsewhere.
    if env_util::env_flag("AUTO_MIGRATE", true) {
        db.ensure_schema().await.context("schema setup failed")?;
    }

    let song_root = env_util::song_data_dir();
    let log_root = env_util::log_data_dir();

    pipeline::run(&db, Path::new(&song_root), Path::new(&log_root)).await?;

    db.pool.close().await;
    info!("done");
    Ok(())
}
