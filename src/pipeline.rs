//! The driver: walks a data root, processes each file inside its own
//! transaction, commits, and reports progress. Catalog files must be loaded
//! before event files so fact-row resolution can see the song rows.

use std::path::Path;

use anyhow::{Context, Result};
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};

use crate::database_ops::db::Db;
use crate::database_ops::loader;
use crate::{discover, records, transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Catalog,
    EventLog,
}

/// Full run: every catalog file, then every event-log file.
pub async fn run(db: &Db, song_root: &Path, log_root: &Path) -> Result<()> {
    process_directory(db, song_root, SourceKind::Catalog).await?;
    process_directory(db, log_root, SourceKind::EventLog).await?;
    Ok(())
}

#[instrument(skip(db, root), fields(root = %root.display()))]
pub async fn process_directory(db: &Db, root: &Path, kind: SourceKind) -> Result<()> {
    let files = discover::json_files(root)?;
    let total = files.len();
    info!("{} files found in {}", total, root.display());

    for (i, path) in files.iter().enumerate() {
        let mut tx = db.begin().await?;
        match kind {
            SourceKind::Catalog => process_song_file(&mut tx, path)
                .await
                .with_context(|| format!("song file {}", path.display()))?,
            SourceKind::EventLog => process_log_file(&mut tx, path)
                .await
                .with_context(|| format!("event file {}", path.display()))?,
        }
        tx.commit().await?;
        info!("{}/{} files processed.", i + 1, total);
    }
    Ok(())
}

/// One catalog file: each line becomes one song row and one artist row.
async fn process_song_file(tx: &mut Transaction<'_, Postgres>, path: &Path) -> Result<()> {
    let records = records::read_song_file(path)?;
    for rec in &records {
        let (song, artist) = transform::song_rows(rec);
        loader::insert_song(tx, &song).await?;
        loader::insert_artist(tx, &artist).await?;
    }
    Ok(())
}

/// One event-log file: filter to playbacks, then three passes in order —
/// time rows, user rows, fact rows — each pass in source-record order.
async fn process_log_file(tx: &mut Transaction<'_, Postgres>, path: &Path) -> Result<()> {
    let records = records::read_event_file(path)?;
    let playbacks = transform::retain_playbacks(records)?;

    for p in &playbacks {
        let row = transform::time_row(p)?;
        loader::insert_time(tx, &row).await?;
    }

    for p in &playbacks {
        loader::upsert_user(tx, &transform::user_row(p)).await?;
    }

    for p in &playbacks {
        let resolved = match transform::song_lookup_key(p) {
            Some((title, artist, duration)) => {
                loader::find_song(tx, title, artist, duration).await?
            }
            None => None,
        };
        let row = transform::songplay_row(p, resolved)?;
        loader::insert_songplay(tx, &row).await?;
    }
    Ok(())
}
