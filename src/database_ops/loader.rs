//! Per-row load operations. Every function takes the live per-file
//! transaction's connection; nothing here owns a connection or commits.

use anyhow::Result;
use sqlx::{PgConnection, Row};

use super::schema;
use crate::transform::{ArtistRow, SongRow, SongplayRow, TimeRow, UserRow};

pub async fn insert_song(conn: &mut PgConnection, row: &SongRow) -> Result<()> {
    sqlx::query(schema::INSERT_SONG)
        .bind(&row.song_id)
        .bind(&row.title)
        .bind(&row.artist_id)
        .bind(row.year)
        .bind(row.duration)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_artist(conn: &mut PgConnection, row: &ArtistRow) -> Result<()> {
    sqlx::query(schema::INSERT_ARTIST)
        .bind(&row.artist_id)
        .bind(&row.name)
        .bind(&row.location)
        .bind(row.latitude)
        .bind(row.longitude)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_time(conn: &mut PgConnection, row: &TimeRow) -> Result<()> {
    sqlx::query(schema::INSERT_TIME)
        .bind(row.start_time)
        .bind(row.hour)
        .bind(row.day)
        .bind(row.week)
        .bind(row.month)
        .bind(row.year)
        .bind(row.weekday)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Last write wins: replaying a user updates every descriptive field,
/// which is how a free account that upgraded ends up stored as paid.
pub async fn upsert_user(conn: &mut PgConnection, row: &UserRow) -> Result<()> {
    sqlx::query(schema::UPSERT_USER)
        .bind(row.user_id)
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.gender)
        .bind(&row.level)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_songplay(conn: &mut PgConnection, row: &SongplayRow) -> Result<()> {
    sqlx::query(schema::INSERT_SONGPLAY)
        .bind(row.start_time)
        .bind(row.user_id)
        .bind(&row.level)
        .bind(&row.song_id)
        .bind(&row.artist_id)
        .bind(row.session_id)
        .bind(&row.location)
        .bind(&row.user_agent)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Resolve a playback's `(title, artist name, duration)` reference to stored
/// `(song_id, artist_id)`. Returns `None` when the catalog has no match —
/// the caller keeps NULL foreign keys in that case.
pub async fn find_song(
    conn: &mut PgConnection,
    title: &str,
    artist: &str,
    duration: f64,
) -> Result<Option<(String, String)>> {
    let row = sqlx::query(schema::FIND_SONG)
        .bind(title)
        .bind(artist)
        .bind(duration)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|r| (r.get("song_id"), r.get("artist_id"))))
}
