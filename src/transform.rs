//! Mapping from source records to the star-schema rows the loader writes.
//!
//! Two independent mappings: catalog records fan out 1:1 into a song row and
//! an artist row; retained event records fan out 1:1:1 into a time row, a
//! user row, and a songplay fact row. Nothing here touches the store — fact
//! foreign keys arrive pre-resolved from the caller.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::records::{EventRecord, Playback, RecordError, SongRecord};

/// Page value marking a completed playback. Everything else in the logs
/// (auth, navigation, settings) is noise for this pipeline.
pub const PLAYBACK_PAGE: &str = "NextSong";

#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeRow {
    pub start_time: DateTime<Utc>,
    pub hour: i32,
    pub day: i32,
    /// ISO week number.
    pub week: i32,
    pub month: i32,
    pub year: i32,
    /// Monday = 0 .. Sunday = 6.
    pub weekday: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongplayRow {
    pub start_time: DateTime<Utc>,
    pub user_id: i64,
    pub level: String,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: String,
    pub user_agent: String,
}

/// Derive the two dimension rows a catalog record denormalizes.
pub fn song_rows(rec: &SongRecord) -> (SongRow, ArtistRow) {
    let song = SongRow {
        song_id: rec.song_id.clone(),
        title: rec.title.clone(),
        artist_id: rec.artist_id.clone(),
        year: rec.year,
        duration: rec.duration,
    };
    let artist = ArtistRow {
        artist_id: rec.artist_id.clone(),
        name: rec.artist_name.clone(),
        location: rec.artist_location.clone(),
        latitude: rec.artist_latitude,
        longitude: rec.artist_longitude,
    };
    (song, artist)
}

/// Filter one file's events down to playbacks and validate each survivor.
/// A retained record with a missing required field aborts the whole file.
pub fn retain_playbacks(records: Vec<EventRecord>) -> Result<Vec<Playback>, RecordError> {
    records
        .into_iter()
        .filter(|r| r.page == PLAYBACK_PAGE)
        .map(EventRecord::into_playback)
        .collect()
}

/// Event timestamp (epoch milliseconds) as a UTC instant.
pub fn playback_instant(p: &Playback) -> Result<DateTime<Utc>, RecordError> {
    Utc.timestamp_millis_opt(p.ts)
        .single()
        .ok_or(RecordError::Timestamp {
            line: p.line,
            ts: p.ts,
        })
}

/// Expand a playback's timestamp into calendar components. Duplicate
/// timestamps across records each still yield their own row.
pub fn time_row(p: &Playback) -> Result<TimeRow, RecordError> {
    let t = playback_instant(p)?;
    Ok(TimeRow {
        start_time: t,
        hour: t.hour() as i32,
        day: t.day() as i32,
        week: t.iso_week().week() as i32,
        month: t.month() as i32,
        year: t.year(),
        weekday: t.weekday().num_days_from_monday() as i32,
    })
}

pub fn user_row(p: &Playback) -> UserRow {
    UserRow {
        user_id: p.user_id,
        first_name: p.first_name.clone(),
        last_name: p.last_name.clone(),
        gender: p.gender.clone(),
        level: p.level.clone(),
    }
}

/// Lookup key for song/artist id resolution, present only when the playback
/// carries the full (title, artist, duration) reference.
pub fn song_lookup_key(p: &Playback) -> Option<(&str, &str, f64)> {
    match (p.song.as_deref(), p.artist.as_deref(), p.length) {
        (Some(song), Some(artist), Some(length)) => Some((song, artist, length)),
        _ => None,
    }
}

/// Package the fact row. `resolved` is the store lookup result; an
/// unresolved reference keeps both foreign keys NULL.
pub fn songplay_row(
    p: &Playback,
    resolved: Option<(String, String)>,
) -> Result<SongplayRow, RecordError> {
    let (song_id, artist_id) = match resolved {
        Some((s, a)) => (Some(s), Some(a)),
        None => (None, None),
    };
    Ok(SongplayRow {
        start_time: playback_instant(p)?,
        user_id: p.user_id,
        level: p.level.clone(),
        song_id,
        artist_id,
        session_id: p.session_id,
        location: p.location.clone(),
        user_agent: p.user_agent.clone(),
    })
}
