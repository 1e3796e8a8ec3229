//! Typed source records for the two NDJSON inputs (song catalog dumps and
//! playback event logs), plus the parse-and-validate boundary that turns raw
//! lines into them.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: missing required field `{field}`")]
    MissingField { line: usize, field: &'static str },
    #[error("line {line}: timestamp {ts} out of range")]
    Timestamp { line: usize, ts: i64 },
}

/// One catalog entry: a song plus its artist's descriptive fields, flattened
/// the way the dumps store them. Every field except the artist geo/location
/// block is required; a dump line missing one fails the whole file.
#[derive(Debug, Clone, Deserialize)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
    pub artist_name: String,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
}

/// One raw event-log line. Only `page` is guaranteed: auth and navigation
/// events carry nulls for most of the actor/session block, so everything
/// else stays optional until the record survives the playback filter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub page: String,
    pub ts: Option<i64>,
    #[serde(default, deserialize_with = "de_user_id")]
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    #[serde(skip)]
    pub line: usize,
}

/// A retained event record with every required field present and typed.
#[derive(Debug, Clone)]
pub struct Playback {
    pub ts: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub level: String,
    pub session_id: i64,
    pub location: String,
    pub user_agent: String,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub line: usize,
}

impl EventRecord {
    /// Validate a filtered record into a [`Playback`]. Any missing required
    /// field is a typed error carrying the source line number.
    pub fn into_playback(self) -> Result<Playback, RecordError> {
        let line = self.line;
        let missing = |field| RecordError::MissingField { line, field };
        Ok(Playback {
            ts: self.ts.ok_or_else(|| missing("ts"))?,
            user_id: self.user_id.ok_or_else(|| missing("userId"))?,
            first_name: self.first_name.ok_or_else(|| missing("firstName"))?,
            last_name: self.last_name.ok_or_else(|| missing("lastName"))?,
            gender: self.gender.ok_or_else(|| missing("gender"))?,
            level: self.level.ok_or_else(|| missing("level"))?,
            session_id: self.session_id.ok_or_else(|| missing("sessionId"))?,
            location: self.location.ok_or_else(|| missing("location"))?,
            user_agent: self.user_agent.ok_or_else(|| missing("userAgent"))?,
            song: self.song,
            artist: self.artist,
            length: self.length,
            line,
        })
    }
}

// The logs encode userId inconsistently: a number, a numeric string, or an
// empty string for anonymous sessions. Empty collapses to None.
fn de_user_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Text(String),
    }
    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Num(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse::<i64>().map(Some).map_err(serde::de::Error::custom)
            }
        }
    }
}

pub fn read_song_file(path: &Path) -> Result<Vec<SongRecord>, RecordError> {
    parse_song_lines(BufReader::new(fs::File::open(path)?))
}

pub fn read_event_file(path: &Path) -> Result<Vec<EventRecord>, RecordError> {
    parse_event_lines(BufReader::new(fs::File::open(path)?))
}

pub fn parse_song_lines<R: BufRead>(reader: R) -> Result<Vec<SongRecord>, RecordError> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let rec: SongRecord = serde_json::from_str(&line).map_err(|source| RecordError::Parse {
            line: idx + 1,
            source,
        })?;
        records.push(rec);
    }
    Ok(records)
}

pub fn parse_event_lines<R: BufRead>(reader: R) -> Result<Vec<EventRecord>, RecordError> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut rec: EventRecord =
            serde_json::from_str(&line).map_err(|source| RecordError::Parse {
                line: idx + 1,
                source,
            })?;
        rec.line = idx + 1;
        records.push(rec);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song_line() -> &'static str {
        r#"{"num_songs": 1, "artist_id": "ARD7TVE1187B99BFB1", "artist_latitude": null, "artist_longitude": null, "artist_location": "California - LA", "artist_name": "Casual", "song_id": "SOMZWCG12A8C13C480", "title": "I Didn't Mean To", "duration": 218.93179, "year": 0}"#
    }

    #[test]
    fn parses_a_catalog_dump_line() {
        let records = parse_song_lines(song_line().as_bytes()).expect("parse");
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.song_id, "SOMZWCG12A8C13C480");
        assert_eq!(rec.artist_name, "Casual");
        assert_eq!(rec.year, 0);
        assert!(rec.artist_latitude.is_none());
        assert_eq!(rec.artist_location.as_deref(), Some("California - LA"));
    }

    #[test]
    fn catalog_line_missing_required_field_is_fatal() {
        // no song_id
        let bad = r#"{"title": "X", "artist_id": "A", "year": 2000, "duration": 1.0, "artist_name": "Y"}"#;
        let err = parse_song_lines(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, RecordError::Parse { line: 1, .. }));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let input = format!("\n{}\n   \n", song_line());
        let records = parse_song_lines(input.as_bytes()).expect("parse");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn parse_error_reports_the_offending_line() {
        let input = format!("{}\nnot json\n", song_line());
        let err = parse_song_lines(input.as_bytes()).unwrap_err();
        assert!(matches!(err, RecordError::Parse { line: 2, .. }));
    }

    #[test]
    fn parses_an_event_line_with_camel_case_fields() {
        let input = r#"{"artist":"Des'ree","auth":"Logged In","firstName":"Kaylee","gender":"F","itemInSession":1,"lastName":"Summers","length":246.30812,"level":"free","location":"Phoenix-Mesa-Scottsdale, AZ","method":"PUT","page":"NextSong","registration":1540344794796.0,"sessionId":139,"song":"You Gotta Be","status":200,"ts":1541106106796,"userAgent":"Mozilla/5.0","userId":"8"}"#;
        let records = parse_event_lines(input.as_bytes()).expect("parse");
        let rec = &records[0];
        assert_eq!(rec.page, "NextSong");
        assert_eq!(rec.user_id, Some(8));
        assert_eq!(rec.session_id, Some(139));
        assert_eq!(rec.song.as_deref(), Some("You Gotta Be"));
        assert_eq!(rec.line, 1);
    }

    #[test]
    fn anonymous_user_id_collapses_to_none() {
        let input = r#"{"page":"Home","ts":1541106106796,"userId":""}"#;
        let records = parse_event_lines(input.as_bytes()).expect("parse");
        assert_eq!(records[0].user_id, None);

        let input = r#"{"page":"Home","ts":1541106106796,"userId":26}"#;
        let records = parse_event_lines(input.as_bytes()).expect("parse");
        assert_eq!(records[0].user_id, Some(26));
    }

    #[test]
    fn sparse_navigation_events_still_parse() {
        // Logged-out page loads carry almost nothing besides the page.
        let input = r#"{"page":"Login","ts":1541207073796,"auth":"Logged Out"}"#;
        let records = parse_event_lines(input.as_bytes()).expect("parse");
        assert_eq!(records[0].page, "Login");
        assert!(records[0].user_id.is_none());
    }

    #[test]
    fn validation_names_the_missing_field() {
        let input = r#"{"page":"NextSong","ts":1541106106796,"userId":"8"}"#;
        let rec = parse_event_lines(input.as_bytes()).expect("parse")[0].clone();
        let err = rec.into_playback().unwrap_err();
        match err {
            RecordError::MissingField { line, field } => {
                assert_eq!(line, 1);
                assert_eq!(field, "firstName");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
