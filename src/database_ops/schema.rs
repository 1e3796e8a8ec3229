//! Star-schema DDL and the per-row statements the loader executes.
//!
//! Column orders here are the storage contract; the loader binds positionally
//! against them.

/// Applied in order by `Db::ensure_schema`.
pub const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS songs (
        song_id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        artist_id TEXT NOT NULL,
        year INT,
        duration DOUBLE PRECISION
    )",
    "CREATE TABLE IF NOT EXISTS artists (
        artist_id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        location TEXT,
        latitude DOUBLE PRECISION,
        longitude DOUBLE PRECISION
    )",
    // Playbacks sharing a timestamp each keep their own row, so no key here.
    "CREATE TABLE IF NOT EXISTS time (
        start_time TIMESTAMPTZ NOT NULL,
        hour INT NOT NULL,
        day INT NOT NULL,
        week INT NOT NULL,
        month INT NOT NULL,
        year INT NOT NULL,
        weekday INT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS users (
        user_id BIGINT PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        gender TEXT,
        level TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS songplays (
        songplay_id BIGSERIAL PRIMARY KEY,
        start_time TIMESTAMPTZ NOT NULL,
        user_id BIGINT NOT NULL,
        level TEXT,
        song_id TEXT,
        artist_id TEXT,
        session_id BIGINT,
        location TEXT,
        user_agent TEXT
    )",
];

// Catalog dumps repeat artists (and re-runs repeat songs); first write wins
// for those two. Users are the one genuinely upserted table.
pub const INSERT_SONG: &str = "INSERT INTO songs \
    (song_id, title, artist_id, year, duration) \
    VALUES ($1, $2, $3, $4, $5) \
    ON CONFLICT (song_id) DO NOTHING";

pub const INSERT_ARTIST: &str = "INSERT INTO artists \
    (artist_id, name, location, latitude, longitude) \
    VALUES ($1, $2, $3, $4, $5) \
    ON CONFLICT (artist_id) DO NOTHING";

pub const INSERT_TIME: &str = "INSERT INTO time \
    (start_time, hour, day, week, month, year, weekday) \
    VALUES ($1, $2, $3, $4, $5, $6, $7)";

pub const UPSERT_USER: &str = "INSERT INTO users \
    (user_id, first_name, last_name, gender, level) \
    VALUES ($1, $2, $3, $4, $5) \
    ON CONFLICT (user_id) DO UPDATE SET \
        first_name = EXCLUDED.first_name, \
        last_name = EXCLUDED.last_name, \
        gender = EXCLUDED.gender, \
        level = EXCLUDED.level";

pub const INSERT_SONGPLAY: &str = "INSERT INTO songplays \
    (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

/// Resolve a playback's song reference to stored ids. At most one row.
pub const FIND_SONG: &str = "SELECT s.song_id, s.artist_id \
    FROM songs s \
    JOIN artists a ON a.artist_id = s.artist_id \
    WHERE s.title = $1 AND a.name = $2 AND s.duration = $3 \
    LIMIT 1";

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder_count(sql: &str) -> usize {
        (1..=16).take_while(|n| sql.contains(&format!("${n}"))).count()
    }

    #[test]
    fn write_statements_bind_every_listed_column() {
        assert_eq!(placeholder_count(INSERT_SONG), 5);
        assert_eq!(placeholder_count(INSERT_ARTIST), 5);
        assert_eq!(placeholder_count(INSERT_TIME), 7);
        assert_eq!(placeholder_count(UPSERT_USER), 5);
        assert_eq!(placeholder_count(INSERT_SONGPLAY), 8);
        assert_eq!(placeholder_count(FIND_SONG), 3);
    }

    #[test]
    fn only_users_get_conflict_updates() {
        assert!(UPSERT_USER.contains("ON CONFLICT (user_id) DO UPDATE"));
        assert!(UPSERT_USER.contains("level = EXCLUDED.level"));
        assert!(!INSERT_TIME.contains("ON CONFLICT"));
        assert!(!INSERT_SONGPLAY.contains("ON CONFLICT"));
    }
}
