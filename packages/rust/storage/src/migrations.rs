//! SQL migration definitions for the rosterbook database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: stations, depot_series, duties, duty_cycles, import_jobs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Station registry (depots are flagged stations)
CREATE TABLE IF NOT EXISTS stations (
    id         TEXT PRIMARY KEY,
    code       TEXT NOT NULL UNIQUE,
    name_fr    TEXT NOT NULL,
    name_nl    TEXT NOT NULL,
    is_depot   INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Cycle series seen at a depot; grows monotonically across imports
CREATE TABLE IF NOT EXISTS depot_series (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    station_id TEXT NOT NULL REFERENCES stations(id) ON DELETE CASCADE,
    series     TEXT NOT NULL,
    UNIQUE(station_id, series)
);

-- Imported duties; key_hash is the composite-identity fingerprint
CREATE TABLE IF NOT EXISTS duties (
    id            TEXT PRIMARY KEY,
    number        TEXT NOT NULL,
    depot_code    TEXT NOT NULL,
    date          TEXT NOT NULL,
    period        TEXT NOT NULL,
    start_time    TEXT NOT NULL,
    end_time      TEXT NOT NULL,
    amplitude     TEXT NOT NULL,
    amplitude_min INTEGER NOT NULL,
    drive_min     INTEGER NOT NULL,
    active_min    INTEGER NOT NULL,
    reserve_min   INTEGER NOT NULL,
    deadhead_min  INTEGER NOT NULL,
    key_hash      TEXT NOT NULL UNIQUE,
    raw_text      TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_duties_depot_code ON duties(depot_code);
CREATE INDEX IF NOT EXISTS idx_duties_date ON duties(date);

-- Day-of-week cycle assignments of a duty
CREATE TABLE IF NOT EXISTS duty_cycles (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    duty_id TEXT NOT NULL REFERENCES duties(id) ON DELETE CASCADE,
    series  TEXT NOT NULL,
    week    TEXT NOT NULL,
    day     INTEGER NOT NULL,
    period  TEXT
);

CREATE INDEX IF NOT EXISTS idx_duty_cycles_duty ON duty_cycles(duty_id);
CREATE INDEX IF NOT EXISTS idx_duty_cycles_series ON duty_cycles(series);

-- Import job history
CREATE TABLE IF NOT EXISTS import_jobs (
    id           TEXT PRIMARY KEY,
    source       TEXT NOT NULL,
    kind         TEXT NOT NULL,
    status       TEXT NOT NULL,
    log          TEXT,
    content_hash TEXT,
    started_at   TEXT NOT NULL,
    finished_at  TEXT
);

CREATE INDEX IF NOT EXISTS idx_import_jobs_started ON import_jobs(started_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
