//! libSQL storage layer for rosterbook (local file database).
//!
//! The [`Storage`] struct wraps a libSQL database holding the station
//! registry, imported duties with their cycle assignments, per-depot series
//! sets, and import job history.
//!
//! **Access rules:**
//! - the CLI is the sole writer via [`Storage::open`];
//! - reporting tools attach read-only via [`Storage::open_readonly`].

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{params, Connection, Database};
use rosterbook_shared::{
    new_record_id, DutyRecord, ImportStatus, Result, RosterbookError,
};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// A station registry row. Depots are stations with `is_depot` set.
#[derive(Debug, Clone)]
pub struct Station {
    pub id: String,
    pub code: String,
    pub name_fr: String,
    pub name_nl: String,
    pub is_depot: bool,
}

/// One row of import job history.
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub id: String,
    pub source: String,
    pub kind: String,
    pub status: ImportStatus,
    pub log: Option<String>,
    pub content_hash: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

/// Per-series duty averages, the unit of the stats report.
#[derive(Debug, Clone)]
pub struct SeriesAverages {
    pub series: String,
    pub duty_count: u32,
    pub avg_amplitude_min: f64,
    pub avg_drive_min: f64,
    pub avg_active_min: f64,
    pub avg_reserve_min: f64,
    pub avg_deadhead_min: f64,
}

/// Optional filters for the stats report.
#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    pub depot_code: Option<String>,
    pub date: Option<String>,
    pub series: Option<String>,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RosterbookError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    RosterbookError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(RosterbookError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Station operations
    // -----------------------------------------------------------------------

    /// Look a station up by its code.
    pub async fn find_station_by_code(&self, code: &str) -> Result<Option<Station>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, code, name_fr, name_nl, is_depot FROM stations WHERE code = ?1",
                params![code],
            )
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_station(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(RosterbookError::Storage(e.to_string())),
        }
    }

    /// Insert a station unless its code is already registered. Returns `true`
    /// when a row was actually created.
    pub async fn insert_station_if_absent(
        &self,
        code: &str,
        name_fr: &str,
        name_nl: &str,
    ) -> Result<bool> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let affected = self
            .conn
            .execute(
                "INSERT INTO stations (id, code, name_fr, name_nl, is_depot, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
                 ON CONFLICT(code) DO NOTHING",
                params![new_record_id(), code, name_fr, name_nl, now.as_str()],
            )
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Flag an existing station as a depot. Names are left untouched.
    pub async fn mark_depot(&self, station_id: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE stations SET is_depot = 1, updated_at = ?1 WHERE id = ?2",
                params![now.as_str(), station_id],
            )
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Depot series operations
    // -----------------------------------------------------------------------

    /// Add a cycle series to a depot's registry. The set only ever grows;
    /// re-adding a known series is a no-op. Returns `true` when added.
    pub async fn add_depot_series(&self, station_id: &str, series: &str) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO depot_series (station_id, series) VALUES (?1, ?2)",
                params![station_id, series],
            )
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// List the series registered for a depot, sorted.
    pub async fn list_depot_series(&self, station_id: &str) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT series FROM depot_series WHERE station_id = ?1 ORDER BY series",
                params![station_id],
            )
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(
                row.get::<String>(0)
                    .map_err(|e| RosterbookError::Storage(e.to_string()))?,
            );
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Duty operations
    // -----------------------------------------------------------------------

    /// Insert a duty unless one with the same fingerprint already exists.
    /// The insert and the uniqueness check are a single statement, so two
    /// concurrent imports of the same booklet cannot race into duplicates.
    /// Cycle assignments are written only when the duty row was created.
    /// Returns `true` when the duty was inserted.
    pub async fn insert_duty_if_absent(&self, record: &DutyRecord) -> Result<bool> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let affected = self
            .conn
            .execute(
                "INSERT INTO duties (id, number, depot_code, date, period, start_time, end_time,
                                     amplitude, amplitude_min, drive_min, active_min, reserve_min,
                                     deadhead_min, key_hash, raw_text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                 ON CONFLICT(key_hash) DO NOTHING",
                params![
                    record.id.as_str(),
                    record.number.as_str(),
                    record.depot_code.as_str(),
                    record.date.to_string(),
                    record.period.as_str(),
                    record.start_time.as_str(),
                    record.end_time.as_str(),
                    record.amplitude.as_str(),
                    record.amplitude_min as i64,
                    record.drive_min as i64,
                    record.active_min as i64,
                    record.reserve_min as i64,
                    record.deadhead_min as i64,
                    record.fingerprint(),
                    record.raw_text.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;

        if affected == 0 {
            return Ok(false);
        }

        for cycle in &record.cycles {
            self.conn
                .execute(
                    "INSERT INTO duty_cycles (duty_id, series, week, day, period)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        record.id.as_str(),
                        cycle.series.as_str(),
                        cycle.week.as_str(),
                        i64::from(cycle.day),
                        cycle.period.as_deref(),
                    ],
                )
                .await
                .map_err(|e| RosterbookError::Storage(e.to_string()))?;
        }
        Ok(true)
    }

    /// Number of stored duties, optionally restricted to a depot.
    pub async fn count_duties(&self, depot_code: Option<&str>) -> Result<u32> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM duties WHERE ?1 IS NULL OR depot_code = ?1",
                params![depot_code],
            )
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<u32>(0)
                .map_err(|e| RosterbookError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(RosterbookError::Storage(e.to_string())),
        }
    }

    /// Average duty times grouped by cycle series. A duty that appears in a
    /// series on several days still counts once, hence the DISTINCT pairing.
    pub async fn series_averages(&self, filter: &StatsFilter) -> Result<Vec<SeriesAverages>> {
        let mut rows = self
            .conn
            .query(
                "SELECT c.series,
                        COUNT(*),
                        AVG(d.amplitude_min),
                        AVG(d.drive_min),
                        AVG(d.active_min),
                        AVG(d.reserve_min),
                        AVG(d.deadhead_min)
                 FROM (SELECT DISTINCT duty_id, series FROM duty_cycles) c
                 JOIN duties d ON d.id = c.duty_id
                 WHERE (?1 IS NULL OR d.depot_code = ?1)
                   AND (?2 IS NULL OR d.date = ?2)
                   AND (?3 IS NULL OR c.series = ?3)
                 GROUP BY c.series
                 ORDER BY c.series",
                params![
                    filter.depot_code.as_deref(),
                    filter.date.as_deref(),
                    filter.series.as_deref(),
                ],
            )
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(SeriesAverages {
                series: row
                    .get::<String>(0)
                    .map_err(|e| RosterbookError::Storage(e.to_string()))?,
                duty_count: row.get::<u32>(1).unwrap_or(0),
                avg_amplitude_min: row.get::<f64>(2).unwrap_or(0.0),
                avg_drive_min: row.get::<f64>(3).unwrap_or(0.0),
                avg_active_min: row.get::<f64>(4).unwrap_or(0.0),
                avg_reserve_min: row.get::<f64>(5).unwrap_or(0.0),
                avg_deadhead_min: row.get::<f64>(6).unwrap_or(0.0),
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Import job operations
    // -----------------------------------------------------------------------

    /// Insert a new pending import job. Returns the generated job ID.
    pub async fn insert_import_job(
        &self,
        source: &str,
        kind: &str,
        content_hash: Option<&str>,
    ) -> Result<String> {
        self.check_writable()?;
        let id = new_record_id();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO import_jobs (id, source, kind, status, content_hash, started_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_str(),
                    source,
                    kind,
                    ImportStatus::Pending.as_str(),
                    content_hash,
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Close an import job with its final status and log.
    pub async fn finish_import_job(
        &self,
        job_id: &str,
        status: ImportStatus,
        log: &str,
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE import_jobs SET status = ?1, log = ?2, finished_at = ?3 WHERE id = ?4",
                params![status.as_str(), log, now.as_str(), job_id],
            )
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;
        Ok(())
    }

    /// List import jobs, most recent first.
    pub async fn list_import_jobs(&self, limit: u32) -> Result<Vec<ImportJob>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, source, kind, status, log, content_hash, started_at, finished_at
                 FROM import_jobs ORDER BY started_at DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| RosterbookError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_import_job(&row)?);
        }
        Ok(results)
    }
}

/// Convert a database row to a [`Station`].
fn row_to_station(row: &libsql::Row) -> Result<Station> {
    Ok(Station {
        id: row
            .get::<String>(0)
            .map_err(|e| RosterbookError::Storage(e.to_string()))?,
        code: row
            .get::<String>(1)
            .map_err(|e| RosterbookError::Storage(e.to_string()))?,
        name_fr: row
            .get::<String>(2)
            .map_err(|e| RosterbookError::Storage(e.to_string()))?,
        name_nl: row
            .get::<String>(3)
            .map_err(|e| RosterbookError::Storage(e.to_string()))?,
        is_depot: row.get::<i64>(4).unwrap_or(0) != 0,
    })
}

/// Convert a database row to an [`ImportJob`].
fn row_to_import_job(row: &libsql::Row) -> Result<ImportJob> {
    let status: String = row
        .get(3)
        .map_err(|e| RosterbookError::Storage(e.to_string()))?;
    Ok(ImportJob {
        id: row
            .get::<String>(0)
            .map_err(|e| RosterbookError::Storage(e.to_string()))?,
        source: row
            .get::<String>(1)
            .map_err(|e| RosterbookError::Storage(e.to_string()))?,
        kind: row
            .get::<String>(2)
            .map_err(|e| RosterbookError::Storage(e.to_string()))?,
        status: status
            .parse()
            .map_err(|e: String| RosterbookError::Storage(e))?,
        log: row.get::<String>(4).ok(),
        content_hash: row.get::<String>(5).ok(),
        started_at: row
            .get::<String>(6)
            .map_err(|e| RosterbookError::Storage(e.to_string()))?,
        finished_at: row.get::<String>(7).ok(),
    })
}
