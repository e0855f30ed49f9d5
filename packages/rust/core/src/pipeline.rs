//! End-to-end roster import: stream text → normalize → parse → persist.

use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use rosterbook_parser::parse_document;
use rosterbook_shared::{ImportStatus, Result};
use rosterbook_storage::Storage;

/// Result of one roster import run.
#[derive(Debug)]
pub struct ImportOutcome {
    /// Import job identifier.
    pub job_id: String,
    /// Depot code from the booklet header, when one was found.
    pub depot_code: Option<String>,
    /// Applicability date of the booklet.
    pub date: chrono::NaiveDate,
    /// Total duty blocks found in the booklet.
    pub blocks_total: usize,
    /// Duties newly persisted.
    pub created: usize,
    /// Duties already present (fingerprint collision, by design a no-op).
    pub duplicates: usize,
    /// Valid duties not persisted because the depot was unresolved.
    pub skipped: usize,
    /// Blocks that failed one or more extractions.
    pub invalid: usize,
    /// Distinct cycle series seen, registered on the depot when resolved.
    pub series: Vec<String>,
    /// Cycle keywords the parse did not account for.
    pub coverage_gap: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

impl ImportOutcome {
    /// One-line summary stored as the job log.
    pub fn summary(&self) -> String {
        format!(
            "{} blocks: {} created, {} duplicate, {} skipped, {} invalid; {} series; coverage gap {}",
            self.blocks_total,
            self.created,
            self.duplicates,
            self.skipped,
            self.invalid,
            self.series.len(),
            self.coverage_gap,
        )
    }
}

/// Progress callback for reporting import status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each duty block is processed.
    fn block_processed(&self, current: usize, total: usize);
    /// Called when the import completes.
    fn done(&self, outcome: &ImportOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn block_processed(&self, _current: usize, _total: usize) {}
    fn done(&self, _outcome: &ImportOutcome) {}
}

/// SHA-256 of the uploaded stream, recorded on the job for traceability.
pub fn content_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Run a full roster import.
///
/// A job row brackets the run: it opens as `pending` and closes as
/// `imported` with a summary log, or `error` with the failure message. An
/// unresolved depot is not a failure: the booklet is still parsed and
/// logged, only persistence is skipped.
#[instrument(skip_all, fields(source = %source))]
pub async fn import_roster(
    storage: &Storage,
    source: &str,
    input: &str,
    progress: &dyn ProgressReporter,
) -> Result<ImportOutcome> {
    let hash = content_hash(input);
    let job_id = storage
        .insert_import_job(source, "roster", Some(&hash))
        .await?;

    match run_roster(storage, &job_id, input, progress).await {
        Ok(outcome) => {
            storage
                .finish_import_job(&job_id, ImportStatus::Imported, &outcome.summary())
                .await?;
            progress.done(&outcome);
            Ok(outcome)
        }
        Err(e) => {
            storage
                .finish_import_job(&job_id, ImportStatus::Error, &e.to_string())
                .await?;
            Err(e)
        }
    }
}

async fn run_roster(
    storage: &Storage,
    job_id: &str,
    input: &str,
    progress: &dyn ProgressReporter,
) -> Result<ImportOutcome> {
    let start = Instant::now();

    progress.phase("Normalizing stream text");
    let text = rosterbook_normalize::normalize(input);

    progress.phase("Parsing duty blocks");
    let parsed = parse_document(&text);

    if parsed.date == rosterbook_parser::fallback_date() {
        warn!("booklet has no applicability date, using epoch default");
    }

    // Resolve the depot by lookup only. An unknown code (or a booklet with
    // no depot header at all) skips persistence for every candidate; the
    // import itself still completes.
    let station = match parsed.depot_code.as_deref() {
        Some(code) => {
            let found = storage.find_station_by_code(code).await?;
            if found.is_none() {
                warn!(depot = code, "depot not in station registry, duties will not be persisted");
            }
            found
        }
        None => {
            warn!("no depot code in document header, duties will not be persisted");
            None
        }
    };

    info!(
        depot = parsed.depot_code.as_deref().unwrap_or("-"),
        date = %parsed.date,
        blocks = parsed.blocks.len(),
        resolved = station.is_some(),
        "booklet parsed"
    );

    progress.phase("Persisting duties");
    let coverage_gap = parsed.coverage_gap();
    let total = parsed.blocks.len();
    let mut created = 0usize;
    let mut duplicates = 0usize;
    let mut skipped = 0usize;
    let mut invalid = 0usize;

    for (i, block) in parsed.blocks.into_iter().enumerate() {
        if !block.is_valid() {
            warn!(
                block = i + 1,
                raw = %block.raw,
                "skipping block with incomplete extraction"
            );
            invalid += 1;
            progress.block_processed(i + 1, total);
            continue;
        }

        let Some(station) = &station else {
            tracing::debug!(block = i + 1, "depot unresolved, duty not persisted");
            skipped += 1;
            progress.block_processed(i + 1, total);
            continue;
        };

        // is_valid() guarantees the record assembles.
        let Some(record) = block.into_record(&station.code, parsed.date) else {
            invalid += 1;
            progress.block_processed(i + 1, total);
            continue;
        };

        if storage.insert_duty_if_absent(&record).await? {
            tracing::debug!(number = %record.number, "duty created");
            created += 1;
        } else {
            tracing::debug!(number = %record.number, "duty already present");
            duplicates += 1;
        }
        progress.block_processed(i + 1, total);
    }

    // Depot side effects only for a resolved depot, after the block pass.
    if let Some(station) = &station {
        storage.mark_depot(&station.id).await?;
        for series in &parsed.series {
            storage.add_depot_series(&station.id, series).await?;
        }
    }

    if coverage_gap > 0 {
        warn!(
            keyword_count = parsed.keyword_count,
            consumed = parsed.consumed_count,
            "some cycle tokens were not captured"
        );
    }

    let outcome = ImportOutcome {
        job_id: job_id.to_string(),
        depot_code: parsed.depot_code,
        date: parsed.date,
        blocks_total: total,
        created,
        duplicates,
        skipped,
        invalid,
        series: parsed.series,
        coverage_gap,
        elapsed: start.elapsed(),
    };

    info!(
        created = outcome.created,
        duplicates = outcome.duplicates,
        skipped = outcome.skipped,
        invalid = outcome.invalid,
        elapsed_ms = outcome.elapsed.as_millis(),
        "roster import complete"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosterbook_shared::new_record_id;
    use rosterbook_storage::StatsFilter;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("rb_core_{}.db", new_record_id()));
        Storage::open(&tmp).await.expect("open test db")
    }

    async fn seed_depot(storage: &Storage) {
        storage
            .insert_station_if_absent("FBMZ", "Bruxelles-Midi", "Brussel-Zuid")
            .await
            .expect("seed station");
    }

    const SEPARATOR: &str = "____________________________________________________________________________________________________";

    fn sample_booklet() -> String {
        let first = [
            "Prestation FBMZ 103 B1 Ete Date d'application 15/06/2025",
            "Durée : 08.05* CTB 612 1 R13 Q1 *05.45****** *Res FBMZ - 05.45-06.15 \
             HLP FBMZ -QLV 06.15-07.30******* *13.50",
        ]
        .join(" ");
        let second = [
            "Prestation FBMZ 104 B2 Hiver Date d'application 15/06/2025",
            "Durée : 07.30* CTB 45 N26 *09.00****** *Res FBMZ - 09.00-10.00******* *16.30",
        ]
        .join(" ");
        format!("{first}{SEPARATOR}{second}")
    }

    #[tokio::test]
    async fn imports_booklet_end_to_end() {
        let storage = test_storage().await;
        seed_depot(&storage).await;
        let outcome = import_roster(&storage, "june.txt", &sample_booklet(), &SilentProgress)
            .await
            .expect("import");

        assert_eq!(outcome.depot_code.as_deref(), Some("FBMZ"));
        assert_eq!(outcome.blocks_total, 2);
        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.duplicates, 0);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.invalid, 0);
        assert_eq!(outcome.coverage_gap, 0);
        assert_eq!(storage.count_duties(Some("FBMZ")).await.unwrap(), 2);

        // The depot is flagged and registered with the union of the series seen.
        let depot = storage
            .find_station_by_code("FBMZ")
            .await
            .unwrap()
            .expect("depot");
        assert!(depot.is_depot);
        let series = storage.list_depot_series(&depot.id).await.unwrap();
        assert_eq!(series, vec!["45".to_string(), "612".to_string()]);

        // The job closed as imported with a summary log.
        let jobs = storage.list_import_jobs(10).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, ImportStatus::Imported);
        assert!(jobs[0].log.as_deref().unwrap_or("").contains("2 created"));
    }

    #[tokio::test]
    async fn reimport_is_a_no_op() {
        let storage = test_storage().await;
        seed_depot(&storage).await;
        let booklet = sample_booklet();
        import_roster(&storage, "june.txt", &booklet, &SilentProgress)
            .await
            .expect("first import");

        let outcome = import_roster(&storage, "june.txt", &booklet, &SilentProgress)
            .await
            .expect("second import");
        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.duplicates, 2);
        assert_eq!(storage.count_duties(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn invalid_blocks_are_counted_not_fatal() {
        let storage = test_storage().await;
        seed_depot(&storage).await;
        let booklet = format!("{}{SEPARATOR}not a duty block at all", sample_booklet());

        let outcome = import_roster(&storage, "june.txt", &booklet, &SilentProgress)
            .await
            .expect("import");
        assert_eq!(outcome.blocks_total, 3);
        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.invalid, 1);
    }

    #[tokio::test]
    async fn block_missing_amplitude_is_skipped() {
        let storage = test_storage().await;
        seed_depot(&storage).await;
        // Second block has a header, date, and task window but no Durée line.
        let truncated = [
            "Prestation FBMZ 105 B1 Ete Date d'application 15/06/2025",
            "*06.00****** *Res FBMZ - 06.00-07.00******* *14.00",
        ]
        .join(" ");
        let booklet = format!("{}{SEPARATOR}{truncated}", sample_booklet());

        let outcome = import_roster(&storage, "june.txt", &booklet, &SilentProgress)
            .await
            .expect("import");
        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.invalid, 1);
        assert_eq!(storage.count_duties(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unresolved_depot_skips_persistence() {
        // Empty station registry: the booklet parses but nothing persists,
        // no stub station appears, and the job still closes as imported.
        let storage = test_storage().await;
        let outcome = import_roster(&storage, "june.txt", &sample_booklet(), &SilentProgress)
            .await
            .expect("import");

        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.duplicates, 0);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(storage.count_duties(None).await.unwrap(), 0);
        assert!(storage.find_station_by_code("FBMZ").await.unwrap().is_none());

        let jobs = storage.list_import_jobs(10).await.unwrap();
        assert_eq!(jobs[0].status, ImportStatus::Imported);
        assert!(jobs[0].log.as_deref().unwrap_or("").contains("2 skipped"));
    }

    #[tokio::test]
    async fn missing_depot_header_is_non_fatal() {
        let storage = test_storage().await;
        let outcome = import_roster(&storage, "junk.txt", "no header here", &SilentProgress)
            .await
            .expect("import");

        assert_eq!(outcome.depot_code, None);
        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.invalid, 1);

        let jobs = storage.list_import_jobs(10).await.unwrap();
        assert_eq!(jobs[0].status, ImportStatus::Imported);
    }

    #[tokio::test]
    async fn imported_duties_feed_series_stats() {
        let storage = test_storage().await;
        seed_depot(&storage).await;
        import_roster(&storage, "june.txt", &sample_booklet(), &SilentProgress)
            .await
            .expect("import");

        let stats = storage
            .series_averages(&StatsFilter {
                series: Some("612".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].duty_count, 1);
        assert!((stats[0].avg_amplitude_min - 485.0).abs() < f64::EPSILON);
    }
}
