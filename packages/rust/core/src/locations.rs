//! Location seed import: flat JSON array → station registry.

use tracing::{info, instrument};

use rosterbook_shared::{ImportStatus, LocationSeed, Result, RosterbookError};
use rosterbook_storage::Storage;

use crate::pipeline::content_hash;

/// Result of one location seed import.
#[derive(Debug)]
pub struct LocationsOutcome {
    /// Import job identifier.
    pub job_id: String,
    /// Records in the seed file.
    pub total: usize,
    /// Stations newly registered.
    pub created: usize,
    /// Stations already present (by code), left untouched.
    pub skipped: usize,
}

impl LocationsOutcome {
    pub fn summary(&self) -> String {
        format!(
            "{} locations: {} created, {} already present",
            self.total, self.created, self.skipped
        )
    }
}

/// Import a location seed file. Existing stations keep their names; only
/// unknown codes are added.
#[instrument(skip_all, fields(source = %source))]
pub async fn import_locations(
    storage: &Storage,
    source: &str,
    input: &str,
) -> Result<LocationsOutcome> {
    let hash = content_hash(input);
    let job_id = storage
        .insert_import_job(source, "locations", Some(&hash))
        .await?;

    match run_locations(storage, &job_id, input).await {
        Ok(outcome) => {
            storage
                .finish_import_job(&job_id, ImportStatus::Imported, &outcome.summary())
                .await?;
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

async fn run_locations(storage: &Storage, job_id: &str, input: &str) -> Result<LocationsOutcome> {
    let seeds: Vec<LocationSeed> = serde_json::from_str(input)
        .map_err(|e| RosterbookError::validation(format!("invalid location seed file: {e}")))?;

    let mut created = 0usize;
    let mut skipped = 0usize;

    for seed in &seeds {
        if storage
            .insert_station_if_absent(&seed.code, &seed.name_fr, &seed.name_nl)
            .await?
        {
            created += 1;
        } else {
            skipped += 1;
        }
    }

    info!(total = seeds.len(), created, skipped, "locations import complete");

    Ok(LocationsOutcome {
        job_id: job_id.to_string(),
        total: seeds.len(),
        created,
        skipped,
    })
}
