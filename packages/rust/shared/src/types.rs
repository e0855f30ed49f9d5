//! Core domain types for rosterbook duty imports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Period label used when a duty header carries no explicit period.
pub const DEFAULT_PERIOD: &str = "Toute l'année";

/// Generate a time-sortable record identifier (UUID v7).
pub fn new_record_id() -> String {
    Uuid::now_v7().to_string()
}

// ---------------------------------------------------------------------------
// Import job enums
// ---------------------------------------------------------------------------

/// Lifecycle state of an import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Imported,
    Error,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Imported => "imported",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "imported" => Ok(Self::Imported),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown import status '{other}'")),
        }
    }
}

/// Kind of uploaded file an import job processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// Duty-roster booklet stream text.
    Roster,
    /// Flat JSON array of station/location records.
    Locations,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roster => "roster",
            Self::Locations => "locations",
        }
    }
}

impl std::fmt::Display for ImportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CycleAssignment
// ---------------------------------------------------------------------------

/// One day-of-week assignment within a recurring duty-cycle series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleAssignment {
    /// Series identifier (e.g. "612").
    pub series: String,
    /// Week number within the cycle, `"0"` when the token carried none.
    pub week: String,
    /// Day of week, 1–7.
    pub day: u8,
    /// Applicability period tag trailing the cycle token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

// ---------------------------------------------------------------------------
// DutyRecord
// ---------------------------------------------------------------------------

/// A normalized duty ("prestation") extracted from one roster block.
///
/// Amplitude and the per-category totals are minutes and always ≥ 0; the
/// start/end times are `"HH:MM"` strings rebuilt from matched digits and are
/// not validated against a calendar (a duty may wrap past midnight).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DutyRecord {
    /// Record identifier (UUID v7).
    pub id: String,
    /// Duty number as printed in the booklet.
    pub number: String,
    /// Depot code the booklet belongs to.
    pub depot_code: String,
    /// Applicability date of the booklet.
    pub date: NaiveDate,
    /// Period label, [`DEFAULT_PERIOD`] when the header carried none.
    pub period: String,
    /// Reporting time, "HH:MM".
    pub start_time: String,
    /// Release time, "HH:MM".
    pub end_time: String,
    /// Amplitude as printed, "HH:MM".
    pub amplitude: String,
    /// Amplitude in minutes.
    pub amplitude_min: u32,
    /// Driving minutes (route runs, yard moves, wash).
    pub drive_min: u32,
    /// Active minutes (every task with a resolvable time range).
    pub active_min: u32,
    /// Reserve minutes.
    pub reserve_min: u32,
    /// Dead-head (HLP) minutes.
    pub deadhead_min: u32,
    /// Recurring-cycle assignments, in extraction order.
    pub cycles: Vec<CycleAssignment>,
    /// Raw block text the record was extracted from.
    pub raw_text: String,
}

impl DutyRecord {
    /// SHA-256 fingerprint of the composite identity: applicability date,
    /// depot, duty number, period, and the full cycle-assignment list in
    /// extraction order. The store enforces uniqueness on this value, which
    /// makes re-imports of an identical booklet no-ops.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.date.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.depot_code.as_bytes());
        hasher.update(b"|");
        hasher.update(self.number.as_bytes());
        hasher.update(b"|");
        hasher.update(self.period.as_bytes());
        for cycle in &self.cycles {
            hasher.update(b"|");
            hasher.update(cycle.series.as_bytes());
            hasher.update(b":");
            hasher.update(cycle.week.as_bytes());
            hasher.update(b":");
            hasher.update([cycle.day + b'0']);
            if let Some(period) = &cycle.period {
                hasher.update(b":");
                hasher.update(period.as_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// LocationSeed
// ---------------------------------------------------------------------------

/// One record of the location seed file (flat JSON array).
///
/// Field names follow the exported registry format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSeed {
    /// Station code (unique in the registry).
    pub code: String,
    /// French display name.
    #[serde(rename = "gareFR")]
    pub name_fr: String,
    /// Dutch display name.
    #[serde(rename = "gareNL")]
    pub name_nl: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> DutyRecord {
        DutyRecord {
            id: new_record_id(),
            number: "103".into(),
            depot_code: "FBMZ".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            period: DEFAULT_PERIOD.into(),
            start_time: "05:45".into(),
            end_time: "13:50".into(),
            amplitude: "08:05".into(),
            amplitude_min: 485,
            drive_min: 105,
            active_min: 165,
            reserve_min: 30,
            deadhead_min: 30,
            cycles: vec![CycleAssignment {
                series: "612".into(),
                week: "1".into(),
                day: 1,
                period: None,
            }],
            raw_text: "Prestation FBMZ 103".into(),
        }
    }

    #[test]
    fn record_serde_roundtrip() {
        let record = sample_record();
        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: DutyRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.number, "103");
        assert_eq!(parsed.date, record.date);
        assert_eq!(parsed.cycles, record.cycles);
    }

    #[test]
    fn fingerprint_is_stable_and_discriminating() {
        let a = sample_record();
        let b = sample_record();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = sample_record();
        c.number = "104".into();
        assert_ne!(a.fingerprint(), c.fingerprint());

        // Same fields but a different cycle set is a different duty.
        let mut d = sample_record();
        d.cycles[0].day = 3;
        assert_ne!(a.fingerprint(), d.fingerprint());
    }

    #[test]
    fn fingerprint_ignores_volatile_fields() {
        let mut a = sample_record();
        let mut b = sample_record();
        a.id = "one".into();
        b.id = "two".into();
        b.raw_text = "different raw capture".into();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn location_seed_parses_registry_export() {
        let json = r#"[{"code": "FBMZ", "gareFR": "Bruxelles-Midi", "gareNL": "Brussel-Zuid"}]"#;
        let seeds: Vec<LocationSeed> = serde_json::from_str(json).expect("parse seeds");
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].code, "FBMZ");
        assert_eq!(seeds[0].name_fr, "Bruxelles-Midi");
    }

    #[test]
    fn import_status_parse() {
        assert_eq!("imported".parse::<ImportStatus>(), Ok(ImportStatus::Imported));
        assert!("done".parse::<ImportStatus>().is_err());
        assert_eq!(ImportStatus::Error.to_string(), "error");
    }
}
