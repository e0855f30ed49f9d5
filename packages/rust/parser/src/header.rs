//! Duty header, application date, and amplitude extraction.
//!
//! Two scopes of extraction live here:
//! - per duty block: the `Prestation …` header line, the block's application
//!   date, and the `Durée : …` amplitude line;
//! - per document: the booklet-level depot code and applicability date,
//!   matched once over the whole normalized text.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use rosterbook_shared::DEFAULT_PERIOD;

// ---------------------------------------------------------------------------
// Patterns (compiled once)
// ---------------------------------------------------------------------------

/// `Prestation <depot> <number> [routing] [period]`.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Prestation ?(?P<depot>\w{2,4}) *(?P<number>\d{1,4}) ?(?P<routing>\w\d{0,3})? ?(?P<period>\w*)")
        .expect("header regex")
});

/// Per-block `Date d'application <dd/mm/yyyy>`.
static BLOCK_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Date ?d'application *(\d{2})/(\d{2})/(\d{4})").expect("block date regex")
});

/// Booklet-level depot code (first header keyword in either language).
static DOC_DEPOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Prestation|Prestatie) {1,2}(\w{2,6})").expect("document depot regex")
});

/// Booklet-level applicability date (either language).
static DOC_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Date d'application|Toepassingsdatum) (\d{2})/(\d{2})/(\d{4})")
        .expect("document date regex")
});

/// `Durée : HH.MM*` followed by the cycle token and the reporting time.
/// Only the amplitude digits are consumed; the trailing time anchors the
/// line shape so a stray `Durée` elsewhere cannot match.
static AMPLITUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Durée ?: ?(?P<h>\d{2})\.(?P<m>\d{2})\* ?CTB ?\w+(?: *\d*) ?(?:[RN]\d+)? [\w\W]{0,3} ?\*\d{2}\.\d{2}",
    )
    .expect("amplitude regex")
});

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Result of matching a duty block header. Downstream logic matches on this
/// exhaustively instead of poking at sparse optional fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderMatch {
    Matched {
        /// Depot code token (2–4 word characters).
        depot: String,
        /// Duty number (1–4 digits).
        number: String,
        /// Optional routing marker (letter + up to 3 digits).
        routing: Option<String>,
        /// Period label; [`DEFAULT_PERIOD`] when the header carried none.
        period: String,
    },
    Unmatched,
}

/// Duty amplitude as printed plus its minute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amplitude {
    /// "HH:MM".
    pub text: String,
    /// Amplitude in minutes, always ≥ 0.
    pub minutes: u32,
}

/// Booklet-level fields matched once over the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    /// Depot code of the booklet, if any header keyword was found.
    pub depot_code: Option<String>,
    /// Applicability date; epoch default when the booklet carries none.
    pub date: NaiveDate,
}

/// Date used when a booklet has no recognizable applicability date.
pub fn fallback_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch date")
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Match the duty header inside a block. Non-matches are not fatal; the
/// block is flagged invalid later.
pub fn extract_header(block: &str) -> HeaderMatch {
    let Some(caps) = HEADER_RE.captures(block) else {
        return HeaderMatch::Unmatched;
    };

    let period = match caps.name("period").map(|m| m.as_str()) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => DEFAULT_PERIOD.to_string(),
    };

    HeaderMatch::Matched {
        depot: caps["depot"].to_string(),
        number: caps["number"].to_string(),
        routing: caps.name("routing").map(|m| m.as_str().to_string()),
        period,
    }
}

/// Per-block application date, used by the validity check.
pub fn extract_block_date(block: &str) -> Option<NaiveDate> {
    let caps = BLOCK_DATE_RE.captures(block)?;
    parse_dmy(&caps[1], &caps[2], &caps[3])
}

/// Amplitude ("Durée") of a duty block.
pub fn extract_block_amplitude(block: &str) -> Option<Amplitude> {
    let caps = AMPLITUDE_RE.captures(block)?;
    let hours: u32 = caps["h"].parse().ok()?;
    let minutes: u32 = caps["m"].parse().ok()?;
    Some(Amplitude {
        text: format!("{}:{}", &caps["h"], &caps["m"]),
        minutes: hours * 60 + minutes,
    })
}

/// Booklet-level depot code and applicability date, matched over the whole
/// normalized document (not per block).
pub fn extract_document_header(doc: &str) -> DocumentHeader {
    let depot_code = DOC_DEPOT_RE
        .captures(doc)
        .map(|caps| caps[1].to_string());

    let date = DOC_DATE_RE
        .captures(doc)
        .and_then(|caps| parse_dmy(&caps[1], &caps[2], &caps[3]))
        .unwrap_or_else(fallback_date);

    DocumentHeader { depot_code, date }
}

/// dd/mm/yyyy digit strings → calendar date.
fn parse_dmy(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_with_routing_and_period() {
        let header = extract_header("Prestation FBMZ 103 B1 Ete Date d'application 15/06/2025");
        assert_eq!(
            header,
            HeaderMatch::Matched {
                depot: "FBMZ".into(),
                number: "103".into(),
                routing: Some("B1".into()),
                period: "Ete".into(),
            }
        );
    }

    #[test]
    fn header_without_period_gets_sentinel() {
        let header = extract_header("Prestation FBMZ 104");
        let HeaderMatch::Matched { number, period, routing, .. } = header else {
            panic!("expected a match");
        };
        assert_eq!(number, "104");
        assert_eq!(routing, None);
        assert_eq!(period, DEFAULT_PERIOD);
    }

    #[test]
    fn header_unmatched_is_non_fatal() {
        assert_eq!(extract_header("Durée : 08.05*"), HeaderMatch::Unmatched);
    }

    #[test]
    fn block_date_parses_to_calendar_date() {
        let date = extract_block_date("… Date d'application 15/06/2025 …");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 6, 15));
    }

    #[test]
    fn block_date_invalid_calendar_is_none() {
        assert_eq!(extract_block_date("Date d'application 31/02/2025"), None);
    }

    #[test]
    fn amplitude_line_with_week_and_cycle_token() {
        let block = "Durée : 08.05* CTB 612 1 R13 Q1 *05.45";
        let amplitude = extract_block_amplitude(block).expect("amplitude");
        assert_eq!(amplitude.text, "08:05");
        assert_eq!(amplitude.minutes, 485);
    }

    #[test]
    fn amplitude_line_without_week() {
        let block = "Durée : 07.30* CTB 14 X *09.00";
        let amplitude = extract_block_amplitude(block).expect("amplitude");
        assert_eq!(amplitude.minutes, 450);
    }

    #[test]
    fn missing_amplitude_is_none() {
        assert!(extract_block_amplitude("Prestation FBMZ 103").is_none());
    }

    #[test]
    fn document_header_both_fields() {
        let doc = "Prestation  FBMZ Date d'application 15/06/2025 rest of booklet";
        let header = extract_document_header(doc);
        assert_eq!(header.depot_code.as_deref(), Some("FBMZ"));
        assert_eq!(header.date, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
    }

    #[test]
    fn document_header_dutch_keywords() {
        let doc = "Prestatie FNGE Toepassingsdatum 01/09/2025";
        let header = extract_document_header(doc);
        assert_eq!(header.depot_code.as_deref(), Some("FNGE"));
        assert_eq!(header.date, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
    }

    #[test]
    fn document_header_defaults_to_epoch() {
        let header = extract_document_header("no recognizable booklet fields here");
        assert_eq!(header.depot_code, None);
        assert_eq!(header.date, fallback_date());
    }
}
