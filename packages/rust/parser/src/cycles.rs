//! Recurring-cycle ("CTB") extraction.
//!
//! Duty blocks reference the rotation they belong to with compact tokens of
//! the form `CTB <series> [week] <R|N><days> [period]`. Scanning happens in
//! two stages: a coarse pattern finds every candidate token inside a block,
//! then a capturing pattern decomposes each candidate. The document-level
//! keyword count against the number of successfully decomposed tokens gives
//! a coverage signal for the import report.

use std::sync::LazyLock;

use regex::Regex;

use rosterbook_shared::CycleAssignment;

/// Keyword opening every cycle token.
pub const CYCLE_KEYWORD: &str = "CTB";

/// Coarse scan for candidate cycle tokens inside a block.
static CYCLE_SCAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"CTB ?\w{1,3} ?\d{0,2}?(?: +)?(?:R|N)\d+ ?\w{0,2}").expect("cycle scan regex")
});

/// Decomposition of a single candidate token.
static CYCLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"CTB ?(?P<series>\w+) ?(?P<week>\d{1,2})? ?(?P<kind>R|N)(?P<days>\d+) ?(?P<period>\w+)?")
        .expect("cycle regex")
});

/// How the digit list after `R`/`N` selects weekdays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayListKind {
    /// `R`: the digits are the working days themselves.
    Listed,
    /// `N`: the digits are the days off; working days are the complement
    /// within Monday(1)..Sunday(7).
    Negated,
}

/// Expand a digit list into working weekday numbers, in ascending order for
/// the negated form and listed order for the direct form.
fn expand_days(digits: &str, kind: DayListKind) -> Vec<u8> {
    let listed: Vec<u8> = digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as u8)
        .collect();

    match kind {
        DayListKind::Listed => listed,
        DayListKind::Negated => (1..=7).filter(|d| !listed.contains(d)).collect(),
    }
}

/// Per-document accumulator threaded through block extraction: the distinct
/// series seen (first-seen order) and how many candidate tokens decomposed
/// successfully.
#[derive(Debug, Default)]
pub struct SeriesAccumulator {
    series: Vec<String>,
    consumed: usize,
}

impl SeriesAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn note_series(&mut self, series: &str) {
        if !self.series.iter().any(|s| s == series) {
            self.series.push(series.to_string());
        }
    }

    /// Distinct series and consumed-token count.
    pub fn into_parts(self) -> (Vec<String>, usize) {
        (self.series, self.consumed)
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

/// Extract every cycle assignment from one duty block, noting series and
/// consumed tokens in the accumulator.
pub fn extract_cycles(block: &str, acc: &mut SeriesAccumulator) -> Vec<CycleAssignment> {
    let mut assignments = Vec::new();

    for candidate in CYCLE_SCAN_RE.find_iter(block) {
        let Some(caps) = CYCLE_RE.captures(candidate.as_str()) else {
            tracing::debug!(token = candidate.as_str(), "cycle token did not decompose");
            continue;
        };
        acc.consumed += 1;

        let series = caps["series"].to_string();
        let week = caps
            .name("week")
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "0".to_string());
        let period = caps.name("period").map(|m| m.as_str().to_string());
        let kind = match &caps["kind"] {
            "N" => DayListKind::Negated,
            _ => DayListKind::Listed,
        };

        let days = expand_days(&caps["days"], kind);
        for day in days {
            acc.note_series(&series);
            assignments.push(CycleAssignment {
                series: series.clone(),
                week: week.clone(),
                day,
                period: period.clone(),
            });
        }
    }

    assignments
}

/// Occurrences of the cycle keyword in a document, matched or not.
pub fn count_keyword(doc: &str) -> usize {
    doc.matches(CYCLE_KEYWORD).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_days_with_week_and_period() {
        let mut acc = SeriesAccumulator::new();
        let cycles = extract_cycles("Durée : 08.05* CTB 612 1 R13 Q1 *05.45", &mut acc);
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].series, "612");
        assert_eq!(cycles[0].week, "1");
        assert_eq!(cycles[0].day, 1);
        assert_eq!(cycles[0].period.as_deref(), Some("Q1"));
        assert_eq!(cycles[1].day, 3);
        assert_eq!(acc.consumed(), 1);
    }

    #[test]
    fn negated_days_are_complemented() {
        let mut acc = SeriesAccumulator::new();
        let cycles = extract_cycles("CTB 45 N26", &mut acc);
        let days: Vec<u8> = cycles.iter().map(|c| c.day).collect();
        assert_eq!(days, vec![1, 3, 4, 5, 7]);
        assert!(cycles.iter().all(|c| c.series == "45"));
    }

    #[test]
    fn missing_week_defaults_to_zero() {
        let mut acc = SeriesAccumulator::new();
        let cycles = extract_cycles("CTB 45 N26", &mut acc);
        assert!(cycles.iter().all(|c| c.week == "0"));
        assert!(cycles.iter().all(|c| c.period.is_none()));
    }

    #[test]
    fn negating_every_day_yields_nothing() {
        let mut acc = SeriesAccumulator::new();
        let cycles = extract_cycles("CTB 45 N1234567", &mut acc);
        assert!(cycles.is_empty());
        // The token still decomposed; it just selects no days.
        assert_eq!(acc.consumed(), 1);
        let (series, _) = acc.into_parts();
        assert!(series.is_empty());
    }

    #[test]
    fn series_are_deduplicated_in_first_seen_order() {
        let mut acc = SeriesAccumulator::new();
        extract_cycles("CTB 612 1 R13 *05.45* CTB 45 N26 *06.00* CTB 612 2 R25", &mut acc);
        let (series, consumed) = acc.into_parts();
        assert_eq!(series, vec!["612".to_string(), "45".to_string()]);
        assert_eq!(consumed, 3);
    }

    #[test]
    fn keyword_count_includes_unparsable_tokens() {
        let doc = "CTB 612 1 R13 … CTB ???";
        assert_eq!(count_keyword(doc), 2);
    }

    #[test]
    fn expand_days_listed_keeps_token_order() {
        assert_eq!(expand_days("513", DayListKind::Listed), vec![5, 1, 3]);
    }

    #[test]
    fn expand_days_negated_is_ascending() {
        assert_eq!(expand_days("7", DayListKind::Negated), vec![1, 2, 3, 4, 5, 6]);
    }
}
