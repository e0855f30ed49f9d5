//! Roster booklet parser: duty-block segmentation, header and task
//! extraction, recurring-cycle decomposition, and assembly into
//! [`DutyRecord`]s.
//!
//! The parser never fails a whole document because one block is malformed:
//! each block carries its own extraction results and a validity verdict, and
//! the caller decides what to do with the invalid ones.

pub mod blocks;
pub mod cycles;
pub mod duration;
pub mod header;
pub mod tasks;

use chrono::NaiveDate;

use rosterbook_shared::{new_record_id, CycleAssignment, DutyRecord};

pub use blocks::{split_blocks, BLOCK_SEPARATOR};
pub use cycles::{count_keyword, extract_cycles, SeriesAccumulator, CYCLE_KEYWORD};
pub use duration::span_minutes;
pub use header::{
    extract_block_amplitude, extract_block_date, extract_document_header, extract_header,
    fallback_date, Amplitude, DocumentHeader, HeaderMatch,
};
pub use tasks::{
    aggregate, extract_detail, extract_window, segment_tasks, TaskCategory, TaskDetail,
    TaskFields, TaskTotals, TaskWindow,
};

/// Everything extracted from one duty block.
#[derive(Debug, Clone)]
pub struct BlockParse {
    pub header: HeaderMatch,
    pub block_date: Option<NaiveDate>,
    pub amplitude: Option<Amplitude>,
    pub window: Option<TaskWindow>,
    pub totals: TaskTotals,
    pub cycles: Vec<CycleAssignment>,
    pub raw: String,
}

impl BlockParse {
    /// A block is importable when the header, its application date, the
    /// amplitude line, and the task window all resolved.
    pub fn is_valid(&self) -> bool {
        matches!(self.header, HeaderMatch::Matched { .. })
            && self.block_date.is_some()
            && self.amplitude.is_some()
            && self.window.is_some()
    }

    /// Assemble a [`DutyRecord`] from a valid block, stamped with the
    /// booklet-level depot code and applicability date. Returns `None` for
    /// invalid blocks.
    pub fn into_record(self, depot_code: &str, date: NaiveDate) -> Option<DutyRecord> {
        let HeaderMatch::Matched { number, period, .. } = self.header else {
            return None;
        };
        let (amplitude, window) = match (self.amplitude, self.window) {
            (Some(a), Some(w)) => (a, w),
            _ => return None,
        };
        self.block_date?;

        Some(DutyRecord {
            id: new_record_id(),
            number,
            depot_code: depot_code.to_string(),
            date,
            period,
            start_time: window.start,
            end_time: window.end,
            amplitude: amplitude.text,
            amplitude_min: amplitude.minutes,
            drive_min: self.totals.drive_min,
            active_min: self.totals.active_min,
            reserve_min: self.totals.reserve_min,
            deadhead_min: self.totals.deadhead_min,
            cycles: self.cycles,
            raw_text: self.raw,
        })
    }
}

/// Parse result for a whole normalized booklet.
#[derive(Debug, Clone)]
pub struct DocumentParse {
    /// Booklet-level depot code, if any header keyword matched.
    pub depot_code: Option<String>,
    /// Booklet-level applicability date (epoch default when absent).
    pub date: NaiveDate,
    /// Per-block extraction results, in document order.
    pub blocks: Vec<BlockParse>,
    /// Distinct cycle series seen across all blocks, first-seen order.
    pub series: Vec<String>,
    /// Occurrences of the cycle keyword in the whole document.
    pub keyword_count: usize,
    /// Cycle tokens that decomposed successfully.
    pub consumed_count: usize,
}

impl DocumentParse {
    /// Cycle keywords that never decomposed into an assignment. A non-zero
    /// gap means the booklet mentions rotations the import did not capture.
    pub fn coverage_gap(&self) -> usize {
        self.keyword_count.saturating_sub(self.consumed_count)
    }
}

/// Parse one duty block, noting cycle series in the accumulator.
pub fn parse_block(block: &str, acc: &mut SeriesAccumulator) -> BlockParse {
    let window = extract_window(block);
    let totals = window
        .as_ref()
        .map(|w| aggregate(&segment_tasks(&w.body)))
        .unwrap_or_default();

    BlockParse {
        header: extract_header(block),
        block_date: extract_block_date(block),
        amplitude: extract_block_amplitude(block),
        window,
        totals,
        cycles: extract_cycles(block, acc),
        raw: block.to_string(),
    }
}

/// Parse a whole normalized booklet.
pub fn parse_document(text: &str) -> DocumentParse {
    let document = extract_document_header(text);

    let mut acc = SeriesAccumulator::new();
    let blocks: Vec<BlockParse> = split_blocks(text)
        .into_iter()
        .map(|block| parse_block(block, &mut acc))
        .collect();

    let keyword_count = count_keyword(text);
    let (series, consumed_count) = acc.into_parts();

    tracing::debug!(
        blocks = blocks.len(),
        valid = blocks.iter().filter(|b| b.is_valid()).count(),
        series = series.len(),
        "parsed booklet"
    );

    DocumentParse {
        depot_code: document.depot_code,
        date: document.date,
        blocks,
        series,
        keyword_count,
        consumed_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> String {
        [
            "Prestation FBMZ 103 B1 Ete Date d'application 15/06/2025",
            "Durée : 08.05* CTB 612 1 R13 Q1 *05.45****** *Res FBMZ - 05.45-06.15 \
             HLP FBMZ -QLV 06.15-07.30******* *13.50",
        ]
        .join(" ")
    }

    fn sample_document() -> String {
        let second = [
            "Prestation FBMZ 104 B2 Hiver Date d'application 15/06/2025",
            "Durée : 07.30* CTB 45 N26 *09.00****** *Res FBMZ - 09.00-10.00******* *16.30",
        ]
        .join(" ");
        format!("{}{}{}", sample_block(), BLOCK_SEPARATOR, second)
    }

    #[test]
    fn valid_block_parses_end_to_end() {
        let mut acc = SeriesAccumulator::new();
        let parsed = parse_block(&sample_block(), &mut acc);
        assert!(parsed.is_valid());
        assert_eq!(parsed.amplitude.as_ref().map(|a| a.minutes), Some(485));
        assert_eq!(parsed.totals.reserve_min, 30);
        assert_eq!(parsed.totals.deadhead_min, 75);
        assert_eq!(parsed.totals.active_min, 105);
        assert_eq!(parsed.cycles.len(), 2);
    }

    #[test]
    fn invalid_block_is_flagged_not_fatal() {
        let mut acc = SeriesAccumulator::new();
        let parsed = parse_block("garbage with no recognizable structure", &mut acc);
        assert!(!parsed.is_valid());
        assert!(parsed.clone().into_record("FBMZ", fallback_date()).is_none());
        assert_eq!(parsed.totals, TaskTotals::default());
    }

    #[test]
    fn record_assembly_uses_document_scope_fields() {
        let mut acc = SeriesAccumulator::new();
        let parsed = parse_block(&sample_block(), &mut acc);
        let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let record = parsed.into_record("FBMZ", date).expect("record");
        assert_eq!(record.number, "103");
        assert_eq!(record.depot_code, "FBMZ");
        assert_eq!(record.period, "Ete");
        assert_eq!(record.start_time, "05:45");
        assert_eq!(record.end_time, "13:50");
        assert_eq!(record.amplitude, "08:05");
        assert_eq!(record.cycles[0].series, "612");
    }

    #[test]
    fn document_parse_splits_blocks_and_collects_series() {
        let parsed = parse_document(&sample_document());
        assert_eq!(parsed.blocks.len(), 2);
        assert!(parsed.blocks.iter().all(BlockParse::is_valid));
        assert_eq!(parsed.depot_code.as_deref(), Some("FBMZ"));
        assert_eq!(
            parsed.date,
            chrono::NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
        );
        assert_eq!(parsed.series, vec!["612".to_string(), "45".to_string()]);
    }

    #[test]
    fn coverage_gap_counts_unconsumed_keywords() {
        let doc = format!("{} CTB ???", sample_document());
        let parsed = parse_document(&doc);
        assert_eq!(parsed.keyword_count, 3);
        assert_eq!(parsed.consumed_count, 2);
        assert_eq!(parsed.coverage_gap(), 1);
    }

    #[test]
    fn document_without_header_falls_back() {
        let parsed = parse_document("nothing recognizable");
        assert_eq!(parsed.depot_code, None);
        assert_eq!(parsed.date, fallback_date());
        assert_eq!(parsed.coverage_gap(), 0);
    }
}
