//! Task window extraction, task segmentation, and time aggregation.
//!
//! Inside a duty block the task list sits between the reporting time and the
//! release time, both printed as starred `HH.MM` markers. Each task ends with
//! the time range that closes it, so segmentation must keep a description and
//! its closing range in the same segment — a range always belongs to the text
//! *before* it, never to the task that opens next.

use std::sync::LazyLock;

use regex::Regex;

use crate::duration::span_minutes;

// ---------------------------------------------------------------------------
// Patterns (compiled once)
// ---------------------------------------------------------------------------

/// `*HH.MM*****… <tasks> ******* *HH.MM` — reporting time, task-list body,
/// release time.
static WINDOW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*(?P<sh>\d{2})\.(?P<sm>\d{2})\*{5,} ?\*+(?P<body>.+)\*{7} \*(?P<eh>\d{2})\.(?P<em>\d{2})")
        .expect("task window regex")
});

/// A time-range token closing a task, optionally glued to trailing digits.
static TIME_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{2}\.\d{2}-\d{2}\.\d{2} *\d{0,4}").expect("time range regex")
});

/// Task detail: optional yard-move prefix, category token from the fixed
/// vocabulary, station codes, optional roll-in route run, and the closing
/// time range (the only mandatory part — a segment without a resolvable
/// range does not match at all).
static TASK_DETAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = concat!(
        r"(?:(?:(?P<yard_prefix>\w{2}) (?P<yard_unit>\d{3,6}) )?",
        r"(?P<category>VoetPied|HLP|AfRelDP|AfRel|Res|UitGar|PerQuai|Taxi|Plat|VkPc|BkPr|CarWash|IdRem|KopCpDP|KopCp|Bus|RAMAN|RaManMO|TRANSFER|Transfer)",
        r" (?P<from>[A-Z]{2,6}) *-*(?P<to>[A-Z]{2,6})*)?",
        r"(?:(?:(?P<roll>ER|RE|EM|ME|ZR|RZ) )?(?P<run>\d{3,6}) (?:[NR])\d* \w? ?(?:\d )?(?P<run_from>\w{2,5}) *-(?P<run_to>\w{2,5}))?",
        r"(?:\d{3,5} [RN]\d{1,5} \w)?",
        r" (?P<sh>\d{2})\.(?P<sm>\d{2})-(?P<eh>\d{2})\.(?P<em>\d{2})",
    );
    Regex::new(pattern).expect("task detail regex")
});

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The task-list window of a duty block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskWindow {
    /// Reporting time, "HH:MM".
    pub start: String,
    /// Release time, "HH:MM".
    pub end: String,
    /// Raw task-list substring between the two time markers.
    pub body: String,
}

/// Task category vocabulary, in the match-priority order of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCategory {
    VoetPied,
    Hlp,
    AfRelDp,
    AfRel,
    Res,
    UitGar,
    PerQuai,
    Taxi,
    Plat,
    VkPc,
    BkPr,
    CarWash,
    IdRem,
    KopCpDp,
    KopCp,
    Bus,
    Raman,
    RaManMo,
    Transfer,
}

impl TaskCategory {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "VoetPied" => Self::VoetPied,
            "HLP" => Self::Hlp,
            "AfRelDP" => Self::AfRelDp,
            "AfRel" => Self::AfRel,
            "Res" => Self::Res,
            "UitGar" => Self::UitGar,
            "PerQuai" => Self::PerQuai,
            "Taxi" => Self::Taxi,
            "Plat" => Self::Plat,
            "VkPc" => Self::VkPc,
            "BkPr" => Self::BkPr,
            "CarWash" => Self::CarWash,
            "IdRem" => Self::IdRem,
            "KopCpDP" => Self::KopCpDp,
            "KopCp" => Self::KopCp,
            "Bus" => Self::Bus,
            "RAMAN" => Self::Raman,
            "RaManMO" => Self::RaManMo,
            "TRANSFER" | "Transfer" => Self::Transfer,
            _ => return None,
        })
    }
}

/// A shunting/yard move prefix ahead of the category token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YardMove {
    pub prefix: String,
    pub unit: String,
}

/// A revenue route run (roll-in marker, run number, station pair).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRun {
    pub roll_marker: Option<String>,
    pub number: String,
    pub from: String,
    pub to: String,
}

/// The closing time range of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSpan {
    pub start_h: String,
    pub start_m: String,
    pub end_h: String,
    pub end_m: String,
}

impl TimeSpan {
    /// Span length in minutes, next-day wrap applied.
    pub fn minutes(&self) -> u32 {
        span_minutes(&self.start_h, &self.start_m, &self.end_h, &self.end_m)
    }
}

/// Extraction result for one task segment. A segment either matched the
/// detail grammar (and then always has a time span) or it did not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDetail {
    Matched(TaskFields),
    Unmatched,
}

/// Fields of a matched task segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub yard_move: Option<YardMove>,
    pub category: Option<TaskCategory>,
    /// Station pair after the category token (second leg may be absent).
    pub stations: Option<(String, Option<String>)>,
    pub run: Option<RouteRun>,
    pub span: TimeSpan,
}

/// Per-category minute totals for one duty. Buckets are non-exclusive:
/// active is a superset of the other three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskTotals {
    pub drive_min: u32,
    pub active_min: u32,
    pub reserve_min: u32,
    pub deadhead_min: u32,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Locate the task-list window of a duty block.
pub fn extract_window(block: &str) -> Option<TaskWindow> {
    let caps = WINDOW_RE.captures(block)?;
    Some(TaskWindow {
        start: format!("{}:{}", &caps["sh"], &caps["sm"]),
        end: format!("{}:{}", &caps["eh"], &caps["em"]),
        body: caps["body"].to_string(),
    })
}

/// Split a task-list body into segments, each carrying the time range that
/// closes it.
///
/// Two passes: first locate every time-range span, then build each segment
/// as the description text since the previous span plus the closing span
/// itself. A span directly following another (no description in between)
/// extends the previous segment; a leading span with no segment to attach to
/// is dropped. Trailing text after the last span becomes a final, range-less
/// segment.
pub fn segment_tasks(body: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut cursor = 0;

    for span in TIME_RANGE_RE.find_iter(body) {
        let description = &body[cursor..span.start()];
        if !description.trim().is_empty() {
            segments.push(format!("{description}{}", span.as_str()));
        } else if let Some(last) = segments.last_mut() {
            last.push_str(span.as_str());
        }
        cursor = span.end();
    }

    let tail = &body[cursor..];
    if !tail.trim().is_empty() {
        segments.push(tail.to_string());
    }

    segments
}

/// Run the detail grammar over one task segment.
pub fn extract_detail(segment: &str) -> TaskDetail {
    let Some(caps) = TASK_DETAIL_RE.captures(segment) else {
        return TaskDetail::Unmatched;
    };

    let grab = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

    let yard_move = match (grab("yard_prefix"), grab("yard_unit")) {
        (Some(prefix), Some(unit)) => Some(YardMove { prefix, unit }),
        _ => None,
    };

    let category = caps
        .name("category")
        .and_then(|m| TaskCategory::from_token(m.as_str()));

    let stations = grab("from").map(|from| (from, grab("to")));

    let run = match (grab("run"), grab("run_from"), grab("run_to")) {
        (Some(number), Some(from), Some(to)) => Some(RouteRun {
            roll_marker: grab("roll"),
            number,
            from,
            to,
        }),
        _ => None,
    };

    TaskDetail::Matched(TaskFields {
        yard_move,
        category,
        stations,
        run,
        span: TimeSpan {
            start_h: caps["sh"].to_string(),
            start_m: caps["sm"].to_string(),
            end_h: caps["eh"].to_string(),
            end_m: caps["em"].to_string(),
        },
    })
}

/// Classify each segment and accumulate minute totals.
///
/// Rules (non-exclusive):
/// - every matched segment counts as active;
/// - `Res` counts as reserve, `HLP` as dead-head;
/// - a route run, a yard-move prefix, or `CarWash` counts as drive.
pub fn aggregate(segments: &[String]) -> TaskTotals {
    let mut totals = TaskTotals::default();

    for segment in segments {
        let TaskDetail::Matched(fields) = extract_detail(segment) else {
            continue;
        };
        let minutes = fields.span.minutes();

        totals.active_min += minutes;
        if fields.category == Some(TaskCategory::Res) {
            totals.reserve_min += minutes;
        }
        if fields.category == Some(TaskCategory::Hlp) {
            totals.deadhead_min += minutes;
        }
        if fields.run.is_some()
            || fields.yard_move.is_some()
            || fields.category == Some(TaskCategory::CarWash)
        {
            totals.drive_min += minutes;
        }
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_between_time_markers() {
        let block = "Durée : 08.05* … *05.45****** *Res FBMZ - 05.45-06.15******* *13.50";
        let window = extract_window(block).expect("window");
        assert_eq!(window.start, "05:45");
        assert_eq!(window.end, "13:50");
        assert!(window.body.contains("Res FBMZ"));
    }

    #[test]
    fn window_missing_is_none() {
        assert!(extract_window("Prestation FBMZ 103, no starred markers").is_none());
    }

    #[test]
    fn segments_keep_closing_range_with_description() {
        let body = "Res FBMZ - 05.45-06.15 HLP FBMZ -QLV 06.15-07.30";
        let segments = segment_tasks(body);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].starts_with("Res FBMZ"));
        assert!(segments[0].ends_with("05.45-06.15 "));
        assert!(segments[1].contains("HLP"));
        assert!(segments[1].ends_with("06.15-07.30"));
    }

    #[test]
    fn consecutive_ranges_extend_previous_segment() {
        // The first range glues its trailing train number; the second range
        // then follows with nothing but whitespace in between and must
        // attach to the segment the first one closed.
        let body = "A 10.00-11.00 1234 13.00-14.00 B 14.00-15.00";
        let segments = segment_tasks(body);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].contains("10.00-11.00 1234"));
        assert!(segments[0].contains("13.00-14.00"));
        assert!(segments[1].contains("B"));
    }

    #[test]
    fn leading_range_without_description_is_dropped() {
        let body = " 05.00-05.30 walk FBMZ 05.30-06.00";
        let segments = segment_tasks(body);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].contains("walk"));
    }

    #[test]
    fn trailing_text_becomes_rangeless_segment() {
        let body = "Res FBMZ - 05.45-06.15 fin de service";
        let segments = segment_tasks(body);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].trim(), "fin de service");
    }

    #[test]
    fn reserve_segment_detail() {
        let detail = extract_detail("Res FBMZ - 05.45-06.15");
        let TaskDetail::Matched(fields) = detail else {
            panic!("expected a match");
        };
        assert_eq!(fields.category, Some(TaskCategory::Res));
        assert_eq!(fields.stations.as_ref().map(|s| s.0.as_str()), Some("FBMZ"));
        assert_eq!(fields.span.minutes(), 30);
        assert!(fields.run.is_none());
        assert!(fields.yard_move.is_none());
    }

    #[test]
    fn route_run_segment_detail() {
        let detail = extract_detail("ER 12345 R12 1 FBMZ -FBMZ 06.15-07.30");
        let TaskDetail::Matched(fields) = detail else {
            panic!("expected a match");
        };
        let run = fields.run.expect("route run");
        assert_eq!(run.roll_marker.as_deref(), Some("ER"));
        assert_eq!(run.number, "12345");
        assert_eq!(run.from, "FBMZ");
        assert_eq!(run.to, "FBMZ");
        assert_eq!(fields.span.minutes(), 75);
    }

    #[test]
    fn rangeless_segment_is_unmatched() {
        assert_eq!(extract_detail("fin de service"), TaskDetail::Unmatched);
    }

    #[test]
    fn aggregate_buckets_are_non_exclusive() {
        let body = "Res FBMZ - 05.45-06.15 \
                    ER 12345 R12 1 FBMZ -FBMZ 06.15-07.30 \
                    HLP FBMZ -QLV 07.30-08.00 \
                    MS 123456 CarWash QLV - 08.00-08.30";
        let totals = aggregate(&segment_tasks(body));
        assert_eq!(totals.active_min, 165);
        assert_eq!(totals.reserve_min, 30);
        assert_eq!(totals.deadhead_min, 30);
        // Route run (75) + yard move & wash (30).
        assert_eq!(totals.drive_min, 105);
    }

    #[test]
    fn overnight_task_wraps() {
        let detail = extract_detail("Res FBMZ - 23.45-00.15");
        let TaskDetail::Matched(fields) = detail else {
            panic!("expected a match");
        };
        assert_eq!(fields.span.minutes(), 30);
    }
}
