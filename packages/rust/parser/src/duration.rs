//! Task duration arithmetic with overnight wraparound.

/// Minutes between a start and end time given as zero-padded decimal digit
/// strings ("HH", "MM" pairs straight from the pattern captures).
///
/// When the start-hour string is lexically greater than the end-hour string
/// the end time is taken to be on the next calendar day (+24 h) before
/// subtracting. Zero-padded decimal strings sort lexically like numbers, so
/// this is the overnight-wrap test. The result is never negative.
pub fn span_minutes(start_h: &str, start_m: &str, end_h: &str, end_m: &str) -> u32 {
    let num = |s: &str| s.parse::<i64>().unwrap_or(0);

    let start = num(start_h) * 60 + num(start_m);
    let mut end = num(end_h) * 60 + num(end_m);
    if start_h > end_h {
        end += 24 * 60;
    }

    (end - start).max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_past_midnight() {
        assert_eq!(span_minutes("23", "45", "00", "15"), 30);
    }

    #[test]
    fn same_day_span() {
        assert_eq!(span_minutes("08", "00", "16", "30"), 510);
    }

    #[test]
    fn zero_length_span() {
        assert_eq!(span_minutes("10", "30", "10", "30"), 0);
    }

    #[test]
    fn full_day_wrap() {
        // 22:00 to 06:00 next day.
        assert_eq!(span_minutes("22", "00", "06", "00"), 480);
    }

    #[test]
    fn never_negative() {
        // Same hour, earlier minute: not a wrap by the hour-string rule,
        // clamped to zero rather than going negative.
        assert_eq!(span_minutes("10", "30", "10", "10"), 0);
    }
}
