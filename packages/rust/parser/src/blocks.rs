//! Duty block segmentation.
//!
//! A roster booklet separates duty entries with a fixed line of underscores.
//! After normalization that line survives as a literal run inside the flat
//! text, so splitting is a plain substring split — no pattern needed.

/// The fixed separator between duty blocks: a run of 100 underscores.
pub const BLOCK_SEPARATOR: &str = "____________________________________________________________________________________________________";

/// Split normalized text into trimmed, non-empty duty blocks in document order.
pub fn split_blocks(text: &str) -> Vec<&str> {
    text.split(BLOCK_SEPARATOR)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_is_one_hundred_underscores() {
        assert_eq!(BLOCK_SEPARATOR.len(), 100);
        assert!(BLOCK_SEPARATOR.chars().all(|c| c == '_'));
    }

    #[test]
    fn splits_in_document_order() {
        let text = format!("first{BLOCK_SEPARATOR}second{BLOCK_SEPARATOR}third");
        assert_eq!(split_blocks(&text), vec!["first", "second", "third"]);
    }

    #[test]
    fn trims_and_drops_empty_pieces() {
        let text = format!("  a  {BLOCK_SEPARATOR}   {BLOCK_SEPARATOR}{BLOCK_SEPARATOR} b {BLOCK_SEPARATOR}");
        assert_eq!(split_blocks(&text), vec!["a", "b"]);
    }

    #[test]
    fn block_count_matches_non_empty_splits() {
        let text = format!("x{BLOCK_SEPARATOR}y{BLOCK_SEPARATOR} {BLOCK_SEPARATOR}z");
        let expected = text
            .split(BLOCK_SEPARATOR)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .count();
        assert_eq!(split_blocks(&text).len(), expected);
        assert_eq!(split_blocks(&text).len(), 3);
    }

    #[test]
    fn no_separator_yields_single_block() {
        assert_eq!(split_blocks("just one duty"), vec!["just one duty"]);
    }
}
