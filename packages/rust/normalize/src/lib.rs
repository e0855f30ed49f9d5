//! Document-stream text normalization.
//!
//! Turns the content stream of an office-document container (the
//! `content.xml` of an ODT roster booklet) into a single flat line of plain
//! text the duty parser can pattern-match against. Container unpacking is an
//! external collaborator; this crate only sees UTF-8 stream text.
//!
//! Each pass is a function `&str -> String` applied in a fixed order. The
//! normalizer is best-effort: malformed markup is stripped, never rejected.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Normalize a document stream into flat plain text.
///
/// Markup passes, in order:
/// 1. `<text:s text:c="N"/>` expands to N literal spaces
/// 2. bare `<text:s/>` becomes one space
/// 3. `<text:tab/>` becomes a literal tab
/// 4. paragraph/heading closing tags become a single space
/// 5. all remaining tags are stripped
/// 6. entity references are decoded
/// 7. whitespace runs collapse to single spaces, ends trimmed
///
/// Input without a `text:` stream is treated as already-plain text and only
/// gets the whitespace collapsing pass.
pub fn normalize(input: &str) -> String {
    if !input.contains("<text:") {
        debug!("no text stream markup, collapsing whitespace only");
        return collapse_whitespace(input);
    }

    let mut result = input.to_string();

    result = expand_space_runs(&result);
    result = expand_single_spaces(&result);
    result = expand_tabs(&result);
    result = flatten_paragraph_breaks(&result);
    result = strip_tags(&result);
    result = decode_entities(&result);
    result = collapse_whitespace(&result);

    debug!(len = result.len(), "stream normalized");
    result
}

// ---------------------------------------------------------------------------
// Pass 1: expand run-length-encoded space markers
// ---------------------------------------------------------------------------

/// `<text:s text:c="5"/>` → five literal spaces.
fn expand_space_runs(xml: &str) -> String {
    static SPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"<text:s[^>]*text:c="(\d+)"[^>]*/>"#).expect("space run regex")
    });

    SPACE_RUN_RE
        .replace_all(xml, |caps: &regex::Captures| {
            let count: usize = caps[1].parse().unwrap_or(1);
            " ".repeat(count)
        })
        .to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: bare space markers
// ---------------------------------------------------------------------------

/// `<text:s/>` (no count attribute) → one space.
fn expand_single_spaces(xml: &str) -> String {
    static SPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<text:s(?:\s+[^>]*)?/>").expect("space regex"));

    SPACE_RE.replace_all(xml, " ").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: tab markers
// ---------------------------------------------------------------------------

/// `<text:tab/>` → literal tab.
fn expand_tabs(xml: &str) -> String {
    static TAB_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<text:tab(?:\s+[^>]*)?/>").expect("tab regex"));

    TAB_RE.replace_all(xml, "\t").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: flatten structural breaks
// ---------------------------------------------------------------------------

/// Paragraph and heading ends become a single space, so the whole booklet
/// reads as one line for the downstream patterns.
fn flatten_paragraph_breaks(xml: &str) -> String {
    xml.replace("</text:p>", " ").replace("</text:h>", " ")
}

// ---------------------------------------------------------------------------
// Pass 5: strip remaining markup
// ---------------------------------------------------------------------------

/// Remove every remaining tag, keeping only character data.
fn strip_tags(xml: &str) -> String {
    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));

    TAG_RE.replace_all(xml, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 6: decode entity references
// ---------------------------------------------------------------------------

/// Decode the named XML entities plus decimal/hex character references.
/// Unknown references are left as-is (best-effort, never an error).
fn decode_entities(text: &str) -> String {
    static ENTITY_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"&(#x?[0-9A-Fa-f]+|\w+);").expect("entity regex"));

    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            match name {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "apos" => "'".to_string(),
                "quot" => "\"".to_string(),
                _ => {
                    let code = if let Some(hex) = name.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = name.strip_prefix('#') {
                        dec.parse::<u32>().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32)
                        .map(String::from)
                        .unwrap_or_else(|| caps[0].to_string())
                }
            }
        })
        .to_string()
}

// ---------------------------------------------------------------------------
// Pass 7: collapse whitespace
// ---------------------------------------------------------------------------

/// Collapse every whitespace run (spaces, tabs, newlines) to one space and
/// trim the ends. Runs on the fully expanded text, so space/tab markers have
/// already become literal whitespace by the time this runs.
fn collapse_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("ws regex"));

    WS_RE.replace_all(text, " ").trim().to_string()
}
