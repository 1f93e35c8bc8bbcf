//! Canonical name normalisation.
//!
//! Normalised names are used for team directory names on disk and for the
//! `admin-` repository topics, so the same function must produce the same
//! identifier in both places.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SPACE_RUNS: Regex = Regex::new(r"[ _]+").unwrap();
    static ref BAD_CHARS: Regex = Regex::new(r"[^a-z0-9\-_]").unwrap();
    static ref HYPHEN_RUNS: Regex = Regex::new(r"-{2,}").unwrap();
    static ref EDGE_TRIM: Regex = Regex::new(r"(^[\-_]+)|([\-_]+$)").unwrap();
}

/// Normalise a team or organisation name: lowercase, runs of space and
/// underscore become a single hyphen, characters outside `[a-z0-9_-]` are
/// dropped, hyphen runs collapse, and leading/trailing `-`/`_` are stripped.
pub fn normalise_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let hyphenated = SPACE_RUNS.replace_all(&lowered, "-");
    let cleaned = BAD_CHARS.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUNS.replace_all(&cleaned, "-");
    EDGE_TRIM.replace_all(&collapsed, "").into_owned()
}
