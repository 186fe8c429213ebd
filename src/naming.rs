//! File-system safe sample names, following the rules Illumina software uses to
//! turn `Sample_Name` into FASTQ file names.

use std::sync::LazyLock;

use regex::Regex;

static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new("-{2,}").unwrap());

/// Canonicalizes a free-text sample identifier.
///
/// Trailing whitespace is dropped, spaces, periods, `=` and `/` become `-`, `+`
/// and `#` are removed, and any run of hyphens collapses to a single one.
/// Empty input yields an empty name.
pub fn canonical_name(raw: &str) -> String {
    let replaced: String = raw
        .trim_end()
        .chars()
        .filter_map(|ch| match ch {
            ' ' | '.' | '=' | '/' => Some('-'),
            '+' | '#' => None,
            other => Some(other),
        })
        .collect();
    // dropping `+`/`#` can expose whitespace that was not trailing before
    HYPHEN_RUNS
        .replace_all(replaced.trim_end(), "-")
        .into_owned()
}

/// Canonicalizes the field at `index` of a split row. A row too short to have
/// that field yields an empty name.
pub fn canonical_name_at<S: AsRef<str>>(fields: &[S], index: usize) -> String {
    fields
        .get(index)
        .map(|field| canonical_name(field.as_ref()))
        .unwrap_or_default()
}
