//! Near-miss diagnostics for anchors that no longer match.
//!
//! When a patcher cannot find its anchor, the usual cause is drift in the
//! target file: a reworded comment, different indentation, a renamed
//! variable. This module finds the first anchor line that is absent from the
//! file and the file line that most resembles it.

use serde::Serialize;

/// Lines scoring below this are not worth showing.
const MIN_SIMILARITY: f64 = 0.6;

/// The first anchor line missing from the file, with its closest match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearMiss {
    pub expected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest: Option<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// 1-based line number in the target file
    pub line: usize,
    pub text: String,
    pub similarity: f64,
}

/// Explain why `anchor` was not found in `content`.
///
/// Returns `None` when every anchor line appears somewhere in the file; the
/// block is then broken up or reordered rather than edited, and a single
/// line comparison would mislead.
pub fn diagnose(content: &str, anchor: &str) -> Option<NearMiss> {
    let missing = anchor
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| !content.lines().any(|candidate| candidate.trim() == *line))?;

    Some(NearMiss {
        expected: missing.to_string(),
        closest: closest_line(content, missing),
    })
}

/// Find the file line most similar to `needle`, ignoring surrounding whitespace.
pub fn closest_line(content: &str, needle: &str) -> Option<Candidate> {
    let needle = needle.trim();

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| Candidate {
            line: idx + 1,
            text: line.trim().to_string(),
            similarity: strsim::normalized_levenshtein(needle, line.trim()),
        })
        .filter(|candidate| candidate.similarity >= MIN_SIMILARITY)
        .max_by(|a, b| a.similarity.total_cmp(&b.similarity))
}
