//! Read-only inspection of a proxy file against both patches.

use crate::errors::PatchError;
use crate::interceptor;
use crate::routing::patcher::{
    count_hardcoded_headers, helper_defined, INSERT_MARKER, ORIGIN_REFERER_BEFORE,
    REFERER_BEFORE, TARGET_URL_BEFORE,
};
use crate::target::TargetFile;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub file: PathBuf,
    pub interceptor_installed: bool,
    pub interceptor_anchor_present: bool,
    pub helper_defined: bool,
    pub helper_marker_present: bool,
    /// Routing literals that a `fix-routing` run would still rewrite
    pub unpatched_literals: Vec<&'static str>,
    pub remaining_hardcoded: usize,
}

impl StatusReport {
    /// Both patches are in and nothing is left pinned to the forms host.
    pub fn fully_patched(&self) -> bool {
        self.interceptor_installed
            && self.helper_defined
            && self.unpatched_literals.is_empty()
            && self.remaining_hardcoded == 0
    }
}

/// Inspect text without touching disk.
pub fn inspect_text(path: impl Into<PathBuf>, content: &str) -> StatusReport {
    let literals = [
        ("target-url", TARGET_URL_BEFORE),
        ("referer", REFERER_BEFORE),
        ("origin-referer", ORIGIN_REFERER_BEFORE),
    ];

    StatusReport {
        file: path.into(),
        interceptor_installed: content.contains(interceptor::MARKER),
        interceptor_anchor_present: content.contains(interceptor::ANCHOR),
        helper_defined: helper_defined(content),
        helper_marker_present: content.contains(INSERT_MARKER),
        unpatched_literals: literals
            .iter()
            .filter(|(_, literal)| content.contains(literal))
            .map(|(name, _)| *name)
            .collect(),
        remaining_hardcoded: count_hardcoded_headers(content),
    }
}

/// Inspect the file at `path`. Never writes.
pub fn inspect(path: impl AsRef<Path>) -> Result<StatusReport, PatchError> {
    let target = TargetFile::open(path)?;
    Ok(inspect_text(target.path(), target.content()))
}
