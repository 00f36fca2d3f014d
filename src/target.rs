use crate::edit::{atomic_write, fingerprint, Edit};
use crate::errors::PatchError;
use crate::report::{PatchReport, StepReport};
use serde::Serialize;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Options shared by both patchers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchOptions {
    /// Compute the patched text but leave the file alone
    pub dry_run: bool,
}

/// How many matches of a search string to replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrences {
    All,
    First,
}

/// When a patcher writes the file back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Only if some step changed the text
    WhenChanged,
    /// Unconditionally, even if every step was skipped
    Always,
}

/// Line terminator style of a target file.
///
/// Anchors are written with `\n`; CRLF files are matched on LF-normalised
/// text and converted back on write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    /// Any `\r\n` in the text makes it a CRLF file.
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineEnding::Crlf
        } else {
            LineEnding::Lf
        }
    }

    /// Convert LF-normalised text to this style.
    pub fn apply<'a>(self, text: &'a str) -> Cow<'a, str> {
        match self {
            LineEnding::Lf => Cow::Borrowed(text),
            LineEnding::Crlf => Cow::Owned(text.replace('\n', "\r\n")),
        }
    }
}

/// A target file held in memory: the text as read, and the working copy.
///
/// Both are LF-normalised; `line_ending` records what the file used.
#[derive(Debug, Clone)]
pub struct TargetFile {
    path: PathBuf,
    line_ending: LineEnding,
    original: String,
    content: String,
}

impl TargetFile {
    /// Read the whole file. Missing, unreadable or non-UTF-8 files fail here.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PatchError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| PatchError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = content.len(), "read target file");
        Ok(Self::from_text(path, content))
    }

    /// Wrap text that did not come from disk.
    pub fn from_text(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let mut content = content.into();
        let line_ending = LineEnding::detect(&content);
        if line_ending == LineEnding::Crlf {
            content = content.replace("\r\n", "\n");
        }
        Self {
            path: path.into(),
            line_ending,
            original: content.clone(),
            content,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.content.contains(needle)
    }

    pub fn is_modified(&self) -> bool {
        self.content != self.original
    }

    /// Replace non-overlapping matches of `search`, scanning left to right.
    ///
    /// Returns the number of replacements; zero means `search` was absent.
    pub fn replace(
        &mut self,
        search: &str,
        replacement: &str,
        occurrences: Occurrences,
    ) -> Result<usize, PatchError> {
        let matches = self.content.match_indices(search);
        let edits: Vec<Edit> = match occurrences {
            Occurrences::All => matches
                .map(|(start, found)| Edit::new(start, start + found.len(), replacement, found))
                .collect(),
            Occurrences::First => matches
                .take(1)
                .map(|(start, found)| Edit::new(start, start + found.len(), replacement, found))
                .collect(),
        };
        self.apply(edits)
    }

    /// Insert `text` directly in front of every occurrence of `marker`.
    pub fn insert_before(&mut self, marker: &str, text: &str) -> Result<usize, PatchError> {
        let edits: Vec<Edit> = self
            .content
            .match_indices(marker)
            .map(|(start, _)| Edit::insert(start, text))
            .collect();
        self.apply(edits)
    }

    /// Insert `text` directly behind every occurrence of `anchor`.
    pub fn insert_after(&mut self, anchor: &str, text: &str) -> Result<usize, PatchError> {
        let edits: Vec<Edit> = self
            .content
            .match_indices(anchor)
            .map(|(start, found)| Edit::insert(start + found.len(), text))
            .collect();
        self.apply(edits)
    }

    fn apply(&mut self, edits: Vec<Edit>) -> Result<usize, PatchError> {
        if edits.is_empty() {
            return Ok(0);
        }
        let count = edits.len();
        self.content =
            Edit::apply_batch(&self.content, edits).map_err(|source| PatchError::Edit {
                path: self.path.clone(),
                source,
            })?;
        Ok(count)
    }

    /// Write back according to `policy` and build the report.
    pub fn finish(
        self,
        tool: &'static str,
        steps: Vec<StepReport>,
        policy: WritePolicy,
        options: PatchOptions,
    ) -> Result<PatchReport, PatchError> {
        let wants_write = match policy {
            WritePolicy::WhenChanged => self.is_modified(),
            WritePolicy::Always => true,
        };
        let written = wants_write && !options.dry_run;

        if written {
            let on_disk = self.line_ending.apply(&self.content);
            atomic_write(&self.path, on_disk.as_bytes()).map_err(|source| {
                PatchError::Write {
                    path: self.path.clone(),
                    source,
                }
            })?;
            debug!(
                path = %self.path.display(),
                bytes = on_disk.len(),
                line_ending = ?self.line_ending,
                "wrote target file"
            );
        } else if wants_write {
            debug!(path = %self.path.display(), "dry run, not writing");
        }

        Ok(PatchReport {
            tool,
            file: self.path,
            steps,
            written,
            dry_run: options.dry_run,
            line_ending: self.line_ending,
            fingerprint_before: fingerprint(&self.original),
            fingerprint_after: fingerprint(&self.content),
            remaining_hardcoded: None,
            original: self.original,
            patched: self.content,
        })
    }
}
