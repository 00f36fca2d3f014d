//! Domain-routing patch for the proxy's Monday.com routes.
//!
//! Four independent steps, each keyed on an exact literal:
//! 1. define the routing helper before the GET route marker
//! 2. compute `targetUrl` from the helper instead of a fixed host
//! 3. point the first fixed `Referer` header at the computed domain
//! 4. point the fixed `Origin`/`Referer` pair at the computed domain
//!
//! A step whose literal is absent is skipped. The file is written at the end
//! regardless, so a run can leave a partially patched file behind.

use super::upstream::{render_helper, HELPER_NAME};
use crate::anchor;
use crate::errors::PatchError;
use crate::report::{PatchReport, StepOutcome, StepReport};
use crate::target::{Occurrences, PatchOptions, TargetFile, WritePolicy};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

pub const TOOL: &str = "fix-routing";

/// The helper goes in front of this comment.
pub const INSERT_MARKER: &str = "// Proxy GET requests for Monday.com resources";

/// Presence of this text means the helper is already defined.
pub const HELPER_MARKER: &str = "function getMondayDomain";

/// Whether `content` already defines the routing helper.
///
/// Plain substring test: a definition spelled with extra whitespace does not
/// count, so the patcher would insert a second one.
pub fn helper_defined(content: &str) -> bool {
    content.contains(HELPER_MARKER)
}

pub const TARGET_URL_BEFORE: &str =
    "const targetPath = req.params[0];\n    const targetUrl = `https://forms.monday.com/${targetPath}`;";
pub const TARGET_URL_AFTER: &str = "const targetPath = '/' + req.params[0];\n    const mondayDomain = getMondayDomain(targetPath);\n    const targetUrl = mondayDomain + targetPath;";

pub const REFERER_BEFORE: &str = "'Referer': 'https://forms.monday.com/'";
pub const REFERER_AFTER: &str = "'Referer': mondayDomain + '/'";

pub const ORIGIN_REFERER_BEFORE: &str =
    "'Origin': 'https://forms.monday.com',\n        'Referer': 'https://forms.monday.com/'";
pub const ORIGIN_REFERER_AFTER: &str =
    "'Origin': mondayDomain,\n        'Referer': mondayDomain + '/'";

static HARDCODED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'(?:Origin|Referer)'\s*:\s*'https://forms\.monday\.com/?'")
        .expect("header literal pattern is valid")
});

/// Count `Origin`/`Referer` header literals still pinned to the forms host.
pub fn count_hardcoded_headers(content: &str) -> usize {
    HARDCODED_HEADER.find_iter(content).count()
}

fn literal_step(
    target: &mut TargetFile,
    name: &'static str,
    before: &str,
    after: &str,
    occurrences: Occurrences,
) -> Result<StepReport, PatchError> {
    let replacements = target.replace(before, after, occurrences)?;
    debug!(step = name, replacements, "literal replacement");
    if replacements == 0 {
        return Ok(StepReport::new(name, StepOutcome::AnchorMissing)
            .with_near_miss(anchor::diagnose(target.content(), before)));
    }
    Ok(StepReport::new(name, StepOutcome::Applied { replacements }))
}

fn helper_step(target: &mut TargetFile) -> Result<StepReport, PatchError> {
    const NAME: &str = "insert-helper";

    if helper_defined(target.content()) {
        debug!(helper = HELPER_NAME, "helper already defined");
        return Ok(StepReport::new(NAME, StepOutcome::AlreadyPresent));
    }

    let replacements = target.insert_before(INSERT_MARKER, &render_helper())?;
    if replacements == 0 {
        return Ok(StepReport::new(NAME, StepOutcome::AnchorMissing)
            .with_near_miss(anchor::diagnose(target.content(), INSERT_MARKER)));
    }
    Ok(StepReport::new(NAME, StepOutcome::Applied { replacements }))
}

/// Run the four routing steps against an in-memory target, in order.
pub fn patch(target: &mut TargetFile) -> Result<Vec<StepReport>, PatchError> {
    Ok(vec![
        helper_step(target)?,
        literal_step(
            target,
            "target-url",
            TARGET_URL_BEFORE,
            TARGET_URL_AFTER,
            Occurrences::All,
        )?,
        literal_step(
            target,
            "referer",
            REFERER_BEFORE,
            REFERER_AFTER,
            Occurrences::First,
        )?,
        literal_step(
            target,
            "origin-referer",
            ORIGIN_REFERER_BEFORE,
            ORIGIN_REFERER_AFTER,
            Occurrences::All,
        )?,
    ])
}

/// Patch the proxy routes in the file at `path`.
///
/// The file is rewritten even when steps were skipped; check
/// [`PatchReport::is_complete`] to find out.
pub fn fix_routing(
    path: impl AsRef<Path>,
    options: PatchOptions,
) -> Result<PatchReport, PatchError> {
    let mut target = TargetFile::open(path)?;
    let steps = patch(&mut target)?;
    let remaining = count_hardcoded_headers(target.content());

    let mut report = target.finish(TOOL, steps, WritePolicy::Always, options)?;
    report.remaining_hardcoded = Some(remaining);

    let skipped: Vec<&str> = report.skipped_steps().map(|step| step.name).collect();
    if !skipped.is_empty() {
        warn!(
            file = %report.file.display(),
            skipped = ?skipped,
            "routing patch incomplete; file written anyway"
        );
    }
    info!(
        file = %report.file.display(),
        written = report.written,
        remaining_hardcoded = remaining,
        "routing pass finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTES: &str = "\
// Proxy GET requests for Monday.com resources
app.get('/monday-form-proxy/*', async (req, res) => {
  try {
    const targetPath = req.params[0];
    const targetUrl = `https://forms.monday.com/${targetPath}`;
    const response = await axios.get(targetUrl, {
      headers: {
        'Referer': 'https://forms.monday.com/'
      }
    });
    res.send(response.data);
  } catch (error) {
    res.status(500).send(error.message);
  }
});

app.post('/monday-form-proxy/*', async (req, res) => {
  try {
    const targetPath = req.params[0];
    const targetUrl = `https://forms.monday.com/${targetPath}`;
    const response = await axios.post(targetUrl, req.body, {
      headers: {
        'Origin': 'https://forms.monday.com',
        'Referer': 'https://forms.monday.com/'
      }
    });
    res.send(response.data);
  } catch (error) {
    res.status(500).send(error.message);
  }
});
";

    #[test]
    fn test_all_steps_apply_in_one_pass() {
        let mut target = TargetFile::from_text("app.js", ROUTES);
        let steps = patch(&mut target).unwrap();

        let outcomes: Vec<_> = steps.iter().map(|s| (s.name, s.outcome.clone())).collect();
        assert_eq!(
            outcomes,
            vec![
                ("insert-helper", StepOutcome::Applied { replacements: 1 }),
                ("target-url", StepOutcome::Applied { replacements: 2 }),
                ("referer", StepOutcome::Applied { replacements: 1 }),
                ("origin-referer", StepOutcome::Applied { replacements: 1 }),
            ]
        );

        let content = target.content();
        assert!(content.starts_with(&render_helper()));
        assert_eq!(content.matches(TARGET_URL_AFTER).count(), 2);
        assert!(content.contains(REFERER_AFTER));
        assert!(content.contains(ORIGIN_REFERER_AFTER));
        assert_eq!(count_hardcoded_headers(content), 0);
    }

    #[test]
    fn test_helper_is_not_duplicated() {
        let mut target = TargetFile::from_text("app.js", ROUTES);
        patch(&mut target).unwrap();
        let steps = patch(&mut target).unwrap();

        assert_eq!(steps[0].outcome, StepOutcome::AlreadyPresent);
        assert_eq!(target.content().matches(HELPER_MARKER).count(), 1);
    }

    #[test]
    fn test_missing_literals_are_skipped() {
        let mut target = TargetFile::from_text("app.js", "const app = express();\n");
        let steps = patch(&mut target).unwrap();

        assert!(steps.iter().all(|s| s.outcome.is_missing()));
        assert!(!target.is_modified());
    }

    #[test]
    fn test_referer_step_runs_before_pair_step() {
        // When the pair comes first, step 3 eats its Referer and step 4 misses.
        let post_first = "\
        'Origin': 'https://forms.monday.com',
        'Referer': 'https://forms.monday.com/'
";
        let mut target = TargetFile::from_text("app.js", post_first);
        let steps = patch(&mut target).unwrap();

        assert_eq!(steps[2].outcome, StepOutcome::Applied { replacements: 1 });
        assert_eq!(steps[3].outcome, StepOutcome::AnchorMissing);
        assert_eq!(count_hardcoded_headers(target.content()), 1);
    }

    #[test]
    fn test_count_hardcoded_headers_tolerates_spacing() {
        let content = "'Origin':'https://forms.monday.com', 'Referer' :  'https://forms.monday.com/'";
        assert_eq!(count_hardcoded_headers(content), 2);
        assert_eq!(count_hardcoded_headers("'Referer': mondayDomain + '/'"), 0);
    }
}
