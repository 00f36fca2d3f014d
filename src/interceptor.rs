//! Interceptor injection for the form proxy's HTML handler.
//!
//! The HTML handler fetches a Monday.com form page and rewrites it before
//! sending it to the browser. This patch adds a `<script>` to that page which
//! wraps `fetch` and `XMLHttpRequest.open` so that requests to Monday.com
//! domains go through our proxy instead.

use crate::anchor;
use crate::errors::PatchError;
use crate::report::{PatchReport, StepOutcome, StepReport};
use crate::target::{PatchOptions, TargetFile, WritePolicy};
use std::path::Path;
use tracing::{debug, info};

pub const TOOL: &str = "inject-interceptor";

/// Presence of this text means the interceptor is already in the file.
pub const MARKER: &str = "Monday.com form interceptor loaded";

/// The handler block the interceptor goes after.
pub const ANCHOR: &str = r#"    let html = response.data;

    // Remove X-Frame-Options and CSP headers that would block embedding
    // Replace all Monday.com URLs with our proxy URLs
    html = html.replace(
      /<head>/i,
      `<head><base href="https://forms.monday.com/">`
    );"#;

/// JavaScript inserted after [`ANCHOR`].
///
/// `PROXY_BASE` is resolved by the proxy server at its own runtime from
/// `REACT_APP_API_URL`.
pub const SNIPPET: &str = r#"    // Inject script to intercept all fetch and XMLHttpRequest calls
    const interceptScript = `<script>
(function() {
  const PROXY_BASE = '${process.env.REACT_APP_API_URL || 'https://api.boldbusiness.com/api'}';
  const MONDAY_DOMAINS = [
    'https://forms.monday.com',
    'https://cdn.monday.com',
    'https://forms-cdn.monday.com',
    'https://api.monday.com'
  ];
  console.log('🚀 Monday.com form interceptor loaded');

  function shouldProxy(url) {
    if (typeof url !== 'string') return false;
    return MONDAY_DOMAINS.some(domain => url.startsWith(domain));
  }

  function proxyUrl(url) {
    for (const domain of MONDAY_DOMAINS) {
      if (url.startsWith(domain)) {
        const path = url.substring(domain.length);
        const proxiedUrl = PROXY_BASE + '/monday-form-proxy' + path;
        console.log('🔄 Proxying:', url, '→', proxiedUrl);
        return proxiedUrl;
      }
    }
    return url;
  }

  // Intercept fetch
  const originalFetch = window.fetch;
  window.fetch = function(url, options) {
    if (shouldProxy(url)) {
      url = proxyUrl(url);
    }
    return originalFetch.call(this, url, options);
  };

  // Intercept XMLHttpRequest
  const originalOpen = XMLHttpRequest.prototype.open;
  XMLHttpRequest.prototype.open = function(method, url, ...rest) {
    if (shouldProxy(url)) {
      url = proxyUrl(url);
    }
    return originalOpen.call(this, method, url, ...rest);
  };
})();
</script>`;

    // Inject the intercept script right after the opening <head> tag
    // so it loads before any other scripts
    html = html.replace(
      /(<head[^>]*>)/i,
      `$1${interceptScript}`
    );"#;

/// Apply the interceptor to an in-memory target.
pub fn inject(target: &mut TargetFile) -> Result<StepReport, PatchError> {
    if target.contains(MARKER) {
        debug!("interceptor marker present");
        return Ok(StepReport::new("interceptor", StepOutcome::AlreadyPresent));
    }

    let insertion = format!("\n\n{SNIPPET}");
    let replacements = target.insert_after(ANCHOR, &insertion)?;
    if replacements == 0 {
        debug!("interceptor anchor not found");
        return Ok(
            StepReport::new("interceptor", StepOutcome::AnchorMissing)
                .with_near_miss(anchor::diagnose(target.content(), ANCHOR)),
        );
    }

    Ok(StepReport::new(
        "interceptor",
        StepOutcome::Applied { replacements },
    ))
}

/// Inject the interceptor into the file at `path`.
///
/// The file is only written when the anchor was found and the marker was not
/// already present.
pub fn inject_interceptor(
    path: impl AsRef<Path>,
    options: PatchOptions,
) -> Result<PatchReport, PatchError> {
    let mut target = TargetFile::open(path)?;
    let step = inject(&mut target)?;
    let report = target.finish(TOOL, vec![step], WritePolicy::WhenChanged, options)?;
    info!(
        file = %report.file.display(),
        written = report.written,
        "interceptor pass finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn handler() -> String {
        format!(
            "app.get('/monday-form', async (req, res) => {{\n  try {{\n    const response = await axios.get(url);\n{ANCHOR}\n\n    res.send(html);\n  }} catch (e) {{}}\n}});\n"
        )
    }

    #[test]
    fn test_snippet_contains_marker() {
        assert!(SNIPPET.contains(MARKER));
        assert!(!ANCHOR.contains(MARKER));
    }

    #[test]
    fn test_inject_places_snippet_after_anchor() {
        let mut target = TargetFile::from_text("app.js", handler());
        let step = inject(&mut target).unwrap();

        assert_eq!(step.outcome, StepOutcome::Applied { replacements: 1 });
        let expected = format!("{ANCHOR}\n\n{SNIPPET}\n\n    res.send(html);");
        assert!(target.content().contains(&expected));
    }

    #[test]
    fn test_inject_twice_is_noop() {
        let mut target = TargetFile::from_text("app.js", handler());
        inject(&mut target).unwrap();
        let once = target.content().to_string();

        let step = inject(&mut target).unwrap();
        assert_eq!(step.outcome, StepOutcome::AlreadyPresent);
        assert_eq!(target.content(), once);
    }

    #[test]
    fn test_inject_reports_near_miss() {
        let drifted = handler().replace("let html = response.data;", "let html = res.data;");
        let mut target = TargetFile::from_text("app.js", drifted);
        let step = inject(&mut target).unwrap();

        assert_eq!(step.outcome, StepOutcome::AnchorMissing);
        assert!(!target.is_modified());
        let miss = step.near_miss.unwrap();
        assert_eq!(miss.expected, "let html = response.data;");
        assert_eq!(miss.closest.unwrap().text, "let html = res.data;");
    }

    #[test]
    fn test_missing_anchor_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.js");
        fs::write(&path, "module.exports = app;\n").unwrap();

        let report = inject_interceptor(&path, PatchOptions::default()).unwrap();

        assert!(!report.written);
        assert!(!report.is_complete());
        assert_eq!(fs::read_to_string(&path).unwrap(), "module.exports = app;\n");
    }
}
