//! Upstream selection by request path prefix.
//!
//! The proxy route serves assets from several Monday.com hosts. [`RULES`] is
//! the single source of truth: the Rust classifier walks it, and the
//! JavaScript helper injected into the proxy is rendered from it.

use serde::Serialize;
use std::fmt;

/// Name of the injected JavaScript helper.
pub const HELPER_NAME: &str = "getMondayDomain";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Upstream {
    Forms,
    Cdn,
}

impl Upstream {
    pub fn domain(self) -> &'static str {
        match self {
            Upstream::Forms => "https://forms.monday.com",
            Upstream::Cdn => "https://cdn.monday.com",
        }
    }

    /// Pick the upstream for a request path. First matching rule wins.
    pub fn for_path(path: &str) -> Upstream {
        RULES
            .iter()
            .find(|rule| rule.matches(path))
            .map_or(FALLBACK, |rule| rule.upstream)
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.domain())
    }
}

/// One branch of the prefix table.
#[derive(Debug, Clone, Copy)]
pub struct RouteRule {
    pub prefixes: &'static [&'static str],
    pub upstream: Upstream,
}

impl RouteRule {
    pub fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }
}

/// Ordered prefix rules. Order matters: `/traces` has no trailing slash.
pub const RULES: &[RouteRule] = &[
    RouteRule {
        prefixes: &["/workforms/", "/forms/"],
        upstream: Upstream::Forms,
    },
    RouteRule {
        prefixes: &["/assets/", "/images/"],
        upstream: Upstream::Cdn,
    },
    RouteRule {
        prefixes: &["/traces"],
        upstream: Upstream::Forms,
    },
    RouteRule {
        prefixes: &["/cdn-cgi/"],
        upstream: Upstream::Forms,
    },
];

pub const FALLBACK: Upstream = Upstream::Forms;

/// Render the JavaScript definition of the helper, with a trailing blank line.
pub fn render_helper() -> String {
    let mut js = String::new();
    js.push_str(
        "// Helper function to determine the correct Monday.com domain based on the path\n",
    );
    js.push_str(&format!("function {HELPER_NAME}(path) {{\n"));

    for (idx, rule) in RULES.iter().enumerate() {
        let condition = rule
            .prefixes
            .iter()
            .map(|prefix| format!("path.startsWith('{prefix}')"))
            .collect::<Vec<_>>()
            .join(" || ");
        let keyword = if idx == 0 { "  if" } else { "  } else if" };
        js.push_str(&format!(
            "{keyword} ({condition}) {{\n    return '{}';\n",
            rule.upstream.domain()
        ));
    }

    let fallback_host = FALLBACK.domain().trim_start_matches("https://");
    js.push_str(&format!(
        "  }} else {{\n    // Default to {fallback_host}\n    return '{}';\n  }}\n}}\n\n",
        FALLBACK.domain()
    ));
    js
}
