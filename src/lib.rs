//! Proxy Patcher: marker-guarded text patches for the Monday.com form proxy
//!
//! Two independent patchers rewrite the Express proxy server file in place:
//!
//! - [`interceptor`] adds a client-side `<script>` to the HTML handler that
//!   routes `fetch`/`XMLHttpRequest` calls for Monday.com hosts through the proxy.
//! - [`routing`] makes the reverse-proxy route pick its upstream host from
//!   the request path instead of always using `forms.monday.com`.
//!
//! # Architecture
//!
//! Every substitution compiles down to [`Edit`], a verified byte-span
//! replacement applied to an in-memory [`TargetFile`]. Patchers only decide
//! where the spans are; writing is a single atomic step at the end.
//!
//! # Example
//!
//! ```no_run
//! use proxy_patcher::{fix_routing, PatchOptions};
//!
//! let report = fix_routing("server/app.js", PatchOptions::default())?;
//! for step in report.skipped_steps() {
//!     eprintln!("skipped {}", step.name);
//! }
//! # Ok::<(), proxy_patcher::PatchError>(())
//! ```

pub mod anchor;
pub mod edit;
pub mod errors;
pub mod interceptor;
pub mod report;
pub mod routing;
pub mod status;
pub mod target;

// Re-exports
pub use anchor::{Candidate, NearMiss};
pub use edit::{Edit, EditError};
pub use errors::PatchError;
pub use interceptor::inject_interceptor;
pub use report::{PatchReport, StepOutcome, StepReport};
pub use routing::{fix_routing, Upstream};
pub use status::{inspect, StatusReport};
pub use target::{LineEnding, Occurrences, PatchOptions, TargetFile, WritePolicy};
