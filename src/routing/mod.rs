pub mod patcher;
pub mod upstream;

pub use patcher::{count_hardcoded_headers, fix_routing, helper_defined, patch};
pub use upstream::{render_helper, RouteRule, Upstream, FALLBACK, HELPER_NAME, RULES};
