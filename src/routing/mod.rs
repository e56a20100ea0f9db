//! Routing module
//!
//! Decides how a request is answered:
//! - Static files from the built front-end
//! - The entry document for client-side routes
//! - Not found for everything else

mod accept;
mod rules;
mod site;

pub use rules::{decide, RequestInfo, RouteDecision};
pub use site::{FileKind, SiteRoot};
