//! HTTP protocol layer module
//!
//! Caching policy, content types, byte ranges and response builders, kept
//! apart from the routing decisions that use them.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

pub use response::{
    build_304_response, build_404_response, build_416_response, build_500_response,
    build_redirect_response, ContentMeta,
};
