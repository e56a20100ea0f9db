//! Request handler module
//!
//! Dispatches routing decisions to file serving and writes the access log.

pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
