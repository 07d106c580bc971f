//! Request handler module
//!
//! Method dispatch, static file serving and directory listings.

mod listing;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
