//! Logger module
//!
//! Logging utilities for the file server:
//! - Lifecycle banner (always on stdout)
//! - Access logging in common, combined or JSON format
//! - Error and warning logging, optionally to files

mod format;
pub mod writer;

pub use format::{AccessLogEntry, AccessLogFormat};

use crate::config::Config;
use std::net::SocketAddr;
use std::path::Path;

/// Initialize the log writer from configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, root: &Path, config: &Config) {
    println!("Serving {} on {addr}", root.display());
    if let Some(ref path) = config.logging.access_log_file {
        println!("Access log: {path}");
    }
    if let Some(ref path) = config.logging.error_log_file {
        println!("Error log: {path}");
    }
    println!("Server running at http://localhost:{}/", addr.port());
    println!("Press Ctrl+C to stop");
}

pub fn log_server_stopped() {
    println!("\nServer stopped.");
}

pub fn log_signal(name: &str) {
    write_error(&format!("[SIGNAL] {name} received, shutting down"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: AccessLogFormat) {
    write_access(&entry.format(format));
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    write_error(&format!("[ERROR] Failed to serve connection: {err}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}
