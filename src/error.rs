//! # Error Types
//!
//! This module defines the error taxonomy for the print dispatch pipeline.
//!
//! Every failure a print attempt can hit is caught at the dispatcher
//! boundary and converted into a terminal [`crate::dispatch::PrintStatus`];
//! these variants carry the diagnostic detail that ends up in
//! `Failed(reason)`.

use thiserror::Error;

/// Main error type for boleta operations
#[derive(Debug, Error)]
pub enum BoletaError {
    /// The device enumeration subsystem could not be queried.
    /// The dispatcher treats this as "zero candidates from this
    /// transport", not as a fatal condition.
    #[error("Platform unavailable: {0}")]
    PlatformUnavailable(String),

    /// USB access permission has not been granted yet. The attempt halts
    /// immediately; the caller re-triggers the print after the grant.
    #[error("Permission required for {0}")]
    PermissionRequired(String),

    /// Transport-level open failure (device unreachable, socket refused)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Write/transmit failure mid-print
    #[error("Transport error: {0}")]
    Transport(String),

    /// Preference store read/write failure
    #[error("Preference error: {0}")]
    Preference(String),

    /// Invalid caller-supplied argument (CLI item specs, MAC addresses)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
