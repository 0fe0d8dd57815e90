//! # Boleta - Receipt Print Dispatch Service
//!
//! Boleta takes a "print this receipt" request, finds an available
//! thermal printer (USB preferred, Bluetooth fallback, with a persisted
//! preference and a keyword heuristic), opens a transport connection,
//! and transmits a formatted ESC/POS document, reporting status
//! transitions to the caller along the way.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use boleta::{Dispatcher, PrintRequest};
//! use boleta::document::RequestItem;
//!
//! let dispatcher = Arc::new(Dispatcher::system(None));
//!
//! let request = PrintRequest {
//!     invoice_id: "123".to_string(),
//!     customer_name: "Jane".to_string(),
//!     total: "45.00".to_string(),
//!     date: None,
//!     items: vec![RequestItem {
//!         name: Some("Bread".to_string()),
//!         quantity: Some("2".to_string()),
//!         amount: Some("10.00".to_string()),
//!     }],
//! };
//!
//! // The attempt runs on a worker thread; consume statuses here.
//! for status in dispatcher.spawn(request) {
//!     println!("{:?}", status);
//! }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`device`] | Printer descriptors (discovered, not yet connected) |
//! | [`discovery`] | USB/Bluetooth candidate enumeration |
//! | [`select`] | Pure selection policy |
//! | [`prefs`] | Persisted last-used printer preference |
//! | [`document`] | Print requests and receipt formatting |
//! | [`escpos`] | Markup to ESC/POS byte encoding |
//! | [`transport`] | USB/Bluetooth transports and the connection manager |
//! | [`dispatch`] | The print-attempt state machine and status channel |
//! | [`server`] | HTTP trigger surface |
//! | [`error`] | Error types |
//!
//! ## Selection Policy
//!
//! 1. Any attached USB printer wins outright.
//! 2. Otherwise the saved Bluetooth printer, if still paired.
//! 3. Otherwise the first paired device whose name looks printer-like
//!    (`POS`, `XP`, `PRINT`, `EPSON`).
//! 4. Otherwise the first paired device.
//!
//! The chosen Bluetooth printer is remembered for next time on paths 3
//! and 4.

pub mod device;
pub mod discovery;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod escpos;
pub mod prefs;
pub mod select;
pub mod server;
pub mod transport;

// Re-exports for convenience
pub use device::{PrinterDescriptor, TransportKind};
pub use dispatch::{Dispatcher, PrintStatus};
pub use document::{PrintRequest, ReceiptDocument};
pub use error::BoletaError;
