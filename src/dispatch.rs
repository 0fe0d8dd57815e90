//! # Receipt Dispatcher
//!
//! Drives one end-to-end print attempt: enumerate candidates, select a
//! printer, open the transport, transmit the formatted document, feed
//! the paper, and report every status transition on the way.
//!
//! ## State machine
//!
//! Every attempt reports `Idle` when it is accepted, before the worker
//! owns the printer slot; `Searching` follows once it does.
//!
//! ```text
//! Idle --start--> Searching
//! Searching --no candidates--> NoPrinterFound            (terminal)
//! Searching --USB needs permission--> PermissionPending  (terminal)
//! Searching --connection opened--> Connected(name)
//! Connected --transmit ok--> Printing
//! Printing --feed written--> Succeeded(name)             (terminal)
//! any state --error--> Failed(reason)                    (terminal)
//! ```
//!
//! Statuses within one attempt are strictly ordered and never regress.
//! All failures are caught at this boundary; nothing propagates out of
//! [`Dispatcher::run`].
//!
//! ## Concurrency
//!
//! One attempt runs sequentially on a single worker thread
//! ([`Dispatcher::spawn`]); the caller's thread only consumes status
//! updates from the channel and never blocks on the printer. A
//! process-wide single-slot mutex keeps a second request from racing the
//! same physical printer mid-print.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::device::{PrinterDescriptor, TransportKind};
use crate::discovery::DeviceEnumerator;
use crate::document::{DEFAULT_HEADER, PrintRequest, ReceiptDocument};
use crate::error::BoletaError;
use crate::escpos::PAPER_FEED;
use crate::prefs::{JsonPreferenceStore, PreferenceStore};
use crate::select::{SelectionResult, select};
use crate::transport::{Connector, PrinterTransport, SystemConnector};

/// Bounded pause between transmitting the document and issuing the
/// paper-feed command, letting the transport drain. A fixed delay, not a
/// wait on an external event.
pub const DRAIN_DELAY: Duration = Duration::from_millis(500);

/// Status of one print attempt, as surfaced to the UI collaborator.
///
/// `Succeeded`, `Failed`, `NoPrinterFound` and `PermissionPending` are
/// terminal; `PermissionPending` means the caller must re-trigger the
/// print after the USB grant comes through.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum PrintStatus {
    Idle,
    Searching,
    Connected(String),
    PermissionPending(String),
    Printing,
    Succeeded(String),
    Failed(String),
    NoPrinterFound,
}

impl PrintStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded(_)
                | Self::Failed(_)
                | Self::NoPrinterFound
                | Self::PermissionPending(_)
        )
    }
}

/// The print-dispatch service.
///
/// All three capabilities are injected so the whole flow runs against
/// mocks in tests.
pub struct Dispatcher {
    enumerator: Box<dyn DeviceEnumerator + Send + Sync>,
    prefs: Box<dyn PreferenceStore + Send + Sync>,
    connector: Box<dyn Connector + Send + Sync>,
    header: String,
    drain_delay: Duration,
    /// Single-slot policy: at most one in-flight connection per process.
    attempt_slot: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        enumerator: Box<dyn DeviceEnumerator + Send + Sync>,
        prefs: Box<dyn PreferenceStore + Send + Sync>,
        connector: Box<dyn Connector + Send + Sync>,
    ) -> Self {
        Self {
            enumerator,
            prefs,
            connector,
            header: DEFAULT_HEADER.to_string(),
            drain_delay: DRAIN_DELAY,
            attempt_slot: Mutex::new(()),
        }
    }

    /// Dispatcher wired to the real system: sysfs/bluetoothctl
    /// enumeration, the JSON preference file, and the Linux device
    /// transports.
    pub fn system(prefs_path: Option<std::path::PathBuf>) -> Self {
        let prefs = match prefs_path {
            Some(path) => JsonPreferenceStore::new(path),
            None => JsonPreferenceStore::default(),
        };
        Self::new(
            Box::new(crate::discovery::SystemEnumerator::new()),
            Box::new(prefs),
            Box::new(SystemConnector::new()),
        )
    }

    /// Set the receipt header text.
    pub fn with_header(mut self, header: &str) -> Self {
        self.header = header.to_string();
        self
    }

    /// Shorten or lengthen the post-transmit drain pause (tests use
    /// zero).
    pub fn with_drain_delay(mut self, delay: Duration) -> Self {
        self.drain_delay = delay;
        self
    }

    /// Current candidates per transport, with unavailable subsystems
    /// reported as empty.
    pub fn candidates(&self) -> (Vec<PrinterDescriptor>, Vec<PrinterDescriptor>) {
        let usb = self.enumerator.list_usb().unwrap_or_else(|e| {
            eprintln!("USB enumeration unavailable: {}", e);
            Vec::new()
        });
        let bluetooth = self.enumerator.list_bluetooth().unwrap_or_else(|e| {
            eprintln!("Bluetooth enumeration unavailable: {}", e);
            Vec::new()
        });
        (usb, bluetooth)
    }

    /// Manually pick the saved printer.
    ///
    /// The identifier must belong to a currently paired Bluetooth
    /// device; the choice persists and wins future selections (after
    /// USB) until the device unpairs or another choice replaces it.
    pub fn select_printer(&self, identifier: &str) -> Result<PrinterDescriptor, BoletaError> {
        let bluetooth = self.enumerator.list_bluetooth()?;
        let printer = bluetooth
            .into_iter()
            .find(|d| d.identifier == identifier)
            .ok_or_else(|| {
                BoletaError::InvalidArgument(format!(
                    "'{}' is not a paired Bluetooth device",
                    identifier
                ))
            })?;
        self.prefs.set(&printer.identifier)?;
        Ok(printer)
    }

    /// Run one print attempt to completion on the calling thread.
    ///
    /// Every status transition is sent on `status_tx` (send failures are
    /// ignored; a departed listener doesn't abort the print). The
    /// terminal status is also returned.
    pub fn run(&self, request: &PrintRequest, status_tx: &Sender<PrintStatus>) -> PrintStatus {
        // Accepted but not yet started; a queued request reports Idle
        // while an earlier attempt holds the slot.
        let _ = status_tx.send(PrintStatus::Idle);

        let _slot = match self.attempt_slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let _ = status_tx.send(PrintStatus::Searching);

        let terminal = match self.attempt(request, status_tx) {
            Ok(status) => status,
            Err(BoletaError::PermissionRequired(name)) => PrintStatus::PermissionPending(name),
            Err(e) => PrintStatus::Failed(e.to_string()),
        };

        let _ = status_tx.send(terminal.clone());
        terminal
    }

    /// Spawn one attempt on a worker thread and hand back the status
    /// channel. A new request simply starts a new worker; in-flight
    /// attempts are not cancelled, they serialize on the attempt slot.
    pub fn spawn(self: &Arc<Self>, request: PrintRequest) -> Receiver<PrintStatus> {
        let (tx, rx) = mpsc::channel();
        let dispatcher = Arc::clone(self);
        thread::spawn(move || {
            dispatcher.run(&request, &tx);
        });
        rx
    }

    fn attempt(
        &self,
        request: &PrintRequest,
        status_tx: &Sender<PrintStatus>,
    ) -> Result<PrintStatus, BoletaError> {
        let (usb, bluetooth) = self.candidates();
        let saved = self.prefs.get();

        let (printer, remember) = match select(&usb, &bluetooth, saved.as_deref()) {
            SelectionResult::Chosen { printer, remember } => (printer, remember),
            SelectionResult::NoPrinterFound => return Ok(PrintStatus::NoPrinterFound),
        };

        // The selection policy owns the preference update, and it happens
        // at selection time whether or not the connection pans out.
        if remember && let Err(e) = self.prefs.set(&printer.identifier) {
            eprintln!("Could not save printer preference: {}", e);
        }

        let mut handle = self.connector.open(&printer)?;
        let label = printer.label();
        let _ = status_tx.send(PrintStatus::Connected(label.clone()));

        let document = ReceiptDocument::with_header(&self.header, request).format();
        let result = self.drive(handle.as_mut(), &document, status_tx);

        // Release on every exit path; Bluetooth gets the explicit
        // disconnect first, USB handles just drop.
        if handle.kind() == TransportKind::Bluetooth
            && let Err(e) = handle.disconnect()
        {
            eprintln!("Disconnect failed: {}", e);
        }
        drop(handle);

        result.map(|_| PrintStatus::Succeeded(label))
    }

    fn drive(
        &self,
        handle: &mut dyn PrinterTransport,
        document: &str,
        status_tx: &Sender<PrintStatus>,
    ) -> Result<(), BoletaError> {
        handle.transmit(document)?;
        let _ = status_tx.send(PrintStatus::Printing);

        if !self.drain_delay.is_zero() {
            thread::sleep(self.drain_delay);
        }
        handle.send_raw(&PAPER_FEED)?;
        Ok(())
    }
}
