//! # USB Printer Transport
//!
//! Writes ESC/POS data to a usblp character device (`/dev/usb/lpN`).
//!
//! ## Permission Gating
//!
//! Opening the node with insufficient access is the platform's way of
//! saying permission has not been granted yet; that maps to
//! [`BoletaError::PermissionRequired`] so the dispatcher can halt the
//! attempt instead of treating it as a dead printer. Any other open
//! failure is a plain connection error.
//!
//! Unlike Bluetooth there is no session to tear down: disconnect is a
//! no-op and the device becomes claimable by other processes as soon as
//! the handle drops.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::device::TransportKind;
use crate::document::PAPER_COLUMNS;
use crate::error::BoletaError;
use crate::escpos;
use crate::transport::PrinterTransport;

/// An open usblp device handle.
pub struct UsbTransport {
    file: File,
}

impl UsbTransport {
    /// Open a usblp device node.
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, BoletaError> {
        let path = device.as_ref();
        match OpenOptions::new().write(true).open(path) {
            Ok(file) => Ok(Self { file }),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(
                BoletaError::PermissionRequired(path.display().to_string()),
            ),
            Err(e) => Err(BoletaError::Connection(format!(
                "Failed to open {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), BoletaError> {
        self.file
            .write_all(data)
            .map_err(|e| BoletaError::Transport(format!("Write failed: {}", e)))?;
        self.file
            .flush()
            .map_err(|e| BoletaError::Transport(format!("Flush failed: {}", e)))
    }
}

impl PrinterTransport for UsbTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Usb
    }

    fn transmit(&mut self, document: &str) -> Result<(), BoletaError> {
        let bytes = escpos::encode_document(document, PAPER_COLUMNS);
        self.write_all(&bytes)
    }

    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), BoletaError> {
        self.write_all(bytes)
    }

    fn disconnect(&mut self) -> Result<(), BoletaError> {
        // No session teardown for usblp; the OS reclaims the device when
        // the handle drops.
        Ok(())
    }
}
