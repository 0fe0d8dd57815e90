//! # Printer Transports
//!
//! This module provides the channels for sending data to printers and
//! the connection manager that opens them.
//!
//! ## Available Transports
//!
//! - [`bluetooth`]: Bluetooth RFCOMM for paired thermal printers (Linux)
//! - [`usb`]: usblp character devices for attached USB printers
//!
//! The dispatcher and selector never see platform handles; everything
//! goes through the [`PrinterTransport`] and [`Connector`] traits so
//! tests can substitute mocks.

use std::path::PathBuf;

use crate::device::{PrinterDescriptor, TransportKind};
use crate::error::BoletaError;

pub mod bluetooth;
pub mod usb;

pub use bluetooth::BluetoothTransport;
pub use usb::UsbTransport;

/// An open channel to one printer.
///
/// The handle is owned exclusively by the print attempt that opened it
/// and is released on every exit path; dropping it closes the underlying
/// descriptor.
pub trait PrinterTransport: Send {
    /// Which transport this handle runs over.
    fn kind(&self) -> TransportKind;

    /// Encode a formatted receipt document and write it out.
    fn transmit(&mut self, document: &str) -> Result<(), BoletaError>;

    /// Write raw control bytes (paper feed and friends).
    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), BoletaError>;

    /// Explicit disconnect, idempotent.
    ///
    /// Bluetooth handles must be disconnected after the print completes
    /// or fails, to avoid leaking the paired-socket resource. For USB
    /// this is a no-op; the OS reclaims the device once the handle
    /// drops.
    fn disconnect(&mut self) -> Result<(), BoletaError>;
}

/// Opens a transport connection to a chosen printer.
pub trait Connector: Send {
    fn open(&self, printer: &PrinterDescriptor)
    -> Result<Box<dyn PrinterTransport>, BoletaError>;
}

/// Fire-and-forget hook invoked when USB access has not been granted
/// yet. The platform layer wires the actual grant flow; the dispatch
/// core only signals that a request should be raised.
pub type PermissionHook = Box<dyn Fn(&PrinterDescriptor) + Send + Sync>;

/// Directory where the usblp driver creates printer device nodes.
const USB_DEV_ROOT: &str = "/dev/usb";

/// Connection manager backed by the real Linux devices.
pub struct SystemConnector {
    usb_dev_root: PathBuf,
    permission_hook: Option<PermissionHook>,
}

impl SystemConnector {
    pub fn new() -> Self {
        Self {
            usb_dev_root: PathBuf::from(USB_DEV_ROOT),
            permission_hook: None,
        }
    }

    /// Install the USB permission-request hook.
    pub fn with_permission_hook(mut self, hook: PermissionHook) -> Self {
        self.permission_hook = Some(hook);
        self
    }

    /// Override the USB device directory (tests).
    pub fn with_usb_dev_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.usb_dev_root = root.into();
        self
    }
}

impl Default for SystemConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for SystemConnector {
    fn open(
        &self,
        printer: &PrinterDescriptor,
    ) -> Result<Box<dyn PrinterTransport>, BoletaError> {
        match printer.kind {
            TransportKind::Usb => {
                let path = self.usb_dev_root.join(&printer.identifier);
                match UsbTransport::open(&path) {
                    Ok(transport) => Ok(Box::new(transport)),
                    Err(BoletaError::PermissionRequired(_)) => {
                        // Raise the grant request and bail out right away;
                        // the caller restarts the flow once access exists.
                        if let Some(hook) = &self.permission_hook {
                            hook(printer);
                        }
                        Err(BoletaError::PermissionRequired(printer.label()))
                    }
                    Err(e) => Err(e),
                }
            }
            TransportKind::Bluetooth => {
                let device = bluetooth::find_rfcomm_for_mac(&printer.identifier)?
                    .ok_or_else(|| {
                        BoletaError::Connection(format!(
                            "no RFCOMM device bound for {} (run `boleta bind {}`)",
                            printer.identifier, printer.identifier
                        ))
                    })?;
                Ok(Box::new(BluetoothTransport::open(device)?))
            }
        }
    }
}
