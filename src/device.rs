//! # Printer Descriptors
//!
//! A [`PrinterDescriptor`] is a discovered-but-not-yet-connected reference
//! to a printer: an immutable snapshot of one enumeration result. The
//! selector and dispatcher only ever see descriptors; platform handles
//! (device files, sockets) stay behind the transport layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The channel used to reach a printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Usb,
    Bluetooth,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usb => write!(f, "USB"),
            Self::Bluetooth => write!(f, "BT"),
        }
    }
}

/// A discovered printer.
///
/// ## Identity
///
/// Two descriptors refer to the same printer when `(kind, identifier)`
/// match; the display name is cosmetic and may differ between
/// enumerations.
///
/// ## Identifier format
///
/// - Bluetooth: the device MAC address (`XX:XX:XX:XX:XX:XX`)
/// - USB: the usblp node name (`lp0`, `lp1`, ...)
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct PrinterDescriptor {
    pub kind: TransportKind,
    pub identifier: String,
    pub display_name: String,
}

impl PrinterDescriptor {
    pub fn usb(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind: TransportKind::Usb,
            identifier: identifier.into(),
            display_name: display_name.into(),
        }
    }

    pub fn bluetooth(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind: TransportKind::Bluetooth,
            identifier: identifier.into(),
            display_name: display_name.into(),
        }
    }

    /// User-facing label: `"USB: <name>"` or `"BT: <name>"`.
    pub fn label(&self) -> String {
        format!("{}: {}", self.kind, self.display_name)
    }
}

impl PartialEq for PrinterDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.identifier == other.identifier
    }
}
