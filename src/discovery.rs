//! # Device Enumeration
//!
//! Lists currently reachable printer-capable devices. Both calls are
//! side-effect-free reads of the platform's device registry:
//!
//! - **USB**: attached devices claimed by the `usblp` printer-class
//!   driver, visible under `/sys/class/usbmisc` as `lp*` nodes.
//! - **Bluetooth**: currently paired (bonded) devices, read from
//!   `bluetoothctl` — not a live scan.
//!
//! When a subsystem cannot be queried at all the enumerator fails with
//! [`BoletaError::PlatformUnavailable`]; the dispatcher treats that as
//! "no candidates from this transport".

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::device::PrinterDescriptor;
use crate::error::BoletaError;
use crate::transport::bluetooth::is_valid_mac;

/// Sysfs directory where the usblp driver registers printer nodes.
const USBLP_SYSFS: &str = "/sys/class/usbmisc";

/// Lists printer candidates per transport.
pub trait DeviceEnumerator {
    /// Currently attached USB devices exposing a printer interface.
    fn list_usb(&self) -> Result<Vec<PrinterDescriptor>, BoletaError>;

    /// Currently paired Bluetooth devices (bonded, not a live scan).
    fn list_bluetooth(&self) -> Result<Vec<PrinterDescriptor>, BoletaError>;
}

/// Enumerator backed by the Linux device registry.
#[derive(Debug, Clone)]
pub struct SystemEnumerator {
    usblp_root: PathBuf,
}

impl SystemEnumerator {
    pub fn new() -> Self {
        Self {
            usblp_root: PathBuf::from(USBLP_SYSFS),
        }
    }

    /// Override the sysfs root (tests).
    pub fn with_usblp_root(root: impl Into<PathBuf>) -> Self {
        Self {
            usblp_root: root.into(),
        }
    }
}

impl Default for SystemEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator for SystemEnumerator {
    fn list_usb(&self) -> Result<Vec<PrinterDescriptor>, BoletaError> {
        let entries = fs::read_dir(&self.usblp_root).map_err(|e| {
            BoletaError::PlatformUnavailable(format!(
                "cannot read {}: {}",
                self.usblp_root.display(),
                e
            ))
        })?;

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let node = entry.file_name();
            let Some(node) = node.to_str() else { continue };
            if !node.starts_with("lp") {
                continue;
            }
            let display_name = usb_display_name(&entry.path());
            found.push(PrinterDescriptor::usb(node, display_name));
        }

        // Directory order is arbitrary; keep enumeration order stable.
        found.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(found)
    }

    fn list_bluetooth(&self) -> Result<Vec<PrinterDescriptor>, BoletaError> {
        // bluez >= 5.65 spelling first, then the legacy one.
        let output = Command::new("bluetoothctl")
            .args(["devices", "Paired"])
            .output();

        let output = match output {
            Ok(out) if out.status.success() => out,
            _ => Command::new("bluetoothctl")
                .arg("paired-devices")
                .output()
                .map_err(|e| {
                    BoletaError::PlatformUnavailable(format!("cannot run bluetoothctl: {}", e))
                })?,
        };

        if !output.status.success() {
            return Err(BoletaError::PlatformUnavailable(format!(
                "bluetoothctl failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_paired_devices(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Human-readable name for a usblp sysfs node.
///
/// `/sys/class/usbmisc/lp0/device` points at the USB interface; the
/// `manufacturer` and `product` attributes live on its parent device.
fn usb_display_name(node: &Path) -> String {
    let device = node.join("device").join("..");
    let manufacturer = read_attr(&device.join("manufacturer")).unwrap_or_default();
    let product = read_attr(&device.join("product")).unwrap_or_else(|| "USB Device".to_string());
    format!("{} {}", manufacturer, product).trim().to_string()
}

fn read_attr(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parse `bluetoothctl` paired-device output.
///
/// Lines look like `Device AA:BB:CC:DD:EE:FF Some Device Name`; anything
/// else (controller banners, agent chatter) is skipped.
fn parse_paired_devices(text: &str) -> Vec<PrinterDescriptor> {
    text.lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Device ")?;
            let (mac, name) = rest.split_once(' ').unwrap_or((rest, ""));
            if !is_valid_mac(mac) {
                return None;
            }
            let name = if name.trim().is_empty() { mac } else { name.trim() };
            Some(PrinterDescriptor::bluetooth(mac, name))
        })
        .collect()
}
