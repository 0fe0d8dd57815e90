//! # Bluetooth RFCOMM Transport
//!
//! Communicates with thermal printers over Bluetooth Serial Port Profile
//! (SPP) via RFCOMM.
//!
//! ## Bluetooth Setup (Linux)
//!
//! Before this transport can open a connection, the printer must be
//! paired and bound to an RFCOMM device:
//!
//! ```bash
//! # 1. Pair with the printer
//! $ bluetoothctl
//! [bluetooth]# scan on
//! # Note the address, e.g., 00:11:62:XX:XX:XX
//! [bluetooth]# pair 00:11:62:XX:XX:XX
//!
//! # 2. Bind to an RFCOMM device (or use `boleta bind <MAC>`)
//! $ sudo rfcomm bind 0 00:11:62:XX:XX:XX
//! # This creates /dev/rfcomm0
//! ```
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is opened in raw mode so ESC/POS bytes pass through
//! unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, etc. off
//! - **No output processing**: OPOST off (no CR/LF translation)
//! - **8-bit characters**: CS8, no parity
//! - **No echo**: ECHO, ECHONL off
//! - **Non-canonical mode**: ICANON off (no line buffering)
//!
//! ## Chunked Writes
//!
//! Large jobs are written in chunks with a small delay between them to
//! avoid overwhelming the Bluetooth buffer.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use crate::device::TransportKind;
use crate::document::PAPER_COLUMNS;
use crate::error::BoletaError;
use crate::escpos;
use crate::transport::PrinterTransport;

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// # Bluetooth Printer Transport
///
/// Manages a connection to a paired printer over Bluetooth RFCOMM.
/// [`disconnect`](PrinterTransport::disconnect) flushes and closes the
/// device; further writes fail with a transport error.
pub struct BluetoothTransport {
    file: Option<File>,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl BluetoothTransport {
    /// Open a Bluetooth connection to the printer.
    ///
    /// ## Errors
    ///
    /// Returns a connection error if:
    /// - The device doesn't exist
    /// - Permission denied (may need root or dialout group)
    /// - TTY configuration fails
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, BoletaError> {
        let path = device.as_ref();

        let file = OpenOptions::new().write(true).open(path).map_err(|e| {
            BoletaError::Connection(format!("Failed to open {}: {}", path.display(), e))
        })?;

        // Configure TTY for raw mode
        configure_tty_raw(file.as_raw_fd())?;

        Ok(Self {
            file: Some(file),
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }

    /// Set the chunk size for large writes.
    ///
    /// Larger chunks are faster but may overflow the Bluetooth buffer.
    /// Default is 4096 bytes.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size;
    }

    /// Set the delay between chunks. Default is 2ms.
    pub fn set_chunk_delay(&mut self, delay: Duration) {
        self.chunk_delay = delay;
    }

    fn file_mut(&mut self) -> Result<&mut File, BoletaError> {
        self.file
            .as_mut()
            .ok_or_else(|| BoletaError::Transport("connection already closed".to_string()))
    }

    /// Write data with chunking and a final flush.
    fn write_all(&mut self, data: &[u8]) -> Result<(), BoletaError> {
        let chunk_size = self.chunk_size;
        let chunk_delay = self.chunk_delay;
        let file = self.file_mut()?;

        if data.len() <= chunk_size {
            file.write_all(data)
                .map_err(|e| BoletaError::Transport(format!("Write failed: {}", e)))?;
        } else {
            for chunk in data.chunks(chunk_size) {
                file.write_all(chunk)
                    .map_err(|e| BoletaError::Transport(format!("Write failed: {}", e)))?;

                if !chunk_delay.is_zero() {
                    thread::sleep(chunk_delay);
                }
            }
        }

        file.flush()
            .map_err(|e| BoletaError::Transport(format!("Flush failed: {}", e)))
    }
}

impl PrinterTransport for BluetoothTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Bluetooth
    }

    fn transmit(&mut self, document: &str) -> Result<(), BoletaError> {
        let bytes = escpos::encode_document(document, PAPER_COLUMNS);
        self.write_all(&bytes)
    }

    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), BoletaError> {
        self.write_all(bytes)
    }

    fn disconnect(&mut self) -> Result<(), BoletaError> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .map_err(|e| BoletaError::Transport(format!("Flush failed: {}", e)))?;
            // Dropping the handle closes the RFCOMM fd.
        }
        Ok(())
    }
}

/// Configure a file descriptor for raw TTY mode.
///
/// This disables all input/output processing so binary data passes
/// through unmodified. Essential for printer communication.
///
/// Note: IXON/IXOFF/IXANY disable XON/XOFF software flow control. This is
/// critical because 0x11 (XON/DC1) and 0x13 (XOFF/DC3) appear in ESC/POS
/// size commands.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> Result<(), BoletaError> {
    use std::mem::MaybeUninit;

    // Get current terminal attributes
    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(BoletaError::Connection(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    // Input flags: disable all processing
    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);

    // Output flags: disable post-processing
    termios.c_oflag &= !libc::OPOST;

    // Local flags: disable echo, canonical mode, signals
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    // Control flags: 8-bit characters, no parity
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    // Apply settings immediately
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(BoletaError::Connection(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_fd: i32) -> Result<(), BoletaError> {
    // On non-Unix platforms, skip TTY configuration
    Ok(())
}

// ============================================================================
// RFCOMM SETUP HELPERS
// ============================================================================

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Find an existing RFCOMM device bound to the given MAC address.
///
/// Checks `/proc/net/rfcomm` and falls back to the `rfcomm -a` command.
/// Returns the device path (e.g., "/dev/rfcomm0") if found.
#[cfg(unix)]
pub fn find_rfcomm_for_mac(mac: &str) -> Result<Option<String>, BoletaError> {
    let mac_upper = mac.to_uppercase();

    // Try /proc/net/rfcomm first (format: "rfcomm0: XX:XX:XX:XX:XX:XX channel N ...")
    if let Ok(contents) = fs::read_to_string("/proc/net/rfcomm") {
        for line in contents.lines() {
            if line.to_uppercase().contains(&mac_upper)
                && let Some(dev_name) = line.split(':').next()
            {
                let device_path = format!("/dev/{}", dev_name.trim());
                if Path::new(&device_path).exists() {
                    return Ok(Some(device_path));
                }
            }
        }
    }

    // Fallback: rfcomm -a command
    let output = run("rfcomm", &["-a"])?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if line.to_uppercase().contains(&mac_upper)
            && let Some(dev_name) = line.split(':').next()
        {
            let device_path = format!("/dev/{}", dev_name.trim());
            if Path::new(&device_path).exists() {
                return Ok(Some(device_path));
            }
        }
    }

    Ok(None)
}

#[cfg(not(unix))]
pub fn find_rfcomm_for_mac(_mac: &str) -> Result<Option<String>, BoletaError> {
    Ok(None)
}

/// Pause after connect and bind for the kernel device node to settle.
#[cfg(unix)]
const RFCOMM_SETTLE: Duration = Duration::from_millis(500);

#[cfg(unix)]
fn run(program: &str, args: &[&str]) -> Result<std::process::Output, BoletaError> {
    Command::new(program)
        .args(args)
        .output()
        .map_err(|e| BoletaError::Connection(format!("Failed to run {}: {}", program, e)))
}

/// Bind an RFCOMM device for a paired printer, backing the CLI `bind`
/// subcommand: connect via `bluetoothctl`, verify with `l2ping`, then
/// `rfcomm bind`. Returns the created device path (`/dev/rfcommN`).
/// The bind step requires root.
#[cfg(unix)]
pub fn setup_rfcomm(mac: &str, channel: u8) -> Result<String, BoletaError> {
    if !is_valid_mac(mac) {
        return Err(BoletaError::InvalidArgument(format!(
            "'{}' is not a MAC address (expected XX:XX:XX:XX:XX:XX)",
            mac
        )));
    }

    let mac = mac.to_uppercase();
    let device_path = format!("/dev/rfcomm{}", channel);

    // Best-effort connect; an already-connected device reports a
    // failure here but still answers the l2ping below.
    eprintln!("Connecting to {}...", mac);
    let output = run("bluetoothctl", &["connect", &mac])?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains("Connection successful") && !stdout.contains("already connected") {
        eprintln!("bluetoothctl returned: {}", stdout.trim());
    }
    thread::sleep(RFCOMM_SETTLE);

    eprintln!("Verifying connectivity...");
    let output = run("l2ping", &["-c", "1", &mac])?;
    if !output.status.success() {
        return Err(BoletaError::Connection(format!(
            "Device {} not reachable: {}",
            mac,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    eprintln!("Binding rfcomm{}...", channel);
    let channel_arg = channel.to_string();
    // Remote channel 1 is the SPP default.
    let output = run("rfcomm", &["bind", &channel_arg, &mac, "1"])?;
    if !output.status.success() {
        return Err(BoletaError::Connection(format!(
            "rfcomm bind failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    thread::sleep(RFCOMM_SETTLE);
    if !Path::new(&device_path).exists() {
        return Err(BoletaError::Connection(format!(
            "Device {} was not created",
            device_path
        )));
    }

    eprintln!("Created {}", device_path);
    Ok(device_path)
}

#[cfg(not(unix))]
pub fn setup_rfcomm(_mac: &str, _channel: u8) -> Result<String, BoletaError> {
    Err(BoletaError::Connection(
        "RFCOMM setup not supported on this platform".to_string(),
    ))
}

// ============================================================================
// TESTS
// ============================================================================
