//! # Boleta CLI
//!
//! Command-line interface for receipt print dispatch.
//!
//! ## Usage
//!
//! ```bash
//! # Print a receipt on the best available printer
//! boleta print --id 123 --customer Jane --total 45.00 \
//!     --item "Bread:2:10.00" --item "Milk:1:3.50"
//!
//! # List printer candidates visible right now
//! boleta devices
//!
//! # Pin a paired Bluetooth printer as the saved choice
//! boleta use 00:11:62:AA:BB:CC
//!
//! # Start the HTTP print service
//! boleta serve --listen 0.0.0.0:8080
//!
//! # Bind an RFCOMM device for a paired Bluetooth printer (root)
//! boleta bind 00:11:62:AA:BB:CC
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use boleta::document::{DEFAULT_HEADER, RequestItem};
use boleta::server::{self, ServerConfig};
use boleta::transport::bluetooth;
use boleta::{BoletaError, Dispatcher, PrintRequest, PrintStatus};

/// Boleta - receipt printer discovery and dispatch
#[derive(Parser, Debug)]
#[command(name = "boleta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a receipt on the best available printer
    Print {
        /// Invoice id
        #[arg(long, default_value = "000")]
        id: String,

        /// Customer name
        #[arg(long, default_value = "Guest")]
        customer: String,

        /// Total amount, printed verbatim
        #[arg(long, default_value = "0.00")]
        total: String,

        /// Line item as NAME:QTY:AMOUNT (repeatable)
        #[arg(long = "item", value_name = "NAME:QTY:AMOUNT")]
        items: Vec<String>,

        /// Receipt header text
        #[arg(long, default_value = DEFAULT_HEADER)]
        header: String,

        /// Preference file path (defaults to ~/.config/boleta/printer.json)
        #[arg(long)]
        prefs: Option<PathBuf>,
    },

    /// List printer candidates visible right now
    Devices,

    /// Set the saved printer to a paired Bluetooth device
    Use {
        /// Printer MAC address (XX:XX:XX:XX:XX:XX)
        mac: String,

        /// Preference file path (defaults to ~/.config/boleta/printer.json)
        #[arg(long)]
        prefs: Option<PathBuf>,
    },

    /// Start the HTTP print service
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        /// Preference file path (defaults to ~/.config/boleta/printer.json)
        #[arg(long)]
        prefs: Option<PathBuf>,
    },

    /// Bind an RFCOMM device for a paired Bluetooth printer (requires root)
    Bind {
        /// Printer MAC address (XX:XX:XX:XX:XX:XX)
        mac: String,

        /// RFCOMM channel number
        #[arg(long, default_value = "0")]
        channel: u8,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), BoletaError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Print {
            id,
            customer,
            total,
            items,
            header,
            prefs,
        } => {
            let items = items
                .iter()
                .map(|spec| parse_item(spec))
                .collect::<Result<Vec<_>, _>>()?;

            let request = PrintRequest {
                invoice_id: id,
                customer_name: customer,
                total,
                date: None,
                items,
            };

            let dispatcher = Arc::new(Dispatcher::system(prefs).with_header(&header));
            for status in dispatcher.spawn(request) {
                println!("{}", describe(&status));
            }
            Ok(())
        }

        Commands::Devices => {
            let dispatcher = Dispatcher::system(None);
            let (usb, bluetooth) = dispatcher.candidates();

            println!("USB printers:");
            if usb.is_empty() {
                println!("  (none)");
            }
            for printer in &usb {
                println!("  {}  {}", printer.identifier, printer.display_name);
            }

            println!("\nPaired Bluetooth devices:");
            if bluetooth.is_empty() {
                println!("  (none)");
            }
            for printer in &bluetooth {
                println!("  {}  {}", printer.identifier, printer.display_name);
            }
            Ok(())
        }

        Commands::Use { mac, prefs } => {
            let dispatcher = Dispatcher::system(prefs);
            let printer = dispatcher.select_printer(&mac)?;
            println!("Saved printer: {}", printer.label());
            Ok(())
        }

        Commands::Serve { listen, prefs } => {
            let dispatcher = Arc::new(Dispatcher::system(prefs));
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(dispatcher, ServerConfig { listen_addr: listen }))
        }

        Commands::Bind { mac, channel } => {
            let device = bluetooth::setup_rfcomm(&mac, channel)?;
            println!("Bound {}", device);
            Ok(())
        }
    }
}

/// Parse a NAME:QTY:AMOUNT item spec. Quantity and amount may be
/// omitted; the document builder fills the defaults.
fn parse_item(spec: &str) -> Result<RequestItem, BoletaError> {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(BoletaError::InvalidArgument(format!(
            "item '{}' has no name (expected NAME:QTY:AMOUNT)",
            spec
        )));
    }

    Ok(RequestItem {
        name: Some(name.to_string()),
        quantity: parts.next().map(|s| s.trim().to_string()),
        amount: parts.next().map(|s| s.trim().to_string()),
    })
}

/// Human-readable console line for one status update.
fn describe(status: &PrintStatus) -> String {
    match status {
        PrintStatus::Idle => "Idle".to_string(),
        PrintStatus::Searching => "Searching...".to_string(),
        PrintStatus::Connected(name) => format!("Connected: {}", name),
        PrintStatus::PermissionPending(name) => {
            format!("Allow permission for {}, then print again", name)
        }
        PrintStatus::Printing => "Printing...".to_string(),
        PrintStatus::Succeeded(name) => format!("Printed: {}", name),
        PrintStatus::Failed(reason) => format!("Error: {}", reason),
        PrintStatus::NoPrinterFound => "No Printer Found".to_string(),
    }
}
