//! # Dispatch Scenario Tests
//!
//! End-to-end print attempts over mock capabilities: a fixed device
//! registry, an in-memory preference store, and a recording transport.
//! These exercise the full state machine without hardware.

use pretty_assertions::assert_eq;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use boleta::device::{PrinterDescriptor, TransportKind};
use boleta::discovery::DeviceEnumerator;
use boleta::dispatch::{Dispatcher, PrintStatus};
use boleta::document::{PrintRequest, RequestItem};
use boleta::error::BoletaError;
use boleta::prefs::{MemoryPreferenceStore, PreferenceStore};
use boleta::transport::{Connector, PrinterTransport};

// ============================================================================
// MOCK CAPABILITIES
// ============================================================================

/// Enumerator returning a fixed snapshot.
#[derive(Default)]
struct StaticEnumerator {
    usb: Vec<PrinterDescriptor>,
    bluetooth: Vec<PrinterDescriptor>,
    usb_unavailable: bool,
}

impl DeviceEnumerator for StaticEnumerator {
    fn list_usb(&self) -> Result<Vec<PrinterDescriptor>, BoletaError> {
        if self.usb_unavailable {
            return Err(BoletaError::PlatformUnavailable("no sysfs".to_string()));
        }
        Ok(self.usb.clone())
    }

    fn list_bluetooth(&self) -> Result<Vec<PrinterDescriptor>, BoletaError> {
        Ok(self.bluetooth.clone())
    }
}

/// What the transport saw during the attempt.
#[derive(Debug, Default)]
struct Recorder {
    transmitted: Vec<String>,
    raw: Vec<Vec<u8>>,
    disconnects: usize,
}

struct MockTransport {
    kind: TransportKind,
    log: Arc<Mutex<Recorder>>,
    fail_transmit: bool,
}

impl PrinterTransport for MockTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn transmit(&mut self, document: &str) -> Result<(), BoletaError> {
        if self.fail_transmit {
            return Err(BoletaError::Transport("broken pipe".to_string()));
        }
        self.log.lock().unwrap().transmitted.push(document.to_string());
        Ok(())
    }

    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), BoletaError> {
        self.log.lock().unwrap().raw.push(bytes.to_vec());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), BoletaError> {
        self.log.lock().unwrap().disconnects += 1;
        Ok(())
    }
}

enum OpenBehavior {
    Connect,
    PermissionRequired,
    Refuse,
}

struct MockConnector {
    behavior: OpenBehavior,
    fail_transmit: bool,
    log: Arc<Mutex<Recorder>>,
}

impl MockConnector {
    fn new(log: Arc<Mutex<Recorder>>) -> Self {
        Self {
            behavior: OpenBehavior::Connect,
            fail_transmit: false,
            log,
        }
    }
}

impl Connector for MockConnector {
    fn open(
        &self,
        printer: &PrinterDescriptor,
    ) -> Result<Box<dyn PrinterTransport>, BoletaError> {
        match self.behavior {
            OpenBehavior::Connect => Ok(Box::new(MockTransport {
                kind: printer.kind,
                log: Arc::clone(&self.log),
                fail_transmit: self.fail_transmit,
            })),
            OpenBehavior::PermissionRequired => {
                Err(BoletaError::PermissionRequired(printer.label()))
            }
            OpenBehavior::Refuse => {
                Err(BoletaError::Connection("connection refused".to_string()))
            }
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn sample_request() -> PrintRequest {
    PrintRequest {
        invoice_id: "123".to_string(),
        customer_name: "Jane".to_string(),
        total: "45.00".to_string(),
        date: Some("2026-08-26 10:30:00".to_string()),
        items: vec![RequestItem {
            name: Some("Bread".to_string()),
            quantity: Some("2".to_string()),
            amount: Some("10.00".to_string()),
        }],
    }
}

struct Harness {
    dispatcher: Dispatcher,
    prefs: Arc<MemoryPreferenceStore>,
    log: Arc<Mutex<Recorder>>,
}

fn harness(
    enumerator: StaticEnumerator,
    prefs: MemoryPreferenceStore,
    configure: impl FnOnce(&mut MockConnector),
) -> Harness {
    let prefs = Arc::new(prefs);
    let log = Arc::new(Mutex::new(Recorder::default()));
    let mut connector = MockConnector::new(Arc::clone(&log));
    configure(&mut connector);

    let dispatcher = Dispatcher::new(
        Box::new(enumerator),
        Box::new(Arc::clone(&prefs)),
        Box::new(connector),
    )
    .with_drain_delay(Duration::ZERO);

    Harness {
        dispatcher,
        prefs,
        log,
    }
}

fn run(h: &Harness, request: &PrintRequest) -> (PrintStatus, Vec<PrintStatus>) {
    let (tx, rx) = mpsc::channel();
    let terminal = h.dispatcher.run(request, &tx);
    drop(tx);
    (terminal, rx.iter().collect())
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_bluetooth_only_print_succeeds_and_remembers() {
    let h = harness(
        StaticEnumerator {
            bluetooth: vec![PrinterDescriptor::bluetooth("00:11:62:AA:BB:CC", "POS-58")],
            ..Default::default()
        },
        MemoryPreferenceStore::new(),
        |_| {},
    );

    let (terminal, trail) = run(&h, &sample_request());

    assert_eq!(terminal, PrintStatus::Succeeded("BT: POS-58".to_string()));
    assert_eq!(
        trail,
        vec![
            PrintStatus::Idle,
            PrintStatus::Searching,
            PrintStatus::Connected("BT: POS-58".to_string()),
            PrintStatus::Printing,
            PrintStatus::Succeeded("BT: POS-58".to_string()),
        ]
    );

    // Keyword match remembers the printer.
    assert_eq!(h.prefs.get(), Some("00:11:62:AA:BB:CC".to_string()));

    let log = h.log.lock().unwrap();
    assert_eq!(log.transmitted.len(), 1);
    assert!(log.transmitted[0].contains("[L]Bread x2[R]10.00\n"));
    assert!(log.transmitted[0].contains("45.00"));
    // The fixed 3-byte paper feed, then the explicit Bluetooth disconnect.
    assert_eq!(log.raw, vec![vec![27, 100, 4]]);
    assert_eq!(log.disconnects, 1);
}

#[test]
fn test_no_candidates_yields_no_printer_found() {
    let h = harness(
        StaticEnumerator::default(),
        MemoryPreferenceStore::new(),
        |_| {},
    );

    let (terminal, trail) = run(&h, &sample_request());

    assert_eq!(terminal, PrintStatus::NoPrinterFound);
    assert_eq!(
        trail,
        vec![
            PrintStatus::Idle,
            PrintStatus::Searching,
            PrintStatus::NoPrinterFound,
        ]
    );
    assert_eq!(h.prefs.get(), None);
    assert!(h.log.lock().unwrap().transmitted.is_empty());
}

#[test]
fn test_usb_without_permission_halts_before_transmitting() {
    let h = harness(
        StaticEnumerator {
            usb: vec![PrinterDescriptor::usb("lp0", "Epson TM-T20")],
            ..Default::default()
        },
        MemoryPreferenceStore::new(),
        |c| c.behavior = OpenBehavior::PermissionRequired,
    );

    let (terminal, trail) = run(&h, &sample_request());

    assert_eq!(
        terminal,
        PrintStatus::PermissionPending("USB: Epson TM-T20".to_string())
    );
    assert_eq!(
        trail,
        vec![
            PrintStatus::Idle,
            PrintStatus::Searching,
            PrintStatus::PermissionPending("USB: Epson TM-T20".to_string()),
        ]
    );
    // Nothing was transmitted and nothing was remembered.
    assert!(h.log.lock().unwrap().transmitted.is_empty());
    assert_eq!(h.prefs.get(), None);
}

#[test]
fn test_usb_beats_bluetooth_and_skips_disconnect() {
    let h = harness(
        StaticEnumerator {
            usb: vec![PrinterDescriptor::usb("lp0", "Epson TM-T20")],
            bluetooth: vec![PrinterDescriptor::bluetooth("00:11:62:AA:BB:CC", "POS-58")],
            ..Default::default()
        },
        MemoryPreferenceStore::with_saved("00:11:62:AA:BB:CC"),
        |_| {},
    );

    let (terminal, _) = run(&h, &sample_request());

    assert_eq!(terminal, PrintStatus::Succeeded("USB: Epson TM-T20".to_string()));
    // USB selection never touches the preference.
    assert_eq!(h.prefs.get(), Some("00:11:62:AA:BB:CC".to_string()));
    // USB handles drop without an explicit disconnect.
    assert_eq!(h.log.lock().unwrap().disconnects, 0);
}

#[test]
fn test_saved_preference_is_used_without_rewrite() {
    let h = harness(
        StaticEnumerator {
            bluetooth: vec![
                PrinterDescriptor::bluetooth("AA:00:00:00:00:01", "Headphones"),
                PrinterDescriptor::bluetooth("AA:00:00:00:00:02", "Old Printer"),
            ],
            ..Default::default()
        },
        MemoryPreferenceStore::with_saved("AA:00:00:00:00:02"),
        |_| {},
    );

    let (terminal, _) = run(&h, &sample_request());

    assert_eq!(terminal, PrintStatus::Succeeded("BT: Old Printer".to_string()));
    assert_eq!(h.prefs.get(), Some("AA:00:00:00:00:02".to_string()));
}

#[test]
fn test_first_available_fallback_remembers() {
    let h = harness(
        StaticEnumerator {
            bluetooth: vec![
                PrinterDescriptor::bluetooth("AA:00:00:00:00:01", "Speaker"),
                PrinterDescriptor::bluetooth("AA:00:00:00:00:02", "Watch"),
            ],
            ..Default::default()
        },
        MemoryPreferenceStore::new(),
        |_| {},
    );

    let (terminal, _) = run(&h, &sample_request());

    assert_eq!(terminal, PrintStatus::Succeeded("BT: Speaker".to_string()));
    assert_eq!(h.prefs.get(), Some("AA:00:00:00:00:01".to_string()));
}

#[test]
fn test_connection_refused_becomes_failed() {
    let h = harness(
        StaticEnumerator {
            bluetooth: vec![PrinterDescriptor::bluetooth("00:11:62:AA:BB:CC", "POS-58")],
            ..Default::default()
        },
        MemoryPreferenceStore::new(),
        |c| c.behavior = OpenBehavior::Refuse,
    );

    let (terminal, trail) = run(&h, &sample_request());

    match &terminal {
        PrintStatus::Failed(reason) => assert!(reason.contains("connection refused")),
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(trail.len(), 3); // Idle, Searching, Failed
}

#[test]
fn test_transmit_failure_still_releases_bluetooth() {
    let h = harness(
        StaticEnumerator {
            bluetooth: vec![PrinterDescriptor::bluetooth("00:11:62:AA:BB:CC", "POS-58")],
            ..Default::default()
        },
        MemoryPreferenceStore::new(),
        |c| c.fail_transmit = true,
    );

    let (terminal, trail) = run(&h, &sample_request());

    match &terminal {
        PrintStatus::Failed(reason) => assert!(reason.contains("broken pipe")),
        other => panic!("expected Failed, got {:?}", other),
    }
    // Connected was reached, then the failure; the handle was still
    // disconnected on the failure path.
    assert!(trail.contains(&PrintStatus::Connected("BT: POS-58".to_string())));
    assert_eq!(h.log.lock().unwrap().disconnects, 1);
}

#[test]
fn test_platform_unavailable_usb_falls_back_to_bluetooth() {
    let h = harness(
        StaticEnumerator {
            usb_unavailable: true,
            bluetooth: vec![PrinterDescriptor::bluetooth("00:11:62:AA:BB:CC", "XP-80 PRINT")],
            ..Default::default()
        },
        MemoryPreferenceStore::new(),
        |_| {},
    );

    let (terminal, _) = run(&h, &sample_request());

    assert_eq!(terminal, PrintStatus::Succeeded("BT: XP-80 PRINT".to_string()));
    assert_eq!(h.prefs.get(), Some("00:11:62:AA:BB:CC".to_string()));
}

#[test]
fn test_spawned_attempt_streams_ordered_statuses() {
    let prefs = Arc::new(MemoryPreferenceStore::new());
    let log = Arc::new(Mutex::new(Recorder::default()));
    let dispatcher = Arc::new(
        Dispatcher::new(
            Box::new(StaticEnumerator {
                bluetooth: vec![PrinterDescriptor::bluetooth("00:11:62:AA:BB:CC", "POS-58")],
                ..Default::default()
            }),
            Box::new(Arc::clone(&prefs)),
            Box::new(MockConnector::new(Arc::clone(&log))),
        )
        .with_drain_delay(Duration::ZERO),
    );

    let trail: Vec<PrintStatus> = dispatcher.spawn(sample_request()).iter().collect();

    assert_eq!(
        trail,
        vec![
            PrintStatus::Idle,
            PrintStatus::Searching,
            PrintStatus::Connected("BT: POS-58".to_string()),
            PrintStatus::Printing,
            PrintStatus::Succeeded("BT: POS-58".to_string()),
        ]
    );
}

#[test]
fn test_manual_selection_persists_paired_device() {
    let h = harness(
        StaticEnumerator {
            bluetooth: vec![
                PrinterDescriptor::bluetooth("AA:00:00:00:00:01", "Headphones"),
                PrinterDescriptor::bluetooth("AA:00:00:00:00:02", "Old Printer"),
            ],
            ..Default::default()
        },
        MemoryPreferenceStore::new(),
        |_| {},
    );

    let printer = h.dispatcher.select_printer("AA:00:00:00:00:02").unwrap();
    assert_eq!(printer.display_name, "Old Printer");
    assert_eq!(h.prefs.get(), Some("AA:00:00:00:00:02".to_string()));

    // The next attempt honors the manual choice over the keyword scan.
    let (terminal, _) = run(&h, &sample_request());
    assert_eq!(terminal, PrintStatus::Succeeded("BT: Old Printer".to_string()));
}

#[test]
fn test_manual_selection_rejects_unpaired_device() {
    let h = harness(
        StaticEnumerator {
            bluetooth: vec![PrinterDescriptor::bluetooth("00:11:62:AA:BB:CC", "POS-58")],
            ..Default::default()
        },
        MemoryPreferenceStore::new(),
        |_| {},
    );

    match h.dispatcher.select_printer("FF:FF:FF:FF:FF:FF") {
        Err(BoletaError::InvalidArgument(_)) => {}
        other => panic!("expected InvalidArgument, got {:?}", other),
    }
    assert_eq!(h.prefs.get(), None);
}
