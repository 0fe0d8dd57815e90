//! # Printer Selection Policy
//!
//! Given the current USB and Bluetooth candidates plus the saved
//! preference, [`select`] produces one chosen printer. The function is
//! pure (no I/O) so the policy is independently testable.
//!
//! ## Policy, in strict order
//!
//! 1. Any USB candidate wins; the first one is chosen. USB presence
//!    implies a deliberate physical connection, so it beats Bluetooth
//!    regardless of the saved preference.
//! 2. No Bluetooth candidates either: `NoPrinterFound`.
//! 3. The saved preference matches a paired device: choose it, leave the
//!    preference untouched.
//! 4. A paired device's name contains one of [`PRINTER_KEYWORDS`]
//!    (case-insensitive): choose it and remember it.
//! 5. Fall back to the first paired device, and remember it.
//!
//! The preference write itself is the caller's job; `Chosen::remember`
//! says whether to perform it. The asymmetry (no rewrite when an existing
//! preference matched) is deliberate: a still-valid preference is not
//! touched.

use crate::device::PrinterDescriptor;

/// Case-insensitive substrings that mark a paired Bluetooth device as
/// printer-like.
pub const PRINTER_KEYWORDS: [&str; 4] = ["POS", "XP", "PRINT", "EPSON"];

/// Outcome of the selection policy.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionResult {
    /// A printer was chosen. When `remember` is true the caller should
    /// overwrite the saved preference with this printer's identifier.
    Chosen {
        printer: PrinterDescriptor,
        remember: bool,
    },
    /// No candidate from either transport.
    NoPrinterFound,
}

/// Apply the selection policy to one enumeration snapshot.
pub fn select(
    usb: &[PrinterDescriptor],
    bluetooth: &[PrinterDescriptor],
    saved: Option<&str>,
) -> SelectionResult {
    if let Some(first) = usb.first() {
        return SelectionResult::Chosen {
            printer: first.clone(),
            remember: false,
        };
    }

    if bluetooth.is_empty() {
        return SelectionResult::NoPrinterFound;
    }

    if let Some(saved) = saved
        && let Some(hit) = bluetooth.iter().find(|d| d.identifier == saved)
    {
        return SelectionResult::Chosen {
            printer: hit.clone(),
            remember: false,
        };
    }

    if let Some(hit) = bluetooth.iter().find(|d| {
        let name = d.display_name.to_uppercase();
        PRINTER_KEYWORDS.iter().any(|kw| name.contains(kw))
    }) {
        return SelectionResult::Chosen {
            printer: hit.clone(),
            remember: true,
        };
    }

    SelectionResult::Chosen {
        printer: bluetooth[0].clone(),
        remember: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb(id: &str, name: &str) -> PrinterDescriptor {
        PrinterDescriptor::usb(id, name)
    }

    fn bt(id: &str, name: &str) -> PrinterDescriptor {
        PrinterDescriptor::bluetooth(id, name)
    }

    fn chosen(result: SelectionResult) -> (PrinterDescriptor, bool) {
        match result {
            SelectionResult::Chosen { printer, remember } => (printer, remember),
            SelectionResult::NoPrinterFound => panic!("expected a chosen printer"),
        }
    }

    #[test]
    fn test_usb_always_wins() {
        let usb_list = vec![usb("lp0", "Epson TM-T20"), usb("lp1", "Other")];
        let bt_list = vec![bt("AA:00:00:00:00:01", "POS-58")];

        // Even a saved preference pointing at a paired device loses to USB.
        let (printer, remember) = chosen(select(
            &usb_list,
            &bt_list,
            Some("AA:00:00:00:00:01"),
        ));
        assert_eq!(printer, usb_list[0]);
        assert!(!remember);
    }

    #[test]
    fn test_no_candidates_anywhere() {
        assert_eq!(select(&[], &[], None), SelectionResult::NoPrinterFound);
        assert_eq!(
            select(&[], &[], Some("AA:00:00:00:00:01")),
            SelectionResult::NoPrinterFound
        );
    }

    #[test]
    fn test_saved_preference_match_without_update() {
        let bt_list = vec![
            bt("AA:00:00:00:00:01", "Headphones"),
            bt("AA:00:00:00:00:02", "Old Printer"),
        ];
        let (printer, remember) = chosen(select(&[], &bt_list, Some("AA:00:00:00:00:02")));
        assert_eq!(printer.identifier, "AA:00:00:00:00:02");
        assert!(!remember, "a still-valid preference is not rewritten");
    }

    #[test]
    fn test_keyword_match_updates_preference() {
        let bt_list = vec![
            bt("AA:00:00:00:00:01", "Car Stereo"),
            bt("AA:00:00:00:00:02", "XP-80 PRINT"),
        ];
        let (printer, remember) = chosen(select(&[], &bt_list, None));
        assert_eq!(printer.identifier, "AA:00:00:00:00:02");
        assert!(remember);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let bt_list = vec![bt("AA:00:00:00:00:01", "epson tm-p20")];
        let (printer, remember) = chosen(select(&[], &bt_list, None));
        assert_eq!(printer.identifier, "AA:00:00:00:00:01");
        assert!(remember);
    }

    #[test]
    fn test_stale_preference_falls_through_to_keywords() {
        let bt_list = vec![bt("AA:00:00:00:00:02", "POS-58")];
        // The saved device is no longer paired.
        let (printer, remember) = chosen(select(&[], &bt_list, Some("AA:00:00:00:00:99")));
        assert_eq!(printer.identifier, "AA:00:00:00:00:02");
        assert!(remember);
    }

    #[test]
    fn test_first_available_fallback_updates_preference() {
        let bt_list = vec![
            bt("AA:00:00:00:00:01", "Speaker"),
            bt("AA:00:00:00:00:02", "Watch"),
        ];
        let (printer, remember) = chosen(select(&[], &bt_list, None));
        assert_eq!(printer.identifier, "AA:00:00:00:00:01");
        assert!(remember);
    }
}
