//! # Receipt Documents
//!
//! A [`PrintRequest`] is the inbound trigger value (the collaborator that
//! parses the deep-link URI produces it; this crate never sees raw URIs).
//! [`ReceiptDocument`] is the immutable document built once per print
//! attempt, with malformed input defensively substituted with defaults.
//!
//! [`ReceiptDocument::format`] renders the transport-agnostic markup
//! string the transports encode to printer bytes. Formatting is a pure
//! function: the same document always yields byte-identical output.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Paper width in Font-A columns (58mm paper at 203 DPI).
pub const PAPER_COLUMNS: usize = 32;

/// Timestamp format used on receipts.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default receipt header text.
pub const DEFAULT_HEADER: &str = "Village Bakery POS";

fn default_invoice_id() -> String {
    "000".to_string()
}

fn default_customer() -> String {
    "Guest".to_string()
}

fn default_total() -> String {
    "0.00".to_string()
}

/// One print request, as produced by the inbound collaborator.
///
/// Field aliases accept the short query-parameter spellings
/// (`id`, `cus`, `tot`) so a deep-link parser can forward its values
/// as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintRequest {
    #[serde(default = "default_invoice_id", alias = "id")]
    pub invoice_id: String,

    #[serde(default = "default_customer", alias = "cus")]
    pub customer_name: String,

    /// Decimal-as-string; never parsed, printed verbatim.
    #[serde(default = "default_total", alias = "tot")]
    pub total: String,

    /// Pre-formatted timestamp. Filled with the current local time when
    /// absent.
    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub items: Vec<RequestItem>,
}

/// One raw line item. All fields optional; defaults are substituted when
/// the document is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestItem {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, alias = "qty")]
    pub quantity: Option<String>,

    #[serde(default, alias = "amt")]
    pub amount: Option<String>,
}

/// One resolved line item on a receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub quantity: String,
    pub amount: String,
}

/// The immutable receipt document for one print attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptDocument {
    pub header: String,
    pub invoice_id: String,
    pub customer_name: String,
    pub total: String,
    pub date: String,
    pub line_items: Vec<LineItem>,
}

impl ReceiptDocument {
    /// Build a document with the default header.
    pub fn from_request(request: &PrintRequest) -> Self {
        Self::with_header(DEFAULT_HEADER, request)
    }

    /// Build a document, substituting defaults for missing item fields:
    /// name falls back to "Item", quantity to "1", amount to "0.00".
    pub fn with_header(header: &str, request: &PrintRequest) -> Self {
        let date = request
            .date
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| Local::now().format(DATE_FORMAT).to_string());

        let line_items = request
            .items
            .iter()
            .map(|item| LineItem {
                name: non_empty(&item.name).unwrap_or_else(|| "Item".to_string()),
                quantity: non_empty(&item.quantity).unwrap_or_else(|| "1".to_string()),
                amount: non_empty(&item.amount).unwrap_or_else(|| "0.00".to_string()),
            })
            .collect();

        Self {
            header: header.to_string(),
            invoice_id: request.invoice_id.clone(),
            customer_name: request.customer_name.clone(),
            total: request.total.clone(),
            date,
            line_items,
        }
    }

    /// Render the transport-agnostic markup string.
    ///
    /// Layout: header, dashed rules, date/invoice/customer block, the
    /// ITEM/AMOUNT table with left-aligned names and right-aligned
    /// amounts, the TOTAL row, a thank-you footer, and three trailing
    /// blank lines of feed.
    pub fn format(&self) -> String {
        let rule = "-".repeat(PAPER_COLUMNS);
        let mut out = String::new();

        out.push_str(&format!(
            "[C]<b><font size='big'>{}</font></b>\n",
            self.header
        ));
        out.push_str(&format!("[C]{}\n", rule));
        out.push_str(&format!("[L]Date: {}\n", self.date));
        out.push_str(&format!("[L]Invoice: <b>{}</b>\n", self.invoice_id));
        out.push_str(&format!("[L]Customer: {}\n", self.customer_name));
        out.push_str(&format!("[C]{}\n", rule));
        out.push_str("[L]<b>ITEM</b>[R]<b>AMOUNT</b>\n");
        out.push_str(&format!("[C]{}\n", rule));

        for item in &self.line_items {
            out.push_str(&format!(
                "[L]{} x{}[R]{}\n",
                item.name, item.quantity, item.amount
            ));
        }

        out.push_str(&format!("[C]{}\n", rule));
        out.push_str(&format!(
            "[L]<b>TOTAL:</b>[R]<b><font size='big'>{}</font></b>\n",
            self.total
        ));
        out.push_str(&format!("[C]{}\n", rule));
        out.push_str("[C]Thank you for your business!\n");
        out.push_str("[L]\n[L]\n[L]\n");
        out
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
