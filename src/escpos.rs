//! # ESC/POS Encoding
//!
//! Translates the markup produced by
//! [`ReceiptDocument::format`](crate::document::ReceiptDocument::format)
//! into ESC/POS byte sequences for thermal receipt printers.
//!
//! ## Markup
//!
//! Each line starts with an alignment tag and may contain inline style
//! tags:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `[L]` / `[C]` / `[R]` | left / center / right alignment |
//! | `<b>` ... `</b>` | emphasized text |
//! | `<font size='big'>` ... `</font>` | double width and height |
//!
//! A line of the form `[L]left[R]right` becomes a single left-aligned
//! line with the right segment padded out to the paper's column width,
//! the way receipt item tables are laid out.
//!
//! ## Byte sequences
//!
//! | Command | Bytes | Effect |
//! |---------|-------|--------|
//! | `ESC @` | 1B 40 | initialize printer |
//! | `ESC a n` | 1B 61 n | justification (0 left, 1 center, 2 right) |
//! | `ESC E n` | 1B 45 n | emphasis on/off |
//! | `GS ! n` | 1D 21 n | character size (0x11 doubles both axes) |
//! | `ESC d n` | 1B 64 n | print and feed n lines |

/// ESC (Escape) - command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - extended command prefix
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - print the line buffer and advance
pub const LF: u8 = 0x0A;

/// The fixed 3-byte paper-feed sequence (`ESC d 4`) sent after every
/// receipt to clear the tear-off bar.
pub const PAPER_FEED: [u8; 3] = [ESC, b'd', 4];

/// GS ! argument doubling character width and height.
const SIZE_BIG: u8 = 0x11;

/// Initialize printer (ESC @). Resets formatting to power-on defaults;
/// sent at the start of every job.
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// Select justification (ESC a n).
#[inline]
pub fn align(n: u8) -> Vec<u8> {
    vec![ESC, b'a', n]
}

/// Turn emphasis on or off (ESC E n).
#[inline]
pub fn emphasis(on: bool) -> Vec<u8> {
    vec![ESC, b'E', on as u8]
}

/// Select character size (GS ! n).
#[inline]
pub fn char_size(n: u8) -> Vec<u8> {
    vec![GS, b'!', n]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    fn code(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Center => 1,
            Self::Right => 2,
        }
    }
}

/// Encode a whole markup document into one ESC/POS job, init included.
pub fn encode_document(markup: &str, columns: usize) -> Vec<u8> {
    let mut out = init();
    for line in markup.lines() {
        encode_line(line, columns, &mut out);
        out.push(LF);
    }
    out
}

fn encode_line(line: &str, columns: usize, out: &mut Vec<u8>) {
    let segments = split_segments(line);

    // The common two-column receipt row: flatten to one left-aligned line
    // with the right segment padded to the paper edge.
    if let [(Align::Left, left), (Align::Right, right)] = segments.as_slice() {
        out.extend(align(Align::Left.code()));
        let used = visible_width(left) + visible_width(right);
        emit_inline(left, out);
        let pad = columns.saturating_sub(used).max(1);
        out.extend(std::iter::repeat_n(b' ', pad));
        emit_inline(right, out);
        return;
    }

    for (alignment, text) in segments {
        out.extend(align(alignment.code()));
        emit_inline(text, out);
    }
}

/// Split a markup line into `(alignment, content)` segments. A line
/// without a leading tag is treated as one left-aligned segment.
fn split_segments(line: &str) -> Vec<(Align, &str)> {
    fn tag_at(s: &str) -> Option<Align> {
        match s.get(..3) {
            Some("[L]") => Some(Align::Left),
            Some("[C]") => Some(Align::Center),
            Some("[R]") => Some(Align::Right),
            _ => None,
        }
    }

    if tag_at(line).is_none() {
        return vec![(Align::Left, line)];
    }

    let mut segments = Vec::new();
    let mut rest = line;
    while let Some(alignment) = tag_at(rest) {
        rest = &rest[3..];
        let end = (1..=rest.len())
            .find(|&i| rest.is_char_boundary(i - 1) && tag_at(&rest[i - 1..]).is_some())
            .map(|i| i - 1)
            .unwrap_or(rest.len());
        segments.push((alignment, &rest[..end]));
        rest = &rest[end..];
    }
    segments
}

/// Emit one segment's text, translating inline style tags to commands.
/// Unknown tags print literally.
fn emit_inline(text: &str, out: &mut Vec<u8>) {
    let mut rest = text;
    while let Some(idx) = rest.find('<') {
        out.extend(rest[..idx].bytes());
        let tail = &rest[idx..];
        let Some(end) = tail.find('>') else {
            out.extend(tail.bytes());
            return;
        };
        match &tail[..=end] {
            "<b>" => out.extend(emphasis(true)),
            "</b>" => out.extend(emphasis(false)),
            "<font size='big'>" => out.extend(char_size(SIZE_BIG)),
            "</font>" => out.extend(char_size(0)),
            other => out.extend(other.bytes()),
        }
        rest = &tail[end + 1..];
    }
    out.extend(rest.bytes());
}

/// Printed width of a segment in columns. Style tags are invisible;
/// double-width text counts twice.
fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut scale = 1;
    let mut rest = text;
    while let Some(idx) = rest.find('<') {
        width += rest[..idx].chars().count() * scale;
        let tail = &rest[idx..];
        let Some(end) = tail.find('>') else {
            return width + tail.chars().count() * scale;
        };
        match &tail[..=end] {
            "<font size='big'>" => scale = 2,
            "</font>" => scale = 1,
            "<b>" | "</b>" => {}
            other => width += other.chars().count() * scale,
        }
        rest = &tail[end + 1..];
    }
    width + rest.chars().count() * scale
}
