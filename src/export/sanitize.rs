//! Text sanitization for PDF reports.
//!
//! Reports use the standard Helvetica font with WinAnsi encoding, which can
//! only show single-byte text. A character survives when it is in Latin-1
//! (U+0000..=U+00FF) and is either printable or whitespace. Whitespace is
//! consumed by line wrapping and never reaches the page. Other C0 controls are
//! dropped, as are the C1 controls U+0080..=U+009F, which WinAnsi would show as
//! unrelated glyphs such as `€` or `ƒ`. Nothing is substituted, so the
//! operation is lossy and idempotent.

/// Highest code point the report encoding can represent
pub const MAX_REPRESENTABLE: char = '\u{FF}';

/// Whether `c` survives sanitization
#[inline]
pub fn is_representable(c: char) -> bool {
    c <= MAX_REPRESENTABLE && (!c.is_control() || c.is_whitespace())
}

/// Drop every character the report encoding cannot represent
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| is_representable(*c)).collect()
}

/// Sanitize and encode as Latin-1 bytes, one byte per character
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| is_representable(*c))
        .map(|c| c as u32 as u8)
        .collect()
}
