//! Lowercase hex helpers for raw protocol chunks.
//!
//! Raw chunks are logged (and historically surfaced to hosts) as hex text.
//! Decoding is lenient to match the protocol's tolerance for malformed
//! input: a trailing odd nibble is silently dropped and pairs that are not
//! valid hex are skipped — neither is an error.

/// Encodes bytes as a lowercase hex string, e.g. `[0x84, 0xC4]` → `"84c4"`.
pub fn encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // Writing to a String cannot fail.
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Decodes a hex string back into bytes.
///
/// Never fails: an incomplete trailing nibble is truncated and non-hex pairs
/// are dropped, so every complete valid byte before and after a bad unit
/// still decodes.
pub fn decode(hex: &str) -> Vec<u8> {
    hex.as_bytes()
        .chunks_exact(2)
        .filter_map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(s, 16).ok()
        })
        .collect()
}
