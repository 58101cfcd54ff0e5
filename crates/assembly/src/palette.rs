//! Shared style tokens: named colors and alignments.

use tracing::warn;

/// Default series colors used when a chart declares none.
pub const DEFAULT_SERIES_COLORS: [&str; 6] = [
    "1F4E79", "C00000", "70AD47", "FFC000", "7030A0", "2E75B6",
];

/// Resolve a color token to a hex string.
///
/// Named palette entries win; a literal 6-digit hex passes through.
/// Unknown tokens resolve to `None` with a warning.
pub fn resolve_color(token: &str) -> Option<String> {
    let named = match token {
        "primary" => Some("1F4E79"),
        "accent" => Some("C00000"),
        "positive" => Some("70AD47"),
        "negative" => Some("FF0000"),
        "highlight" => Some("FFC000"),
        "text" => Some("333333"),
        "muted" => Some("7F7F7F"),
        "background" => Some("FFFFFF"),
        _ => None,
    };
    if let Some(hex) = named {
        return Some(hex.to_string());
    }
    if is_hex_color(token) {
        return Some(token.to_uppercase());
    }
    warn!(token, "unknown color token");
    None
}

/// Validate an alignment token.
pub fn resolve_align(token: &str) -> Option<String> {
    match token {
        "left" | "center" | "right" | "justify" => Some(token.to_string()),
        _ => {
            warn!(token, "unknown alignment token");
            None
        }
    }
}

fn is_hex_color(token: &str) -> bool {
    token.len() == 6 && token.chars().all(|c| c.is_ascii_hexdigit())
}
