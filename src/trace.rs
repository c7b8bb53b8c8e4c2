//! Log-safe rendering of request and response bodies.

use crate::Payload;

/// Default number of characters kept by [`format_default`].
pub const DEFAULT_MAX_LENGTH: usize = 50;

/// Renders `payload` for a log line.
///
/// Binary payloads are replaced by `<binary data, N bytes>`. Text longer than
/// `max_len` characters is cut and suffixed with `...`.
pub fn format(payload: &Payload, max_len: usize) -> String {
    let text = match payload {
        Payload::Binary(bytes) => return format!("<binary data, {} bytes>", bytes.len()),
        Payload::Text(text) => text,
    };

    match text.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.clone(),
    }
}

pub fn format_default(payload: &Payload) -> String {
    format(payload, DEFAULT_MAX_LENGTH)
}
