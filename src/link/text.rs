//! Script-channel text helpers.
//!
//! Script text travels unframed: each write is one chunk of an escaped
//! string literal. A chunk boundary must never separate a backslash
//! from the character it escapes, or the device would see a torn
//! escape sequence at the end of one `f:write("...")` call.

use crate::error::{Error, Result};

/// Escape marker inside a script string literal.
pub const ESCAPE: u8 = b'\\';

/// Split `text` into chunks of at most `max_line_payload` bytes.
///
/// Boundaries are walked backward off any trailing backslash and onto a
/// UTF-8 character boundary. If a whole window is backslashes, the cut
/// lands after an even count so every escape pair stays intact.
pub fn split_text(text: &str, max_line_payload: usize) -> Result<Vec<&str>> {
    if max_line_payload < 2 {
        return Err(Error::Configuration(
            "line payload must hold at least one escape pair",
        ));
    }

    let bytes = text.as_bytes();
    let mut chunks = Vec::with_capacity(bytes.len().div_ceil(max_line_payload));
    let mut start = 0;

    while start < bytes.len() {
        let mut end = (start + max_line_payload).min(bytes.len());

        if end < bytes.len() {
            while end > start && !text.is_char_boundary(end) {
                end -= 1;
            }
            let window_end = end;
            while end > start && bytes[end - 1] == ESCAPE {
                end -= 1;
            }
            if end == start {
                // window is entirely escape markers (or one oversized char)
                let run = window_end - start;
                if bytes[start] != ESCAPE || run < 2 {
                    return Err(Error::Configuration(
                        "line payload too small to split text",
                    ));
                }
                end = start + run - run % 2;
            }
        }

        chunks.push(&text[start..end]);
        start = end;
    }

    Ok(chunks)
}

/// Escape `content` for embedding in a double- or single-quoted script
/// string literal. Carriage returns are dropped.
pub fn escape_script_string(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + content.len() / 8);
    for c in content.chars() {
        match c {
            '\r' => {}
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out
}
