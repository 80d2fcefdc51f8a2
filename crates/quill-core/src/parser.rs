//! Extraction of embedded tool calls from model text.
//!
//! Models are prompted to emit a JSON object with `tool` and `arguments`
//! fields, optionally surrounded by prose. The parser scans for the first
//! balanced brace span that decodes to that shape, lifts it out, and returns
//! the remaining prose. Everything else is plain text.

use serde::Deserialize;

/// A tool call lifted out of a model reply. Transient: it lives only long
/// enough to be executed, never in the conversation history.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub arguments: serde_json::Value,
}

/// Outcome of parsing one model reply.
#[derive(Debug, PartialEq)]
pub enum ParsedReply {
    /// A tool call plus the surrounding prose with the call's JSON removed
    /// (edge whitespace trimmed, interior text preserved verbatim).
    Call { call: ToolCall, text: String },
    /// No tool call found; the whole reply, unchanged.
    Text(String),
}

/// Find the end (exclusive byte index) of the brace-balanced span starting
/// at `start`, which must point at a `{`. Braces inside JSON string literals
/// do not count toward the balance.
fn balanced_end(reply: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in reply[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse one model reply. The first balanced `{…}` span that decodes to a
/// `ToolCall` wins; spans that fail to decode are skipped and the scan
/// continues from the next brace.
pub fn parse_reply(reply: &str) -> ParsedReply {
    let mut search = 0;
    while let Some(offset) = reply[search..].find('{') {
        let start = search + offset;
        if let Some(end) = balanced_end(reply, start) {
            if let Ok(call) = serde_json::from_str::<ToolCall>(&reply[start..end]) {
                let mut text = String::with_capacity(reply.len() - (end - start));
                text.push_str(&reply[..start]);
                text.push_str(&reply[end..]);
                return ParsedReply::Call {
                    call,
                    text: text.trim().to_string(),
                };
            }
        }
        search = start + 1;
    }
    ParsedReply::Text(reply.to_string())
}
