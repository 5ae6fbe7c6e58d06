//! Recovery of the song JSON from model output.
//!
//! Models occasionally wrap the object in commentary or a fenced block even
//! when asked for bare JSON. This is a best-effort heuristic: it takes the
//! span from the first `{` to the last `}`, and only falls back to stripping
//! fence markers when no such span exists.

use crate::error::ClientError;
use crate::types::GeneratedSong;

pub fn extract_json_object(text: &str) -> &str {
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return &text[start..=end];
        }
    }
    strip_code_fences(text)
}

fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

pub fn parse_song(text: &str) -> Result<GeneratedSong, ClientError> {
    if text.trim().is_empty() {
        return Err(ClientError::EmptyResponse);
    }
    let json = extract_json_object(text);
    Ok(serde_json::from_str(json)?)
}
