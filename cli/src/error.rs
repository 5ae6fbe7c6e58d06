//! Error types for the generation/synthesis clients and form validation.

use crate::types::{MAX_DURATION_MINUTES, MIN_DURATION_MINUTES};

/// Failure of a generation or synthesis call. Always terminal for the request.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No API credential configured.
    #[error("no API key configured (set SURKAR_API_KEY or GEMINI_API_KEY)")]
    MissingApiKey,

    /// Transport-level failure.
    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status.
    #[error("endpoint returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The first candidate carried no text.
    #[error("no response text from the model")]
    EmptyResponse,

    /// Response text did not contain a schema-conformant song.
    #[error("malformed song JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// Speech response had no inline audio.
    #[error("no audio data in speech response")]
    MissingAudio,

    /// Inline audio was not valid base64.
    #[error("invalid audio payload: {0}")]
    InvalidAudio(#[from] base64::DecodeError),
}

/// Rejected user input, caught before any request is issued.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("সময়কাল {MIN_DURATION_MINUTES} থেকে {MAX_DURATION_MINUTES} মিনিটের মধ্যে হতে হবে।")]
    DurationOutOfRange { requested: i32 },

    #[error("নিজস্ব গানের কথা লিখুন অথবা নিজস্ব লিরিক্স মোড বন্ধ করুন।")]
    EmptyCustomLyrics,

    #[error("শুধুমাত্র অডিও ফাইল সংযুক্ত করা যাবে ({0})")]
    UnsupportedSample(String),

    #[error("ফাইল পড়া যায়নি: {0}")]
    SampleRead(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_localized() {
        let message = ValidationError::DurationOutOfRange { requested: 12 }.to_string();
        assert!(message.contains("10"));
        assert!(message.contains("মিনিট"));
    }

    #[test]
    fn api_error_mentions_status() {
        let err = ClientError::Api { status: 429, message: "quota".into() };
        assert_eq!(err.to_string(), "endpoint returned 429: quota");
    }
}
