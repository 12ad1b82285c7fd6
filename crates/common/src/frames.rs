//! Multi-frame text messages (control commands, admin requests and replies)
//! travel as a JSON array of strings.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("malformed frames: {0}")]
pub struct FrameError(#[from] serde_json::Error);

pub fn encode<S: AsRef<str>>(frames: &[S]) -> Vec<u8> {
    let frames: Vec<&str> = frames.iter().map(AsRef::as_ref).collect();
    serde_json::to_vec(&frames).unwrap_or_else(|_| b"[]".to_vec())
}

pub fn decode(payload: &[u8]) -> Result<Vec<String>, FrameError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Builds an owned frame list from string slices.
pub fn frames<S: AsRef<str>>(parts: &[S]) -> Vec<String> {
    parts.iter().map(|p| p.as_ref().to_string()).collect()
}
