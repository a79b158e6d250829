use serde::{Deserialize, Serialize};

/// A transcription update from the browser's speech recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub text: String,
    /// Interim results may still change; a final result is a finished command.
    pub is_final: bool,
}

/// Text the browser should speak, with its voice settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Utterance {
    /// An utterance with the default guidance voice.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
        }
    }
}
