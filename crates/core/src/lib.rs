pub mod controller;
pub mod fallback;
pub mod llm_client;
pub mod overlay;
pub mod resolver;
pub mod sequencer;
pub mod speech;
pub mod step;

use speech::Utterance;
use std::fmt;

/// Represents commands that the core logic issues to an external runtime.
///
/// The browser owns screen capture, recording and speech; the controller only
/// asks it to act through these.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Speak the given utterance to the user.
    SpeakText(Utterance),
    /// Show a notice to the user.
    Notify(Notice),
    /// Stop any running speech recognition.
    StopVoiceCapture,
    /// Stop any running screen recording.
    StopRecording,
    /// Stop the screen capture stream.
    StopScreenCapture,
    /// The user finished every step of the tutorial for `command`.
    TutorialComplete { command: String },
}

/// User-visible notices. Model-side failures never appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A command arrived without an active screen share.
    ScreenShareRequired,
    /// A command arrived while another one is still being resolved.
    Busy,
    /// Screen capture could not be started.
    CaptureFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ScreenShareRequired => {
                write!(f, "Please start screen sharing first to use voice commands.")
            }
            Notice::Busy => write!(
                f,
                "Still working on your previous command. Please wait a moment."
            ),
            Notice::CaptureFailed(reason) => write!(f, "Could not start screen sharing: {}", reason),
        }
    }
}
