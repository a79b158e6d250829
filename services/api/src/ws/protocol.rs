//! Defines the WebSocket message protocol between the browser client and the API server.

use serde::{Deserialize, Serialize};
use tutor_core::{
    Command,
    controller::{Event, Output, TutorialSnapshot},
    overlay::Viewport,
    speech::{TranscriptEvent, Utterance},
};

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ScreenShareStarted,
    ScreenShareStopped,
    /// The browser could not start screen capture.
    CaptureFailed { message: String },
    ListeningChanged { listening: bool },
    RecordingChanged { recording: bool },
    /// An interim or final speech recognition result.
    Transcript { text: String, is_final: bool },
    /// A typed command.
    Command { text: String },
    NextStep,
    PreviousStep,
    SkipStep,
    CloseTutorial,
    ClearTutorial,
    Reset,
    Viewport { width: f64, height: f64 },
}

impl From<ClientMessage> for Event {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::ScreenShareStarted => Event::ScreenShareStarted,
            ClientMessage::ScreenShareStopped => Event::ScreenShareStopped,
            ClientMessage::CaptureFailed { message } => Event::CaptureFailed(message),
            ClientMessage::ListeningChanged { listening } => Event::ListeningChanged(listening),
            ClientMessage::RecordingChanged { recording } => Event::RecordingChanged(recording),
            ClientMessage::Transcript { text, is_final } => {
                Event::Transcript(TranscriptEvent { text, is_final })
            }
            ClientMessage::Command { text } => Event::CommandSubmitted(text),
            ClientMessage::NextStep => Event::Advance,
            ClientMessage::PreviousStep => Event::Retreat,
            ClientMessage::SkipStep => Event::Skip,
            ClientMessage::CloseTutorial => Event::CloseTutorial,
            ClientMessage::ClearTutorial => Event::ClearTutorial,
            ClientMessage::Reset => Event::ResetApp,
            ClientMessage::Viewport { width, height } => {
                Event::ViewportResized(Viewport { width, height })
            }
        }
    }
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The complete session state after a change.
    State { snapshot: TutorialSnapshot },
    /// Text the browser should speak.
    Speak { utterance: Utterance },
    /// A notice to show the user.
    Notice { message: String },
    StopVoiceCapture,
    StopRecording,
    StopScreenCapture,
    TutorialComplete { command: String },
    /// Reports a protocol error to the client.
    Error { message: String },
}

impl From<Output> for ServerMessage {
    fn from(output: Output) -> Self {
        match output {
            Output::Snapshot(snapshot) => ServerMessage::State { snapshot },
            Output::Command(command) => match command {
                Command::SpeakText(utterance) => ServerMessage::Speak { utterance },
                Command::Notify(notice) => ServerMessage::Notice {
                    message: notice.to_string(),
                },
                Command::StopVoiceCapture => ServerMessage::StopVoiceCapture,
                Command::StopRecording => ServerMessage::StopRecording,
                Command::StopScreenCapture => ServerMessage::StopScreenCapture,
                Command::TutorialComplete { command } => ServerMessage::TutorialComplete { command },
            },
        }
    }
}
