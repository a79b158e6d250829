//! Session Controller
//!
//! All application state lives in one [`TutorialState`] owned by a
//! [`SessionController`]. Every change is expressed as the pure function
//! [`reduce`], which also returns the [`Effect`]s the change calls for. The
//! controller's effect layer runs those effects on tokio tasks, and each task
//! reports back by pushing an [`Event`] onto the same queue.
//!
//! Two guards keep late results out of the wrong tutorial:
//! - a resolution is only applied if its `request_id` is still the pending one;
//! - guidance and teardown timers carry the `generation` of the session they
//!   were issued for, and the generation changes whenever a session is created
//!   or destroyed.

use crate::{
    Command, Notice,
    overlay::{OverlayView, Viewport, present},
    resolver::{CommandResolver, ResolveOutcome},
    sequencer::{Phase, StepChange, TutorialSession},
    speech::{TranscriptEvent, Utterance},
    step::TutorialStep,
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info};

/// Everything that can happen to a session.
#[derive(Debug, Clone)]
pub enum Event {
    ScreenShareStarted,
    ScreenShareStopped,
    CaptureFailed(String),
    ListeningChanged(bool),
    RecordingChanged(bool),
    Transcript(TranscriptEvent),
    CommandSubmitted(String),
    StepsResolved {
        request_id: u64,
        outcome: ResolveOutcome,
    },
    GuidanceReady {
        generation: u64,
        index: usize,
        text: String,
    },
    Advance,
    Retreat,
    Skip,
    CloseTutorial,
    ClearTutorial,
    ResetApp,
    TeardownElapsed {
        generation: u64,
    },
    ViewportResized(Viewport),
    /// Stops the controller loop.
    Shutdown,
}

/// Side effects requested by [`reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Resolve {
        request_id: u64,
        command: String,
    },
    Guide {
        generation: u64,
        index: usize,
        action: String,
        description: String,
    },
    ScheduleTeardown {
        generation: u64,
    },
    Emit(Command),
}

#[derive(Debug, Clone, Default)]
pub struct TutorialState {
    pub screen_sharing: bool,
    pub listening: bool,
    pub recording: bool,
    pub processing: bool,
    /// Latest transcript text, interim or final.
    pub transcript: String,
    /// The command the current (or pending) tutorial was requested for.
    pub current_command: String,
    pub session: TutorialSession,
    pub viewport: Viewport,
    pub voice_guidance: bool,
    /// The command the displayed session was built for.
    session_command: String,
    generation: u64,
    next_request_id: u64,
    pending_request: Option<u64>,
}

/// A serializable view of [`TutorialState`] for the browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TutorialSnapshot {
    pub screen_sharing: bool,
    pub listening: bool,
    pub recording: bool,
    pub processing: bool,
    pub transcript: String,
    pub current_command: String,
    pub phase: Phase,
    pub steps: Vec<TutorialStep>,
    pub current_index: usize,
    pub progress_percent: f64,
    pub overlay: Option<OverlayView>,
}

impl TutorialState {
    pub fn new(voice_guidance: bool) -> Self {
        Self {
            voice_guidance,
            ..Default::default()
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_request(&self) -> Option<u64> {
        self.pending_request
    }

    pub fn snapshot(&self) -> TutorialSnapshot {
        TutorialSnapshot {
            screen_sharing: self.screen_sharing,
            listening: self.listening,
            recording: self.recording,
            processing: self.processing,
            transcript: self.transcript.clone(),
            current_command: self.current_command.clone(),
            phase: self.session.phase(),
            steps: self.session.steps().to_vec(),
            current_index: self.session.current_index(),
            progress_percent: self.session.progress_percent(),
            overlay: present(&self.session, self.viewport),
        }
    }

    /// Drops the tutorial and any resolution still in flight.
    fn discard_tutorial(&mut self) {
        self.session.reset();
        self.current_command.clear();
        self.session_command.clear();
        self.pending_request = None;
        self.processing = false;
        self.generation += 1;
    }

    fn submit_command(&mut self, text: &str, effects: &mut Vec<Effect>) {
        let command = text.trim();
        if command.is_empty() {
            return;
        }
        if !self.screen_sharing {
            effects.push(Effect::Emit(Command::Notify(Notice::ScreenShareRequired)));
            return;
        }
        if self.processing {
            debug!(%command, "Rejecting command while another is being resolved");
            effects.push(Effect::Emit(Command::Notify(Notice::Busy)));
            return;
        }

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.pending_request = Some(request_id);
        self.processing = true;
        self.current_command = command.to_string();
        info!(request_id, %command, "Resolving command");
        effects.push(Effect::Resolve {
            request_id,
            command: command.to_string(),
        });
    }

    fn guide_current(&self, effects: &mut Vec<Effect>) {
        if !self.voice_guidance || self.session.phase() != Phase::Active {
            return;
        }
        if let Some(step) = self.session.current_step() {
            effects.push(Effect::Guide {
                generation: self.generation,
                index: self.session.current_index(),
                action: step.action.clone(),
                description: step.description.clone(),
            });
        }
    }

    fn apply_step_change(&self, change: StepChange, effects: &mut Vec<Effect>) {
        match change {
            StepChange::Moved(_) => self.guide_current(effects),
            StepChange::Finished => {
                effects.push(Effect::ScheduleTeardown {
                    generation: self.generation,
                });
                effects.push(Effect::Emit(Command::TutorialComplete {
                    command: self.session_command.clone(),
                }));
            }
            StepChange::Unchanged => {}
        }
    }
}

/// Applies one event to the state.
pub fn reduce(mut state: TutorialState, event: Event) -> (TutorialState, Vec<Effect>) {
    let mut effects = Vec::new();

    match event {
        Event::ScreenShareStarted => {
            state.screen_sharing = true;
            state.discard_tutorial();
        }
        Event::ScreenShareStopped => {
            state.screen_sharing = false;
            state.discard_tutorial();
            if state.listening {
                state.listening = false;
                effects.push(Effect::Emit(Command::StopVoiceCapture));
            }
            if state.recording {
                state.recording = false;
                effects.push(Effect::Emit(Command::StopRecording));
            }
        }
        Event::CaptureFailed(reason) => {
            effects.push(Effect::Emit(Command::Notify(Notice::CaptureFailed(reason))));
        }
        Event::ListeningChanged(listening) => state.listening = listening,
        Event::RecordingChanged(recording) => state.recording = recording,
        Event::Transcript(transcript) => {
            state.transcript = transcript.text.clone();
            if transcript.is_final {
                state.submit_command(&transcript.text, &mut effects);
            }
        }
        Event::CommandSubmitted(text) => state.submit_command(&text, &mut effects),
        Event::StepsResolved {
            request_id,
            outcome,
        } => {
            if state.pending_request != Some(request_id) {
                debug!(request_id, "Discarding stale resolution");
                return (state, effects);
            }
            state.pending_request = None;
            state.processing = false;
            let session = TutorialSession::start(outcome.into_steps());
            if session.phase() == Phase::Active {
                state.session = session;
                state.session_command = state.current_command.clone();
                state.generation += 1;
                state.guide_current(&mut effects);
            }
        }
        Event::GuidanceReady {
            generation,
            index,
            text,
        } => {
            let still_current = generation == state.generation
                && state.session.phase() == Phase::Active
                && state.session.current_index() == index;
            if still_current {
                effects.push(Effect::Emit(Command::SpeakText(Utterance::new(text))));
            }
        }
        Event::Advance => {
            let change = state.session.advance();
            state.apply_step_change(change, &mut effects);
        }
        Event::Skip => {
            let change = state.session.skip();
            state.apply_step_change(change, &mut effects);
        }
        Event::Retreat => {
            let change = state.session.retreat();
            state.apply_step_change(change, &mut effects);
        }
        Event::CloseTutorial | Event::ClearTutorial => state.discard_tutorial(),
        Event::ResetApp => {
            if state.screen_sharing {
                effects.push(Effect::Emit(Command::StopScreenCapture));
            }
            if state.listening {
                effects.push(Effect::Emit(Command::StopVoiceCapture));
            }
            if state.recording {
                effects.push(Effect::Emit(Command::StopRecording));
            }
            state = TutorialState {
                viewport: state.viewport,
                voice_guidance: state.voice_guidance,
                generation: state.generation + 1,
                next_request_id: state.next_request_id,
                ..Default::default()
            };
        }
        Event::TeardownElapsed { generation } => {
            if generation == state.generation && state.session.finish_teardown() {
                state.session_command.clear();
                if state.pending_request.is_none() {
                    state.current_command.clear();
                }
                state.generation += 1;
            }
        }
        Event::ViewportResized(viewport) => state.viewport = viewport.sanitized(),
        Event::Shutdown => {}
    }

    (state, effects)
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("The session controller has shut down")]
    Closed,
}

/// What the controller sends out to its runtime.
#[derive(Debug, Clone)]
pub enum Output {
    Snapshot(TutorialSnapshot),
    Command(Command),
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Credential passed to every resolver call.
    pub credential: String,
    /// How long a completed tutorial stays visible before it is torn down.
    pub completion_delay: Duration,
    /// Whether to request spoken guidance for each current step.
    pub voice_guidance: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            credential: String::new(),
            completion_delay: Duration::from_millis(2000),
            voice_guidance: true,
        }
    }
}

/// The sending side of a controller's event queue.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    events: mpsc::UnboundedSender<Event>,
}

impl ControllerHandle {
    pub fn dispatch(&self, event: Event) -> Result<(), ControllerError> {
        self.events.send(event).map_err(|_| ControllerError::Closed)
    }

    pub fn shutdown(&self) {
        let _ = self.events.send(Event::Shutdown);
    }
}

/// Owns a [`TutorialState`] and runs the effects its reducer asks for.
pub struct SessionController {
    state: TutorialState,
    resolver: Arc<dyn CommandResolver>,
    credential: Arc<str>,
    completion_delay: Duration,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    output_tx: mpsc::Sender<Output>,
    last_snapshot: Option<TutorialSnapshot>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionController {
    /// Creates a controller, the handle used to feed it events, and the
    /// receiver of its outputs.
    pub fn new(
        resolver: Arc<dyn CommandResolver>,
        config: ControllerConfig,
    ) -> (Self, ControllerHandle, mpsc::Receiver<Output>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::channel(64);
        let controller = Self {
            state: TutorialState::new(config.voice_guidance),
            resolver,
            credential: Arc::from(config.credential),
            completion_delay: config.completion_delay,
            events_tx: events_tx.clone(),
            events_rx,
            output_tx,
            last_snapshot: None,
            tasks: Vec::new(),
        };
        let handle = ControllerHandle { events: events_tx };
        (controller, handle, output_rx)
    }

    /// Processes events until shut down or until the output receiver is dropped.
    pub async fn run(mut self) {
        if self.publish_snapshot().await {
            while let Some(event) = self.events_rx.recv().await {
                if matches!(event, Event::Shutdown) {
                    break;
                }
                let state = std::mem::take(&mut self.state);
                let (state, effects) = reduce(state, event);
                self.state = state;

                let mut open = true;
                for effect in effects {
                    open &= self.execute(effect).await;
                }
                open &= self.publish_snapshot().await;
                if !open {
                    debug!("Output receiver dropped; stopping controller");
                    break;
                }
            }
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Session controller stopped.");
    }

    async fn publish_snapshot(&mut self) -> bool {
        let snapshot = self.state.snapshot();
        if self.last_snapshot.as_ref() == Some(&snapshot) {
            return true;
        }
        self.last_snapshot = Some(snapshot.clone());
        self.output_tx.send(Output::Snapshot(snapshot)).await.is_ok()
    }

    async fn execute(&mut self, effect: Effect) -> bool {
        self.tasks.retain(|task| !task.is_finished());
        let events = self.events_tx.clone();

        match effect {
            Effect::Resolve {
                request_id,
                command,
            } => {
                let resolver = self.resolver.clone();
                let credential = self.credential.clone();
                self.tasks.push(tokio::spawn(async move {
                    let outcome = resolver.resolve(&command, &credential).await;
                    let _ = events.send(Event::StepsResolved {
                        request_id,
                        outcome,
                    });
                }));
            }
            Effect::Guide {
                generation,
                index,
                action,
                description,
            } => {
                let resolver = self.resolver.clone();
                let credential = self.credential.clone();
                self.tasks.push(tokio::spawn(async move {
                    let text = resolver
                        .generate_guidance(&action, &description, &credential)
                        .await;
                    let _ = events.send(Event::GuidanceReady {
                        generation,
                        index,
                        text,
                    });
                }));
            }
            Effect::ScheduleTeardown { generation } => {
                let delay = self.completion_delay;
                self.tasks.push(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = events.send(Event::TeardownElapsed { generation });
                }));
            }
            Effect::Emit(command) => {
                return self.output_tx.send(Output::Command(command)).await.is_ok();
            }
        }
        true
    }
}
