//! Step Sequencing
//!
//! A [`TutorialSession`] owns the ordered steps of one tutorial and the index
//! of the step the user is currently on. Its lifecycle is
//! `Idle -> Active -> Completed -> Idle`, with an explicit reset returning to
//! `Idle` from anywhere.

use crate::step::TutorialStep;
use serde::Serialize;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No steps are loaded.
    #[default]
    Idle,
    /// Steps are loaded and `current_index` points at one of them.
    Active,
    /// The user moved past the last step; teardown is pending.
    Completed,
}

/// The observable effect of a sequencer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepChange {
    /// The current index moved to the contained value.
    Moved(usize),
    /// The last step was passed; the session is now `Completed`.
    Finished,
    /// Nothing happened.
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TutorialSession {
    steps: Vec<TutorialStep>,
    current_index: usize,
    phase: Phase,
}

impl TutorialSession {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session at the first step. An empty list yields an idle session.
    pub fn start(mut steps: Vec<TutorialStep>) -> Self {
        for step in &mut steps {
            step.completed = false;
        }
        let phase = if steps.is_empty() {
            Phase::Idle
        } else {
            Phase::Active
        };
        Self {
            steps,
            current_index: 0,
            phase,
        }
    }

    pub fn steps(&self) -> &[TutorialStep] {
        &self.steps
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn current_step(&self) -> Option<&TutorialStep> {
        self.steps.get(self.current_index)
    }

    fn is_last(&self) -> bool {
        self.current_index + 1 >= self.steps.len()
    }

    /// Marks the current step completed and moves forward.
    ///
    /// On the last step every step is marked completed and the session enters
    /// `Completed`; the caller is expected to schedule [`Self::finish_teardown`].
    pub fn advance(&mut self) -> StepChange {
        if self.phase != Phase::Active {
            return StepChange::Unchanged;
        }
        if self.is_last() {
            for step in &mut self.steps {
                step.completed = true;
            }
            self.phase = Phase::Completed;
            return StepChange::Finished;
        }
        self.steps[self.current_index].completed = true;
        self.current_index += 1;
        StepChange::Moved(self.current_index)
    }

    /// Moves forward without marking the current step completed.
    pub fn skip(&mut self) -> StepChange {
        if self.phase != Phase::Active {
            return StepChange::Unchanged;
        }
        if self.is_last() {
            self.phase = Phase::Completed;
            return StepChange::Finished;
        }
        self.current_index += 1;
        StepChange::Moved(self.current_index)
    }

    /// Moves back one step. Completion flags are left untouched.
    pub fn retreat(&mut self) -> StepChange {
        if self.phase != Phase::Active || self.current_index == 0 {
            return StepChange::Unchanged;
        }
        self.current_index -= 1;
        StepChange::Moved(self.current_index)
    }

    /// Discards all steps and progress.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Completes a pending teardown. Returns false if the session was not `Completed`.
    pub fn finish_teardown(&mut self) -> bool {
        if self.phase != Phase::Completed {
            return false;
        }
        self.reset();
        true
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }

    /// Share of steps marked completed, in percent.
    pub fn progress_percent(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.steps.len() as f64 * 100.0
    }

    /// A "Step i of n" label, or `None` while idle.
    pub fn position_label(&self) -> Option<String> {
        if self.steps.is_empty() {
            return None;
        }
        Some(format!(
            "Step {} of {}",
            self.current_index + 1,
            self.steps.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Coordinates;

    fn steps(n: usize) -> Vec<TutorialStep> {
        (0..n)
            .map(|i| {
                TutorialStep::new(
                    format!("step-{}", i + 1),
                    "cmd",
                    format!("do {}", i),
                    Coordinates::new(10.0 * i as f64, 5.0),
                    format!("Action {}", i),
                )
            })
            .collect()
    }

    #[test]
    fn test_start_enters_active_at_zero() {
        let session = TutorialSession::start(steps(3));
        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.current_step().unwrap().id, "step-1");
    }

    #[test]
    fn test_start_with_no_steps_is_idle() {
        let session = TutorialSession::start(vec![]);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.position_label().is_none());
    }

    #[test]
    fn test_start_resets_completion_flags() {
        let mut input = steps(2);
        input[0].completed = true;
        let session = TutorialSession::start(input);
        assert_eq!(session.completed_count(), 0);
    }

    #[test]
    fn test_advance_through_three_steps() {
        let mut session = TutorialSession::start(steps(3));

        assert_eq!(session.advance(), StepChange::Moved(1));
        assert!(session.steps()[0].completed);
        assert!(!session.steps()[1].completed);

        assert_eq!(session.advance(), StepChange::Moved(2));
        assert!(session.steps()[1].completed);

        assert_eq!(session.advance(), StepChange::Finished);
        assert_eq!(session.phase(), Phase::Completed);
        assert!(session.steps().iter().all(|s| s.completed));
        assert_eq!(session.progress_percent(), 100.0);

        assert!(session.finish_teardown());
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.is_empty());
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_operations_ignored_once_completed() {
        let mut session = TutorialSession::start(steps(1));
        assert_eq!(session.advance(), StepChange::Finished);
        assert_eq!(session.advance(), StepChange::Unchanged);
        assert_eq!(session.skip(), StepChange::Unchanged);
        assert_eq!(session.retreat(), StepChange::Unchanged);
    }

    #[test]
    fn test_retreat_at_zero_is_noop() {
        let mut session = TutorialSession::start(steps(3));
        let before = session.clone();
        assert_eq!(session.retreat(), StepChange::Unchanged);
        assert_eq!(session, before);
    }

    #[test]
    fn test_retreat_keeps_completion() {
        let mut session = TutorialSession::start(steps(3));
        session.advance();
        assert_eq!(session.retreat(), StepChange::Moved(0));
        assert!(session.steps()[0].completed);
    }

    #[test]
    fn test_skip_does_not_mark_completed() {
        let mut session = TutorialSession::start(steps(2));
        assert_eq!(session.skip(), StepChange::Moved(1));
        assert!(!session.steps()[0].completed);
        assert_eq!(session.skip(), StepChange::Finished);
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(session.completed_count(), 0);
    }

    #[test]
    fn test_reset_from_any_position() {
        let mut session = TutorialSession::start(steps(4));
        session.advance();
        session.advance();
        session.reset();
        assert_eq!(session, TutorialSession::new());
    }

    #[test]
    fn test_finish_teardown_requires_completed() {
        let mut session = TutorialSession::start(steps(2));
        assert!(!session.finish_teardown());
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_progress_counts_completed_steps() {
        let mut session = TutorialSession::start(steps(4));
        assert_eq!(session.progress_percent(), 0.0);
        assert_eq!(session.position_label().unwrap(), "Step 1 of 4");
        session.advance();
        assert_eq!(session.progress_percent(), 25.0);
        session.skip();
        assert_eq!(session.progress_percent(), 25.0);
        assert_eq!(session.position_label().unwrap(), "Step 3 of 4");
    }
}
