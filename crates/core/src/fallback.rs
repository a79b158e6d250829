//! Rule-Based Step Generation
//!
//! When the model cannot be reached or answers with something unusable, a
//! tutorial is still produced from a small set of hand-authored step lists.
//! The list is chosen by keyword matching on the lowercased command, so the
//! output is a pure function of the command text.

use crate::step::{Coordinates, TutorialStep, default_step_id};

/// The intent recognised in a command, in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    EmailCompose,
    PhotoDeletion,
    DocumentCreation,
    Generic,
}

/// A fixed step: `(action, description, x, y)`.
type Template = (&'static str, &'static str, f64, f64);

const EMAIL_COMPOSE: &[Template] = &[
    (
        "Navigate to Gmail",
        "Open Gmail by going to gmail.com in your browser",
        400.0,
        60.0,
    ),
    (
        "Click Compose Button",
        "Click on the \"Compose\" button on the left side",
        120.0,
        200.0,
    ),
    (
        "Enter Recipient Email",
        "Enter the recipient email address in the \"To\" field",
        600.0,
        250.0,
    ),
    (
        "Enter Subject",
        "Click on the subject field and enter your email subject",
        600.0,
        300.0,
    ),
    (
        "Write Email Content",
        "Click in the message body area and type your email content",
        600.0,
        400.0,
    ),
    (
        "Send Email",
        "Click the \"Send\" button to send your email",
        150.0,
        550.0,
    ),
];

const PHOTO_DELETION: &[Template] = &[
    (
        "Open Gallery App",
        "Open your photo gallery or photos app",
        200.0,
        400.0,
    ),
    (
        "Select Photo",
        "Find and select the photo you want to delete by clicking on it",
        400.0,
        300.0,
    ),
    (
        "Click Delete Button",
        "Look for the delete button (usually a trash icon) and click it",
        600.0,
        100.0,
    ),
    (
        "Confirm Delete",
        "Confirm the deletion when prompted by clicking \"Delete\" or \"OK\"",
        500.0,
        400.0,
    ),
];

const DOCUMENT_CREATION: &[Template] = &[
    (
        "Navigate to Google Docs",
        "Open Google Docs by going to docs.google.com",
        400.0,
        60.0,
    ),
    (
        "Create New Document",
        "Click on the \"+\" button or \"Blank document\" to create a new document",
        200.0,
        200.0,
    ),
    (
        "Start Writing",
        "Click in the document area and start typing your content",
        500.0,
        300.0,
    ),
    (
        "Rename Document",
        "Your document is automatically saved. You can rename it by clicking \"Untitled document\"",
        300.0,
        100.0,
    ),
];

const GENERIC: &[Template] = &[
    (
        "Locate Target Area",
        "Identify the relevant application or area on your screen for this task",
        300.0,
        250.0,
    ),
    (
        "Navigate to Section",
        "Navigate to the appropriate menu or section needed for your task",
        450.0,
        200.0,
    ),
    (
        "Execute Action",
        "Perform the main action required for your task",
        500.0,
        350.0,
    ),
    (
        "Verify Completion",
        "Verify that the action was completed successfully",
        400.0,
        450.0,
    ),
];

impl Intent {
    /// Classifies a command. The first matching rule wins.
    pub fn classify(command: &str) -> Self {
        let lower = command.to_lowercase();
        let has = |needle: &str| lower.contains(needle);

        if has("email") || has("gmail") || has("compose") || has("send email") {
            Intent::EmailCompose
        } else if has("delete") && has("photo") {
            Intent::PhotoDeletion
        } else if has("document") || has("google docs") {
            Intent::DocumentCreation
        } else {
            Intent::Generic
        }
    }

    fn templates(self) -> &'static [Template] {
        match self {
            Intent::EmailCompose => EMAIL_COMPOSE,
            Intent::PhotoDeletion => PHOTO_DELETION,
            Intent::DocumentCreation => DOCUMENT_CREATION,
            Intent::Generic => GENERIC,
        }
    }
}

/// Produces the canned step list for a command. Never empty, never fails.
pub fn fallback_steps(command: &str) -> Vec<TutorialStep> {
    Intent::classify(command)
        .templates()
        .iter()
        .enumerate()
        .map(|(index, (action, description, x, y))| {
            TutorialStep::new(
                default_step_id(index),
                command,
                *description,
                Coordinates::new(*x, *y),
                *action,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(steps: &[TutorialStep]) -> Vec<&str> {
        steps.iter().map(|s| s.action.as_str()).collect()
    }

    #[test]
    fn test_photo_deletion_sequence() {
        let steps = fallback_steps("How to delete a photo in gallery");
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].action, "Open Gallery App");
        assert_eq!(steps[3].action, "Confirm Delete");
    }

    #[test]
    fn test_email_sequence_opens_mail_first() {
        let steps = fallback_steps("send an email");
        assert_eq!(Intent::classify("send an email"), Intent::EmailCompose);
        assert_eq!(steps[0].action, "Navigate to Gmail");
        assert_eq!(steps.len(), 6);
        assert_eq!(steps.last().unwrap().action, "Send Email");
    }

    #[test]
    fn test_email_rule_takes_priority() {
        assert_eq!(
            Intent::classify("delete the photo attached to my email"),
            Intent::EmailCompose
        );
        assert_eq!(Intent::classify("COMPOSE a message"), Intent::EmailCompose);
    }

    #[test]
    fn test_photo_rule_needs_both_keywords() {
        assert_eq!(Intent::classify("delete this folder"), Intent::Generic);
        assert_eq!(Intent::classify("share a photo"), Intent::Generic);
    }

    #[test]
    fn test_document_sequence() {
        assert_eq!(
            Intent::classify("How to save this document"),
            Intent::DocumentCreation
        );
        assert_eq!(
            Intent::classify("open Google Docs"),
            Intent::DocumentCreation
        );
        let steps = fallback_steps("new document please");
        assert_eq!(
            actions(&steps),
            vec![
                "Navigate to Google Docs",
                "Create New Document",
                "Start Writing",
                "Rename Document"
            ]
        );
    }

    #[test]
    fn test_generic_sequence() {
        let steps = fallback_steps("Help me change settings");
        assert_eq!(
            actions(&steps),
            vec![
                "Locate Target Area",
                "Navigate to Section",
                "Execute Action",
                "Verify Completion"
            ]
        );
    }

    #[test]
    fn test_steps_carry_command_and_start_incomplete() {
        let command = "How to create a new folder";
        let steps = fallback_steps(command);
        for (index, step) in steps.iter().enumerate() {
            assert_eq!(step.command, command);
            assert!(!step.completed);
            assert_eq!(step.id, format!("step-{}", index + 1));
        }
    }

    #[test]
    fn test_fallback_is_deterministic() {
        assert_eq!(fallback_steps("anything"), fallback_steps("anything"));
        assert!(!fallback_steps("").is_empty());
    }
}
