//! Command Resolution Service
//!
//! Turns a free-text command into an ordered list of tutorial steps. The model
//! is asked for a JSON document; anything short of a usable answer (transport
//! failure, bad status, missing content, malformed JSON) degrades to the
//! rule-based generator in [`crate::fallback`], so resolution always succeeds
//! from the caller's point of view.

use crate::{
    fallback::fallback_steps,
    llm_client::{GenerationOptions, LLMClient, LlmError},
    step::{Coordinates, TutorialStep, default_step_id},
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Prompt template key for the step-list request.
pub const STEPS_PROMPT_KEY: &str = "tutorial_steps";
/// Prompt template key for the guidance request.
pub const GUIDANCE_PROMPT_KEY: &str = "step_guidance";

const DEFAULT_STEPS_PROMPT: &str = r#"Analyze this voice command and create a step-by-step tutorial: "{command}"

Please respond with a JSON object containing tutorial steps in this exact format:
{
  "steps": [
    {
      "id": "step-1",
      "command": "{command}",
      "description": "Detailed description of what to do",
      "coordinates": {"x": 400, "y": 300},
      "action": "Click on Gallery app",
      "completed": false
    }
  ]
}

Create 3-5 logical steps that would help someone complete the requested task.
Generate realistic screen coordinates (assume 1920x1080 screen).
Make the descriptions clear and actionable.
Focus on common UI patterns and locations.

Only respond with valid JSON, no additional text."#;

const DEFAULT_GUIDANCE_PROMPT: &str = r#"Generate a clear, friendly voice instruction for the following step:

Action: {action}
Description: {description}

Provide a single sentence that guides the user on what to do next. Make it conversational and encouraging.
For example: "Now, click on the Compose button in the top left corner to start writing your email."

Keep the instruction under 20 words and make it actionable."#;

const MISSING_DESCRIPTION: &str = "No description provided";

/// Why a resolution fell back to the rule-based generator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FallbackReason {
    #[error("no credential configured")]
    NoCredential,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("model endpoint returned HTTP {0}")]
    Status(u16),
    #[error("model returned no content")]
    EmptyContent,
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("model output has no `steps` array")]
    MissingSteps,
    #[error("model output has an empty `steps` array")]
    NoSteps,
}

impl From<LlmError> for FallbackReason {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Network(message) | LlmError::Provider(message) => {
                FallbackReason::Transport(message)
            }
            LlmError::Status { status, .. } => FallbackReason::Status(status),
            LlmError::EmptyContent => FallbackReason::EmptyContent,
            LlmError::Decode(message) => FallbackReason::Transport(message),
            timeout @ LlmError::Timeout(_) => FallbackReason::Transport(timeout.to_string()),
        }
    }
}

/// The result of resolving a command.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// The model's answer was parsed and normalized.
    Parsed(Vec<TutorialStep>),
    /// The model's answer was unusable; `steps` came from the fallback generator.
    Fallback {
        reason: FallbackReason,
        steps: Vec<TutorialStep>,
    },
}

impl ResolveOutcome {
    /// Builds a fallback outcome for `command`.
    pub fn fallback(command: &str, reason: FallbackReason) -> Self {
        ResolveOutcome::Fallback {
            reason,
            steps: fallback_steps(command),
        }
    }

    pub fn steps(&self) -> &[TutorialStep] {
        match self {
            ResolveOutcome::Parsed(steps) | ResolveOutcome::Fallback { steps, .. } => steps,
        }
    }

    pub fn into_steps(self) -> Vec<TutorialStep> {
        match self {
            ResolveOutcome::Parsed(steps) | ResolveOutcome::Fallback { steps, .. } => steps,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ResolveOutcome::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            ResolveOutcome::Fallback { reason, .. } => Some(reason),
            ResolveOutcome::Parsed(_) => None,
        }
    }
}

/// Removes a surrounding Markdown code fence (plain or `json`-tagged).
///
/// Text that does not begin with a fence is only trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coordinates_of(value: Option<&Value>) -> Option<Coordinates> {
    let point = value?.as_object()?;
    let x = point.get("x")?.as_f64()?;
    let y = point.get("y")?.as_f64()?;
    Some(Coordinates::new(x, y).non_negative())
}

/// Repairs one raw step from the model.
///
/// Missing or empty fields receive deterministic defaults and `completed` is
/// always reset to false. A step with every field present passes through
/// unchanged apart from `completed`.
pub fn normalize_step(raw: &Value, index: usize, command: &str) -> TutorialStep {
    TutorialStep {
        id: non_empty_text(raw.get("id")).unwrap_or_else(|| default_step_id(index)),
        command: non_empty_text(raw.get("command")).unwrap_or_else(|| command.to_string()),
        description: non_empty_text(raw.get("description"))
            .unwrap_or_else(|| MISSING_DESCRIPTION.to_string()),
        coordinates: coordinates_of(raw.get("coordinates"))
            .unwrap_or_else(|| Coordinates::default_for_index(index)),
        action: non_empty_text(raw.get("action")).unwrap_or_else(|| format!("Step {}", index + 1)),
        completed: false,
    }
}

/// Replaces repeated ids so every id in the list is unique.
fn dedupe_ids(steps: &mut [TutorialStep]) {
    let mut seen = HashSet::new();
    for index in 0..steps.len() {
        if seen.contains(&steps[index].id) {
            let mut candidate = default_step_id(index);
            let mut suffix = 2;
            while seen.contains(&candidate) || steps.iter().any(|s| s.id == candidate) {
                candidate = format!("{}-{}", default_step_id(index), suffix);
                suffix += 1;
            }
            steps[index].id = candidate;
        }
        seen.insert(steps[index].id.clone());
    }
}

/// Parses the model's raw text into normalized steps.
pub fn parse_steps(raw_text: &str, command: &str) -> Result<Vec<TutorialStep>, FallbackReason> {
    let body = strip_code_fence(raw_text);
    if body.is_empty() {
        return Err(FallbackReason::EmptyContent);
    }

    let document: Value =
        serde_json::from_str(body).map_err(|e| FallbackReason::InvalidJson(e.to_string()))?;
    let raw_steps = document
        .get("steps")
        .and_then(Value::as_array)
        .ok_or(FallbackReason::MissingSteps)?;
    if raw_steps.is_empty() {
        return Err(FallbackReason::NoSteps);
    }

    let mut steps: Vec<TutorialStep> = raw_steps
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_step(raw, index, command))
        .collect();
    dedupe_ids(&mut steps);
    Ok(steps)
}

/// Substitutes `{name}` placeholders in one pass over `template`.
///
/// Substituted values are copied verbatim and never scanned for placeholders.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    'scan: while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        for (name, value) in values {
            if let Some(after) = tail.strip_prefix(name).and_then(|t| t.strip_prefix('}')) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        out.push('{');
        rest = tail;
    }
    out.push_str(rest);
    out
}

/// Defines the contract for any service that can turn a command into steps.
#[async_trait]
pub trait CommandResolver: Send + Sync {
    /// Resolves `command` into a non-empty step list. Never fails.
    async fn resolve(&self, command: &str, credential: &str) -> ResolveOutcome;

    /// Produces one encouraging instruction sentence for a step. Never fails.
    async fn generate_guidance(&self, action: &str, description: &str, credential: &str)
    -> String;
}

/// The deterministic instruction used when the model cannot supply one.
pub fn fallback_guidance(action: &str, description: &str) -> String {
    format!("Please {}: {}", action.to_lowercase(), description)
}

/// A `CommandResolver` backed by a language model, with rule-based fallback.
pub struct LLMCommandResolver {
    client: Arc<dyn LLMClient>,
    prompts: HashMap<String, String>,
}

impl LLMCommandResolver {
    /// Creates a resolver.
    ///
    /// `prompts` may override the built-in templates under the keys
    /// [`STEPS_PROMPT_KEY`] (placeholder `{command}`) and
    /// [`GUIDANCE_PROMPT_KEY`] (placeholders `{action}`, `{description}`).
    pub fn new(client: Arc<dyn LLMClient>, prompts: HashMap<String, String>) -> Self {
        Self { client, prompts }
    }

    fn template(&self, key: &str, default: &'static str) -> &str {
        self.prompts.get(key).map(String::as_str).unwrap_or(default)
    }

    pub fn steps_prompt(&self, command: &str) -> String {
        fill_template(
            self.template(STEPS_PROMPT_KEY, DEFAULT_STEPS_PROMPT),
            &[("command", command)],
        )
    }

    pub fn guidance_prompt(&self, action: &str, description: &str) -> String {
        fill_template(
            self.template(GUIDANCE_PROMPT_KEY, DEFAULT_GUIDANCE_PROMPT),
            &[("action", action), ("description", description)],
        )
    }

    async fn try_resolve(
        &self,
        command: &str,
        credential: &str,
    ) -> Result<Vec<TutorialStep>, FallbackReason> {
        if credential.trim().is_empty() {
            return Err(FallbackReason::NoCredential);
        }
        let prompt = self.steps_prompt(command);
        let text = self
            .client
            .generate_text(&prompt, &GenerationOptions::tutorial_steps(), credential)
            .await?;
        parse_steps(&text, command)
    }
}

#[async_trait]
impl CommandResolver for LLMCommandResolver {
    async fn resolve(&self, command: &str, credential: &str) -> ResolveOutcome {
        match self.try_resolve(command, credential).await {
            Ok(steps) => {
                debug!(count = steps.len(), "Model produced tutorial steps");
                ResolveOutcome::Parsed(steps)
            }
            Err(reason) => {
                warn!(%reason, "Falling back to rule-based tutorial steps");
                ResolveOutcome::fallback(command, reason)
            }
        }
    }

    async fn generate_guidance(
        &self,
        action: &str,
        description: &str,
        credential: &str,
    ) -> String {
        if credential.trim().is_empty() {
            return fallback_guidance(action, description);
        }
        let prompt = self.guidance_prompt(action, description);
        match self
            .client
            .generate_text(&prompt, &GenerationOptions::step_guidance(), credential)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback_guidance(action, description),
            Err(e) => {
                warn!(error = %e, "Guidance generation failed; using default instruction");
                fallback_guidance(action, description)
            }
        }
    }
}

/// A `CommandResolver` that never contacts a model.
///
/// Used when no credential is configured, and useful for deterministic tests.
pub struct FallbackCommandResolver;

#[async_trait]
impl CommandResolver for FallbackCommandResolver {
    async fn resolve(&self, command: &str, _credential: &str) -> ResolveOutcome {
        ResolveOutcome::fallback(command, FallbackReason::NoCredential)
    }

    async fn generate_guidance(
        &self,
        action: &str,
        description: &str,
        _credential: &str,
    ) -> String {
        fallback_guidance(action, description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::MockLLMClient;
    use serde_json::json;

    fn resolver_returning(result: Result<String, LlmError>) -> LLMCommandResolver {
        let mut client = MockLLMClient::new();
        let mut slot = Some(result);
        client
            .expect_generate_text()
            .times(1)
            .returning(move |_, _, _| slot.take().unwrap());
        LLMCommandResolver::new(Arc::new(client), HashMap::new())
    }

    const MODEL_JSON: &str = r#"{"steps": [
        {"id": "a", "command": "open mail", "description": "Open it", "coordinates": {"x": 10, "y": 20}, "action": "Open Mail", "completed": true},
        {"id": "b", "command": "open mail", "description": "Write it", "coordinates": {"x": 30, "y": 40}, "action": "Write", "completed": false},
        {"id": "c", "command": "open mail", "description": "Send it", "coordinates": {"x": 50, "y": 60}, "action": "Send", "completed": false}
    ]}"#;

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```JSON\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("prefix ```json {}```"), "prefix ```json {}```");
    }

    #[test]
    fn test_normalize_complete_step_only_resets_completed() {
        let raw = json!({
            "id": "x-1",
            "command": "cmd",
            "description": "desc",
            "coordinates": {"x": 12.5, "y": 7},
            "action": "Do It",
            "completed": true
        });
        let step = normalize_step(&raw, 3, "other command");
        assert_eq!(
            step,
            TutorialStep::new("x-1", "cmd", "desc", Coordinates::new(12.5, 7.0), "Do It")
        );
    }

    #[test]
    fn test_normalize_fills_missing_fields() {
        let step = normalize_step(&json!({}), 1, "the command");
        assert_eq!(step.id, "step-2");
        assert_eq!(step.command, "the command");
        assert_eq!(step.description, "No description provided");
        assert_eq!(step.action, "Step 2");
        assert_eq!(step.coordinates, Coordinates::new(500.0, 350.0));
        assert!(!step.completed);
    }

    #[test]
    fn test_normalize_treats_empty_and_malformed_as_missing() {
        let raw = json!({
            "id": "",
            "description": "   ",
            "coordinates": {"x": "left", "y": 3},
            "action": null
        });
        let step = normalize_step(&raw, 0, "c");
        assert_eq!(step.id, "step-1");
        assert_eq!(step.description, "No description provided");
        assert_eq!(step.coordinates, Coordinates::new(400.0, 300.0));
        assert_eq!(step.action, "Step 1");
    }

    #[test]
    fn test_normalize_clamps_negative_coordinates() {
        let step = normalize_step(&json!({"coordinates": {"x": -40, "y": 90}}), 0, "c");
        assert_eq!(step.coordinates, Coordinates::new(0.0, 90.0));
    }

    #[test]
    fn test_parse_steps_rejects_bad_documents() {
        assert!(matches!(
            parse_steps("not json", "c"),
            Err(FallbackReason::InvalidJson(_))
        ));
        assert_eq!(parse_steps("{\"foo\": 1}", "c"), Err(FallbackReason::MissingSteps));
        assert_eq!(
            parse_steps("{\"steps\": \"nope\"}", "c"),
            Err(FallbackReason::MissingSteps)
        );
        assert_eq!(parse_steps("{\"steps\": []}", "c"), Err(FallbackReason::NoSteps));
        assert_eq!(parse_steps("```json\n```", "c"), Err(FallbackReason::EmptyContent));
    }

    #[test]
    fn test_parse_steps_makes_ids_unique() {
        let text = r#"{"steps": [{"id": "s"}, {"id": "s"}, {"id": "step-2"}]}"#;
        let steps = parse_steps(text, "c").unwrap();
        let ids: Vec<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids[0], "s");
        assert_ne!(ids[1], "s");
        assert_ne!(ids[1], ids[2]);
        assert_eq!(ids[2], "step-2");
    }

    #[tokio::test]
    async fn test_resolve_parses_fenced_model_output() {
        let fenced = format!("```json\n{}\n```", MODEL_JSON);
        let resolver = resolver_returning(Ok(fenced));
        let outcome = resolver.resolve("open mail", "key").await;

        assert!(!outcome.is_fallback());
        let steps = outcome.into_steps();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].action, "Open Mail");
        assert!(steps.iter().all(|s| !s.completed));
    }

    #[tokio::test]
    async fn test_resolve_failures_equal_fallback() {
        let command = "How to delete a photo in gallery";
        let failures = vec![
            Err(LlmError::Network("connection refused".into())),
            Err(LlmError::Status {
                status: 500,
                message: "internal".into(),
            }),
            Err(LlmError::EmptyContent),
            Err(LlmError::Timeout(std::time::Duration::from_secs(60))),
            Ok("this is not json".to_string()),
            Ok("{\"answer\": 42}".to_string()),
        ];

        for failure in failures {
            let resolver = resolver_returning(failure);
            let outcome = resolver.resolve(command, "key").await;
            assert!(outcome.is_fallback());
            assert_eq!(outcome.into_steps(), fallback_steps(command));
        }
    }

    #[tokio::test]
    async fn test_resolve_reports_status_reason() {
        let resolver = resolver_returning(Err(LlmError::Status {
            status: 503,
            message: "unavailable".into(),
        }));
        let outcome = resolver.resolve("anything", "key").await;
        assert_eq!(outcome.fallback_reason(), Some(&FallbackReason::Status(503)));
    }

    #[tokio::test]
    async fn test_resolve_without_credential_skips_model() {
        let mut client = MockLLMClient::new();
        client.expect_generate_text().times(0);
        let resolver = LLMCommandResolver::new(Arc::new(client), HashMap::new());

        let outcome = resolver.resolve("send an email", "  ").await;
        assert_eq!(outcome.fallback_reason(), Some(&FallbackReason::NoCredential));
        assert_eq!(outcome.steps()[0].action, "Navigate to Gmail");
    }

    #[test]
    fn test_prompt_templates_substitute_placeholders() {
        let resolver = LLMCommandResolver::new(Arc::new(MockLLMClient::new()), HashMap::new());
        let prompt = resolver.steps_prompt("rename a file");
        assert!(prompt.contains("\"rename a file\""));
        assert!(prompt.contains("1920x1080"));
        assert!(!prompt.contains("{command}"));

        let mut prompts = HashMap::new();
        prompts.insert(
            GUIDANCE_PROMPT_KEY.to_string(),
            "A={action} D={description}".to_string(),
        );
        let resolver = LLMCommandResolver::new(Arc::new(MockLLMClient::new()), prompts);
        assert_eq!(resolver.guidance_prompt("Click", "the button"), "A=Click D=the button");
    }

    #[test]
    fn test_guidance_prompt_does_not_rescan_values() {
        let mut prompts = HashMap::new();
        prompts.insert(
            GUIDANCE_PROMPT_KEY.to_string(),
            "A={action} D={description} {unknown}".to_string(),
        );
        let resolver = LLMCommandResolver::new(Arc::new(MockLLMClient::new()), prompts);
        assert_eq!(
            resolver.guidance_prompt("Type {description} here", "the {action} field"),
            "A=Type {description} here D=the {action} field {unknown}"
        );
    }

    #[tokio::test]
    async fn test_guidance_uses_trimmed_model_text() {
        let resolver = resolver_returning(Ok("  Now click Compose to begin.  ".to_string()));
        let text = resolver
            .generate_guidance("Click Compose Button", "Click compose", "key")
            .await;
        assert_eq!(text, "Now click Compose to begin.");
    }

    #[tokio::test]
    async fn test_guidance_falls_back_on_blank_model_text() {
        let resolver = resolver_returning(Ok("   ".to_string()));
        let text = resolver
            .generate_guidance("Send Email", "Click the Send button", "key")
            .await;
        assert_eq!(text, "Please send email: Click the Send button");
    }

    #[tokio::test]
    async fn test_guidance_falls_back_on_failure() {
        let resolver = resolver_returning(Err(LlmError::Network("down".into())));
        let text = resolver
            .generate_guidance("Click Compose Button", "Click the Compose button", "key")
            .await;
        assert_eq!(text, "Please click compose button: Click the Compose button");
    }

    #[tokio::test]
    async fn test_fallback_resolver_is_deterministic() {
        let outcome = FallbackCommandResolver.resolve("send an email", "ignored").await;
        assert_eq!(outcome.into_steps(), fallback_steps("send an email"));
        assert_eq!(
            FallbackCommandResolver
                .generate_guidance("Send Email", "Click send", "")
                .await,
            "Please send email: Click send"
        );
    }
}
