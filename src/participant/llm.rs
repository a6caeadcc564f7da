use super::{MoveContext, ParticipantBrain};
use crate::llm::{GenerateRequest, LlmError, LlmManager, LlmResult};
use crate::types::{MoveKind, Stance};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are playing a party word game with three other people in a chat. \
Everyone got a secret word. All players but one share the same word; the odd one out got a \
similar but different word, and nobody knows which group they are in for sure. \
Never say your secret word. Write like a relaxed human typing in a chat: short, casual, \
no lists, no explanations of the rules. Reply with a single line.";

/// Participant backed by the configured language model providers
pub struct LlmParticipant {
    manager: Arc<LlmManager>,
    /// "provider:model"; when unset, providers are tried in order
    model: Option<String>,
    max_tokens: u32,
    timeout: Duration,
}

impl LlmParticipant {
    pub fn new(
        manager: Arc<LlmManager>,
        model: Option<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            manager,
            model,
            max_tokens,
            timeout,
        }
    }
}

/// Render the observable game state as a plain text prompt
pub fn build_prompt(ctx: &MoveContext) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Your name is {}. Your secret word is \"{}\".", ctx.seat_name, ctx.word);
    let _ = writeln!(
        prompt,
        "{}",
        match ctx.stance {
            Stance::SeekOutlier => "Try to find the player whose word differs from the rest.",
            Stance::BlendIn => "Your word may be the odd one out. Stay vague enough to blend in.",
        }
    );

    let players: Vec<String> = ctx
        .others
        .iter()
        .map(|s| {
            if s.alive {
                s.display_name.clone()
            } else {
                format!("{} (out)", s.display_name)
            }
        })
        .collect();
    let _ = writeln!(prompt, "Other players: {}.", players.join(", "));
    let _ = writeln!(prompt, "This is round {}.", ctx.cycle);

    if !ctx.descriptions.is_empty() {
        let _ = writeln!(prompt, "\nDescriptions so far:");
        for line in &ctx.descriptions {
            let _ = writeln!(prompt, "- {}: {}", line.display_name, line.text);
        }
    }
    if !ctx.transcript.is_empty() {
        let _ = writeln!(prompt, "\nChat this round:");
        for line in &ctx.transcript {
            let _ = writeln!(prompt, "{}: {}", line.display_name, line.text);
        }
    }

    let _ = writeln!(prompt);
    match ctx.kind {
        MoveKind::Description => {
            let _ = write!(
                prompt,
                "Describe your word in one short hint (under {} characters) without naming it.",
                ctx.max_chars
            );
        }
        MoveKind::Discussion => {
            let _ = write!(
                prompt,
                "Write one short chat message (under {} characters) reacting to the others.",
                ctx.max_chars
            );
        }
        MoveKind::Vote => {
            let names: Vec<&str> = ctx
                .eligible_targets
                .iter()
                .map(|s| s.display_name.as_str())
                .collect();
            let _ = write!(
                prompt,
                "Vote out one player. Answer with exactly one name from: {}.",
                names.join(", ")
            );
        }
    }
    prompt
}

#[async_trait]
impl ParticipantBrain for LlmParticipant {
    async fn request_move(&self, ctx: &MoveContext) -> LlmResult<String> {
        let request = GenerateRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: build_prompt(ctx),
            max_tokens: Some(self.max_tokens),
            timeout: self.timeout,
            model_override: None,
        };

        let response = match &self.model {
            Some(model_id) => self.manager.generate_from_model(model_id, request).await?,
            None => self.manager.generate_first(request).await?,
        };
        Ok(response.text)
    }
}

/// Used when no provider is configured; every move falls back locally
pub struct OfflineParticipant;

#[async_trait]
impl ParticipantBrain for OfflineParticipant {
    async fn request_move(&self, _ctx: &MoveContext) -> LlmResult<String> {
        Err(LlmError::ConfigError("No LLM providers configured".to_string()))
    }
}
