//! The non-human seat: what it is shown, how it is asked for a move and how
//! raw text replies are turned into game moves.

pub mod fallback;
mod llm;

pub use llm::{LlmParticipant, OfflineParticipant};

use crate::llm::LlmResult;
use crate::types::*;
use async_trait::async_trait;
use serde::Serialize;

/// Another seat as the participant sees it (no word, no faction)
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatRef {
    pub id: SeatId,
    pub display_name: String,
    pub alive: bool,
}

impl From<&Seat> for SeatRef {
    fn from(seat: &Seat) -> Self {
        Self {
            id: seat.id.clone(),
            display_name: seat.display_name.clone(),
            alive: seat.alive,
        }
    }
}

/// Everything the participant may observe when asked for a move
#[derive(Debug, Clone, Serialize)]
pub struct MoveContext {
    pub kind: MoveKind,
    pub cycle: u32,
    pub seat_name: String,
    pub word: String,
    pub stance: Stance,
    pub others: Vec<SeatRef>,
    /// Descriptions of every cycle so far, oldest first
    pub descriptions: Vec<ChatLine>,
    /// Discussion of the current cycle
    pub transcript: Vec<ChatLine>,
    /// Seats a vote may name; empty unless voting
    pub eligible_targets: Vec<SeatRef>,
    pub max_chars: usize,
}

/// A participant request handed out by the session
#[derive(Debug, Clone)]
pub struct MoveRequest {
    pub request_id: RequestId,
    pub context: MoveContext,
}

/// Source of raw replies for the non-human seat
#[async_trait]
pub trait ParticipantBrain: Send + Sync {
    async fn request_move(&self, ctx: &MoveContext) -> LlmResult<String>;
}

/// Strip decoration models like to add around a one-line answer
fn clean_line<'a>(text: &'a str, speaker: &str) -> &'a str {
    let mut line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");

    for prefix in [speaker, "Me", "Answer", "Vote", "Description"] {
        if let Some(rest) = line.strip_prefix(prefix) {
            if let Some(rest) = rest.trim_start().strip_prefix(':') {
                line = rest.trim();
            }
        }
    }
    line.trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c.is_whitespace())
}

/// Turn a raw reply into a move, or `None` if it cannot be used as-is
pub fn interpret(ctx: &MoveContext, text: &str) -> Option<ParticipantMove> {
    let line = clean_line(text, &ctx.seat_name);
    if line.is_empty() {
        return None;
    }

    match ctx.kind {
        MoveKind::Description | MoveKind::Discussion => {
            // Saying the secret word outright gives the game away
            if line.to_lowercase().contains(&ctx.word.to_lowercase()) {
                tracing::debug!("Participant reply contains its own word, discarding");
                return None;
            }
            Some(ParticipantMove::Utterance(
                line.chars().take(ctx.max_chars).collect(),
            ))
        }
        MoveKind::Vote => {
            let wanted = line.trim_end_matches('.').to_lowercase();
            ctx.eligible_targets
                .iter()
                .find(|t| t.display_name.to_lowercase() == wanted)
                .or_else(|| {
                    // Accept a reply that mentions exactly one eligible name
                    let mentioned: Vec<&SeatRef> = ctx
                        .eligible_targets
                        .iter()
                        .filter(|t| wanted.contains(&t.display_name.to_lowercase()))
                        .collect();
                    match mentioned.as_slice() {
                        [only] => Some(*only),
                        _ => None,
                    }
                })
                .map(|t| ParticipantMove::Vote(t.id.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(id: &str, name: &str) -> SeatRef {
        SeatRef {
            id: id.to_string(),
            display_name: name.to_string(),
            alive: true,
        }
    }

    fn ctx(kind: MoveKind) -> MoveContext {
        MoveContext {
            kind,
            cycle: 1,
            seat_name: "Robin".to_string(),
            word: "apple".to_string(),
            stance: Stance::SeekOutlier,
            others: vec![seat("a", "Alice"), seat("b", "Bob"), seat("c", "Carol")],
            descriptions: vec![],
            transcript: vec![],
            eligible_targets: match kind {
                MoveKind::Vote => vec![seat("a", "Alice"), seat("b", "Bob")],
                _ => vec![],
            },
            max_chars: 20,
        }
    }

    #[test]
    fn test_description_is_cleaned() {
        let mv = interpret(&ctx(MoveKind::Description), "\n  Robin: \"Grows on trees\"\nmore");
        assert_eq!(mv, Some(ParticipantMove::Utterance("Grows on trees".into())));
    }

    #[test]
    fn test_description_is_truncated() {
        let mv = interpret(
            &ctx(MoveKind::Description),
            "Something you can find in most kitchens",
        );
        assert_eq!(
            mv,
            Some(ParticipantMove::Utterance("Something you can fi".into()))
        );
    }

    #[test]
    fn test_reply_with_own_word_is_rejected() {
        assert_eq!(interpret(&ctx(MoveKind::Discussion), "I love Apple pie"), None);
        assert_eq!(interpret(&ctx(MoveKind::Discussion), "   \n  "), None);
    }

    #[test]
    fn test_vote_matches_eligible_names() {
        let c = ctx(MoveKind::Vote);
        assert_eq!(interpret(&c, "bob"), Some(ParticipantMove::Vote("b".into())));
        assert_eq!(interpret(&c, "Vote: Alice."), Some(ParticipantMove::Vote("a".into())));
        assert_eq!(
            interpret(&c, "I think it is Alice"),
            Some(ParticipantMove::Vote("a".into()))
        );
    }

    #[test]
    fn test_vote_rejects_unknown_or_ambiguous() {
        let c = ctx(MoveKind::Vote);
        // Carol is not eligible
        assert_eq!(interpret(&c, "Carol"), None);
        assert_eq!(interpret(&c, "Alice or Bob"), None);
    }
}
