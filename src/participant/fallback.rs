//! Local replies used when the model is slow, down or unusable.

use crate::types::MoveKind;
use rand::seq::IndexedRandom;
use rand::Rng;

const DESCRIPTIONS: &[&str] = &[
    "Most people have used one at some point.",
    "You can find it in a lot of homes.",
    "It comes in different sizes.",
    "Kids usually know what it is.",
    "I saw one just last week.",
    "It is more common than you think.",
];

const DISCUSSION: &[&str] = &[
    "Hmm, hard to say so far.",
    "Some of those descriptions were pretty vague.",
    "I'm not sure yet, let's hear more.",
    "One of those answers felt a bit off to me.",
    "Mine fits, I promise.",
];

/// A generic line that reveals nothing about any word
pub fn utterance<R: Rng + ?Sized>(kind: MoveKind, rng: &mut R) -> String {
    let pool = match kind {
        MoveKind::Description => DESCRIPTIONS,
        MoveKind::Discussion | MoveKind::Vote => DISCUSSION,
    };
    pool.choose(rng).copied().unwrap_or("Hmm.").to_string()
}
