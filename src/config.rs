use crate::llm::LlmConfig;
use crate::types::WordPair;
use crate::words;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

/// Rules and timings shared by every room
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Time budget for the discussion phase of each cycle
    pub discussion_duration: Duration,
    /// Auto-advance out of Results after this long (None = manual advance only)
    pub results_duration: Option<Duration>,
    /// Upper bound on one request to the non-human participant
    pub participant_timeout: Duration,
    /// Room actors shut down after this long without activity
    pub room_idle_timeout: Duration,
    pub max_description_chars: usize,
    pub max_message_chars: usize,
    /// Minority wins once the alive majority seats drop to this many or fewer
    pub minority_win_threshold: usize,
    pub word_pairs: Vec<WordPair>,
    pub participant_names: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            discussion_duration: Duration::from_secs(120),
            results_duration: Some(Duration::from_secs(10)),
            participant_timeout: Duration::from_secs(20),
            room_idle_timeout: Duration::from_secs(60 * 60),
            max_description_chars: 200,
            max_message_chars: 300,
            minority_win_threshold: 1,
            word_pairs: words::default_pairs(),
            participant_names: words::PARTICIPANT_NAMES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

/// Read and parse an environment variable, ignoring blanks and bad values
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, trimmed);
            None
        }
    }
}

/// Like `env_parse`, but pulls out-of-range values back into `range`
fn env_clamped(key: &str, default: usize, range: RangeInclusive<usize>) -> usize {
    let Some(value) = env_parse::<usize>(key) else {
        return default;
    };
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        tracing::warn!("{}={} is out of range {:?}, using {}", key, value, range, clamped);
    }
    clamped
}

impl GameConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let results_duration = match env_parse::<u64>("RESULTS_SECONDS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.results_duration,
        };

        let word_pairs = std::env::var("WORD_PAIRS")
            .ok()
            .map(|raw| words::parse_pairs(&raw))
            .filter(|pairs| !pairs.is_empty())
            .unwrap_or(defaults.word_pairs);

        Self {
            discussion_duration: env_parse("DISCUSSION_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.discussion_duration),
            results_duration,
            participant_timeout: env_parse("PARTICIPANT_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.participant_timeout),
            room_idle_timeout: env_parse::<u64>("ROOM_IDLE_MINUTES")
                .map(|mins| Duration::from_secs(mins * 60))
                .unwrap_or(defaults.room_idle_timeout),
            max_description_chars: env_clamped(
                "MAX_DESCRIPTION_CHARS",
                defaults.max_description_chars,
                1..=usize::MAX,
            ),
            max_message_chars: env_clamped(
                "MAX_MESSAGE_CHARS",
                defaults.max_message_chars,
                1..=usize::MAX,
            ),
            // 0 would let two seats tie forever, 3 would end every game at once
            minority_win_threshold: env_clamped(
                "MINORITY_WIN_THRESHOLD",
                defaults.minority_win_threshold,
                1..=2,
            ),
            word_pairs,
            participant_names: defaults.participant_names,
        }
    }
}

/// Process-level configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub game: GameConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            // 6573 is ascii for "AI"
            port: env_parse("PORT").unwrap_or(6573),
            game: GameConfig::from_env(),
            llm: LlmConfig::from_env(),
        }
    }
}
