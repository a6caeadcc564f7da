use crate::types::WordPair;

/// Built-in catalogue: closely related words, so the odd one out can bluff
const DEFAULT_PAIRS: &[(&str, &str)] = &[
    ("coffee", "tea"),
    ("piano", "guitar"),
    ("cat", "tiger"),
    ("beach", "desert"),
    ("pizza", "burger"),
    ("train", "bus"),
    ("moon", "sun"),
    ("football", "basketball"),
    ("library", "bookstore"),
    ("wedding", "birthday party"),
    ("dentist", "doctor"),
    ("snow", "rain"),
    ("castle", "palace"),
    ("violin", "cello"),
    ("honey", "jam"),
    ("submarine", "ship"),
    ("pencil", "pen"),
    ("wolf", "dog"),
    ("cinema", "theatre"),
    ("lemon", "orange"),
];

/// Names given to the non-human seat; one is picked that no human uses
pub const PARTICIPANT_NAMES: &[&str] = &[
    "Alex", "Sam", "Jamie", "Robin", "Charlie", "Kim", "Max", "Lou", "Noa", "Toni", "Mika",
    "Jo", "Luca", "Nico", "Sasha", "Ari",
];

pub fn default_pairs() -> Vec<WordPair> {
    DEFAULT_PAIRS
        .iter()
        .map(|(a, b)| WordPair::new(*a, *b))
        .collect()
}

/// Parse `a:b,c:d` into word pairs, skipping malformed entries
pub fn parse_pairs(raw: &str) -> Vec<WordPair> {
    raw.split(',')
        .filter_map(|entry| {
            let (a, b) = entry.split_once(':')?;
            let (a, b) = (a.trim(), b.trim());
            if a.is_empty() || b.is_empty() || a.eq_ignore_ascii_case(b) {
                tracing::warn!("Ignoring malformed word pair entry: {:?}", entry);
                return None;
            }
            Some(WordPair::new(a, b))
        })
        .collect()
}
