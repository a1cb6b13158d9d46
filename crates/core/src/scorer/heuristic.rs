//! Keyword and duration heuristic scorer.
//!
//! Scores candidates by:
//! 1. Genre keywords in title, tags and description
//! 2. Era markers (a 1950-1989 year or a decade token)
//! 3. Crate-digging indicators (vinyl, rare, private press, ...)
//! 4. Penalties for derivative uploads (covers, remixes, reactions, ...)
//! 5. Duration plausibility for a single track
//!
//! The sum is scaled by the channel's reputation: a 0.5 reputation leaves
//! it unchanged, 0.0 halves it and 1.0 multiplies it by 1.5.

use super::{Classification, Scorer};
use crate::candidate::Candidate;

/// Genre label and the words or phrases that indicate it, in priority order.
const GENRES: &[(&str, &[&str])] = &[
    ("funk", &["funk", "funky", "boogie"]),
    ("soul", &["soul", "motown", "rnb", "r&b"]),
    ("jazz", &["jazz", "bebop", "hard bop", "jazz funk", "fusion"]),
    ("breaks", &["breakbeat", "drum break", "breaks"]),
    ("library", &["library music", "library"]),
    ("psych", &["psychedelic", "psych"]),
    ("disco", &["disco"]),
    ("reggae", &["reggae", "dub", "rocksteady", "ska"]),
    ("afrobeat", &["afrobeat", "afro funk", "highlife"]),
    ("latin", &["bossa nova", "samba", "salsa", "cumbia", "latin"]),
    ("gospel", &["gospel"]),
    ("blues", &["blues"]),
    ("soundtrack", &["soundtrack", "ost"]),
    ("city pop", &["city pop"]),
];

const POSITIVE_INDICATORS: &[&str] = &[
    "vinyl",
    "rare",
    "lp",
    "45",
    "45rpm",
    "private press",
    "obscure",
    "full album",
    "original",
];

const NEGATIVE_INDICATORS: &[&str] = &[
    "cover",
    "remix",
    "reaction",
    "tutorial",
    "type beat",
    "karaoke",
    "nightcore",
    "slowed",
    "shorts",
];

const DECADE_TOKENS: &[(&str, &str)] = &[
    ("50s", "1950s"),
    ("1950s", "1950s"),
    ("fifties", "1950s"),
    ("60s", "1960s"),
    ("1960s", "1960s"),
    ("sixties", "1960s"),
    ("70s", "1970s"),
    ("1970s", "1970s"),
    ("seventies", "1970s"),
    ("80s", "1980s"),
    ("1980s", "1980s"),
    ("eighties", "1980s"),
];

const BASE_SCORE: i32 = 20;
const GENRE_BONUS: i32 = 25;
const EXTRA_GENRE_BONUS: i32 = 5;
const EXTRA_GENRE_CAP: i32 = 10;
const ERA_BONUS: i32 = 15;
const INDICATOR_BONUS: i32 = 5;
const INDICATOR_CAP: i32 = 15;
const NEGATIVE_PENALTY: i32 = 20;

/// Lowercased text with every non-alphanumeric run (except `&`) replaced by
/// a single space and padded with spaces, so ` word ` finds whole words and
/// phrases.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    let mut last_space = true;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '&' {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if !last_space {
        out.push(' ');
    }
    out
}

fn contains_term(normalized: &str, term: &str) -> bool {
    normalized.contains(&format!(" {} ", term))
}

fn genres_in(normalized: &str) -> Vec<&'static str> {
    GENRES
        .iter()
        .filter(|(_, words)| words.iter().any(|w| contains_term(normalized, w)))
        .map(|(label, _)| *label)
        .collect()
}

fn era_in(normalized: &str) -> Option<String> {
    for token in normalized.split_whitespace() {
        if token.len() == 4 {
            if let Ok(year) = token.parse::<u32>() {
                if (1950..=1989).contains(&year) {
                    return Some(format!("{}s", year / 10 * 10));
                }
            }
        }
        if let Some((_, label)) = DECADE_TOKENS.iter().find(|(t, _)| *t == token) {
            return Some(label.to_string());
        }
    }
    None
}

/// Whether `text` carries a genre or era signal.
pub fn has_keyword_signal(text: &str) -> bool {
    let normalized = normalize(text);
    !genres_in(&normalized).is_empty() || era_in(&normalized).is_some()
}

fn duration_adjustment(duration_seconds: Option<u32>) -> i32 {
    match duration_seconds {
        None => 0,
        Some(d) if d < 60 => -25,
        Some(d) if d <= 900 => 15,
        Some(d) if d <= 3600 => 5,
        Some(_) => -10,
    }
}

/// Default scorer.
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    fn full_text(candidate: &Candidate) -> String {
        let mut text = String::new();
        for part in [&candidate.title, &candidate.description].into_iter().flatten() {
            text.push_str(part);
            text.push(' ');
        }
        text.push_str(&candidate.tags.join(" "));
        text
    }

    /// Title and tags only: descriptions are full of links to remixes and
    /// covers that say nothing about the upload itself.
    fn headline_text(candidate: &Candidate) -> String {
        format!(
            "{} {}",
            candidate.title.as_deref().unwrap_or_default(),
            candidate.tags.join(" ")
        )
    }

    fn raw_score(&self, candidate: &Candidate) -> i32 {
        let full = normalize(&Self::full_text(candidate));
        let headline = normalize(&Self::headline_text(candidate));

        let mut score = BASE_SCORE;

        let genres = genres_in(&full);
        if !genres.is_empty() {
            score += GENRE_BONUS;
            score += ((genres.len() as i32 - 1) * EXTRA_GENRE_BONUS).min(EXTRA_GENRE_CAP);
        }

        if era_in(&full).is_some() {
            score += ERA_BONUS;
        }

        let indicators = POSITIVE_INDICATORS
            .iter()
            .filter(|term| contains_term(&full, term))
            .count() as i32;
        score += (indicators * INDICATOR_BONUS).min(INDICATOR_CAP);

        let negatives = NEGATIVE_INDICATORS
            .iter()
            .filter(|term| contains_term(&headline, term))
            .count() as i32;
        score -= negatives * NEGATIVE_PENALTY;

        score + duration_adjustment(candidate.duration_seconds)
    }
}

impl Scorer for HeuristicScorer {
    fn score(&self, candidate: &Candidate, channel_reputation: f64) -> u8 {
        let reputation = if channel_reputation.is_finite() {
            channel_reputation.clamp(0.0, 1.0)
        } else {
            0.5
        };
        let scaled = self.raw_score(candidate) as f64 * (0.5 + reputation);
        scaled.round().clamp(0.0, 100.0) as u8
    }

    fn classify(&self, candidate: &Candidate) -> Classification {
        let full = normalize(&Self::full_text(candidate));
        Classification {
            genre: genres_in(&full).first().map(|g| g.to_string()),
            era: era_in(&full),
        }
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}
