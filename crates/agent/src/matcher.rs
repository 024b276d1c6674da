use rentline_core::domain::equipment::EquipmentRecord;
use rentline_core::inventory::InventorySnapshot;

/// A snapshot row that matched the caller's description, ranked by score.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchCandidate {
    pub record: EquipmentRecord,
    pub score: u32,
}

/// Maps a caller's free-text equipment description to snapshot rows.
pub trait EquipmentMatcher: Send + Sync {
    /// Ranked candidates, best first. Empty when nothing plausibly fits.
    fn rank(&self, description: &str, snapshot: &InventorySnapshot) -> Vec<MatchCandidate>;
}

/// Token-overlap matcher over unit names and categories. Category hits
/// weigh more than name hits because callers say "an excavator", not
/// "a CAT 320".
#[derive(Debug, Default)]
pub struct KeywordMatcher;

const CATEGORY_HIT_WEIGHT: u32 = 3;
const NAME_HIT_WEIGHT: u32 = 1;

/// Filler words that carry no equipment signal.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "for", "i", "it", "need", "of", "one", "rent", "some", "the", "to", "want",
];

fn tokenize(text: &str) -> Vec<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .collect()
}

/// Crude singularization so "excavators" hits "Excavator".
fn stem(token: &str) -> &str {
    token.strip_suffix('s').filter(|stripped| stripped.len() >= 3).unwrap_or(token)
}

fn overlap(description_tokens: &[String], field: &str) -> u32 {
    let field_tokens = tokenize(field);
    description_tokens
        .iter()
        .filter(|token| field_tokens.iter().any(|field_token| stem(field_token) == stem(token)))
        .count() as u32
}

impl EquipmentMatcher for KeywordMatcher {
    fn rank(&self, description: &str, snapshot: &InventorySnapshot) -> Vec<MatchCandidate> {
        let description_tokens = tokenize(description);
        if description_tokens.is_empty() {
            return Vec::new();
        }

        let mut candidates: Vec<MatchCandidate> = snapshot
            .available()
            .into_iter()
            .filter_map(|record| {
                let score = overlap(&description_tokens, &record.category) * CATEGORY_HIT_WEIGHT
                    + overlap(&description_tokens, &record.name) * NAME_HIT_WEIGHT;
                (score > 0).then(|| MatchCandidate { record: record.clone(), score })
            })
            .collect();

        // Equal scores fall back to id order, which the snapshot guarantees.
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates
    }
}
