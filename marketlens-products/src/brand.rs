//! Best-effort brand extraction from listing titles.
//!
//! An ordered list of pure matchers, first plausible match wins:
//!
//! 1. a recognized brand occurring as a word-bounded title prefix (longest
//!    match wins, canonical casing preserved);
//! 2. the capitalized token run before a separator (` - `, `|`, `: `);
//! 3. the leading token, unless it is a generic stop-word.
//!
//! Deterministic and side-effect-free. Never guaranteed correct; callers
//! treat the result as a hint, not a fact.

use std::sync::LazyLock;

use regex::Regex;

/// Brands recognized as title prefixes, canonical casing preserved on match.
/// Multi-word entries let the longest-prefix rule beat their single-word
/// stems ("Anker Soundcore" over "Anker").
const KNOWN_BRANDS: [&str; 24] = [
    "Anker",
    "Anker Soundcore",
    "Apple",
    "Bang & Olufsen",
    "Beats",
    "Belkin",
    "Bose",
    "Google",
    "JBL",
    "JLab",
    "Jabra",
    "Logitech",
    "Microsoft",
    "Panasonic",
    "Philips",
    "Samsung",
    "Sennheiser",
    "Skullcandy",
    "Sony",
    "Soundcore",
    "TOZO",
    "TP-Link",
    "Ugreen",
    "Xiaomi",
];

/// Generic words that never stand alone as a brand.
const STOP_WORDS: [&str; 11] = [
    "a", "an", "and", "best", "genuine", "new", "official", "original", "premium", "the", "with",
];

/// Words whose presence marks a candidate as product description, not brand.
const EXCLUDED_TOKENS: [&str; 9] = [
    "bundle",
    "compatible",
    "for",
    "pack",
    "pcs",
    "piece",
    "pieces",
    "replacement",
    "set",
];

// Capitalized token run followed by a separator. The dash form requires
// surrounding whitespace so in-word hyphens ("WH-1000XM5") never split a
// model number.
static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][\w&'.]*(?:\s+[A-Z][\w&'.]*)*)(?:\s+[-–]\s+|\s*\|\s*|:\s+)").unwrap()
});

static TRAILING_STORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(store|official|shop)$").unwrap());

/// Extract a best-guess brand from a product title.
pub fn extract(title: &str) -> Option<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(canonical) = known_prefix(trimmed) {
        return Some(canonical);
    }
    before_separator(trimmed)
        .and_then(|candidate| tidy(&candidate))
        .or_else(|| leading_token(trimmed).and_then(|candidate| tidy(&candidate)))
}

fn known_prefix(title: &str) -> Option<String> {
    KNOWN_BRANDS
        .iter()
        .filter(|brand| has_word_prefix(title, brand))
        .max_by_key(|brand| brand.len())
        .map(|brand| (*brand).to_string())
}

fn has_word_prefix(title: &str, brand: &str) -> bool {
    if title.len() < brand.len() || !title.is_char_boundary(brand.len()) {
        return false;
    }
    let (head, rest) = title.split_at(brand.len());
    head.eq_ignore_ascii_case(brand) && rest.chars().next().map_or(true, |c| !c.is_alphanumeric())
}

fn before_separator(title: &str) -> Option<String> {
    CAPITALIZED_RUN
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn leading_token(title: &str) -> Option<String> {
    let token = title.split_whitespace().next()?;
    if STOP_WORDS.contains(&token.to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(token.to_string())
}

/// Clean a candidate and decide whether it is plausible as a brand:
/// collapse whitespace, drop a trailing "Store"/"Official"/"Shop", reject
/// implausible lengths, all-digit candidates, and description words, then
/// normalize shouting or all-lowercase candidates to title case.
pub(crate) fn tidy(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped = TRAILING_STORE.replace(&collapsed, "").into_owned();

    if !(2..=50).contains(&stripped.chars().count()) {
        return None;
    }
    if stripped
        .chars()
        .filter(|c| !c.is_whitespace())
        .all(|c| c.is_ascii_digit())
    {
        return None;
    }
    if stripped
        .split_whitespace()
        .any(|token| EXCLUDED_TOKENS.contains(&token.to_ascii_lowercase().as_str()))
    {
        return None;
    }

    Some(recase(&stripped))
}

fn recase(s: &str) -> String {
    let has_upper = s.chars().any(char::is_uppercase);
    let has_lower = s.chars().any(char::is_lowercase);
    if has_upper && has_lower {
        return s.to_string();
    }
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_brand_prefers_longest_prefix() {
        assert_eq!(
            extract("Anker Soundcore Life P2 Earbuds").as_deref(),
            Some("Anker Soundcore")
        );
        assert_eq!(
            extract("Anker PowerCore 10000 Charger").as_deref(),
            Some("Anker")
        );
    }

    #[test]
    fn known_brand_restores_canonical_casing() {
        assert_eq!(
            extract("tozo t6 true wireless earbuds").as_deref(),
            Some("TOZO")
        );
        assert_eq!(extract("JBL Tune 510BT").as_deref(), Some("JBL"));
    }

    #[test]
    fn known_brand_requires_a_word_boundary() {
        // "Sony" must not match inside "Sonya's".
        assert_eq!(extract("Sonya's Kitchen Tongs").as_deref(), Some("Sonya's"));
    }

    #[test]
    fn capitalized_run_before_separator() {
        assert_eq!(
            extract("Acme Audio - Wireless Earbuds").as_deref(),
            Some("Acme Audio")
        );
        assert_eq!(extract("Happy Plugs | Air 1").as_deref(), Some("Happy Plugs"));
        assert_eq!(
            extract("Zagg: Screen Protector 3 Pack").as_deref(),
            Some("Zagg")
        );
    }

    #[test]
    fn in_word_hyphens_are_not_separators() {
        // No "Beyerdynamic DT" nonsense from the model number's hyphen.
        assert_eq!(
            extract("Beyerdynamic DT-770 Pro Headphones").as_deref(),
            Some("Beyerdynamic")
        );
    }

    #[test]
    fn leading_stop_word_means_no_brand() {
        assert_eq!(extract("New USB C Cable 6ft"), None);
        assert_eq!(extract("The Best Earbuds Ever"), None);
        assert_eq!(extract(""), None);
        assert_eq!(extract("   "), None);
    }

    #[test]
    fn implausible_candidates_are_dropped() {
        assert_eq!(extract("12345 Widget Counter"), None);
        assert_eq!(extract("Replacement Band Strap"), None);
        // single character leading token is too short to be a brand
        assert_eq!(extract("X Mount Bracket"), None);
    }

    #[test]
    fn store_suffix_is_stripped() {
        assert_eq!(
            extract("Wavebird Store - Wireless Mouse").as_deref(),
            Some("Wavebird")
        );
    }

    #[test]
    fn shouting_candidates_are_recased() {
        assert_eq!(extract("ACME | USB Hub").as_deref(), Some("Acme"));
        assert_eq!(
            extract("generic brandless item").as_deref(),
            Some("Generic")
        );
    }

    #[test]
    fn tidy_enforces_cleanup_rules() {
        assert_eq!(tidy("  Wavebird   Official "), Some("Wavebird".to_string()));
        assert_eq!(tidy("4040"), None);
        assert_eq!(tidy("Pack of Three"), None);
        assert_eq!(tidy("a"), None);
        assert_eq!(tidy(&"x".repeat(60)), None);
    }
}
