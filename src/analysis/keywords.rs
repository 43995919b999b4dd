// Tier 1 — keyword screening.
//
// Stateless text-pattern matching against curated sensitive-term lists.
// Zero network cost, deterministic, idempotent: identical input text always
// yields identical matches and the same overall risk hint.

use regex_lite::Regex;

use super::{ContentCategory, Evidence, Modality};
use crate::db::models::Severity;

/// A single matched term.
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatch {
    pub term: String,
    pub category: ContentCategory,
    pub severity: Severity,
}

/// The result of screening one piece of text.
#[derive(Debug, Clone, Default)]
pub struct ScreenResult {
    pub matches: Vec<TermMatch>,
    /// Highest severity among the matches; None when nothing matched.
    pub risk_hint: Option<Severity>,
}

struct CategoryRule {
    category: ContentCategory,
    severity: Severity,
    regex: Regex,
}

/// Compiled screener over the curated term lists.
///
/// Construct once and reuse — compilation happens in `new`, screening is a
/// pure scan.
pub struct KeywordScreener {
    rules: Vec<CategoryRule>,
}

// Term lists are matched case-insensitively on word boundaries, so "party"
// does not fire inside "parturition" and "hell" does not fire inside
// "hello".
const PROFANITY: &[&str] = &[
    "fuck", "fucking", "shit", "bitch", "asshole", "bastard", "dick", "piss", "damn",
];
const VIOLENCE: &[&str] = &[
    "kill", "killing", "murder", "shooting", "stabbing", "assault", "beatdown", "gunfight",
    "massacre",
];
const ADULT: &[&str] = &[
    "nsfw", "nude", "nudes", "porn", "onlyfans", "stripper", "explicit",
];
const SUBSTANCES: &[&str] = &[
    "alcohol", "drunk", "vodka", "tequila", "beer", "weed", "marijuana", "cocaine", "heroin",
    "vaping", "party", "partying", "wasted", "hungover",
];
const CONTROVERSIAL: &[&str] = &[
    "scandal", "boycott", "cancelled", "racist", "sexist", "lawsuit", "fraud", "scam",
];
const DANGEROUS: &[&str] = &[
    "challenge gone wrong", "near death", "freefall", "illegal stunt", "street race", "parkour fail",
];
const POLITICAL: &[&str] = &[
    "election", "protest", "impeach", "senator", "congress", "maga", "antifa",
];

impl KeywordScreener {
    pub fn new() -> Self {
        let lists: [(&[&str], ContentCategory, Severity); 7] = [
            (PROFANITY, ContentCategory::Profanity, Severity::Medium),
            (VIOLENCE, ContentCategory::Violence, Severity::High),
            (ADULT, ContentCategory::Adult, Severity::High),
            (SUBSTANCES, ContentCategory::Substances, Severity::Medium),
            (CONTROVERSIAL, ContentCategory::Controversial, Severity::Medium),
            (DANGEROUS, ContentCategory::Dangerous, Severity::High),
            (POLITICAL, ContentCategory::Political, Severity::Low),
        ];

        let rules = lists
            .into_iter()
            .map(|(terms, category, severity)| {
                let pattern = format!(r"(?i)\b(?:{})\b", terms.join("|"));
                CategoryRule {
                    category,
                    severity,
                    // The patterns are compile-time constants; a failure here
                    // is a programming error, not an input error.
                    regex: Regex::new(&pattern).expect("invalid built-in term pattern"),
                }
            })
            .collect();

        Self { rules }
    }

    /// Screen one piece of text. Pure: no I/O, no state.
    pub fn screen(&self, text: &str) -> ScreenResult {
        let mut matches = Vec::new();

        for rule in &self.rules {
            for m in rule.regex.find_iter(text) {
                matches.push(TermMatch {
                    term: m.as_str().to_lowercase(),
                    category: rule.category,
                    severity: rule.severity,
                });
            }
        }

        // One hit per distinct term is enough evidence
        matches.sort_by(|a, b| a.term.cmp(&b.term));
        matches.dedup_by(|a, b| a.term == b.term && a.category == b.category);

        let risk_hint = matches.iter().map(|m| m.severity).max();
        ScreenResult { matches, risk_hint }
    }

    /// Screen text and convert the matches directly to evidence.
    pub fn screen_to_evidence(&self, text: &str, modality: Modality) -> Vec<Evidence> {
        self.screen(text)
            .matches
            .into_iter()
            .map(|m| Evidence {
                category: m.category,
                severity: m.severity,
                start_seconds: None,
                end_seconds: None,
                quote: format!("matched term \"{}\"", m.term),
                modality,
            })
            .collect()
    }
}

impl Default for KeywordScreener {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_substance_terms() {
        let screener = KeywordScreener::new();
        let result =
            screener.screen("Check out my new video about alcohol and partying \u{1f37a}");
        let terms: Vec<&str> = result.matches.iter().map(|m| m.term.as_str()).collect();
        assert!(terms.contains(&"alcohol"));
        assert!(terms.contains(&"partying"));
        assert_eq!(result.risk_hint, Some(Severity::Medium));
    }

    #[test]
    fn test_neutral_text_flags_nothing() {
        let screener = KeywordScreener::new();
        let result = screener.screen("Had a great workout today, feeling strong! \u{1f4aa}");
        assert!(result.matches.is_empty());
        assert_eq!(result.risk_hint, None);
    }

    #[test]
    fn test_screening_is_deterministic() {
        let screener = KeywordScreener::new();
        let text = "drunk driving scandal after the party";
        let a = screener.screen(text);
        let b = screener.screen(text);
        assert_eq!(a.matches, b.matches);
        assert_eq!(a.risk_hint, b.risk_hint);
    }

    #[test]
    fn test_word_boundaries_respected() {
        let screener = KeywordScreener::new();
        // "hello" must not fire the profanity list, "classic" no substring hits
        let result = screener.screen("hello there, a classic workout");
        assert!(result.matches.is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let screener = KeywordScreener::new();
        let result = screener.screen("WEED and Vodka");
        assert_eq!(result.matches.len(), 2);
    }

    #[test]
    fn test_risk_hint_is_max_severity() {
        let screener = KeywordScreener::new();
        // "election" is low, "murder" is high — hint takes the max
        let result = screener.screen("election coverage of a murder trial");
        assert_eq!(result.risk_hint, Some(Severity::High));
    }

    #[test]
    fn test_repeated_terms_dedup() {
        let screener = KeywordScreener::new();
        let result = screener.screen("beer beer beer");
        assert_eq!(result.matches.len(), 1);
    }

    #[test]
    fn test_evidence_conversion_carries_modality() {
        let screener = KeywordScreener::new();
        let evidence = screener.screen_to_evidence("too much vodka", Modality::Transcript);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].modality, Modality::Transcript);
        assert_eq!(evidence[0].category, ContentCategory::Substances);
        assert!(evidence[0].quote.contains("vodka"));
    }
}
