// Unit tests for the tier-1 keyword screener and the tier-3 gating policy.
//
// Both are pure: no network, no database. The screener must be
// deterministic and the gate must be monotonic in its threshold.

use greenlight::analysis::keywords::KeywordScreener;
use greenlight::analysis::prescreen::{PreScreenReason, PreScreenResult};
use greenlight::db::models::Severity;

// ============================================================
// Keyword screening — risky vs. neutral captions
// ============================================================

#[test]
fn risky_caption_elevates_above_neutral_baseline() {
    let screener = KeywordScreener::new();

    let risky = screener.screen("Check out my new video about alcohol and partying \u{1f37a}");
    let neutral = screener.screen("Had a great workout today, feeling strong! \u{1f4aa}");

    assert!(neutral.matches.is_empty());
    assert_eq!(neutral.risk_hint, None);

    let terms: Vec<&str> = risky.matches.iter().map(|m| m.term.as_str()).collect();
    assert!(terms.contains(&"alcohol"), "terms: {terms:?}");
    assert!(terms.contains(&"partying"), "terms: {terms:?}");
    assert!(risky.risk_hint > neutral.risk_hint);
}

#[test]
fn screening_same_text_twice_is_identical() {
    let screener = KeywordScreener::new();
    let text = "drunk street race ends in a lawsuit";
    let first = screener.screen(text);
    let second = screener.screen(text);
    assert_eq!(first.matches, second.matches);
    assert_eq!(first.risk_hint, second.risk_hint);
}

#[test]
fn screening_empty_text_finds_nothing() {
    let screener = KeywordScreener::new();
    let result = screener.screen("");
    assert!(result.matches.is_empty());
    assert_eq!(result.risk_hint, None);
}

#[test]
fn two_screener_instances_agree() {
    // The term lists are compiled per instance but the behavior is static
    let a = KeywordScreener::new();
    let b = KeywordScreener::new();
    let text = "beer pong and a protest march";
    assert_eq!(a.screen(text).matches, b.screen(text).matches);
}

// ============================================================
// Pre-screen gating — only confident "safe" skips full analysis
// ============================================================

#[test]
fn safe_above_threshold_skips() {
    let r = PreScreenResult::new(PreScreenReason::Safe, 0.9, vec![], 0.7);
    assert!(!r.needs_full_analysis);
}

#[test]
fn uncertain_is_always_analyzed() {
    let r = PreScreenResult::new(PreScreenReason::Uncertain, 0.3, vec![], 0.7);
    assert!(r.needs_full_analysis);
    // Regardless of threshold
    let r = PreScreenResult::new(PreScreenReason::Uncertain, 0.3, vec![], 0.0);
    assert!(r.needs_full_analysis);
}

#[test]
fn raising_threshold_never_skips_more() {
    let confidences: Vec<f64> = (0..=20).map(|i| i as f64 / 20.0).collect();
    let skipped_at = |threshold: f64| {
        confidences
            .iter()
            .filter(|&&c| {
                !PreScreenResult::new(PreScreenReason::Safe, c, vec![], threshold)
                    .needs_full_analysis
            })
            .count()
    };
    let mut previous = usize::MAX;
    for threshold in [0.0, 0.2, 0.4, 0.6, 0.8, 1.0] {
        let skipped = skipped_at(threshold);
        assert!(
            skipped <= previous,
            "threshold {threshold} skipped {skipped} > previous {previous}"
        );
        previous = skipped;
    }
}

#[test]
fn brands_detected_gates_in_even_at_full_confidence() {
    let r = PreScreenResult::new(PreScreenReason::BrandsDetected, 1.0, vec!["GlowCo".into()], 0.5);
    assert!(r.needs_full_analysis);
    assert_eq!(r.detected_brands, vec!["GlowCo".to_string()]);
}

// ============================================================
// Severity ordering feeding the risk hint
// ============================================================

#[test]
fn mixed_category_text_hints_at_max_severity() {
    let screener = KeywordScreener::new();
    // political (low) + violence (high)
    let result = screener.screen("congress hearing on the murder case");
    assert_eq!(result.risk_hint, Some(Severity::High));
}
