//! Property-based tests for normalization, chance parsing and templates.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use factkeeper::services::{Command, classify};
use factkeeper::{
    Chance, ChatMessage, Error, ExpandContext, KeyNormalizer, ScopeId, Speaker, TemplatePipeline,
};

fn context() -> ExpandContext {
    let message = ChatMessage::new(
        Speaker::new("alice", "al", "host"),
        ScopeId::new("#c"),
        "hi",
    );
    let now = Utc
        .with_ymd_and_hms(2020, 1, 2, 3, 4, 5)
        .single()
        .expect("valid time");
    ExpandContext::at(&message, "keeper", now)
}

proptest! {
    /// Normalizing twice changes nothing.
    #[test]
    fn prop_strict_normalization_is_idempotent(raw in "[ \\ta-zA-Z0-9.,!?;:'\"()éÜ]{0,40}") {
        let normalizer = KeyNormalizer::new("keeper");
        let once = normalizer.normalize(&raw, false);
        prop_assert_eq!(normalizer.normalize(&once, false), once);
    }

    /// Normalized keys have no surrounding or doubled whitespace.
    #[test]
    fn prop_normalized_whitespace_is_canonical(raw in "[ a-zA-Z\\t]{0,30}") {
        let key = KeyNormalizer::new("keeper").normalize(&raw, true);
        prop_assert_eq!(key.trim(), key.as_str());
        prop_assert!(!key.contains("  "));
        prop_assert!(!key.contains('\t'));
        prop_assert_eq!(key.to_lowercase(), key.clone());
    }

    /// Every whole percentage in 1..=100 parses to that fraction.
    #[test]
    fn prop_valid_percentages_parse(percent in 1i64..=100) {
        let chance = Chance::parse(&format!("{percent}%")).expect("valid percentage");
        #[allow(clippy::cast_precision_loss)]
        let expected = percent as f64 / 100.0;
        prop_assert!((chance.value() - expected).abs() < 1e-12);
    }

    /// Percentages outside 1..=100 are out of range, never clamped.
    #[test]
    fn prop_out_of_range_percentages_rejected(
        percent in prop_oneof![-1000i64..=0, 101i64..=100_000]
    ) {
        let input = format!("{percent}%");
        let result = Chance::parse(&input);
        prop_assert!(
            matches!(result, Err(Error::ChanceOutOfRange(ref s)) if *s == input)
        );
    }

    /// Bare fractions in (0, 1] are accepted as-is.
    #[test]
    fn prop_fractions_in_range_parse(value in 0.0001f64..=1.0) {
        let chance = Chance::parse(&value.to_string()).expect("valid fraction");
        prop_assert!((chance.value() - value).abs() < 1e-12);
        prop_assert!(chance.admits(0.0));
    }

    /// Text without a `$` passes through the built-in pipeline unchanged.
    #[test]
    fn prop_expansion_without_directives_is_identity(text in "[^$]{0,60}") {
        let pipeline = TemplatePipeline::with_builtins();
        prop_assert_eq!(pipeline.expand(&text, &context()), text);
    }

    /// Prefix commands keep the remainder byte-for-byte.
    #[test]
    fn prop_literal_keeps_remainder(key in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,29}") {
        match classify(&format!("LITERAL {key}")) {
            Command::Literal { key: got } => prop_assert_eq!(got, key.trim_end()),
            other => prop_assert!(false, "unexpected {other:?}"),
        }
    }
}
