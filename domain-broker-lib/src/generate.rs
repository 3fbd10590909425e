//! Name variant generation.
//!
//! Produces alternative labels for a normalized base label: industry
//! keyword combinations (`label-kw`, `kw-label`) followed by generic
//! affixes (`label-suffix`, `prefix-label`). Only used when variants are
//! enabled; the bare label itself is never part of the output.
//!
//! ```
//! use domain_broker_lib::generate::generate_variants;
//! use domain_broker_lib::SuggestionConfig;
//!
//! let config = SuggestionConfig::default();
//! let variants = generate_variants("cafe-mueller", Some("handwerker"), &config);
//! assert_eq!(variants[0], "cafe-mueller-handwerk");
//! assert!(variants.len() <= config.max_variants);
//! ```

use crate::config::SuggestionConfig;
use crate::normalize::{is_valid_label, normalize_label};
use std::collections::HashSet;

/// Generate variants of `label`, deduplicated in generation order and capped
/// at `config.max_variants`.
pub fn generate_variants(
    label: &str,
    industry: Option<&str>,
    config: &SuggestionConfig,
) -> Vec<String> {
    let keywords: Vec<String> = industry
        .map(|i| i.trim().to_ascii_lowercase())
        .and_then(|i| config.industry_keywords.get(&i))
        .map(|words| clean_affixes(words))
        .unwrap_or_default();

    let prefixes = clean_affixes(&config.prefixes);
    let suffixes = clean_affixes(&config.suffixes);

    let combos = keywords
        .iter()
        .flat_map(|kw| [join(label, kw), join(kw, label)])
        .chain(suffixes.iter().map(|s| join(label, s)))
        .chain(prefixes.iter().map(|p| join(p, label)));

    let mut seen = HashSet::new();
    seen.insert(label.to_string());

    combos
        .filter(|candidate| is_valid_label(candidate))
        .filter(|candidate| seen.insert(candidate.clone()))
        .take(config.max_variants)
        .collect()
}

fn join(left: &str, right: &str) -> String {
    format!("{}-{}", left, right)
}

/// Normalize configured affixes the same way business names are normalized.
fn clean_affixes(words: &[String]) -> Vec<String> {
    words
        .iter()
        .filter_map(|w| normalize_label(w).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_industry_keywords_come_first() {
        let config = SuggestionConfig::default();
        let variants = generate_variants("schmidt-bau", Some("Handwerker"), &config);

        assert_eq!(
            &variants[..4],
            &[
                "schmidt-bau-handwerk",
                "handwerk-schmidt-bau",
                "schmidt-bau-meister",
                "meister-schmidt-bau",
            ]
        );
        assert_eq!(variants.len(), config.max_variants);
    }

    #[test]
    fn test_generic_affixes_without_industry() {
        let config = SuggestionConfig::default();
        let variants = generate_variants("cafe", None, &config);
        assert_eq!(variants, vec!["cafe-online", "cafe-24", "mein-cafe"]);
    }

    #[test]
    fn test_unknown_industry_uses_affixes_only() {
        let config = SuggestionConfig::default();
        let variants = generate_variants("cafe", Some("gastro"), &config);
        assert_eq!(variants, vec!["cafe-online", "cafe-24", "mein-cafe"]);
    }

    #[test]
    fn test_variants_are_deduplicated_and_valid() {
        let config = SuggestionConfig {
            prefixes: vec!["Mein".into(), "mein".into(), "!!!".into()],
            suffixes: vec!["24".into(), " 24 ".into()],
            max_variants: 10,
            ..Default::default()
        };
        let variants = generate_variants("laden", None, &config);
        assert_eq!(variants, vec!["laden-24", "mein-laden"]);
    }

    #[test]
    fn test_overlong_variants_dropped() {
        let config = SuggestionConfig::default();
        let label = "a".repeat(61);
        let variants = generate_variants(&label, None, &config);
        assert!(variants.is_empty());
    }

    #[test]
    fn test_cap_zero_disables_output() {
        let config = SuggestionConfig {
            max_variants: 0,
            ..Default::default()
        };
        assert!(generate_variants("cafe", Some("haendler"), &config).is_empty());
    }
}
