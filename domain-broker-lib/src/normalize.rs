//! Business-name normalization and domain string validation.
//!
//! `normalize_label` turns a free-form business name into a domain-safe
//! label. The transformation is deterministic and idempotent:
//! `normalize_label(normalize_label(x)) == normalize_label(x)`.

use crate::error::BrokerError;

/// Maximum length of a single DNS label.
pub const MAX_LABEL_LEN: usize = 63;

/// Legal-form words dropped from business names (compared after dots are removed).
const LEGAL_FORMS: &[&str] = &["gmbh", "ag", "kg", "ohg", "gbr", "ev", "ug", "mbh"];

/// Normalize a raw business name into a domain label.
///
/// Steps:
/// 1. German transliteration (ä→ae, ö→oe, ü→ue, ß→ss); any other non-ASCII
///    character is transliterated with `deunicode` (Ș→s, ễ→e, Д→d)
/// 2. lower-casing
/// 3. whitespace, hyphens and underscores become word separators; any other
///    character outside `a-z0-9` is deleted
/// 4. legal-form words (GmbH, AG, e.V., ...) are removed unless nothing else remains
/// 5. words are joined with single hyphens and the result is cut to 63 characters
///
/// # Errors
///
/// Returns `BrokerError::InvalidName` if no usable character remains.
pub fn normalize_label(raw: &str) -> Result<String, BrokerError> {
    let mut folded = String::with_capacity(raw.len());
    for ch in raw.chars() {
        fold_char(ch, &mut folded);
    }

    let words: Vec<&str> = folded.split('-').filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return Err(BrokerError::invalid_name(
            raw,
            "name contains no characters usable in a domain",
        ));
    }

    let kept: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| !LEGAL_FORMS.contains(w))
        .collect();
    let words = if kept.is_empty() { words } else { kept };

    let mut label = words.join("-");
    if label.len() > MAX_LABEL_LEN {
        // Cutting can leave a trailing hyphen or expose a legal-form word; run
        // the word pass again on the shortened ASCII label.
        label.truncate(MAX_LABEL_LEN);
        return normalize_label(&label);
    }

    Ok(label)
}

/// Append the ASCII rendering of one character.
///
/// German umlauts get their two-letter spelling; everything else non-ASCII
/// goes through `deunicode`. Separators become `-`, other symbols are dropped.
fn fold_char(ch: char, out: &mut String) {
    match ch {
        'ä' | 'Ä' => out.push_str("ae"),
        'ö' | 'Ö' => out.push_str("oe"),
        'ü' | 'Ü' => out.push_str("ue"),
        'ß' | 'ẞ' => out.push_str("ss"),
        c if c.is_ascii() => push_ascii(c, out),
        c if c.is_whitespace() => out.push('-'),
        c => {
            if let Some(ascii) = deunicode::deunicode_char(c) {
                ascii.chars().for_each(|a| push_ascii(a, out));
            }
        }
    }
}

fn push_ascii(ch: char, out: &mut String) {
    match ch {
        'a'..='z' | '0'..='9' => out.push(ch),
        'A'..='Z' => out.push(ch.to_ascii_lowercase()),
        '-' | '_' => out.push('-'),
        c if c.is_ascii_whitespace() => out.push('-'),
        _ => {}
    }
}

/// Check that a label is already in normalized form.
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && !label.contains("--")
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Split a full domain into (label, tld) at the first dot.
///
/// Multi-level suffixes stay together ("example.co.uk" -> ("example", "co.uk")).
///
/// # Errors
///
/// Returns `BrokerError::InvalidDomain` if the string is not a plausible
/// `label.tld` domain.
pub fn split_domain(domain: &str) -> Result<(String, String), BrokerError> {
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();

    if !is_valid_fqdn(&domain) {
        return Err(BrokerError::invalid_domain(
            domain,
            "expected a domain like 'example.de'",
        ));
    }

    match domain.split_once('.') {
        Some((label, tld)) => Ok((label.to_string(), tld.to_string())),
        None => Err(BrokerError::invalid_domain(domain, "missing TLD")),
    }
}

/// Validate that an FQDN has basic valid structure.
pub fn is_valid_fqdn(domain: &str) -> bool {
    if domain.len() < 4 || domain.len() > 253 {
        return false;
    }

    if !domain.contains('.') {
        return false;
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return false;
    }

    for part in domain.split('.') {
        if part.is_empty() || part.len() > MAX_LABEL_LEN {
            return false;
        }

        if part.starts_with('-') || part.ends_with('-') {
            return false;
        }

        if !part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_german_business_name() {
        assert_eq!(normalize_label("Café Müller").unwrap(), "cafe-mueller");
        assert_eq!(normalize_label("Schmidt Bau").unwrap(), "schmidt-bau");
        assert_eq!(
            normalize_label("Bäckerei Weiß GmbH").unwrap(),
            "baeckerei-weiss"
        );
        assert_eq!(
            normalize_label("Schreinerei Müller & Söhne KG").unwrap(),
            "schreinerei-mueller-soehne"
        );
    }

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(normalize_label("  --foo   bar__baz-- ").unwrap(), "foo-bar-baz");
        assert_eq!(normalize_label("a\tb\nc").unwrap(), "a-b-c");
    }

    #[test]
    fn test_normalize_deletes_punctuation() {
        assert_eq!(normalize_label("Tom's Diner!").unwrap(), "toms-diner");
        assert_eq!(normalize_label("Verein e.V.").unwrap(), "verein");
        assert_eq!(normalize_label("www.example").unwrap(), "wwwexample");
    }

    #[test]
    fn test_legal_form_alone_is_kept() {
        assert_eq!(normalize_label("GmbH").unwrap(), "gmbh");
        assert_eq!(normalize_label("AG & KG").unwrap(), "ag-kg");
        assert_eq!(normalize_label("ag-kg").unwrap(), "ag-kg");
    }

    #[test]
    fn test_normalize_rejects_empty_input() {
        assert!(matches!(
            normalize_label(""),
            Err(BrokerError::InvalidName { .. })
        ));
        assert!(normalize_label("   ").is_err());
        assert!(normalize_label("!!!").is_err());
        assert!(normalize_label("&& ?? --").is_err());
    }

    #[test]
    fn test_normalize_truncates_long_names() {
        let long = "a".repeat(62) + " b" + &"c".repeat(20);
        let label = normalize_label(&long).unwrap();
        assert!(label.len() <= MAX_LABEL_LEN);
        assert!(!label.ends_with('-'));
        assert!(is_valid_label(&label));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let long_z = "z".repeat(70) + " y";
        let long_agrar = "x".repeat(60) + " agrar";
        let inputs: Vec<&str> = vec![
            "Café Müller",
            "Schmidt Bau GmbH",
            "GmbH",
            "ÆRØ Straße 24",
            "  x  ",
            "Über-Ärger__Öl",
            "Verein e.V.",
            "ag kg ohg",
            long_z.as_str(),
            long_agrar.as_str(),
            "foo - - bar",
        ];
        for input in inputs {
            let once = normalize_label(input).unwrap();
            let twice = normalize_label(&once).unwrap();
            assert_eq!(once, twice, "normalization not idempotent for {:?}", input);
            assert!(is_valid_label(&once), "invalid label {:?}", once);
        }
    }

    #[test]
    fn test_normalize_transliterates_non_german_names() {
        let cases = [
            ("Ștefan Țurcanu", "stefan-turcanu"),
            ("Nguyễn Văn", "nguyen-van"),
            ("Łódź Piekarnia", "lodz-piekarnia"),
            ("Bjørn Ålesund", "bjorn-alesund"),
            ("Ǧerd", "gerd"),
            ("Дом Сервис", "dom-servis"),
            ("Crème Brûlée", "creme-brulee"),
        ];
        for (input, expected) in cases {
            let once = normalize_label(input).unwrap();
            assert_eq!(once, expected, "transliteration of {:?}", input);
            assert_eq!(normalize_label(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_split_domain() {
        assert_eq!(
            split_domain("cafe-mueller.de").unwrap(),
            ("cafe-mueller".to_string(), "de".to_string())
        );
        assert_eq!(
            split_domain("Test.CO.UK.").unwrap(),
            ("test".to_string(), "co.uk".to_string())
        );
        assert!(split_domain("example").is_err());
        assert!(split_domain(".com").is_err());
        assert!(split_domain("-example.com").is_err());
    }

    #[test]
    fn test_is_valid_fqdn() {
        assert!(is_valid_fqdn("example.com"));
        assert!(is_valid_fqdn("test.co.uk"));
        assert!(!is_valid_fqdn("example"));
        assert!(!is_valid_fqdn("example."));
        assert!(!is_valid_fqdn("ex."));
        assert!(!is_valid_fqdn("exa mple.com"));
    }

    #[test]
    fn test_is_valid_label() {
        assert!(is_valid_label("cafe-mueller"));
        assert!(!is_valid_label("Cafe"));
        assert!(!is_valid_label("-cafe"));
        assert!(!is_valid_label("a--b"));
        assert!(!is_valid_label(""));
    }
}
