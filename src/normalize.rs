use std::collections::BTreeMap;

/// Arabic elongation mark. Purely typographic, never part of a headword.
pub const TATWEEL: char = '\u{0640}';

const EDGE_PUNCTUATION: &[char] = &[
    ',', ';', ':', '!', '?', '.', '(', ')', '[', ']', '«', '»', '"', '\'', '،', '؛',
];

fn is_edge_noise(ch: char) -> bool {
    ch.is_whitespace() || EDGE_PUNCTUATION.contains(&ch)
}

/// Trims whitespace and punctuation from both ends. Interior characters are
/// left alone.
pub fn strip_punctuation(raw: &str) -> &str {
    raw.trim_matches(is_edge_noise)
}

pub fn remove_tatweel(raw: &str) -> String {
    raw.chars().filter(|&ch| ch != TATWEEL).collect()
}

/// Produces the dictionary lookup key for a raw token.
///
/// Steps run in a fixed order: edge punctuation is stripped, the stripped
/// form is replaced by its alias when one exists, then every tatweel is
/// removed. Alias keys therefore match the form *before* tatweel removal.
/// A last edge trim catches punctuation that only becomes an edge once the
/// tatweel is gone.
pub fn normalize(raw: &str, aliases: &BTreeMap<String, String>) -> String {
    let stripped = strip_punctuation(raw);
    let aliased = aliases
        .get(stripped)
        .map(String::as_str)
        .unwrap_or(stripped);
    let cleaned = remove_tatweel(aliased);
    strip_punctuation(&cleaned).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_aliases() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn aliases(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn strips_latin_and_arabic_punctuation_at_edges() {
        assert_eq!(strip_punctuation("  «كتاب»، "), "كتاب");
        assert_eq!(strip_punctuation("(قلم)؛"), "قلم");
        assert_eq!(strip_punctuation("\"بيت\"!?."), "بيت");
        assert_eq!(strip_punctuation("[باب]:,;'"), "باب");
    }

    #[test]
    fn keeps_interior_punctuation() {
        assert_eq!(strip_punctuation("أ.ب"), "أ.ب");
        assert_eq!(normalize("،أ،ب،", &no_aliases()), "أ،ب");
    }

    #[test]
    fn tatweel_is_removed_everywhere() {
        assert_eq!(
            normalize("كـتـاب", &no_aliases()),
            normalize("كتاب", &no_aliases())
        );
        assert_eq!(normalize("ـكتابـ", &no_aliases()), "كتاب");
    }

    #[test]
    fn alias_applies_to_stripped_form_before_tatweel_removal() {
        let map = aliases(&[("الكـتاب", "كتاب")]);
        assert_eq!(normalize("«الكـتاب»", &map), "كتاب");
        // Once the tatweel is gone the key no longer matches.
        assert_eq!(normalize("الكتاب", &map), "الكتاب");
    }

    #[test]
    fn alias_target_is_cleaned_like_any_token() {
        let map = aliases(&[("ذهبوا", "ذهـب")]);
        assert_eq!(normalize("ذهبوا.", &map), "ذهب");
        assert_eq!(normalize("ذهبوا", &map), normalize("ذهـب", &map));
    }

    #[test]
    fn aliased_token_matches_its_target() {
        let map = aliases(&[("يكتبون", "كتب")]);
        for token in ["يكتبون", " يكتبون،", "(يكتبون)"] {
            assert_eq!(normalize(token, &map), normalize("كتب", &map));
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "",
            "   ",
            "كتاب",
            "«كـتـاب»",
            "ك.ـ",
            "!ـ",
            "،وكتاب؛",
            "  (الـقلم)  ",
            "a.b",
            "«»",
        ];
        let map = no_aliases();
        for sample in samples {
            let once = normalize(sample, &map);
            assert_eq!(normalize(&once, &map), once, "input {sample:?}");
        }
    }

    #[test]
    fn punctuation_only_token_normalizes_to_empty() {
        assert_eq!(normalize("«،»", &no_aliases()), "");
        assert_eq!(normalize("ـ", &no_aliases()), "");
    }
}
