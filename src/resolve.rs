use crate::document::{DictEntry, Dictionary, Phrase};
use serde::{Deserialize, Serialize};

/// Conjunction prefix dropped when a full form is missing.
pub const WAW: char = 'و';

/// Translation shown for words nothing could resolve.
pub const MISSING_TRANSLATION: &str = "—";
pub const MISSING_NOTE: &str = "Mot non encore présent dans le vocabulaire.";
pub const WORD_BY_WORD_NOTE: &str = "Traduction mot à mot tirée de la phrase.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Global,
    Local,
    WordByWord,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Headword that matched. Differs from the token after a waw retry.
    pub key: String,
    pub entry: DictEntry,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn is_miss(&self) -> bool {
        self.source == ResolutionSource::Missing
    }
}

/// Position of the activated token inside its phrase.
#[derive(Debug, Clone, Copy)]
pub struct PhraseHint<'a> {
    pub phrase: &'a Phrase,
    pub index: usize,
}

/// Looks normalized tokens up in the global dictionary, then the text-local
/// one, then the phrase's word-by-word translation.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    global: &'a Dictionary,
    local: Option<&'a Dictionary>,
}

impl<'a> Resolver<'a> {
    pub fn new(global: &'a Dictionary, local: Option<&'a Dictionary>) -> Self {
        Self { global, local }
    }

    pub fn resolve(&self, token: &str, hint: Option<PhraseHint<'_>>) -> Resolution {
        if token.is_empty() {
            return Resolution::missing(token);
        }
        if let Some((key, entry)) = find_entry(self.global, token) {
            return Resolution {
                key: key.to_string(),
                entry: entry.clone(),
                source: ResolutionSource::Global,
            };
        }
        if let Some((key, entry)) = self.local.and_then(|local| find_entry(local, token)) {
            return Resolution {
                key: key.to_string(),
                entry: entry.clone(),
                source: ResolutionSource::Local,
            };
        }
        if let Some(literal) = hint.and_then(|hint| hint.phrase.word_by_word_at(hint.index)) {
            return Resolution {
                key: token.to_string(),
                entry: DictEntry::new(literal).with_note(WORD_BY_WORD_NOTE),
                source: ResolutionSource::WordByWord,
            };
        }
        Resolution::missing(token)
    }
}

impl Resolution {
    fn missing(token: &str) -> Self {
        Self {
            key: token.to_string(),
            entry: DictEntry::new(MISSING_TRANSLATION).with_note(MISSING_NOTE),
            source: ResolutionSource::Missing,
        }
    }
}

/// Exact lookup with a single retry that drops a leading waw.
fn find_entry<'d>(dict: &'d Dictionary, token: &str) -> Option<(&'d str, &'d DictEntry)> {
    if let Some((key, entry)) = dict.get_key_value(token) {
        return Some((key.as_str(), entry));
    }
    let rest = token.strip_prefix(WAW).filter(|rest| !rest.is_empty())?;
    dict.get_key_value(rest)
        .map(|(key, entry)| (key.as_str(), entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Token;

    fn dict(pairs: &[(&str, &str)]) -> Dictionary {
        pairs
            .iter()
            .map(|(word, fr)| (word.to_string(), DictEntry::new(*fr)))
            .collect()
    }

    fn phrase(tokens: &[(&str, bool)], wbw: &str) -> Phrase {
        Phrase {
            tokens: tokens
                .iter()
                .map(|(text, clickable)| Token::new(*text, *clickable))
                .collect(),
            fluent_translation: String::new(),
            word_by_word_translation: wbw.to_string(),
        }
    }

    #[test]
    fn global_wins_over_local() {
        let global = dict(&[("كتاب", "livre")]);
        let local = dict(&[("كتاب", "ouvrage")]);
        let found = Resolver::new(&global, Some(&local)).resolve("كتاب", None);
        assert_eq!(found.entry.translation, "livre");
        assert_eq!(found.source, ResolutionSource::Global);
    }

    #[test]
    fn local_used_when_global_misses() {
        let global = dict(&[]);
        let local = dict(&[("قلم", "stylo")]);
        let found = Resolver::new(&global, Some(&local)).resolve("قلم", None);
        assert_eq!(found.entry.translation, "stylo");
        assert_eq!(found.source, ResolutionSource::Local);
    }

    #[test]
    fn waw_prefix_fallback_returns_stem_entry() {
        let global = dict(&[("كتاب", "livre")]);
        let found = Resolver::new(&global, None).resolve("وكتاب", None);
        assert_eq!(found.key, "كتاب");
        assert_eq!(found.entry.translation, "livre");
    }

    #[test]
    fn exact_waw_form_beats_retry() {
        let global = dict(&[("وكتاب", "et un livre"), ("كتاب", "livre")]);
        let found = Resolver::new(&global, None).resolve("وكتاب", None);
        assert_eq!(found.key, "وكتاب");
        assert_eq!(found.entry.translation, "et un livre");
    }

    #[test]
    fn waw_retry_runs_inside_each_dictionary() {
        // The global retry is tried before the local exact match.
        let global = dict(&[("قلم", "stylo (global)")]);
        let local = dict(&[("وقلم", "et un stylo")]);
        let found = Resolver::new(&global, Some(&local)).resolve("وقلم", None);
        assert_eq!(found.source, ResolutionSource::Global);

        let global = dict(&[]);
        let local = dict(&[("قلم", "stylo")]);
        let found = Resolver::new(&global, Some(&local)).resolve("وقلم", None);
        assert_eq!(found.key, "قلم");
        assert_eq!(found.source, ResolutionSource::Local);
    }

    #[test]
    fn lone_waw_does_not_retry_empty_key() {
        let mut global = dict(&[]);
        global.insert(String::new(), DictEntry::new("nothing"));
        let found = Resolver::new(&global, None).resolve("و", None);
        assert!(found.is_miss());
    }

    #[test]
    fn word_by_word_fallback_uses_token_position() {
        let phrase = phrase(&[("ذهب", true), ("الولد", true), ("،", false)], "a / b");
        let global = dict(&[]);
        let found = Resolver::new(&global, None).resolve(
            "الولد",
            Some(PhraseHint {
                phrase: &phrase,
                index: 1,
            }),
        );
        assert_eq!(found.entry.translation, "b");
        assert_eq!(found.entry.note.as_deref(), Some(WORD_BY_WORD_NOTE));
        assert_eq!(found.source, ResolutionSource::WordByWord);
    }

    #[test]
    fn waw_retry_does_not_apply_to_word_by_word() {
        let phrase = phrase(&[("وذهب", true)], "et il partit");
        let global = dict(&[]);
        let found = Resolver::new(&global, None).resolve(
            "وذهب",
            Some(PhraseHint {
                phrase: &phrase,
                index: 0,
            }),
        );
        assert_eq!(found.key, "وذهب");
        assert_eq!(found.entry.translation, "et il partit");
    }

    #[test]
    fn miss_yields_placeholder() {
        let global = dict(&[("كتاب", "livre")]);
        let phrase = phrase(&[("بيت", true)], "");
        let found = Resolver::new(&global, None).resolve(
            "بيت",
            Some(PhraseHint {
                phrase: &phrase,
                index: 0,
            }),
        );
        assert!(found.is_miss());
        assert_eq!(found.key, "بيت");
        assert_eq!(found.entry.translation, "—");
        assert_eq!(found.entry.note.as_deref(), Some(MISSING_NOTE));
    }

    #[test]
    fn out_of_range_position_is_a_miss() {
        let phrase = phrase(&[("a", true), ("b", true), ("c", true)], "x / y");
        let global = dict(&[]);
        let found = Resolver::new(&global, None).resolve(
            "c",
            Some(PhraseHint {
                phrase: &phrase,
                index: 2,
            }),
        );
        assert!(found.is_miss());
    }

    #[test]
    fn empty_token_is_a_miss() {
        let global = dict(&[("", "never")]);
        assert!(Resolver::new(&global, None).resolve("", None).is_miss());
    }
}
