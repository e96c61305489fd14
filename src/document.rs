use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Headword → entry. Keys are exact post-normalization word forms.
pub type Dictionary = BTreeMap<String, DictEntry>;

/// The whole vocabulary resource: every text plus the shared dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabDocument {
    pub texts: BTreeMap<String, TextEntry>,
    #[serde(default)]
    pub dictionary: Dictionary,
    /// Texts that failed validation, keyed by id.
    #[serde(skip)]
    pub rejected: BTreeMap<String, ValidationError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextEntry {
    #[serde(rename = "title_ar", default)]
    pub title: String,
    #[serde(default)]
    pub phrases: Vec<Phrase>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Legacy per-text dictionary, consulted after the global one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<Dictionary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(rename = "fr_fluent", default)]
    pub fluent_translation: String,
    /// Literal translation, `" / "`-delimited and aligned with `tokens`.
    #[serde(rename = "fr_word_by_word", default)]
    pub word_by_word_translation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "t")]
    pub text: String,
    #[serde(default)]
    pub clickable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictEntry {
    #[serde(rename = "fr", default)]
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(rename = "pos", default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Why a text was set aside at load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text identifiers must not be empty")]
    EmptyTextId,
    #[error("phrase {phrase}, token {token}: token text is empty")]
    EmptyToken { phrase: usize, token: usize },
}

impl VocabDocument {
    /// Parses a document from its JSON bytes. Only a malformed document is an
    /// error; texts that fail validation are set aside individually.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, crate::LoadError> {
        let mut document: Self = serde_json::from_slice(bytes)?;
        document.set_aside_invalid();
        Ok(document)
    }

    /// Moves every text that fails [`TextEntry::validate`] out of `texts` and
    /// into `rejected`, and drops blank headwords no token can match.
    pub fn set_aside_invalid(&mut self) {
        drop_blank_headwords(&mut self.dictionary, "global");
        for (id, mut text) in std::mem::take(&mut self.texts) {
            if let Some(local) = text.dictionary.as_mut() {
                drop_blank_headwords(local, &id);
            }
            match text.validate(&id) {
                Ok(()) => {
                    self.texts.insert(id, text);
                }
                Err(err) => {
                    warn!(text = %id, error = %err, "text set aside");
                    self.rejected.insert(id, err);
                }
            }
        }
    }

    /// The reason `id` was set aside, if it was.
    pub fn rejection(&self, id: &str) -> Option<&ValidationError> {
        self.rejected.get(id)
    }

    pub fn text(&self, id: &str) -> Option<&TextEntry> {
        self.texts.get(id)
    }

    /// Text identifiers in stable order.
    pub fn text_ids(&self) -> impl Iterator<Item = &str> {
        self.texts.keys().map(String::as_str)
    }
}

impl TextEntry {
    /// Checks the structural rules that serde cannot express.
    ///
    /// Word-by-word strings that line up with neither the tokens nor the
    /// clickable tokens are only reported.
    pub fn validate(&self, id: &str) -> Result<(), ValidationError> {
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyTextId);
        }
        for (phrase_idx, phrase) in self.phrases.iter().enumerate() {
            if let Some(token_idx) = phrase
                .tokens
                .iter()
                .position(|token| token.text.trim().is_empty())
            {
                return Err(ValidationError::EmptyToken {
                    phrase: phrase_idx,
                    token: token_idx,
                });
            }
            if !phrase.word_by_word_aligned() {
                warn!(
                    text = %id,
                    phrase = phrase_idx,
                    tokens = phrase.tokens.len(),
                    parts = phrase.word_by_word_parts().count(),
                    "word-by-word translation is not aligned with tokens"
                );
            }
        }
        Ok(())
    }
}

fn drop_blank_headwords(dict: &mut Dictionary, scope: &str) {
    let before = dict.len();
    dict.retain(|key, _| !key.trim().is_empty());
    if dict.len() < before {
        warn!(scope, dropped = before - dict.len(), "blank headwords dropped");
    }
}

impl Phrase {
    /// True when the word-by-word parts match either every token or just the
    /// clickable ones. A blank string is trivially aligned.
    pub fn word_by_word_aligned(&self) -> bool {
        let parts = self.word_by_word_parts().count();
        let clickable = self.tokens.iter().filter(|token| token.clickable).count();
        parts == 0 || parts == self.tokens.len() || parts == clickable
    }

    /// Splits the word-by-word translation on `" / "`, trimming each part.
    pub fn word_by_word_parts(&self) -> impl Iterator<Item = &str> {
        let raw = self.word_by_word_translation.as_str();
        let parts = if raw.trim().is_empty() {
            None
        } else {
            Some(raw.split(" / ").map(str::trim))
        };
        parts.into_iter().flatten()
    }

    /// The literal translation aligned with the token at `index`, if any.
    pub fn word_by_word_at(&self, index: usize) -> Option<&str> {
        self.word_by_word_parts()
            .nth(index)
            .filter(|part| !part.is_empty())
    }
}

impl Token {
    pub fn new(text: impl Into<String>, clickable: bool) -> Self {
        Self {
            text: text.into(),
            clickable,
        }
    }
}

impl DictEntry {
    pub fn new(translation: impl Into<String>) -> Self {
        Self {
            translation: translation.into(),
            ..Default::default()
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_part_of_speech(mut self, pos: impl Into<String>) -> Self {
        self.part_of_speech = Some(pos.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
