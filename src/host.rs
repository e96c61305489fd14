use crate::config::DOCUMENT_NAME;
use crate::document::{TextEntry, ValidationError, VocabDocument};
use crate::loader::LoadError;
use crate::normalize::normalize;
use crate::popup::PopupCard;
use crate::render::TokenRef;
use crate::resolve::{PhraseHint, Resolution, Resolver};
use thiserror::Error;
use tracing::error;

/// What the hosting page provides: a mount point and the id of the text to
/// show (`<body data-text-id="…">`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostPage {
    pub has_container: bool,
    pub text_id: Option<String>,
}

impl HostPage {
    pub fn new(text_id: Option<String>) -> Self {
        Self {
            has_container: true,
            text_id,
        }
    }

    /// The attribute value as written; only an empty value counts as missing.
    pub fn text_id(&self) -> Option<&str> {
        self.text_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Failures shown inside the container. `Display` is the user-facing text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MountError {
    /// Nothing to render into; the page is left untouched.
    #[error("no text container on the page")]
    MissingContainer,
    #[error("Erreur : data-text-id manquant sur <body>.")]
    MissingTextId,
    #[error("{}", not_found_message(.id, .available))]
    TextNotFound { id: String, available: Vec<String> },
    #[error("Erreur : vocabulaire \"{id}\" invalide ({reason}).")]
    InvalidText { id: String, reason: ValidationError },
    #[error("Erreur : impossible de charger {}.", DOCUMENT_NAME)]
    LoadFailed,
}

fn not_found_message(id: &str, available: &[String]) -> String {
    let mut message = format!("Erreur : vocabulaire \"{id}\" introuvable.");
    if !available.is_empty() {
        message.push_str(" Textes disponibles : ");
        message.push_str(&available.join(", "));
    }
    message
}

/// A text resolved against its document, ready for rendering and lookups.
#[derive(Debug, Clone, Copy)]
pub struct MountedText<'d> {
    pub id: &'d str,
    pub text: &'d TextEntry,
    pub document: &'d VocabDocument,
}

/// Applies the host contract: container first, then the text id, then the
/// load outcome, then the id lookup.
pub fn mount<'d>(
    host: &HostPage,
    document: Result<&'d VocabDocument, &LoadError>,
) -> Result<MountedText<'d>, MountError> {
    if !host.has_container {
        return Err(MountError::MissingContainer);
    }
    let id = host.text_id().ok_or(MountError::MissingTextId)?;
    let document = document.map_err(|err| {
        error!(error = %err, "vocabulary document unavailable");
        MountError::LoadFailed
    })?;
    let (id, text) = document.texts.get_key_value(id).ok_or_else(|| {
        match document.rejection(id) {
            Some(reason) => MountError::InvalidText {
                id: id.to_string(),
                reason: reason.clone(),
            },
            None => MountError::TextNotFound {
                id: id.to_string(),
                available: document.text_ids().map(str::to_string).collect(),
            },
        }
    })?;
    Ok(MountedText {
        id: id.as_str(),
        text,
        document,
    })
}

impl<'d> MountedText<'d> {
    pub fn resolver(&self) -> Resolver<'d> {
        Resolver::new(&self.document.dictionary, self.text.dictionary.as_ref())
    }

    /// Normalizes `raw` with this text's aliases and resolves it.
    pub fn lookup(&self, raw: &str, hint: Option<PhraseHint<'_>>) -> Resolution {
        let token = normalize(raw, &self.text.aliases);
        self.resolver().resolve(&token, hint)
    }

    /// Card for the token at `at`, with its phrase available as fallback.
    pub fn card_for(&self, at: TokenRef) -> Option<PopupCard> {
        let phrase = self.text.phrases.get(at.phrase)?;
        let token = phrase.tokens.get(at.token)?;
        let resolution = self.lookup(
            &token.text,
            Some(PhraseHint {
                phrase,
                index: at.token,
            }),
        );
        Some(PopupCard::new(resolution.key, &resolution.entry))
    }

    /// Card for a free-standing word typed by the user.
    pub fn card_for_word(&self, raw: &str) -> PopupCard {
        let resolution = self.lookup(raw, None);
        PopupCard::new(resolution.key, &resolution.entry)
    }
}
