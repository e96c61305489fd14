//! Clickable Arabic reading texts with French glosses.
//!
//! A vocabulary document holds texts (phrases of tokens with fluent and
//! word-by-word translations) and a dictionary. Words are normalized
//! ([`normalize`]), resolved against the global and text-local dictionaries
//! with a word-by-word fallback ([`Resolver`]), and shown in a single popup
//! ([`Popup`]). The [`Reader`] ties those together for one mounted text;
//! [`Page`] renders the same thing as an HTML host page.

pub mod config;
mod document;
mod host;
mod loader;
mod normalize;
mod popup;
mod reader;
mod render;
mod resolve;
#[cfg(feature = "web")]
pub mod web;

pub use document::{
    DictEntry, Dictionary, Phrase, TextEntry, Token, ValidationError, VocabDocument,
};
pub use host::{HostPage, MountError, MountedText, mount};
pub use loader::{DocumentSource, LoadError};
pub use normalize::{TATWEEL, normalize, remove_tatweel, strip_punctuation};
pub use popup::{CloseTrigger, Key, Popup, PopupCard, PopupState};
pub use reader::{Activation, Reader};
pub use render::{
    Container, ContainerContent, DispatchTable, Page, PhraseView, TextView, TokenRef, WordSpan,
    render_terminal,
};
pub use resolve::{
    MISSING_NOTE, MISSING_TRANSLATION, PhraseHint, Resolution, ResolutionSource, Resolver, WAW,
    WORD_BY_WORD_NOTE,
};
