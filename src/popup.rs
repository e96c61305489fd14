use crate::document::DictEntry;
use serde::{Deserialize, Serialize};
use tracing::debug;

const META_SEPARATOR: &str = " • ";

/// What the popup card displays for one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupCard {
    pub word: String,
    pub translation: String,
    /// `Racine : … • Catégorie : …`, either half omitted when unknown.
    pub meta: Option<String>,
    pub note: Option<String>,
}

impl PopupCard {
    pub fn new(word: impl Into<String>, entry: &DictEntry) -> Self {
        let segments: Vec<String> = [
            entry.root.as_deref().map(|root| format!("Racine : {root}")),
            entry
                .part_of_speech
                .as_deref()
                .map(|pos| format!("Catégorie : {pos}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        Self {
            word: word.into(),
            translation: entry.translation.clone(),
            meta: (!segments.is_empty()).then(|| segments.join(META_SEPARATOR)),
            note: entry.note.as_deref().map(|note| format!("Note : {note}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTrigger {
    /// Click on the dimmed area around the card.
    Backdrop,
    CloseButton,
    Escape,
}

/// Keyboard keys the reader reacts to, named after DOM `KeyboardEvent.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Escape,
    Other,
}

impl Key {
    pub fn from_dom(name: &str) -> Self {
        match name {
            "Enter" => Key::Enter,
            " " | "Spacebar" => Key::Space,
            "Escape" | "Esc" => Key::Escape,
            _ => Key::Other,
        }
    }
}

/// The word popup. One instance per page, reused for every lookup.
#[derive(Debug, Clone)]
pub struct Popup {
    state: PopupState,
    card: Option<PopupCard>,
}

impl Default for Popup {
    fn default() -> Self {
        Self::new()
    }
}

impl Popup {
    pub fn new() -> Self {
        Self {
            state: PopupState::Closed,
            card: None,
        }
    }

    /// Shows `entry` for `word`, replacing whatever was displayed before.
    pub fn open(&mut self, word: &str, entry: &DictEntry) -> &PopupCard {
        self.show(PopupCard::new(word, entry))
    }

    pub fn show(&mut self, card: PopupCard) -> &PopupCard {
        debug!(word = %card.word, "popup open");
        self.state = PopupState::Open;
        self.card.insert(card)
    }

    pub fn close(&mut self, trigger: CloseTrigger) {
        if self.state == PopupState::Open {
            debug!(?trigger, "popup close");
        }
        self.state = PopupState::Closed;
    }

    /// Returns `true` when the key closed the popup.
    pub fn handle_key(&mut self, key: Key) -> bool {
        if key == Key::Escape && self.is_open() {
            self.close(CloseTrigger::Escape);
            return true;
        }
        false
    }

    pub fn state(&self) -> PopupState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == PopupState::Open
    }

    /// The card currently on screen; `None` while closed.
    pub fn visible_card(&self) -> Option<&PopupCard> {
        match self.state {
            PopupState::Open => self.card.as_ref(),
            PopupState::Closed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_joins_root_and_category() {
        let entry = DictEntry::new("livre")
            .with_root("ك ت ب")
            .with_part_of_speech("nom");
        let card = PopupCard::new("كتاب", &entry);
        assert_eq!(
            card.meta.as_deref(),
            Some("Racine : ك ت ب • Catégorie : nom")
        );
        assert_eq!(card.note, None);
    }

    #[test]
    fn meta_omits_missing_segments() {
        let root_only = PopupCard::new("w", &DictEntry::new("x").with_root("ك ت ب"));
        assert_eq!(root_only.meta.as_deref(), Some("Racine : ك ت ب"));
        let pos_only = PopupCard::new("w", &DictEntry::new("x").with_part_of_speech("verbe"));
        assert_eq!(pos_only.meta.as_deref(), Some("Catégorie : verbe"));
        let neither = PopupCard::new("w", &DictEntry::new("x").with_note("rare"));
        assert_eq!(neither.meta, None);
        assert_eq!(neither.note.as_deref(), Some("Note : rare"));
    }

    #[test]
    fn starts_closed() {
        let popup = Popup::new();
        assert_eq!(popup.state(), PopupState::Closed);
        assert!(popup.visible_card().is_none());
    }

    #[test]
    fn open_then_close_hides_card() {
        let mut popup = Popup::new();
        popup.open("كتاب", &DictEntry::new("livre"));
        assert!(popup.is_open());
        popup.close(CloseTrigger::Backdrop);
        assert_eq!(popup.state(), PopupState::Closed);
        assert!(popup.visible_card().is_none());
    }

    #[test]
    fn reopening_overwrites_every_field() {
        let mut popup = Popup::new();
        popup.open(
            "كتاب",
            &DictEntry::new("livre")
                .with_root("ك ت ب")
                .with_note("masculin"),
        );
        popup.close(CloseTrigger::CloseButton);
        popup.open("قلم", &DictEntry::new("stylo"));
        let card = popup.visible_card().unwrap();
        assert_eq!(card.word, "قلم");
        assert_eq!(card.translation, "stylo");
        assert_eq!(card.meta, None);
        assert_eq!(card.note, None);
    }

    #[test]
    fn open_while_open_replaces_in_place() {
        let mut popup = Popup::new();
        popup.open("a", &DictEntry::new("1"));
        popup.open("b", &DictEntry::new("2"));
        assert!(popup.is_open());
        assert_eq!(popup.visible_card().unwrap().word, "b");
    }

    #[test]
    fn escape_closes_only_when_open() {
        let mut popup = Popup::new();
        assert!(!popup.handle_key(Key::Escape));
        popup.open("a", &DictEntry::new("1"));
        assert!(!popup.handle_key(Key::Enter));
        assert!(popup.handle_key(Key::Escape));
        assert!(!popup.is_open());
    }

    #[test]
    fn dom_key_names() {
        assert_eq!(Key::from_dom("Enter"), Key::Enter);
        assert_eq!(Key::from_dom(" "), Key::Space);
        assert_eq!(Key::from_dom("Escape"), Key::Escape);
        assert_eq!(Key::from_dom("a"), Key::Other);
    }
}
