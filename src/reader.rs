use crate::config::ENABLE_HOVER;
use crate::document::VocabDocument;
use crate::host::{HostPage, MountError, MountedText, mount};
use crate::popup::{CloseTrigger, Key, Popup, PopupCard};
use crate::render::{Container, DispatchTable, TextView, TokenRef};
use tracing::debug;

/// How a word was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Click,
    Enter,
    Space,
    Hover,
}

impl Activation {
    /// Keyboard activation for a focused word.
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::Enter => Some(Activation::Enter),
            Key::Space => Some(Activation::Space),
            _ => None,
        }
    }
}

/// One mounted text with its container and the page's popup.
///
/// The popup is created on the first activation and then reused, so a
/// reader never holds more than one.
pub struct Reader<'d> {
    mounted: MountedText<'d>,
    container: Container,
    dispatch: DispatchTable,
    popup: Option<Popup>,
    hover: bool,
}

impl<'d> Reader<'d> {
    pub fn mount(document: &'d VocabDocument, host: &HostPage) -> Result<Self, MountError> {
        let mounted = mount(host, Ok(document))?;
        let mut reader = Self {
            mounted,
            container: Container::default(),
            dispatch: DispatchTable::default(),
            popup: None,
            hover: ENABLE_HOVER,
        };
        reader.render();
        Ok(reader)
    }

    pub fn with_hover(mut self, enabled: bool) -> Self {
        self.hover = enabled;
        self
    }

    /// Rebuilds the container and dispatch table from the text. Safe to call
    /// repeatedly; previous content is replaced.
    pub fn render(&mut self) {
        self.container.show_text(TextView::build(self.mounted.text));
        self.dispatch = DispatchTable::build(self.mounted.text);
    }

    pub fn text_id(&self) -> &'d str {
        self.mounted.id
    }

    pub fn view(&self) -> Option<&TextView> {
        self.container.view()
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    /// Resolves the word at `at` and opens the popup on it. Returns `None`
    /// when the position is not clickable or a hover arrives while hover
    /// lookups are disabled.
    pub fn activate(&mut self, at: TokenRef, how: Activation) -> Option<&PopupCard> {
        if how == Activation::Hover && !self.hover {
            return None;
        }
        self.dispatch.get(at)?;
        let card = self.mounted.card_for(at)?;
        debug!(text = self.mounted.id, %at, ?how, "word activated");
        Some(self.popup.get_or_insert_with(Popup::new).show(card))
    }

    /// Keyboard input while the word at `focused` has focus.
    pub fn handle_key(&mut self, focused: Option<TokenRef>, key: Key) -> Option<&PopupCard> {
        if let Some(popup) = self.popup.as_mut() {
            if popup.handle_key(key) {
                return None;
            }
        }
        let how = Activation::from_key(key)?;
        self.activate(focused?, how)
    }

    /// Looks up a word that is not in the text.
    pub fn lookup_word(&mut self, raw: &str) -> &PopupCard {
        let card = self.mounted.card_for_word(raw);
        self.popup.get_or_insert_with(Popup::new).show(card)
    }

    pub fn close(&mut self, trigger: CloseTrigger) {
        if let Some(popup) = self.popup.as_mut() {
            popup.close(trigger);
        }
    }

    /// `None` until the first activation creates the popup.
    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn visible_card(&self) -> Option<&PopupCard> {
        self.popup.as_ref().and_then(Popup::visible_card)
    }
}
