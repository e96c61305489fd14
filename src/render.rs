use crate::config::{CONTAINER_SELECTOR, ENABLE_HOVER};
use crate::document::{TextEntry, VocabDocument};
use crate::host::{HostPage, MountError, MountedText, mount};
use crate::loader::LoadError;
use crate::popup::PopupCard;
use askama::Template;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Position of a token: phrase index, then token index inside the phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TokenRef {
    pub phrase: usize,
    pub token: usize,
}

impl TokenRef {
    pub const fn new(phrase: usize, token: usize) -> Self {
        Self { phrase, token }
    }
}

impl fmt::Display for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.phrase, self.token)
    }
}

impl FromStr for TokenRef {
    type Err = String;

    /// Accepts `P.T` or `P T`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(|c: char| c == '.' || c.is_whitespace());
        let mut next = |label: &str| {
            parts
                .next()
                .filter(|part| !part.is_empty())
                .ok_or_else(|| format!("missing {label} index in {s:?}"))?
                .parse::<usize>()
                .map_err(|_| format!("invalid {label} index in {s:?}"))
        };
        let phrase = next("phrase")?;
        let token = next("token")?;
        Ok(Self { phrase, token })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSpan {
    pub text: String,
    pub at: TokenRef,
    pub clickable: bool,
}

impl WordSpan {
    pub fn class(&self) -> &'static str {
        if self.clickable { "w clickable" } else { "w" }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseView {
    pub spans: Vec<WordSpan>,
    pub fluent: String,
    pub word_by_word: String,
}

impl PhraseView {
    /// Words joined by single spaces, in token order.
    pub fn line(&self) -> String {
        self.spans
            .iter()
            .map(|span| span.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything the container shows for one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextView {
    pub title: String,
    pub phrases: Vec<PhraseView>,
}

impl TextView {
    pub fn build(text: &TextEntry) -> Self {
        let phrases = text
            .phrases
            .iter()
            .enumerate()
            .map(|(phrase_idx, phrase)| PhraseView {
                spans: phrase
                    .tokens
                    .iter()
                    .enumerate()
                    .map(|(token_idx, token)| WordSpan {
                        text: token.text.clone(),
                        at: TokenRef::new(phrase_idx, token_idx),
                        clickable: token.clickable,
                    })
                    .collect(),
                fluent: phrase.fluent_translation.clone(),
                word_by_word: phrase.word_by_word_translation.clone(),
            })
            .collect();
        Self {
            title: text.title.clone(),
            phrases,
        }
    }

    pub fn clickable_count(&self) -> usize {
        self.phrases
            .iter()
            .flat_map(|phrase| &phrase.spans)
            .filter(|span| span.clickable)
            .count()
    }
}

/// Clickable token positions and the raw text each one looks up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchTable {
    bindings: BTreeMap<TokenRef, String>,
}

impl DispatchTable {
    pub fn build(text: &TextEntry) -> Self {
        let bindings = text
            .phrases
            .iter()
            .enumerate()
            .flat_map(|(phrase_idx, phrase)| {
                phrase
                    .tokens
                    .iter()
                    .enumerate()
                    .filter(|(_, token)| token.clickable)
                    .map(move |(token_idx, token)| {
                        (TokenRef::new(phrase_idx, token_idx), token.text.clone())
                    })
            })
            .collect();
        Self { bindings }
    }

    pub fn get(&self, at: TokenRef) -> Option<&str> {
        self.bindings.get(&at).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn refs(&self) -> impl Iterator<Item = TokenRef> + '_ {
        self.bindings.keys().copied()
    }

    /// Resolves every binding up front, keyed by `P.T`.
    pub fn cards(&self, mounted: &MountedText<'_>) -> BTreeMap<String, PopupCard> {
        self.refs()
            .filter_map(|at| mounted.card_for(at).map(|card| (at.to_string(), card)))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContainerContent {
    #[default]
    Empty,
    Text(TextView),
    Error(String),
}

/// The mount point. Every update replaces what was there.
#[derive(Debug, Clone, Default)]
pub struct Container {
    content: ContainerContent,
}

impl Container {
    pub fn show_text(&mut self, view: TextView) {
        self.content = ContainerContent::Text(view);
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.content = ContainerContent::Error(message.into());
    }

    pub fn clear(&mut self) {
        self.content = ContainerContent::Empty;
    }

    pub fn content(&self) -> &ContainerContent {
        &self.content
    }

    pub fn view(&self) -> Option<&TextView> {
        match &self.content {
            ContainerContent::Text(view) => Some(view),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.content {
            ContainerContent::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// A host page after mounting: container content plus the pre-resolved
/// popup cards for each clickable word.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub text_id: Option<String>,
    pub container: Container,
    pub cards: BTreeMap<String, PopupCard>,
}

impl Page {
    /// Returns `None` when the host has no container to render into.
    pub fn build(host: &HostPage, document: Result<&VocabDocument, &LoadError>) -> Option<Self> {
        let mut page = Page {
            text_id: host.text_id().map(str::to_string),
            ..Default::default()
        };
        match mount(host, document) {
            Ok(mounted) => {
                page.container.show_text(TextView::build(mounted.text));
                page.cards = DispatchTable::build(mounted.text).cards(&mounted);
            }
            Err(MountError::MissingContainer) => return None,
            Err(err) => page.container.show_error(err.to_string()),
        }
        Some(page)
    }

    pub fn to_html(&self) -> Result<String, askama::Error> {
        let cards_json = serde_json::to_string(&self.cards)
            .map_err(|err| askama::Error::Custom(Box::new(err)))?
            .replace("</", "<\\/");
        PageTemplate {
            text_id: self.text_id.as_deref().unwrap_or_default(),
            title: self
                .container
                .view()
                .map(|view| view.title.as_str())
                .unwrap_or("Vocabulaire"),
            view: self.container.view(),
            error: self.container.error(),
            cards_json,
            hover: ENABLE_HOVER,
            container_selector: CONTAINER_SELECTOR,
        }
        .render()
    }
}

/// Plain-text rendering for terminals. Clickable words carry their `P.T`
/// reference so they can be activated by typing it.
pub fn render_terminal(view: &TextView) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n", view.title));
    for (idx, phrase) in view.phrases.iter().enumerate() {
        let words: Vec<String> = phrase
            .spans
            .iter()
            .map(|span| {
                if span.clickable {
                    format!("{}[{}]", span.text, span.at)
                } else {
                    span.text.clone()
                }
            })
            .collect();
        out.push_str(&format!("\n{}. {}\n", idx, words.join(" ")));
        if !phrase.fluent.is_empty() {
            out.push_str(&format!("   ✅ {}\n", phrase.fluent));
        }
        if !phrase.word_by_word.is_empty() {
            out.push_str(&format!("   🔍 {}\n", phrase.word_by_word));
        }
    }
    out
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="fr">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{ title }}</title>
    <style>
      .text { direction: rtl; line-height: 1.9; }
      .phrase { margin: 16px 0; padding: 12px; border: 1px solid #eee; border-radius: 12px; }
      .ar-line { font-size: 22px; }
      .w { padding: 2px 4px; border-radius: 8px; }
      .clickable { cursor: pointer; background: rgba(0,0,0,0.05); }
      .clickable:hover, .clickable:focus { background: rgba(0,0,0,0.1); }
      .tr { direction: ltr; font-size: 14px; margin-top: 8px; }
      .error { direction: ltr; color: #a40000; }
      #vocab-popup { position: fixed; inset: 0; display: none; align-items: center; justify-content: center; background: rgba(0,0,0,.45); z-index: 9999; }
      #vocab-popup.open { display: flex; }
      .vp-card { background: #fff; padding: 16px; border-radius: 14px; max-width: 520px; width: 95vw; position: relative; }
      .vp-close { position: absolute; top: 8px; right: 8px; }
      .vp-ar { direction: rtl; font-size: 26px; font-weight: bold; }
      .vp-fr { font-size: 18px; margin-top: 6px; }
      .vp-meta { font-size: 13px; opacity: .8; margin-top: 4px; }
      .vp-note { font-size: 14px; margin-top: 6px; }
    </style>
  </head>
  <body data-text-id="{{ text_id }}">
    <div class="text" lang="ar">
      {% match error %}
      {% when Some with (message) %}
      <p class="error">{{ message }}</p>
      {% when None %}
      {% endmatch %}
      {% match view %}
      {% when Some with (view) %}
      <h1>{{ view.title }}</h1>
      {% for phrase in view.phrases %}
      <div class="phrase">
        <div class="ar-line">{% for span in phrase.spans %}{% if !loop.first %} {% endif %}{% if span.clickable %}<span class="{{ span.class() }}" data-ref="{{ span.at }}" tabindex="0" role="button">{{ span.text }}</span>{% else %}<span class="{{ span.class() }}">{{ span.text }}</span>{% endif %}{% endfor %}</div>
        <div class="tr">
          <div class="fr">✅ {{ phrase.fluent }}</div>
          <div class="wbw">🔍 {{ phrase.word_by_word }}</div>
        </div>
      </div>
      {% endfor %}
      {% when None %}
      {% endmatch %}
    </div>
    <script type="application/json" id="vocab-cards">{{ cards_json|safe }}</script>
    <script>
    (() => {
      "use strict";
      const HOVER = {{ hover }};
      const cards = JSON.parse(document.getElementById("vocab-cards").textContent || "{}");
      const container = document.querySelector("{{ container_selector|safe }}");
      let popup = null;
      function closePopup() { if (popup) popup.classList.remove("open"); }
      function ensurePopup() {
        if (popup) return popup;
        popup = document.createElement("div");
        popup.id = "vocab-popup";
        popup.innerHTML = '<div class="vp-card" role="dialog" aria-modal="true"><button class="vp-close" aria-label="Fermer">×</button><div class="vp-ar"></div><div class="vp-fr"></div><div class="vp-meta"></div><div class="vp-note"></div></div>';
        document.body.appendChild(popup);
        popup.addEventListener("click", e => e.target === popup && closePopup());
        popup.querySelector(".vp-close").addEventListener("click", closePopup);
        document.addEventListener("keydown", e => e.key === "Escape" && closePopup());
        return popup;
      }
      function openPopup(card) {
        const p = ensurePopup();
        p.querySelector(".vp-ar").textContent = card.word;
        p.querySelector(".vp-fr").textContent = card.translation || "";
        p.querySelector(".vp-meta").textContent = card.meta || "";
        p.querySelector(".vp-note").textContent = card.note || "";
        p.classList.add("open");
      }
      function activate(span) {
        const card = cards[span.dataset.ref];
        if (card) openPopup(card);
      }
      if (!container) return;
      container.querySelectorAll(".clickable").forEach(span => {
        span.addEventListener("click", () => activate(span));
        span.addEventListener("keydown", e => {
          if (e.key === "Enter" || e.key === " ") {
            e.preventDefault();
            activate(span);
          }
        });
        if (HOVER) span.addEventListener("mouseenter", () => activate(span));
      });
    })();
    </script>
  </body>
</html>"#,
    ext = "html"
)]
struct PageTemplate<'a> {
    text_id: &'a str,
    title: &'a str,
    view: Option<&'a TextView>,
    error: Option<&'a str>,
    cards_json: String,
    hover: bool,
    container_selector: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DictEntry, Phrase, Token};

    fn sample_text() -> TextEntry {
        TextEntry {
            title: "الدرس".to_string(),
            phrases: vec![
                Phrase {
                    tokens: vec![
                        Token::new("ذهب", true),
                        Token::new("الولد", true),
                        Token::new("،", false),
                    ],
                    fluent_translation: "Le garçon est parti.".to_string(),
                    word_by_word_translation: "partit / le garçon".to_string(),
                },
                Phrase {
                    tokens: vec![Token::new("كتاب", true)],
                    fluent_translation: "Un livre.".to_string(),
                    word_by_word_translation: "livre".to_string(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn view_keeps_token_order_and_flags() {
        let view = TextView::build(&sample_text());
        assert_eq!(view.title, "الدرس");
        assert_eq!(view.phrases.len(), 2);
        assert_eq!(view.phrases[0].line(), "ذهب الولد ،");
        assert_eq!(view.phrases[0].spans[2].class(), "w");
        assert_eq!(view.phrases[0].spans[1].class(), "w clickable");
        assert_eq!(view.phrases[0].spans[1].at, TokenRef::new(0, 1));
        assert_eq!(view.clickable_count(), 3);
    }

    #[test]
    fn dispatch_table_binds_only_clickable_tokens() {
        let table = DispatchTable::build(&sample_text());
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(TokenRef::new(0, 1)), Some("الولد"));
        assert_eq!(table.get(TokenRef::new(0, 2)), None);
        assert_eq!(table.get(TokenRef::new(1, 0)), Some("كتاب"));
    }

    #[test]
    fn token_ref_parses_both_forms() {
        assert_eq!("1.2".parse::<TokenRef>(), Ok(TokenRef::new(1, 2)));
        assert_eq!(" 0 3 ".parse::<TokenRef>(), Ok(TokenRef::new(0, 3)));
        assert!("1".parse::<TokenRef>().is_err());
        assert!("a.b".parse::<TokenRef>().is_err());
        assert_eq!(TokenRef::new(4, 5).to_string(), "4.5");
    }

    #[test]
    fn container_replaces_previous_content() {
        let mut container = Container::default();
        container.show_text(TextView::build(&sample_text()));
        container.show_text(TextView::build(&sample_text()));
        assert_eq!(container.view().map(|v| v.phrases.len()), Some(2));
        container.show_error("Erreur");
        assert!(container.view().is_none());
        assert_eq!(container.error(), Some("Erreur"));
        container.clear();
        assert_eq!(container.content(), &ContainerContent::Empty);
    }

    #[test]
    fn page_html_has_spans_cards_and_host_contract() {
        let mut doc = VocabDocument::default();
        doc.texts.insert("lesson".to_string(), sample_text());
        doc.dictionary
            .insert("كتاب".to_string(), DictEntry::new("livre").with_root("ك ت ب"));
        let page = Page::build(&HostPage::new(Some("lesson".into())), Ok(&doc)).unwrap();
        let html = page.to_html().unwrap();
        assert!(html.contains(r#"<body data-text-id="lesson">"#));
        assert!(html.contains(r#"<div class="text" lang="ar">"#));
        assert!(html.contains(r#"data-ref="1.0" tabindex="0" role="button">كتاب</span>"#));
        assert!(html.contains(r#"<span class="w">،</span>"#));
        assert!(html.contains("const HOVER = false;"));
        assert_eq!(html.matches("<div class=\"phrase\">").count(), 2);
        assert_eq!(page.cards["1.0"].translation, "livre");
        assert_eq!(page.cards["0.1"].translation, "le garçon");
        assert!(!page.cards.contains_key("0.2"));
    }

    #[test]
    fn page_shows_inline_error() {
        let doc = VocabDocument::default();
        let page = Page::build(&HostPage::new(None), Ok(&doc)).unwrap();
        let html = page.to_html().unwrap();
        assert!(html.contains("Erreur : data-text-id manquant sur &lt;body&gt;."));
        assert!(page.cards.is_empty());
    }

    #[test]
    fn page_without_container_is_not_built() {
        let doc = VocabDocument::default();
        let host = HostPage {
            has_container: false,
            text_id: Some("x".into()),
        };
        assert!(Page::build(&host, Ok(&doc)).is_none());
    }

    #[test]
    fn card_json_cannot_close_script_tag() {
        let mut text = sample_text();
        text.phrases[1].tokens[0] = Token::new("</script>", true);
        let mut doc = VocabDocument::default();
        doc.texts.insert("x".to_string(), text);
        let page = Page::build(&HostPage::new(Some("x".into())), Ok(&doc)).unwrap();
        let html = page.to_html().unwrap();
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn embedded_card_table_matches_page_cards() {
        let mut doc = VocabDocument::default();
        doc.texts.insert("x".to_string(), sample_text());
        let page = Page::build(&HostPage::new(Some("x".into())), Ok(&doc)).unwrap();
        assert!(!page.cards.is_empty());
        let html = page.to_html().unwrap();
        let start = html.find(r#"id="vocab-cards">"#).unwrap() + r#"id="vocab-cards">"#.len();
        let end = start + html[start..].find("</script>").unwrap();
        let embedded: BTreeMap<String, PopupCard> =
            serde_json::from_str(&html[start..end]).unwrap();
        assert_eq!(embedded, page.cards);
    }

    #[test]
    fn terminal_marks_clickable_words() {
        let out = render_terminal(&TextView::build(&sample_text()));
        assert!(out.starts_with("# الدرس\n"));
        assert!(out.contains("ذهب[0.0] الولد[0.1] ،"));
        assert!(out.contains("✅ Un livre."));
    }
}
