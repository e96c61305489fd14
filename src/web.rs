use crate::{
    DocumentSource, HostPage, LoadError, MountError, Page, PhraseHint, PopupCard,
    ResolutionSource, VocabDocument, mount,
};
use askama::Template;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info};

type SharedState = Arc<AppState>;

/// The document is loaded once at startup. A failed load is kept so every
/// page can show the inline error instead of the server refusing to start.
pub struct AppState {
    pub source: DocumentSource,
    pub document: Result<VocabDocument, LoadError>,
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub source: DocumentSource,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            source: DocumentSource::default(),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let document = config.source.load().await;
    if let Err(err) = &document {
        error!(source = %config.source, error = %err, "Failed to load vocabulary document");
    }
    let state = Arc::new(AppState {
        source: config.source.clone(),
        document,
    });
    let router = build_router(state);
    info!(%config.addr, source = %config.source, "Binding HTTP listener");
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }
}

impl From<MountError> for ApiError {
    fn from(value: MountError) -> Self {
        match value {
            MountError::MissingContainer | MountError::MissingTextId => {
                ApiError::bad_request("Query parameter `text` is required")
            }
            MountError::TextNotFound { .. } => ApiError::not_found(value.to_string()),
            MountError::InvalidText { .. } => ApiError::unprocessable(value.to_string()),
            MountError::LoadFailed => ApiError::unavailable(value.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/text", get(text_html))
        .route("/vocabAR.json", get(document_json))
        .route("/api/lookup", get(api_lookup))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": if state.document.is_ok() { "ok" } else { "degraded" },
        "service": "vocabar-web",
        "source": state.source.to_string(),
    }))
}

async fn home(State(state): State<SharedState>) -> impl IntoResponse {
    let texts = match &state.document {
        Ok(document) => document
            .texts
            .iter()
            .map(|(id, text)| TextLink {
                id,
                title: &text.title,
                href: text_path(id),
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    let template = HomeTemplate {
        texts,
        error: state
            .document
            .as_ref()
            .err()
            .map(|_| MountError::LoadFailed.to_string()),
        version: env!("CARGO_PKG_VERSION"),
    };
    Html(template.render().unwrap_or_else(render_error_page))
}

#[derive(Debug, Deserialize)]
struct TextParams {
    id: Option<String>,
}

async fn text_html(
    State(state): State<SharedState>,
    Query(params): Query<TextParams>,
) -> impl IntoResponse {
    let host = HostPage::new(params.id);
    let page = Page::build(&host, state.document.as_ref()).unwrap_or_default();
    Html(page.to_html().unwrap_or_else(render_error_page))
}

async fn document_json(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let document = state
        .document
        .as_ref()
        .map_err(|_| ApiError::unavailable(MountError::LoadFailed.to_string()))?;
    Ok(([(header::CACHE_CONTROL, "no-cache")], Json(document)).into_response())
}

#[derive(Debug, Deserialize)]
struct LookupParams {
    text: Option<String>,
    word: Option<String>,
    phrase: Option<usize>,
    token: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LookupPayload {
    text: String,
    key: String,
    source: ResolutionSource,
    card: PopupCard,
}

async fn api_lookup(
    State(state): State<SharedState>,
    Query(params): Query<LookupParams>,
) -> Result<Json<LookupPayload>, ApiError> {
    let host = HostPage::new(params.text.clone());
    let mounted = mount(&host, state.document.as_ref())?;

    let resolution = match (params.phrase, params.token, params.word.as_deref()) {
        (Some(phrase_idx), Some(token_idx), _) => {
            let phrase = mounted.text.phrases.get(phrase_idx).ok_or_else(|| {
                ApiError::not_found(format!("No phrase #{phrase_idx} in text {:?}", mounted.id))
            })?;
            let token = phrase.tokens.get(token_idx).ok_or_else(|| {
                ApiError::not_found(format!("No token #{token_idx} in phrase #{phrase_idx}"))
            })?;
            mounted.lookup(
                &token.text,
                Some(PhraseHint {
                    phrase,
                    index: token_idx,
                }),
            )
        }
        (_, _, Some(word)) if !word.trim().is_empty() => mounted.lookup(word, None),
        _ => {
            return Err(ApiError::bad_request(
                "Provide either `word` or both `phrase` and `token` query parameters.",
            ));
        }
    };

    Ok(Json(LookupPayload {
        text: mounted.id.to_string(),
        card: PopupCard::new(resolution.key.clone(), &resolution.entry),
        key: resolution.key,
        source: resolution.source,
    }))
}

struct TextLink<'a> {
    id: &'a str,
    title: &'a str,
    href: String,
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

fn text_path(id: &str) -> String {
    format!("/text?id={}", encode_component(id))
}

fn render_error_page(err: askama::Error) -> String {
    error!(error = %err, "template rendering failed");
    ErrorTemplate {
        message: err.to_string(),
    }
    .render()
    .unwrap_or_else(|_| "Something went wrong".to_string())
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="fr">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Vocabulaire • Textes</title>
  </head>
  <body>
    <main>
      <p>vocabar v{{ version }}</p>
      <h1>Textes</h1>
      {% match error %}
      {% when Some with (message) %}
      <p class="error">{{ message }}</p>
      {% when None %}
      {% endmatch %}
      <ul>
        {% for text in texts %}
        <li><a href="{{ text.href }}" lang="ar" dir="rtl">{{ text.title }}</a> <code>{{ text.id }}</code></li>
        {% endfor %}
      </ul>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct HomeTemplate<'a> {
    texts: Vec<TextLink<'a>>,
    error: Option<String>,
    version: &'static str,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="fr">
  <head>
    <meta charset="utf-8" />
    <title>Vocabulaire • Erreur</title>
  </head>
  <body>
    <main>
      <h1>Something went wrong</h1>
      <p>{{ message }}</p>
      <a href="/">Back to home</a>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct ErrorTemplate {
    message: String,
}
