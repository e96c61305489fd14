use crate::config::DOCUMENT_URL;
use crate::document::VocabDocument;
use reqwest::header::CACHE_CONTROL;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} while loading {url}")]
    Status { status: u16, url: String },
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the vocabulary document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Path(PathBuf),
    Url(String),
}

impl Default for DocumentSource {
    fn default() -> Self {
        Self::from(DOCUMENT_URL)
    }
}

impl From<&str> for DocumentSource {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            DocumentSource::Url(trimmed.to_string())
        } else {
            DocumentSource::Path(PathBuf::from(trimmed))
        }
    }
}

impl FromStr for DocumentSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Path(path) => write!(f, "{}", path.display()),
            DocumentSource::Url(url) => write!(f, "{url}"),
        }
    }
}

impl DocumentSource {
    /// Fetches, parses and validates the document. URLs are requested with
    /// `Cache-Control: no-cache` and any non-2xx status is an error. There
    /// is no retry.
    pub async fn load(&self) -> Result<VocabDocument, LoadError> {
        let bytes = match self {
            DocumentSource::Path(path) => read_path(path)?,
            DocumentSource::Url(url) => fetch_url(url).await?,
        };
        let document = VocabDocument::from_slice(&bytes)?;
        info!(
            source = %self,
            texts = document.texts.len(),
            words = document.dictionary.len(),
            "Loaded vocabulary document"
        );
        Ok(document)
    }

    /// Synchronous variant for file sources, used by tooling that has no
    /// runtime at hand.
    pub fn load_path(path: impl Into<PathBuf>) -> Result<VocabDocument, LoadError> {
        let path = path.into();
        let bytes = read_path(&path)?;
        VocabDocument::from_slice(&bytes)
    }
}

fn read_path(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn fetch_url(url: &str) -> Result<Vec<u8>, LoadError> {
    let response = reqwest::Client::new()
        .get(url)
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response.bytes().await?.to_vec())
}
