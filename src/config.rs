//! Build-time knobs for the reader.
//!
//! The widget has exactly two settings and both are fixed at compile time:
//! where the vocabulary document lives and whether hovering a word counts as
//! an activation. Everything else (listen address, output paths) belongs to
//! the CLI or the web server.

/// Default location of the vocabulary document. Relative paths are resolved
/// against the working directory; `http(s)://` values are fetched.
pub const DOCUMENT_URL: &str = "./vocabAR.json";

/// File name shown in the generic load-failure message.
pub const DOCUMENT_NAME: &str = "vocabAR.json";

/// Set to `true` to open the popup when the pointer enters a word (desktop).
pub const ENABLE_HOVER: bool = false;

/// CSS selector of the mount point on the host page.
pub const CONTAINER_SELECTOR: &str = ".text[lang='ar']";
