//! web2pdf library
//!
//! Converts public web pages into PDF documents with a headless Chrome
//! instance shared across requests. A single URL yields one PDF; several
//! URLs yield a ZIP archive of the PDFs that rendered successfully.
//!
//! # Module Overview
//!
//! - [`url_guard`] - URL normalization and the private-network denylist
//! - [`browser`] - Engine session, Chrome adapter, content-settling stages
//! - [`render`] - Single-URL render pipeline, render options, filenames
//! - [`batch`] - Sequential batch conversion with progress reporting
//! - [`archive`] - ZIP bundling
//! - [`export`] - URL list in, PDF or archive out
//! - [`config`] - TOML configuration
//! - [`output`] - JSON report schemas
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use web2pdf_lib::{
//!     export, BatchConverter, ChromeLauncher, ChromeOptions, EngineSession, Export,
//!     PageRenderer, RenderOptions, MAX_URLS,
//! };
//!
//! # async fn example() -> web2pdf_lib::Result<()> {
//! let session = Arc::new(EngineSession::new(Arc::new(ChromeLauncher::new(
//!     ChromeOptions::default(),
//! ))));
//! let converter = BatchConverter::new(PageRenderer::new(Arc::clone(&session)));
//!
//! let urls = ["example.com", "https://www.rust-lang.org/learn"];
//! match export(&converter, &urls, &RenderOptions::default(), MAX_URLS, None).await? {
//!     Export::Pdf { filename, bytes, .. } => std::fs::write(filename, bytes)?,
//!     Export::Archive { filename, bytes, .. } => std::fs::write(filename, bytes)?,
//! }
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod batch;
pub mod browser;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod render;
pub mod types;
pub mod url_guard;
pub mod viewport;

pub use archive::{bundle, ArchiveEntry};
pub use batch::{BatchConverter, BatchProgress, DEFAULT_THROTTLE};
pub use browser::{
    ChromeLauncher, ChromeOptions, EngineError, EngineSession, SessionPhase, SettleSchedule,
};
pub use config::{Config, ConfigError};
pub use error::{ConversionErrorKind, ErrorCategory, ErrorPayload, Result, Web2PdfError};
pub use export::{export, prepare_urls, Export, ExportSummary, MAX_URLS};
pub use output::{
    CheckItem, CheckOutput, ConvertOutput, ErrorOutput, ItemReport, Web2PdfOutput,
    WEB2PDF_OUTPUT_VERSION,
};
pub use render::{Margins, Orientation, PageFormat, PageRenderer, RenderOptions};
pub use types::{ConversionRequest, ConversionResult};
pub use url_guard::{is_allowed_url, normalize_url};
pub use viewport::Viewport;
