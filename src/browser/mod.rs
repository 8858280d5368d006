//! Headless rendering engine plumbing.
//!
//! # Module Structure
//!
//! - [`session`] - Engine traits and the shared single-flight session
//! - [`chrome`] - Chrome DevTools Protocol implementation of the engine traits
//! - [`settle`] - Content-settling stages run before capture
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use web2pdf_lib::browser::{ChromeLauncher, ChromeOptions, EngineSession};
//!
//! # async fn example() -> web2pdf_lib::Result<()> {
//! let session = EngineSession::new(Arc::new(ChromeLauncher::new(ChromeOptions::default())));
//! let engine = session.acquire().await?;
//! let page = engine.new_page().await?;
//! page.navigate("https://example.com").await?;
//! page.close().await?;
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod chrome;
pub mod session;
pub mod settle;
#[cfg(test)]
pub(crate) mod testing;

pub use chrome::{
    ChromeLauncher, ChromeOptions, CHROME_ARGS, DEFAULT_LAUNCH_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
pub use session::{
    bounded, BlockedResource, Engine, EngineError, EngineLauncher, EngineSession,
    LaunchedEngine, PageContext, SessionPhase,
};
pub use settle::{SettleSchedule, SettleStage};
