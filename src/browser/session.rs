//! Shared rendering engine session.
//!
//! One [`EngineSession`] owns the single browser handle for the process.
//! It launches lazily on the first [`EngineSession::acquire`], lets every
//! concurrent caller await the same in-flight launch, and drops back to
//! `Unstarted` when the engine reports a disconnect so the next caller
//! relaunches it.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::render::PdfParams;
use crate::viewport::Viewport;

/// Raw failure reported by the rendering engine.
///
/// Cloneable so every caller waiting on one launch sees the same error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<EngineError> for crate::Web2PdfError {
    fn from(err: EngineError) -> Self {
        crate::Web2PdfError::Engine(err.0)
    }
}

/// Request categories a page context can refuse to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedResource {
    Media,
    Font,
}

/// One isolated browsing context (tab plus its own cookie jar) in the engine.
#[async_trait]
pub trait PageContext: Send + Sync {
    /// Abort every request whose resource type is in `kinds`; let the rest through.
    async fn block_resources(&self, kinds: &[BlockedResource]) -> Result<(), EngineError>;

    async fn set_viewport(&self, viewport: Viewport) -> Result<(), EngineError>;

    async fn set_user_agent(&self, user_agent: &str) -> Result<(), EngineError>;

    /// Navigate and resolve once the network has gone idle.
    async fn navigate(&self, url: &str) -> Result<(), EngineError>;

    /// Evaluate a script in the page, awaiting a returned promise.
    async fn evaluate(&self, script: &str) -> Result<Value, EngineError>;

    async fn print_to_pdf(&self, params: &PdfParams) -> Result<Vec<u8>, EngineError>;

    async fn close(self: Box<Self>) -> Result<(), EngineError>;
}

/// A live connection to the headless engine process.
#[async_trait]
pub trait Engine: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn new_page(&self) -> Result<Box<dyn PageContext>, EngineError>;

    async fn close(&self) -> Result<(), EngineError>;
}

/// Result of a successful launch: the handle plus a future that resolves
/// when the engine disconnects.
pub struct LaunchedEngine {
    pub engine: Arc<dyn Engine>,
    pub disconnected: BoxFuture<'static, ()>,
}

#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<LaunchedEngine, EngineError>;
}

/// Observable lifecycle phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unstarted,
    Launching,
    Ready,
}

type LaunchFuture = Shared<BoxFuture<'static, Result<Arc<dyn Engine>, EngineError>>>;

enum SessionState {
    Unstarted,
    Launching {
        generation: u64,
        launch: LaunchFuture,
    },
    Ready {
        generation: u64,
        engine: Arc<dyn Engine>,
    },
}

struct SessionInner {
    state: SessionState,
    next_generation: u64,
}

pub struct EngineSession {
    launcher: Arc<dyn EngineLauncher>,
    inner: Arc<Mutex<SessionInner>>,
}

impl std::fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession")
            .field("phase", &self.phase())
            .finish()
    }
}

fn lock(inner: &Mutex<SessionInner>) -> MutexGuard<'_, SessionInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EngineSession {
    pub fn new(launcher: Arc<dyn EngineLauncher>) -> Self {
        Self {
            launcher,
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Unstarted,
                next_generation: 0,
            })),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match lock(&self.inner).state {
            SessionState::Unstarted => SessionPhase::Unstarted,
            SessionState::Launching { .. } => SessionPhase::Launching,
            SessionState::Ready { .. } => SessionPhase::Ready,
        }
    }

    /// Return the live engine handle, launching it if needed.
    ///
    /// At most one launch is in flight at any time; concurrent callers await
    /// the same launch and observe the same outcome. A failed launch leaves
    /// the session `Unstarted` so the next call retries.
    pub async fn acquire(&self) -> Result<Arc<dyn Engine>, EngineError> {
        let launch = {
            let mut guard = lock(&self.inner);
            let inner = &mut *guard;
            match &inner.state {
                SessionState::Ready { engine, .. } if engine.is_connected() => {
                    return Ok(Arc::clone(engine));
                }
                SessionState::Launching { launch, .. } => launch.clone(),
                _ => {
                    let generation = inner.next_generation;
                    inner.next_generation += 1;
                    let launch = self.start_launch(generation);
                    inner.state = SessionState::Launching {
                        generation,
                        launch: launch.clone(),
                    };
                    launch
                }
            }
        };
        launch.await
    }

    fn start_launch(&self, generation: u64) -> LaunchFuture {
        let launcher = Arc::clone(&self.launcher);
        let inner = Arc::clone(&self.inner);
        async move {
            info!(generation, "launching rendering engine");
            let launched = launcher.launch().await;
            let LaunchedEngine {
                engine,
                disconnected,
            } = match launched {
                Ok(launched) => launched,
                Err(err) => {
                    warn!(generation, error = %err, "rendering engine launch failed");
                    let mut guard = lock(&inner);
                    if is_launching(&guard.state, generation) {
                        guard.state = SessionState::Unstarted;
                    }
                    return Err(err);
                }
            };

            let installed = {
                let mut guard = lock(&inner);
                if is_launching(&guard.state, generation) {
                    guard.state = SessionState::Ready {
                        generation,
                        engine: Arc::clone(&engine),
                    };
                    true
                } else {
                    false
                }
            };

            if !installed {
                // Shut down while launching; nobody owns this engine.
                if let Err(err) = engine.close().await {
                    debug!(error = %err, "closing orphaned engine failed");
                }
                return Err(EngineError::new(
                    "rendering engine session was shut down during launch",
                ));
            }

            let watcher = Arc::clone(&inner);
            tokio::spawn(async move {
                disconnected.await;
                mark_disconnected(&watcher, generation);
            });

            info!(generation, "rendering engine ready");
            Ok(engine)
        }
        .boxed()
        .shared()
    }

    /// Close the engine if one is running and reset to `Unstarted`.
    /// Close errors are logged and swallowed.
    pub async fn shutdown(&self) {
        let engine = {
            let mut inner = lock(&self.inner);
            match std::mem::replace(&mut inner.state, SessionState::Unstarted) {
                SessionState::Ready { engine, .. } => Some(engine),
                _ => None,
            }
        };
        if let Some(engine) = engine {
            info!("shutting down rendering engine");
            if let Err(err) = engine.close().await {
                warn!(error = %err, "rendering engine close failed");
            }
        }
    }
}

fn is_launching(state: &SessionState, generation: u64) -> bool {
    matches!(state, SessionState::Launching { generation: g, .. } if *g == generation)
}

fn mark_disconnected(inner: &Mutex<SessionInner>, generation: u64) {
    let mut guard = lock(inner);
    if matches!(guard.state, SessionState::Ready { generation: g, .. } if g == generation) {
        warn!(generation, "rendering engine disconnected");
        guard.state = SessionState::Unstarted;
    }
}

/// Run `fut` with an upper bound of `limit`, reporting `operation` on expiry.
pub async fn bounded<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::new(format!(
            "{operation} timed out after {} ms",
            limit.as_millis()
        ))),
    }
}
