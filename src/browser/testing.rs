//! In-process engine used by unit tests; no browser is launched.
//!
//! Outcome is picked from the URL:
//! - `unresolvable` fails name resolution, `refused` refuses the connection,
//!   `slow` never reaches network idle;
//! - after navigation, `broken-script` makes the scroll script throw,
//!   `hung-script` makes it never return, `pdf-fails` makes printing fail.
//!
//! Everything else renders a payload of `%PDF-` followed by the URL.

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::session::{
    BlockedResource, Engine, EngineError, EngineLauncher, EngineSession, LaunchedEngine,
    PageContext,
};
use crate::render::PdfParams;
use crate::viewport::Viewport;

#[derive(Debug, Default)]
pub(crate) struct Recorder {
    events: Mutex<Vec<String>>,
    pub launches: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pdf_params: Mutex<Vec<PdfParams>>,
}

impl Recorder {
    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_pdf_params(&self) -> Option<PdfParams> {
        self.pdf_params.lock().unwrap().last().copied()
    }
}

pub(crate) struct FakeLauncher {
    pub recorder: Arc<Recorder>,
}

impl FakeLauncher {
    /// A session backed by a fresh fake engine, plus the recorder observing it.
    pub fn session() -> (Arc<EngineSession>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let launcher = Arc::new(FakeLauncher {
            recorder: Arc::clone(&recorder),
        });
        (Arc::new(EngineSession::new(launcher)), recorder)
    }
}

#[async_trait]
impl EngineLauncher for FakeLauncher {
    async fn launch(&self) -> Result<LaunchedEngine, EngineError> {
        self.recorder.launches.fetch_add(1, Ordering::SeqCst);
        Ok(LaunchedEngine {
            engine: Arc::new(FakeEngine {
                recorder: Arc::clone(&self.recorder),
            }),
            disconnected: futures::future::pending().boxed(),
        })
    }
}

struct FakeEngine {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl Engine for FakeEngine {
    fn is_connected(&self) -> bool {
        true
    }

    async fn new_page(&self) -> Result<Box<dyn PageContext>, EngineError> {
        self.recorder.pages_opened.fetch_add(1, Ordering::SeqCst);
        self.recorder.push("new_page");
        Ok(Box::new(FakePage {
            recorder: Arc::clone(&self.recorder),
            url: Mutex::new(String::new()),
        }))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.recorder.push("engine_close");
        Ok(())
    }
}

struct FakePage {
    recorder: Arc<Recorder>,
    url: Mutex<String>,
}

#[async_trait]
impl PageContext for FakePage {
    async fn block_resources(&self, kinds: &[BlockedResource]) -> Result<(), EngineError> {
        self.recorder.push(format!("block:{kinds:?}"));
        Ok(())
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<(), EngineError> {
        self.recorder.push(format!("viewport:{viewport}"));
        Ok(())
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<(), EngineError> {
        self.recorder.push(format!("user_agent:{user_agent}"));
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), EngineError> {
        self.recorder.push(format!("navigate:{url}"));
        *self.url.lock().unwrap() = url.to_string();
        if url.contains("unresolvable") {
            return Err(EngineError::new(format!(
                "net::ERR_NAME_NOT_RESOLVED at {url}"
            )));
        }
        if url.contains("refused") {
            return Err(EngineError::new(format!(
                "net::ERR_CONNECTION_REFUSED at {url}"
            )));
        }
        if url.contains("slow") {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, EngineError> {
        if script.contains("scrollBy") {
            self.recorder.push("evaluate:scroll");
            let url = self.url.lock().unwrap().clone();
            if url.contains("broken-script") {
                return Err(EngineError::new(
                    "Evaluation failed: ReferenceError: lazyLoad is not defined",
                ));
            }
            if url.contains("hung-script") {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(json!(400))
        } else if script.contains("querySelectorAll('img')") {
            self.recorder.push("evaluate:images");
            Ok(json!(0))
        } else {
            self.recorder.push("evaluate:other");
            Ok(Value::Null)
        }
    }

    async fn print_to_pdf(&self, params: &PdfParams) -> Result<Vec<u8>, EngineError> {
        self.recorder.push("pdf");
        self.recorder.pdf_params.lock().unwrap().push(*params);
        let url = self.url.lock().unwrap().clone();
        if url.contains("pdf-fails") {
            return Err(EngineError::new("Printing failed"));
        }
        Ok(format!("%PDF-{url}").into_bytes())
    }

    async fn close(self: Box<Self>) -> Result<(), EngineError> {
        self.recorder.pages_closed.fetch_add(1, Ordering::SeqCst);
        self.recorder.push("close");
        Err(EngineError::new("close errors are swallowed"))
    }
}
