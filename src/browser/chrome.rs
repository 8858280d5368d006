//! Chrome DevTools Protocol implementation of the engine traits.
//!
//! Chrome is launched once through chromiumoxide; its CDP event handler is
//! driven on a spawned task, and the end of that handler stream is reported
//! as the engine disconnect.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FailRequestParams, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, LoaderId, ResourceType, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, FrameId, NavigateParams, NavigateReturns, PrintToPdfParams,
    SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::{FutureExt, StreamExt};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::session::{
    BlockedResource, Engine, EngineError, EngineLauncher, LaunchedEngine, PageContext,
};
use crate::render::PdfParams;
use crate::viewport::Viewport;

/// Default time allowed for Chrome to start and expose its DevTools endpoint.
pub const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline chromiumoxide applies to each CDP command. It sits above the
/// pipeline's own per-operation bounds so those are the ones that fire.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const REQUEST_TIMEOUT_HEADROOM: Duration = Duration::from_secs(5);

/// Flags tuned for running headless on a server. The sandbox is disabled,
/// which is a stability tradeoff, not a security feature.
pub const CHROME_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-software-rasterizer",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-default-apps",
    "--disable-sync",
    "--disable-translate",
    "--hide-scrollbars",
    "--metrics-recording-only",
    "--mute-audio",
    "--no-first-run",
    "--safebrowsing-disable-auto-update",
];

const NETWORK_IDLE_EVENT: &str = "networkIdle";

impl From<CdpError> for EngineError {
    fn from(err: CdpError) -> Self {
        EngineError::new(err.to_string())
    }
}

/// Launch configuration for Chrome.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    /// Explicit Chrome/Chromium binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub launch_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ChromeOptions {
    /// Raise the CDP request timeout so it outlasts an operation bounded by `limit`.
    pub fn covering(mut self, limit: Duration) -> Self {
        self.request_timeout = self
            .request_timeout
            .max(limit.saturating_add(REQUEST_TIMEOUT_HEADROOM));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    options: ChromeOptions,
}

impl ChromeLauncher {
    pub fn new(options: ChromeOptions) -> Self {
        Self { options }
    }

    fn browser_config(&self) -> Result<BrowserConfig, EngineError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .args(CHROME_ARGS.iter().copied())
            .launch_timeout(self.options.launch_timeout)
            .request_timeout(self.options.request_timeout);
        if !self.options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.options.executable {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| EngineError::new(format!("Invalid Chrome configuration: {e}")))
    }
}

#[async_trait]
impl EngineLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<LaunchedEngine, EngineError> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| EngineError::new(format!("Failed to launch Chrome: {e}")))?;
        info!(executable = ?self.options.executable, "Chrome launched");

        let connected = Arc::new(AtomicBool::new(true));
        let (disconnect_tx, disconnect_rx) = oneshot::channel::<()>();
        let flag = Arc::clone(&connected);
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "CDP handler error");
                }
            }
            flag.store(false, Ordering::SeqCst);
            let _ = disconnect_tx.send(());
        });

        let engine = Arc::new(ChromeEngine {
            browser: Arc::new(RwLock::new(browser)),
            connected,
        });
        Ok(LaunchedEngine {
            engine,
            disconnected: async move {
                let _ = disconnect_rx.await;
            }
            .boxed(),
        })
    }
}

pub struct ChromeEngine {
    browser: Arc<RwLock<Browser>>,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl Engine for ChromeEngine {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn new_page(&self) -> Result<Box<dyn PageContext>, EngineError> {
        let browser = self.browser.read().await;
        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await?
            .result
            .browser_context_id;
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(EngineError::new)?;
        let page = match browser.new_page(target).await {
            Ok(page) => page,
            Err(err) => {
                let _ = browser
                    .execute(DisposeBrowserContextParams::new(context_id))
                    .await;
                return Err(err.into());
            }
        };
        drop(browser);
        Ok(Box::new(ChromePage {
            page: Some(page),
            context_id: Some(context_id),
            browser: Arc::clone(&self.browser),
            interceptor: std::sync::Mutex::new(None),
            runtime: tokio::runtime::Handle::current(),
        }))
    }

    async fn close(&self) -> Result<(), EngineError> {
        let mut browser = self.browser.write().await;
        browser.close().await?;
        browser.wait().await.map_err(|e| EngineError::new(e.to_string()))?;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// A tab inside its own browser context. Closing it disposes the context.
///
/// If dropped without `close()`, cleanup is spawned onto the runtime captured
/// at construction.
pub struct ChromePage {
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
    browser: Arc<RwLock<Browser>>,
    interceptor: std::sync::Mutex<Option<JoinHandle<()>>>,
    runtime: tokio::runtime::Handle,
}

impl ChromePage {
    fn page(&self) -> Result<&Page, EngineError> {
        self.page
            .as_ref()
            .ok_or_else(|| EngineError::new("page context already closed"))
    }

    fn stop_interceptor(&self) {
        let handle = self
            .interceptor
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

/// How far a `Page.navigate` command got.
#[derive(Debug, PartialEq)]
enum NavigationStart {
    Committed {
        frame_id: FrameId,
        loader_id: Option<LoaderId>,
    },
    /// chromiumoxide tracks the navigation itself and gives up at its own
    /// fixed deadline. The page may still be loading, so waiting continues
    /// on the main frame under the caller's timeout.
    StillLoading,
}

fn navigation_start(
    url: &str,
    outcome: Result<NavigateReturns, CdpError>,
) -> Result<NavigationStart, EngineError> {
    match outcome {
        Ok(NavigateReturns {
            error_text: Some(error_text),
            ..
        }) => Err(EngineError::new(format!("{error_text} at {url}"))),
        Ok(returns) => Ok(NavigationStart::Committed {
            frame_id: returns.frame_id,
            loader_id: returns.loader_id,
        }),
        Err(CdpError::Timeout) => Ok(NavigationStart::StillLoading),
        Err(err) => Err(err.into()),
    }
}

fn is_blocked(resource: &ResourceType, kinds: &[BlockedResource]) -> bool {
    kinds.iter().any(|kind| match kind {
        BlockedResource::Media => *resource == ResourceType::Media,
        BlockedResource::Font => *resource == ResourceType::Font,
    })
}

#[async_trait]
impl PageContext for ChromePage {
    async fn block_resources(&self, kinds: &[BlockedResource]) -> Result<(), EngineError> {
        let page = self.page()?;
        let mut paused = page.event_listener::<EventRequestPaused>().await?;
        let interceptor = page.clone();
        let kinds = kinds.to_vec();
        let task = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let outcome = if is_blocked(&event.resource_type, &kinds) {
                    interceptor
                        .execute(FailRequestParams::new(
                            event.request_id.clone(),
                            ErrorReason::BlockedByClient,
                        ))
                        .await
                        .map(|_| ())
                } else {
                    interceptor
                        .execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                if let Err(err) = outcome {
                    debug!(error = %err, url = %event.request.url, "request filter reply failed");
                }
            }
        });
        *self
            .interceptor
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(task);

        let pattern = RequestPattern::builder()
            .url_pattern("*")
            .request_stage(RequestStage::Request)
            .build();
        page.execute(FetchEnableParams::builder().pattern(pattern).build())
            .await?;
        Ok(())
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<(), EngineError> {
        self.page()?
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(viewport.width),
                i64::from(viewport.height),
                1.0,
                false,
            ))
            .await?;
        Ok(())
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<(), EngineError> {
        self.page()?
            .execute(SetUserAgentOverrideParams::new(user_agent))
            .await?;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), EngineError> {
        let page = self.page()?;
        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await?;
        let mut lifecycle = page.event_listener::<EventLifecycleEvent>().await?;

        let outcome = page
            .execute(NavigateParams::new(url))
            .await
            .map(|response| response.result);
        let (frame_id, loader_id) = match navigation_start(url, outcome)? {
            NavigationStart::Committed {
                frame_id,
                loader_id,
            } => (Some(frame_id), loader_id),
            NavigationStart::StillLoading => {
                debug!(url, "navigate command timed out, waiting on the main frame");
                (page.mainframe().await?, None)
            }
        };

        while let Some(event) = lifecycle.next().await {
            let same_frame = frame_id.as_ref().map_or(true, |id| event.frame_id == *id);
            let same_document = loader_id.as_ref().map_or(true, |id| event.loader_id == *id);
            if event.name == NETWORK_IDLE_EVENT && same_frame && same_document {
                debug!(url, "network idle");
                return Ok(());
            }
        }
        Err(EngineError::new(format!(
            "page closed before network idle at {url}"
        )))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, EngineError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(EngineError::new)?;
        let result = self.page()?.evaluate_expression(params).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn print_to_pdf(&self, params: &PdfParams) -> Result<Vec<u8>, EngineError> {
        let print = PrintToPdfParams::builder()
            .landscape(params.landscape)
            .print_background(params.print_background)
            .scale(params.scale)
            .paper_width(params.paper_width_in)
            .paper_height(params.paper_height_in)
            .margin_top(params.margin_top_in)
            .margin_right(params.margin_right_in)
            .margin_bottom(params.margin_bottom_in)
            .margin_left(params.margin_left_in)
            .build();
        Ok(self.page()?.pdf(print).await?)
    }

    async fn close(mut self: Box<Self>) -> Result<(), EngineError> {
        self.stop_interceptor();
        let page = self.page.take();
        let context_id = self.context_id.take();
        close_target(page, context_id, Arc::clone(&self.browser)).await
    }
}

async fn close_target(
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
    browser: Arc<RwLock<Browser>>,
) -> Result<(), EngineError> {
    let closed = match page {
        Some(page) => page.close().await.map_err(EngineError::from),
        None => Ok(()),
    };
    if let Some(id) = context_id {
        let browser = browser.read().await;
        if let Err(err) = browser.execute(DisposeBrowserContextParams::new(id)).await {
            debug!(error = %err, "disposing browser context failed");
        }
    }
    closed
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        self.stop_interceptor();
        let page = self.page.take();
        let context_id = self.context_id.take();
        if page.is_none() && context_id.is_none() {
            return;
        }
        let browser = Arc::clone(&self.browser);
        self.runtime.spawn(async move {
            if let Err(err) = close_target(page, context_id, browser).await {
                warn!(error = %err, "page cleanup on drop failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionErrorKind;

    #[test]
    fn chrome_args_disable_sandbox_gpu_audio_and_updates() {
        for flag in [
            "--no-sandbox",
            "--disable-gpu",
            "--mute-audio",
            "--disable-background-networking",
            "--safebrowsing-disable-auto-update",
        ] {
            assert!(CHROME_ARGS.contains(&flag), "missing {flag}");
        }
    }

    #[test]
    fn only_media_and_fonts_are_blocked() {
        let kinds = [BlockedResource::Media, BlockedResource::Font];
        assert!(is_blocked(&ResourceType::Media, &kinds));
        assert!(is_blocked(&ResourceType::Font, &kinds));
        assert!(!is_blocked(&ResourceType::Image, &kinds));
        assert!(!is_blocked(&ResourceType::Document, &kinds));
        assert!(!is_blocked(&ResourceType::Font, &[BlockedResource::Media]));
    }

    #[test]
    fn chrome_options_default_values() {
        let opts = ChromeOptions::default();
        assert!(opts.headless);
        assert!(opts.executable.is_none());
        assert_eq!(opts.launch_timeout, DEFAULT_LAUNCH_TIMEOUT);
        assert_eq!(opts.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn request_timeout_covers_long_operation_bounds() {
        let opts = ChromeOptions::default().covering(Duration::from_secs(60));
        assert_eq!(opts.request_timeout, DEFAULT_REQUEST_TIMEOUT);

        let opts = ChromeOptions::default().covering(Duration::from_secs(600));
        assert_eq!(opts.request_timeout, Duration::from_secs(605));
    }

    fn navigate_returns(error_text: Option<&str>) -> NavigateReturns {
        let mut builder = NavigateReturns::builder()
            .frame_id(FrameId::new("main"))
            .loader_id(LoaderId::new("doc-1"));
        if let Some(text) = error_text {
            builder = builder.error_text(text);
        }
        builder.build().unwrap()
    }

    #[test]
    fn committed_navigation_targets_its_frame_and_loader() {
        let start = navigation_start("https://example.com", Ok(navigate_returns(None))).unwrap();
        assert_eq!(
            start,
            NavigationStart::Committed {
                frame_id: FrameId::new("main"),
                loader_id: Some(LoaderId::new("doc-1")),
            }
        );
    }

    #[test]
    fn navigate_error_text_is_classified() {
        let err = navigation_start(
            "https://nope.invalid",
            Ok(navigate_returns(Some("net::ERR_NAME_NOT_RESOLVED"))),
        )
        .unwrap_err();
        assert_eq!(err.0, "net::ERR_NAME_NOT_RESOLVED at https://nope.invalid");
        assert_eq!(
            ConversionErrorKind::classify(&err.0),
            ConversionErrorKind::NameResolutionFailure
        );
    }

    #[test]
    fn cdp_request_deadline_keeps_waiting_instead_of_failing() {
        // A slow page must end as a navigation timeout from the pipeline,
        // never as chromiumoxide's own "Request timed out.".
        let start = navigation_start("https://slow.example", Err(CdpError::Timeout)).unwrap();
        assert_eq!(start, NavigationStart::StillLoading);
        assert!(matches!(
            ConversionErrorKind::classify(&CdpError::Timeout.to_string()),
            ConversionErrorKind::Unknown(_)
        ));
    }

    #[test]
    fn other_cdp_failures_propagate() {
        let err = navigation_start(
            "https://example.com",
            Err(CdpError::ChromeMessage("target crashed".to_string())),
        )
        .unwrap_err();
        assert!(err.0.contains("target crashed"));
    }

    #[test]
    fn browser_config_builds_with_explicit_executable() {
        let launcher = ChromeLauncher::new(ChromeOptions {
            executable: Some(PathBuf::from("/usr/bin/chromium")),
            ..ChromeOptions::default()
        });
        assert!(launcher.browser_config().is_ok());
    }
}
