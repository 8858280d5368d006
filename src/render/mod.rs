//! Single-URL render pipeline: validate, open an isolated page, navigate,
//! settle, print, close.
//!
//! [`PageRenderer::render`] never returns an error. Every failure is
//! classified into the returned [`ConversionResult`] so a caller running a
//! batch keeps going.

mod filename;
mod options;

pub use filename::{pdf_filename, timestamp_ms};
pub use options::{
    clamp_scale, parse_css_length, CssLengthError, Inches, Margins, Orientation, PageFormat,
    PdfParams, RenderOptions, ResolvedRenderOptions, DEFAULT_MARGIN, DEFAULT_SCALE,
    DEFAULT_TIMEOUT_MS, MAX_SCALE, MIN_SCALE,
};

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::browser::{bounded, BlockedResource, EngineError, EngineSession, PageContext, SettleSchedule};
use crate::error::ConversionErrorKind;
use crate::types::{ConversionRequest, ConversionResult};
use crate::url_guard::{is_allowed_url, normalize_url};
use crate::viewport::Viewport;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Request types refused while a page loads. Images stay.
const BLOCKED_RESOURCES: &[BlockedResource] = &[BlockedResource::Media, BlockedResource::Font];

/// Renders one URL at a time into PDF bytes using the shared engine session.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    session: Arc<EngineSession>,
    settle: SettleSchedule,
    viewport: Viewport,
    user_agent: String,
}

impl PageRenderer {
    pub fn new(session: Arc<EngineSession>) -> Self {
        Self {
            session,
            settle: SettleSchedule::default(),
            viewport: Viewport::default(),
            user_agent: DESKTOP_USER_AGENT.to_string(),
        }
    }

    pub fn with_settle(mut self, settle: SettleSchedule) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn session(&self) -> &Arc<EngineSession> {
        &self.session
    }

    pub async fn render_request(&self, request: &ConversionRequest) -> ConversionResult {
        self.render(request.url(), request.options()).await
    }

    /// Convert `url` into a PDF.
    ///
    /// The returned result keeps `url` exactly as given; navigation uses the
    /// scheme-normalized form.
    pub async fn render(&self, url: &str, options: &RenderOptions) -> ConversionResult {
        let started = Instant::now();
        let target = normalize_url(url).unwrap_or_default();
        let filename = pdf_filename(&target, timestamp_ms());

        if !is_allowed_url(&target) {
            warn!(url, "URL rejected by validator");
            return ConversionResult::failed(
                url,
                filename,
                ConversionErrorKind::InvalidUrl,
                elapsed_ms(started),
            );
        }

        let resolved = options.resolve();
        match self.capture(&target, &resolved).await {
            Ok(payload) => {
                info!(url, bytes = payload.len(), "rendered PDF");
                ConversionResult::succeeded(url, filename, payload, elapsed_ms(started))
            }
            Err(err) => {
                let kind = ConversionErrorKind::classify(&err.0);
                warn!(url, error = %err, kind = %kind, "render failed");
                ConversionResult::failed(url, filename, kind, elapsed_ms(started))
            }
        }
    }

    /// Owns the page for its whole lifetime; the page is closed on every path
    /// once it has been opened.
    async fn capture(
        &self,
        url: &str,
        options: &ResolvedRenderOptions,
    ) -> Result<Vec<u8>, EngineError> {
        let params = options
            .pdf_params()
            .map_err(|e| EngineError::new(e.to_string()))?;
        let engine = self.session.acquire().await?;
        let page = engine.new_page().await?;

        let outcome = self.drive(page.as_ref(), url, options, &params).await;

        if let Err(err) = page.close().await {
            debug!(url, error = %err, "page close failed");
        }
        outcome
    }

    async fn drive(
        &self,
        page: &dyn PageContext,
        url: &str,
        options: &ResolvedRenderOptions,
        params: &PdfParams,
    ) -> Result<Vec<u8>, EngineError> {
        let limit = options.timeout;

        bounded("page setup", limit, async {
            page.block_resources(BLOCKED_RESOURCES).await?;
            page.set_viewport(self.viewport).await?;
            page.set_user_agent(&self.user_agent).await
        })
        .await?;

        debug!(url, timeout_ms = limit.as_millis() as u64, "navigating");
        match tokio::time::timeout(limit, page.navigate(url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(EngineError::new(format!(
                    "Navigation timeout of {} ms exceeded",
                    limit.as_millis()
                )))
            }
        }

        self.settle.run(page, limit).await?;

        bounded("PDF generation", limit, page.print_to_pdf(params)).await
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::FakeLauncher;
    use std::sync::atomic::Ordering;

    fn renderer() -> (PageRenderer, Arc<crate::browser::testing::Recorder>) {
        let (session, recorder) = FakeLauncher::session();
        (
            PageRenderer::new(session).with_settle(SettleSchedule::none()),
            recorder,
        )
    }

    #[tokio::test]
    async fn successful_render_returns_payload_and_closes_page() {
        let (renderer, recorder) = renderer();
        let result = renderer
            .render("https://example.com/docs", &RenderOptions::default())
            .await;

        assert!(result.success);
        assert_eq!(result.url, "https://example.com/docs");
        assert!(result.filename.starts_with("example.com-docs-"));
        assert!(result.filename.ends_with(".pdf"));
        assert_eq!(result.payload, b"%PDF-https://example.com/docs".to_vec());
        assert!(result.error_kind.is_none());
        assert_eq!(recorder.pages_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn page_is_prepared_before_navigation() {
        let (renderer, recorder) = renderer();
        renderer
            .render("https://example.com", &RenderOptions::default())
            .await;

        let events = recorder.events();
        assert_eq!(
            events,
            vec![
                "new_page".to_string(),
                "block:[Media, Font]".to_string(),
                "viewport:1920x1080".to_string(),
                format!("user_agent:{DESKTOP_USER_AGENT}"),
                "navigate:https://example.com".to_string(),
                "pdf".to_string(),
                "close".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn scheme_less_input_is_normalized_but_reported_verbatim() {
        let (renderer, recorder) = renderer();
        let result = renderer
            .render("example.org", &RenderOptions::default())
            .await;

        assert!(result.success);
        assert_eq!(result.url, "example.org");
        assert!(recorder
            .events()
            .contains(&"navigate:https://example.org".to_string()));
    }

    #[tokio::test]
    async fn blocked_url_never_reaches_the_engine() {
        let (renderer, recorder) = renderer();
        let result = renderer
            .render("http://192.168.1.5/", &RenderOptions::default())
            .await;

        assert!(!result.success);
        assert!(result.payload.is_empty());
        assert_eq!(result.error_kind, Some(ConversionErrorKind::InvalidUrl));
        assert_eq!(recorder.launches.load(Ordering::SeqCst), 0);
        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    async fn navigation_failure_is_classified_and_page_closed() {
        let (renderer, recorder) = renderer();
        let result = renderer
            .render("https://unresolvable.example", &RenderOptions::default())
            .await;

        assert!(!result.success);
        assert_eq!(
            result.error_kind,
            Some(ConversionErrorKind::NameResolutionFailure)
        );
        assert_eq!(result.error_message().as_deref(), Some("Domain not found"));
        assert_eq!(recorder.pages_closed.load(Ordering::SeqCst), 1);
        assert!(!recorder.events().contains(&"pdf".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_timeout_fails_item_and_closes_page() {
        let (renderer, recorder) = renderer();
        let options = RenderOptions {
            timeout_ms: Some(2_000),
            ..RenderOptions::default()
        };
        let result = renderer.render("https://slow.example", &options).await;

        assert!(!result.success);
        assert_eq!(
            result.error_kind,
            Some(ConversionErrorKind::NavigationTimeout)
        );
        assert_eq!(recorder.pages_opened.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.pages_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolved_options_reach_the_engine() {
        let (renderer, recorder) = renderer();
        let options = RenderOptions {
            page_format: Some(PageFormat::Letter),
            orientation: Some(Orientation::Landscape),
            print_background: Some(false),
            scale: Some(5.0),
            margins: Some(Margins {
                top: Some("1in".to_string()),
                ..Margins::default()
            }),
            timeout_ms: None,
        };
        renderer.render("https://example.com", &options).await;

        let params = recorder.last_pdf_params().unwrap();
        assert_eq!(params.paper_width_in, 8.5);
        assert_eq!(params.paper_height_in, 11.0);
        assert!(params.landscape);
        assert!(!params.print_background);
        assert_eq!(params.scale, 2.0);
        assert!((params.margin_top_in - 1.0).abs() < 1e-9);
        assert!((params.margin_left_in - 10.0 / 25.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn bad_margin_fails_item_without_opening_page() {
        let (renderer, recorder) = renderer();
        let options = RenderOptions {
            margins: Some(Margins::uniform("wide")),
            ..RenderOptions::default()
        };
        let result = renderer.render("https://example.com", &options).await;

        assert!(!result.success);
        assert!(matches!(
            result.error_kind,
            Some(ConversionErrorKind::Unknown(ref msg)) if msg.contains("Invalid margin length")
        ));
        assert_eq!(recorder.pages_opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn default_settle_schedule_runs_between_navigation_and_print() {
        let (session, recorder) = FakeLauncher::session();
        let renderer = PageRenderer::new(session);
        let result = renderer
            .render("https://example.com", &RenderOptions::default())
            .await;
        assert!(result.success);

        let events = recorder.events();
        let nav = events.iter().position(|e| e.starts_with("navigate:")).unwrap();
        let scroll = events.iter().position(|e| e == "evaluate:scroll").unwrap();
        let images = events.iter().position(|e| e == "evaluate:images").unwrap();
        let pdf = events.iter().position(|e| e == "pdf").unwrap();
        assert!(nav < scroll && scroll < images && images < pdf);
    }

    #[tokio::test]
    async fn print_failure_is_classified_and_page_closed() {
        let (renderer, recorder) = renderer();
        let result = renderer
            .render("https://pdf-fails.example", &RenderOptions::default())
            .await;

        assert!(!result.success);
        assert!(result.payload.is_empty());
        assert_eq!(
            result.error_kind,
            Some(ConversionErrorKind::Unknown("Printing failed".to_string()))
        );
        assert_eq!(recorder.pages_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_script_error_fails_item_and_closes_page() {
        let (session, recorder) = FakeLauncher::session();
        let renderer = PageRenderer::new(session);
        let result = renderer
            .render("https://broken-script.example", &RenderOptions::default())
            .await;

        assert!(!result.success);
        assert!(matches!(
            result.error_kind,
            Some(ConversionErrorKind::Unknown(ref msg)) if msg.contains("ReferenceError")
        ));
        assert!(!recorder.events().contains(&"pdf".to_string()));
        assert_eq!(recorder.pages_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_settle_script_times_out_and_closes_page() {
        let (session, recorder) = FakeLauncher::session();
        let renderer = PageRenderer::new(session);
        let options = RenderOptions {
            timeout_ms: Some(3_000),
            ..RenderOptions::default()
        };
        let result = renderer
            .render("https://hung-script.example", &options)
            .await;

        assert!(!result.success);
        assert_eq!(
            result.error_kind,
            Some(ConversionErrorKind::Unknown(
                "scroll step timed out after 3000 ms".to_string()
            ))
        );
        assert_eq!(recorder.pages_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn request_renders_with_custom_viewport_and_user_agent() {
        let (session, recorder) = FakeLauncher::session();
        let renderer = PageRenderer::new(session)
            .with_settle(SettleSchedule::none())
            .with_viewport(Viewport {
                width: 1280,
                height: 720,
            })
            .with_user_agent("web2pdf-test/1.0");
        let request = ConversionRequest::new(
            "example.com/pricing",
            RenderOptions {
                page_format: Some(PageFormat::Letter),
                ..RenderOptions::default()
            },
        );
        let result = renderer.render_request(&request).await;

        assert!(result.success);
        assert_eq!(result.url, "example.com/pricing");
        let events = recorder.events();
        assert!(events.contains(&"viewport:1280x720".to_string()));
        assert!(events.contains(&"user_agent:web2pdf-test/1.0".to_string()));
        assert_eq!(recorder.last_pdf_params().unwrap().paper_width_in, 8.5);
    }

    #[tokio::test]
    async fn engine_is_launched_once_across_renders() {
        let (renderer, recorder) = renderer();
        for url in ["https://a.example", "https://b.example"] {
            renderer.render(url, &RenderOptions::default()).await;
        }
        assert_eq!(recorder.launches.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.pages_opened.load(Ordering::SeqCst), 2);
    }
}
