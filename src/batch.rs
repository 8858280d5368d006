//! Sequential batch conversion.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::render::{PageRenderer, RenderOptions};
use crate::types::ConversionResult;

/// Pause inserted between two consecutive renders of one batch.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(500);

/// Progress hook: `(completed, total, current_url)`. Fired once before each
/// item and a final time with `(total, total, "")`.
pub type BatchProgress = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Runs renders one at a time so a batch never holds more than one page open
/// in the shared engine.
#[derive(Debug, Clone)]
pub struct BatchConverter {
    renderer: PageRenderer,
    throttle: Duration,
}

impl BatchConverter {
    pub fn new(renderer: PageRenderer) -> Self {
        Self {
            renderer,
            throttle: DEFAULT_THROTTLE,
        }
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn renderer(&self) -> &PageRenderer {
        &self.renderer
    }

    /// Convert every URL, returning exactly one result per input in input order.
    pub async fn convert_all(
        &self,
        urls: &[String],
        options: &RenderOptions,
        on_progress: Option<BatchProgress>,
    ) -> Vec<ConversionResult> {
        let total = urls.len();
        let mut results = Vec::with_capacity(total);

        for (index, url) in urls.iter().enumerate() {
            if let Some(report) = &on_progress {
                report(index, total, url);
            }
            results.push(self.renderer.render(url, options).await);

            if index + 1 < total && !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }
        }

        if let Some(report) = &on_progress {
            report(total, total, "");
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            total,
            succeeded,
            failed = total - succeeded,
            "batch finished"
        );
        results
    }
}
