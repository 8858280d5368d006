//! Content-settling sequence run between navigation and PDF capture.
//!
//! Many pages defer content until they are scrolled, or keep loading after
//! the network-idle signal fired. The schedule is a fixed list of stages,
//! each bounded, executed one after another with task suspension for waits.

use std::time::Duration;
use tracing::debug;

use super::session::{bounded, EngineError, PageContext};

/// One step of the settling sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStage {
    /// Suspend for a fixed duration.
    Pause(Duration),
    /// Scroll down by `step_px` every `interval` until the scrolled distance
    /// reaches the page height or `max_steps` is hit, then scroll to the top.
    ScrollPass {
        step_px: u32,
        interval: Duration,
        max_steps: u32,
    },
    /// Wait for every `<img>` to load or error, each bounded by `per_image_timeout`.
    AwaitImages { per_image_timeout: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleSchedule {
    stages: Vec<SettleStage>,
}

impl Default for SettleSchedule {
    fn default() -> Self {
        Self::new(vec![
            SettleStage::Pause(Duration::from_millis(1000)),
            SettleStage::ScrollPass {
                step_px: 500,
                interval: Duration::from_millis(100),
                max_steps: 50,
            },
            SettleStage::Pause(Duration::from_millis(1500)),
            SettleStage::AwaitImages {
                per_image_timeout: Duration::from_millis(5000),
            },
            SettleStage::Pause(Duration::from_millis(500)),
        ])
    }
}

impl SettleSchedule {
    pub fn new(stages: Vec<SettleStage>) -> Self {
        Self { stages }
    }

    /// A schedule with no stages; the page is captured right after navigation.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    pub fn stages(&self) -> &[SettleStage] {
        &self.stages
    }

    /// Run every stage in order. Each script evaluation is bounded by `op_timeout`.
    pub async fn run(&self, page: &dyn PageContext, op_timeout: Duration) -> Result<(), EngineError> {
        for stage in &self.stages {
            match *stage {
                SettleStage::Pause(duration) => {
                    debug!(?duration, "settle: pause");
                    tokio::time::sleep(duration).await;
                }
                SettleStage::ScrollPass {
                    step_px,
                    interval,
                    max_steps,
                } => {
                    let steps = scroll_pass(page, step_px, interval, max_steps, op_timeout).await?;
                    debug!(steps, "settle: scroll pass finished");
                }
                SettleStage::AwaitImages { per_image_timeout } => {
                    let script = await_images_script(per_image_timeout);
                    // The in-page per-image timers cap this; the outer bound guards a hung page.
                    let limit = op_timeout.max(per_image_timeout);
                    let images = bounded("image load wait", limit, page.evaluate(&script)).await?;
                    debug!(images = %images, "settle: images settled");
                }
            }
        }
        Ok(())
    }
}

async fn scroll_pass(
    page: &dyn PageContext,
    step_px: u32,
    interval: Duration,
    max_steps: u32,
    op_timeout: Duration,
) -> Result<u32, EngineError> {
    let script = scroll_step_script(step_px);
    let mut scrolled: f64 = 0.0;
    let mut steps = 0;
    while steps < max_steps {
        tokio::time::sleep(interval).await;
        let height = bounded("scroll step", op_timeout, page.evaluate(&script)).await?;
        steps += 1;
        scrolled += f64::from(step_px);
        let page_height = height.as_f64().unwrap_or(0.0);
        if scrolled >= page_height {
            break;
        }
    }
    bounded("scroll reset", op_timeout, page.evaluate(SCROLL_TO_TOP_SCRIPT)).await?;
    Ok(steps)
}

pub(crate) const SCROLL_TO_TOP_SCRIPT: &str = "window.scrollTo(0, 0)";

/// Scrolls by `step_px` and returns the scrollable height measured before the step.
pub(crate) fn scroll_step_script(step_px: u32) -> String {
    format!(
        "(() => {{ const h = document.body ? document.body.scrollHeight : 0; window.scrollBy(0, {step_px}); return h; }})()"
    )
}

pub(crate) fn await_images_script(per_image_timeout: Duration) -> String {
    format!(
        r#"(async (timeoutMs) => {{
  const images = Array.from(document.querySelectorAll('img'));
  await Promise.all(images.map((img) => {{
    if (img.complete) return Promise.resolve();
    return new Promise((resolve) => {{
      img.addEventListener('load', resolve);
      img.addEventListener('error', resolve);
      setTimeout(resolve, timeoutMs);
    }});
  }}));
  return images.length;
}})({})"#,
        per_image_timeout.as_millis()
    )
}
