use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::batch::DEFAULT_THROTTLE;
use crate::browser::{ChromeOptions, SettleSchedule, SettleStage, DEFAULT_LAUNCH_TIMEOUT};
use crate::export::MAX_URLS;
use crate::render::{Margins, Orientation, PageFormat, RenderOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Read(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Settings file contents. Every section and key is optional.
///
/// ```toml
/// [engine]
/// chrome_executable = "/usr/bin/chromium"
/// launch_timeout = "45s"
///
/// [render]
/// page_format = "Letter"
/// margin = "15mm"
/// timeout = "90s"
///
/// [batch]
/// throttle = "250ms"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub engine: EngineConfig,
    pub render: RenderConfig,
    pub batch: BatchConfig,
    pub settle: SettleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    #[serde(with = "humantime_serde")]
    pub launch_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            headless: true,
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn chrome_options(&self) -> ChromeOptions {
        ChromeOptions {
            executable: self.chrome_executable.clone(),
            headless: self.headless,
            launch_timeout: self.launch_timeout,
            ..ChromeOptions::default()
        }
    }
}

/// Default render options. `margin` applies to every side a per-side key
/// does not override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub page_format: Option<PageFormat>,
    pub orientation: Option<Orientation>,
    pub print_background: Option<bool>,
    pub scale: Option<f64>,
    pub margin: Option<String>,
    pub margin_top: Option<String>,
    pub margin_right: Option<String>,
    pub margin_bottom: Option<String>,
    pub margin_left: Option<String>,
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl RenderConfig {
    pub fn to_options(&self) -> RenderOptions {
        let side = |specific: &Option<String>| specific.clone().or_else(|| self.margin.clone());
        let margins = Margins {
            top: side(&self.margin_top),
            right: side(&self.margin_right),
            bottom: side(&self.margin_bottom),
            left: side(&self.margin_left),
        };
        let any_margin = margins != Margins::default();
        RenderOptions {
            page_format: self.page_format,
            orientation: self.orientation,
            print_background: self.print_background,
            scale: self.scale,
            margins: any_margin.then_some(margins),
            timeout_ms: self
                .timeout
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    #[serde(with = "humantime_serde")]
    pub throttle: Duration,
    pub max_urls: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            throttle: DEFAULT_THROTTLE,
            max_urls: MAX_URLS,
        }
    }
}

/// Timings of the content-settling sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettleConfig {
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    pub scroll_step_px: u32,
    #[serde(with = "humantime_serde")]
    pub scroll_interval: Duration,
    pub max_scroll_steps: u32,
    #[serde(with = "humantime_serde")]
    pub post_scroll_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub image_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub final_delay: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            scroll_step_px: 500,
            scroll_interval: Duration::from_millis(100),
            max_scroll_steps: 50,
            post_scroll_delay: Duration::from_millis(1500),
            image_timeout: Duration::from_millis(5000),
            final_delay: Duration::from_millis(500),
        }
    }
}

impl SettleConfig {
    pub fn schedule(&self) -> SettleSchedule {
        SettleSchedule::new(vec![
            SettleStage::Pause(self.initial_delay),
            SettleStage::ScrollPass {
                step_px: self.scroll_step_px,
                interval: self.scroll_interval,
                max_steps: self.max_scroll_steps,
            },
            SettleStage::Pause(self.post_scroll_delay),
            SettleStage::AwaitImages {
                per_image_timeout: self.image_timeout,
            },
            SettleStage::Pause(self.final_delay),
        ])
    }
}

impl Config {
    /// `~/.config/web2pdf/config.toml`, when a home directory is known.
    pub fn central_config_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("web2pdf")
                    .join("config.toml")
            })
    }

    /// Load from `path`, else the central config if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::central_config_path() {
                Some(central) if central.is_file() => Self::from_file(&central),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.max_urls == 0 || self.batch.max_urls > MAX_URLS {
            return Err(ConfigError::Invalid(format!(
                "batch.max_urls must be between 1 and {MAX_URLS}, got {}",
                self.batch.max_urls
            )));
        }
        if self.settle.scroll_step_px == 0 {
            return Err(ConfigError::Invalid(
                "settle.scroll_step_px must be positive".to_string(),
            ));
        }
        if self.settle.max_scroll_steps == 0 {
            return Err(ConfigError::Invalid(
                "settle.max_scroll_steps must be positive".to_string(),
            ));
        }
        if self.engine.launch_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "engine.launch_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
