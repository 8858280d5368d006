use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MARGIN: &str = "10mm";
pub const DEFAULT_SCALE: f64 = 1.0;
pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 2.0;
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
    Legal,
}

impl PageFormat {
    /// Paper size in inches, portrait orientation.
    pub fn paper_size_in(self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (8.27, 11.7),
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Legal => (8.5, 14.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Per-side margins; unset or blank sides fall back to [`DEFAULT_MARGIN`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: Option<String>,
    pub right: Option<String>,
    pub bottom: Option<String>,
    pub left: Option<String>,
}

impl Margins {
    pub fn uniform(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            top: Some(value.clone()),
            right: Some(value.clone()),
            bottom: Some(value.clone()),
            left: Some(value),
        }
    }
}

/// Caller-facing render options. Every field is optional; defaults are
/// applied by [`RenderOptions::resolve`] inside the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    pub page_format: Option<PageFormat>,
    pub orientation: Option<Orientation>,
    pub print_background: Option<bool>,
    pub scale: Option<f64>,
    pub margins: Option<Margins>,
    pub timeout_ms: Option<u64>,
}

/// Render options with every default applied and the scale clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRenderOptions {
    pub page_format: PageFormat,
    pub landscape: bool,
    pub print_background: bool,
    pub scale: f64,
    pub margin_top: String,
    pub margin_right: String,
    pub margin_bottom: String,
    pub margin_left: String,
    pub timeout: Duration,
}

impl RenderOptions {
    /// Layer `self` over `base`: fields set here win, unset fields come from `base`.
    pub fn or(&self, base: &RenderOptions) -> RenderOptions {
        let margins = match (&self.margins, &base.margins) {
            (Some(own), Some(fallback)) => Some(Margins {
                top: own.top.clone().or_else(|| fallback.top.clone()),
                right: own.right.clone().or_else(|| fallback.right.clone()),
                bottom: own.bottom.clone().or_else(|| fallback.bottom.clone()),
                left: own.left.clone().or_else(|| fallback.left.clone()),
            }),
            (own, fallback) => own.clone().or_else(|| fallback.clone()),
        };
        RenderOptions {
            page_format: self.page_format.or(base.page_format),
            orientation: self.orientation.or(base.orientation),
            print_background: self.print_background.or(base.print_background),
            scale: self.scale.or(base.scale),
            margins,
            timeout_ms: self.timeout_ms.or(base.timeout_ms),
        }
    }

    pub fn resolve(&self) -> ResolvedRenderOptions {
        let margins = self.margins.clone().unwrap_or_default();
        ResolvedRenderOptions {
            page_format: self.page_format.unwrap_or_default(),
            landscape: self.orientation.unwrap_or_default() == Orientation::Landscape,
            print_background: self.print_background.unwrap_or(true),
            scale: clamp_scale(self.scale),
            margin_top: margin_or_default(margins.top),
            margin_right: margin_or_default(margins.right),
            margin_bottom: margin_or_default(margins.bottom),
            margin_left: margin_or_default(margins.left),
            timeout: Duration::from_millis(
                self.timeout_ms
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
        }
    }
}

/// Clamps a requested scale into `MIN_SCALE..=MAX_SCALE`. Zero counts as unset.
pub fn clamp_scale(scale: Option<f64>) -> f64 {
    match scale {
        Some(value) if value.is_finite() && value != 0.0 => value.clamp(MIN_SCALE, MAX_SCALE),
        _ => DEFAULT_SCALE,
    }
}

fn margin_or_default(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_MARGIN.to_string())
}

/// Print parameters handed to the engine, with lengths in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfParams {
    pub paper_width_in: f64,
    pub paper_height_in: f64,
    pub landscape: bool,
    pub print_background: bool,
    pub scale: f64,
    pub margin_top_in: f64,
    pub margin_right_in: f64,
    pub margin_bottom_in: f64,
    pub margin_left_in: f64,
}

impl ResolvedRenderOptions {
    pub fn pdf_params(&self) -> Result<PdfParams, CssLengthError> {
        let (paper_width_in, paper_height_in) = self.page_format.paper_size_in();
        Ok(PdfParams {
            paper_width_in,
            paper_height_in,
            landscape: self.landscape,
            print_background: self.print_background,
            scale: self.scale,
            margin_top_in: parse_css_length(&self.margin_top)?.0,
            margin_right_in: parse_css_length(&self.margin_right)?.0,
            margin_bottom_in: parse_css_length(&self.margin_bottom)?.0,
            margin_left_in: parse_css_length(&self.margin_left)?.0,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CssLengthError {
    #[error("Invalid margin length '{0}': expected a number with unit mm, cm, in, px, pt or pc")]
    Invalid(String),
    #[error("Margin length '{0}' must not be negative")]
    Negative(String),
}

/// A length in inches parsed from a CSS-style string such as `10mm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inches(pub f64);

impl FromStr for Inches {
    type Err = CssLengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_css_length(s)
    }
}

pub fn parse_css_length(raw: &str) -> Result<Inches, CssLengthError> {
    let value = raw.trim().to_ascii_lowercase();
    let split = value
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number
        .trim()
        .parse()
        .map_err(|_| CssLengthError::Invalid(raw.to_string()))?;
    if !number.is_finite() {
        return Err(CssLengthError::Invalid(raw.to_string()));
    }
    if number < 0.0 {
        return Err(CssLengthError::Negative(raw.to_string()));
    }
    let per_inch = match unit.trim() {
        "" | "px" => 96.0,
        "in" => 1.0,
        "cm" => 2.54,
        "mm" => 25.4,
        "pt" => 72.0,
        "pc" => 6.0,
        _ => return Err(CssLengthError::Invalid(raw.to_string())),
    };
    Ok(Inches(number / per_inch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn defaults_are_applied_by_resolve() {
        let resolved = RenderOptions::default().resolve();
        assert_eq!(resolved.page_format, PageFormat::A4);
        assert!(!resolved.landscape);
        assert!(resolved.print_background);
        assert!(approx(resolved.scale, 1.0));
        assert_eq!(resolved.margin_top, "10mm");
        assert_eq!(resolved.margin_right, "10mm");
        assert_eq!(resolved.margin_bottom, "10mm");
        assert_eq!(resolved.margin_left, "10mm");
        assert_eq!(resolved.timeout, Duration::from_millis(60_000));
    }

    #[test]
    fn scale_is_always_clamped() {
        let high = RenderOptions {
            scale: Some(5.0),
            ..RenderOptions::default()
        };
        assert!(approx(high.resolve().scale, 2.0));

        let low = RenderOptions {
            scale: Some(0.01),
            ..RenderOptions::default()
        };
        assert!(approx(low.resolve().scale, 0.1));

        assert!(approx(clamp_scale(Some(f64::NAN)), 1.0));
        assert!(approx(clamp_scale(Some(-3.0)), 0.1));
        assert!(approx(clamp_scale(Some(1.5)), 1.5));
    }

    #[test]
    fn margins_default_independently() {
        let options = RenderOptions {
            margins: Some(Margins {
                top: Some("1in".to_string()),
                right: None,
                bottom: Some("  ".to_string()),
                left: Some("5mm".to_string()),
            }),
            ..RenderOptions::default()
        };
        let resolved = options.resolve();
        assert_eq!(resolved.margin_top, "1in");
        assert_eq!(resolved.margin_right, "10mm");
        assert_eq!(resolved.margin_bottom, "10mm");
        assert_eq!(resolved.margin_left, "5mm");
    }

    #[test]
    fn zero_scale_falls_back_to_default() {
        let options = RenderOptions {
            scale: Some(0.0),
            ..RenderOptions::default()
        };
        assert!(approx(options.resolve().scale, DEFAULT_SCALE));
    }

    #[test]
    fn landscape_and_zero_timeout() {
        let options = RenderOptions {
            orientation: Some(Orientation::Landscape),
            timeout_ms: Some(0),
            ..RenderOptions::default()
        };
        let resolved = options.resolve();
        assert!(resolved.landscape);
        assert_eq!(resolved.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn or_prefers_own_fields_and_merges_margins() {
        let base = RenderOptions {
            page_format: Some(PageFormat::Letter),
            scale: Some(0.8),
            margins: Some(Margins::uniform("2cm")),
            ..RenderOptions::default()
        };
        let own = RenderOptions {
            scale: Some(1.2),
            margins: Some(Margins {
                top: Some("0".to_string()),
                ..Margins::default()
            }),
            ..RenderOptions::default()
        };
        let merged = own.or(&base);
        assert_eq!(merged.page_format, Some(PageFormat::Letter));
        assert_eq!(merged.scale, Some(1.2));
        let margins = merged.margins.unwrap();
        assert_eq!(margins.top.as_deref(), Some("0"));
        assert_eq!(margins.left.as_deref(), Some("2cm"));
    }

    #[test]
    fn css_lengths_convert_to_inches() {
        assert!(approx(parse_css_length("25.4mm").unwrap().0, 1.0));
        assert!(approx(parse_css_length("2.54cm").unwrap().0, 1.0));
        assert!(approx(parse_css_length("96px").unwrap().0, 1.0));
        assert!(approx(parse_css_length("96").unwrap().0, 1.0));
        assert!(approx(parse_css_length("72pt").unwrap().0, 1.0));
        assert!(approx(parse_css_length("6pc").unwrap().0, 1.0));
        assert!(approx(" 0.5IN ".parse::<Inches>().unwrap().0, 0.5));
    }

    #[test]
    fn css_length_rejects_unknown_units() {
        assert!(matches!(
            parse_css_length("3em"),
            Err(CssLengthError::Invalid(_))
        ));
        assert!(matches!(
            parse_css_length("abc"),
            Err(CssLengthError::Invalid(_))
        ));
        assert!(matches!(
            parse_css_length("-1mm"),
            Err(CssLengthError::Negative(_))
        ));
    }

    #[test]
    fn pdf_params_use_paper_size_and_margins() {
        let options = RenderOptions {
            page_format: Some(PageFormat::Legal),
            margins: Some(Margins::uniform("1in")),
            ..RenderOptions::default()
        };
        let params = options.resolve().pdf_params().unwrap();
        assert!(approx(params.paper_width_in, 8.5));
        assert!(approx(params.paper_height_in, 14.0));
        assert!(approx(params.margin_top_in, 1.0));
        assert!(approx(params.margin_left_in, 1.0));
        assert!(params.print_background);
    }
}
