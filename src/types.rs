use serde::{Deserialize, Serialize};

use crate::error::ConversionErrorKind;
use crate::render::RenderOptions;

/// One URL to convert together with the options that apply to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    url: String,
    options: RenderOptions,
}

impl ConversionRequest {
    pub fn new(url: impl Into<String>, options: RenderOptions) -> Self {
        Self {
            url: url.into(),
            options,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }
}

/// Outcome of converting a single URL.
///
/// `payload` is empty whenever `success` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub url: String,
    pub filename: String,
    #[serde(skip)]
    pub payload: Vec<u8>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ConversionErrorKind>,
    pub duration_ms: u64,
}

impl ConversionResult {
    pub fn succeeded(url: &str, filename: String, payload: Vec<u8>, duration_ms: u64) -> Self {
        Self {
            url: url.to_string(),
            filename,
            payload,
            success: true,
            error_kind: None,
            duration_ms,
        }
    }

    pub fn failed(
        url: &str,
        filename: String,
        kind: ConversionErrorKind,
        duration_ms: u64,
    ) -> Self {
        Self {
            url: url.to_string(),
            filename,
            payload: Vec::new(),
            success: false,
            error_kind: Some(kind),
            duration_ms,
        }
    }

    /// Human-readable failure reason, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error_kind.as_ref().map(ConversionErrorKind::user_message)
    }
}
