use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ConversionResult;

#[derive(Debug, Error)]
pub enum Web2PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rendering engine error: {0}")]
    Engine(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request rejected: {0}")]
    Request(String),

    #[error("Conversion failed: {message}")]
    NothingConverted {
        message: String,
        results: Vec<ConversionResult>,
    },

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl Web2PdfError {
    pub fn engine(message: impl Into<String>) -> Self {
        Web2PdfError::Engine(message.into())
    }

    pub fn request(message: impl Into<String>) -> Self {
        Web2PdfError::Request(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            Web2PdfError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check output directory paths/permissions.",
            ),
            Web2PdfError::Engine(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("could not auto detect")
                    || lower.contains("executable")
                    || lower.contains("no such file")
                {
                    ErrorPayload::new(
                        ErrorCategory::Engine,
                        msg.to_string(),
                        "Install Chrome/Chromium or set engine.chrome_executable in the config file.",
                    )
                } else if lower.contains("timed out") {
                    ErrorPayload::new(
                        ErrorCategory::Engine,
                        msg.to_string(),
                        "Chrome was slow to start; raise engine.launch_timeout or check system load.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Engine,
                        msg.to_string(),
                        "Re-run with --verbose to see the Chrome launch log.",
                    )
                }
            }
            Web2PdfError::Archive(e) => ErrorPayload::new(
                ErrorCategory::Archive,
                e.to_string(),
                "Re-run the export; the archive was discarded and no partial file was written.",
            ),
            Web2PdfError::Config(msg) => ErrorPayload::new(
                ErrorCategory::Config,
                msg.to_string(),
                "Check flags and the TOML config file (durations use humantime, e.g. \"60s\").",
            ),
            Web2PdfError::Request(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("at most") {
                    ErrorPayload::new(
                        ErrorCategory::Request,
                        msg.to_string(),
                        "Split the URLs into several requests of at most 10 each.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Request,
                        msg.to_string(),
                        "Pass at least one public http(s) URL.",
                    )
                }
            }
            Web2PdfError::NothingConverted { message, .. } => ErrorPayload::new(
                ErrorCategory::Conversion,
                message.to_string(),
                "Check that the pages are reachable and public; try a larger --timeout.",
            ),
            Web2PdfError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, Web2PdfError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Request,
    Engine,
    Conversion,
    Archive,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}

/// Classified reason a single URL failed to convert.
///
/// These never escape as [`Web2PdfError`]; they travel inside a
/// [`ConversionResult`] so one bad page cannot abort a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum ConversionErrorKind {
    InvalidUrl,
    NameResolutionFailure,
    ConnectionRefused,
    ConnectionTimeout,
    NavigationTimeout,
    TlsFailure,
    Unknown(String),
}

/// Ordered lookup table; the first pattern contained in the raw message wins.
const CLASSIFICATION_RULES: &[(&str, ConversionErrorKind)] = &[
    (
        "net::ERR_NAME_NOT_RESOLVED",
        ConversionErrorKind::NameResolutionFailure,
    ),
    (
        "net::ERR_CONNECTION_REFUSED",
        ConversionErrorKind::ConnectionRefused,
    ),
    (
        "net::ERR_CONNECTION_TIMED_OUT",
        ConversionErrorKind::ConnectionTimeout,
    ),
    ("Navigation timeout", ConversionErrorKind::NavigationTimeout),
    ("net::ERR_SSL", ConversionErrorKind::TlsFailure),
    ("net::ERR_CERT", ConversionErrorKind::TlsFailure),
];

impl ConversionErrorKind {
    /// Classify a raw engine failure message.
    pub fn classify(raw: &str) -> Self {
        CLASSIFICATION_RULES
            .iter()
            .find(|(pattern, _)| raw.contains(pattern))
            .map(|(_, kind)| kind.clone())
            .unwrap_or_else(|| ConversionErrorKind::Unknown(raw.to_string()))
    }

    /// Short message suitable for showing to whoever submitted the URL.
    pub fn user_message(&self) -> String {
        match self {
            ConversionErrorKind::InvalidUrl => "Invalid or disallowed URL".to_string(),
            ConversionErrorKind::NameResolutionFailure => "Domain not found".to_string(),
            ConversionErrorKind::ConnectionRefused => "Connection refused".to_string(),
            ConversionErrorKind::ConnectionTimeout => "Connection timed out".to_string(),
            ConversionErrorKind::NavigationTimeout => "Page took too long to load".to_string(),
            ConversionErrorKind::TlsFailure => "SSL certificate error".to_string(),
            ConversionErrorKind::Unknown(raw) => raw.clone(),
        }
    }
}

impl std::fmt::Display for ConversionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.user_message())
    }
}
