use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConversionErrorKind, ErrorPayload};
use crate::export::{Export, ExportSummary};
use crate::types::ConversionResult;

/// Schema version for report payloads.
pub const WEB2PDF_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Web2PdfOutput {
    Convert(ConvertOutput),
    Check(CheckOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOutput {
    pub version: String,
    /// Where the PDF or archive was written.
    pub output_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ExportSummary>,
    pub items: Vec<ItemReport>,
}

impl ConvertOutput {
    pub fn from_export(export: &Export, output_path: PathBuf) -> Self {
        let summary = match export {
            Export::Pdf { .. } => None,
            Export::Archive { summary, .. } => Some(*summary),
        };
        Self {
            version: WEB2PDF_OUTPUT_VERSION.to_string(),
            output_path,
            summary,
            items: export.results().into_iter().map(ItemReport::from).collect(),
        }
    }
}

/// Per-URL line of a conversion report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    pub url: String,
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ConversionErrorKind>,
    pub duration_ms: u64,
    pub bytes: usize,
}

impl From<&ConversionResult> for ItemReport {
    fn from(result: &ConversionResult) -> Self {
        Self {
            url: result.url.clone(),
            filename: result.filename.clone(),
            success: result.success,
            error: result.error_message(),
            error_kind: result.error_kind.clone(),
            duration_ms: result.duration_ms,
            bytes: result.payload.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutput {
    pub version: String,
    pub items: Vec<CheckItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckItem {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
    pub allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
    /// Per-URL results when the failure happened after conversion ran.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ItemReport>,
}
