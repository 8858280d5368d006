//! Request-level entry point: URL list in, one PDF or one ZIP out.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::archive::{bundle, ArchiveEntry};
use crate::batch::{BatchConverter, BatchProgress};
use crate::error::{Result, Web2PdfError};
use crate::render::{timestamp_ms, RenderOptions};
use crate::types::ConversionResult;
use crate::url_guard::normalize_url;

/// Largest number of URLs a single export accepts.
pub const MAX_URLS: usize = 10;

/// Success and failure counts for a multi-URL export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

impl ExportSummary {
    pub fn from_results(results: &[ConversionResult]) -> Self {
        let success = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            success,
            failed: results.len() - success,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Export {
    /// A single URL rendered to one PDF.
    Pdf {
        filename: String,
        bytes: Vec<u8>,
        result: ConversionResult,
    },
    /// Several URLs; only the successful ones are in the archive.
    Archive {
        filename: String,
        bytes: Vec<u8>,
        summary: ExportSummary,
        results: Vec<ConversionResult>,
    },
}

impl Export {
    pub fn filename(&self) -> &str {
        match self {
            Export::Pdf { filename, .. } | Export::Archive { filename, .. } => filename,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Export::Pdf { bytes, .. } | Export::Archive { bytes, .. } => bytes,
        }
    }

    pub fn results(&self) -> Vec<&ConversionResult> {
        match self {
            Export::Pdf { result, .. } => vec![result],
            Export::Archive { results, .. } => results.iter().collect(),
        }
    }
}

/// Enforce the `max_urls` bound on the raw list, then trim inputs, drop
/// blanks and add `https://` where no scheme was given.
pub fn prepare_urls<S: AsRef<str>>(raw: &[S], max_urls: usize) -> Result<Vec<String>> {
    if raw.len() > max_urls {
        return Err(Web2PdfError::request(format!(
            "at most {max_urls} URLs per request, got {}",
            raw.len()
        )));
    }
    let urls: Vec<String> = raw
        .iter()
        .filter_map(|u| normalize_url(u.as_ref()))
        .collect();
    if urls.is_empty() {
        return Err(Web2PdfError::request("enter at least one URL"));
    }
    Ok(urls)
}

/// Convert `raw_urls` and package the outcome.
///
/// Input is rejected before the engine is touched when it is empty or longer
/// than `max_urls`. A run that produces no PDF at all is an error carrying
/// every per-URL result.
pub async fn export<S: AsRef<str>>(
    converter: &BatchConverter,
    raw_urls: &[S],
    options: &RenderOptions,
    max_urls: usize,
    on_progress: Option<BatchProgress>,
) -> Result<Export> {
    let urls = prepare_urls(raw_urls, max_urls)?;

    if let [url] = urls.as_slice() {
        let result = converter.renderer().render(url, options).await;
        if !result.success {
            let message = result
                .error_message()
                .unwrap_or_else(|| "conversion failed".to_string());
            return Err(Web2PdfError::NothingConverted {
                message,
                results: vec![result],
            });
        }
        return Ok(Export::Pdf {
            filename: result.filename.clone(),
            bytes: result.payload.clone(),
            result,
        });
    }

    let results = converter.convert_all(&urls, options, on_progress).await;
    let summary = ExportSummary::from_results(&results);
    if summary.success == 0 {
        let details = results
            .iter()
            .map(|r| {
                format!(
                    "{}: {}",
                    r.url,
                    r.error_message().unwrap_or_else(|| "failed".to_string())
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Web2PdfError::NothingConverted {
            message: format!("no URL could be converted ({details})"),
            results,
        });
    }

    let (bytes, results) = bundle_successes(results).await?;
    let filename = format!("pdf-export-{}.zip", timestamp_ms());
    info!(
        filename = %filename,
        total = summary.total,
        success = summary.success,
        failed = summary.failed,
        "archive ready"
    );

    Ok(Export::Archive {
        filename,
        bytes,
        summary,
        results,
    })
}

/// Deflate is CPU bound, so the archive is built on the blocking pool. The
/// results are handed back once their payloads have been written.
async fn bundle_successes(
    results: Vec<ConversionResult>,
) -> Result<(Vec<u8>, Vec<ConversionResult>)> {
    tokio::task::spawn_blocking(move || {
        let entries: Vec<ArchiveEntry<'_>> = results
            .iter()
            .filter(|r| r.success)
            .map(|r| ArchiveEntry::new(&r.filename, &r.payload))
            .collect();
        let bytes = bundle(&entries)?;
        Ok::<_, Web2PdfError>((bytes, results))
    })
    .await
    .map_err(|e| Web2PdfError::Unknown(format!("archive task failed: {e}")))?
}
