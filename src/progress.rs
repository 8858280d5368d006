use std::sync::Arc;

use web2pdf_lib::BatchProgress;

/// Progress line for one batch event; `None` for the final completion call.
pub fn progress_line(completed: usize, total: usize, url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    Some(format!("[{}/{}] Converting {}", completed + 1, total, url))
}

/// Batch progress printed to stderr.
pub fn stderr_progress() -> BatchProgress {
    Arc::new(|completed: usize, total: usize, url: &str| match progress_line(completed, total, url) {
        Some(line) => eprintln!("{line}"),
        None => eprintln!("Converted batch of {total}"),
    })
}
