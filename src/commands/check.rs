use std::path::PathBuf;
use std::process::ExitCode;

use web2pdf_lib::output::{CheckItem, CheckOutput, WEB2PDF_OUTPUT_VERSION};
use web2pdf_lib::{is_allowed_url, normalize_url, prepare_urls, Web2PdfError, Web2PdfOutput};

use crate::cli::OutputFormat;
use crate::formatting::{exit_code_for_check, render_error, write_output};
use crate::settings::load_config;

/// Run the check command. Chrome is never launched.
pub fn run_check(
    config_path: Option<PathBuf>,
    verbose: bool,
    urls: Vec<String>,
    report: OutputFormat,
    report_file: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, report, report_file),
    };
    if let Err(err) = prepare_urls(&urls, config.batch.max_urls) {
        return render_error(err, report, report_file);
    }

    let items = check_items(&urls);
    if verbose {
        let blocked = items.iter().filter(|i| !i.allowed).count();
        eprintln!("Checked {} URLs, {} blocked", items.len(), blocked);
    }
    let all_allowed = items.iter().all(|i| i.allowed);
    let body = Web2PdfOutput::Check(CheckOutput {
        version: WEB2PDF_OUTPUT_VERSION.to_string(),
        items,
    });
    if let Err(err) = write_output(&body, report, report_file.clone()) {
        return render_error(Web2PdfError::Unknown(err.to_string()), report, report_file);
    }
    exit_code_for_check(all_allowed)
}

/// One entry per non-blank input, in input order.
pub fn check_items(urls: &[String]) -> Vec<CheckItem> {
    urls.iter()
        .filter_map(|raw| {
            let normalized = normalize_url(raw)?;
            Some(CheckItem {
                input: raw.clone(),
                allowed: is_allowed_url(&normalized),
                normalized: Some(normalized),
            })
        })
        .collect()
}
