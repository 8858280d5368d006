use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

use web2pdf_lib::output::ConvertOutput;
use web2pdf_lib::{
    export, BatchConverter, ChromeLauncher, EngineSession, Export, PageRenderer, Web2PdfError,
    Web2PdfOutput,
};

use crate::cli::{OutputFormat, RenderArgs};
use crate::formatting::{exit_code_for_convert, render_error, write_output};
use crate::progress::stderr_progress;
use crate::settings::{load_config, log_effective_config, resolve_render_options};
use crate::shutdown::{interrupted, shutdown_signal};

/// Run the convert command.
#[allow(clippy::too_many_arguments)]
pub async fn run_convert(
    config_path: Option<PathBuf>,
    verbose: bool,
    urls: Vec<String>,
    render: RenderArgs,
    out_dir: PathBuf,
    report: OutputFormat,
    report_file: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, report, report_file),
    };
    let options = resolve_render_options(&render, &config);
    if verbose {
        log_effective_config(&options, &config, config_path.as_deref());
    }

    let longest_operation = options
        .resolve()
        .timeout
        .max(config.settle.image_timeout);
    let launcher = Arc::new(ChromeLauncher::new(
        config.engine.chrome_options().covering(longest_operation),
    ));
    let session = Arc::new(EngineSession::new(launcher));
    let renderer =
        PageRenderer::new(Arc::clone(&session)).with_settle(config.settle.schedule());
    let converter = BatchConverter::new(renderer).with_throttle(config.batch.throttle);
    let progress = verbose.then(stderr_progress);

    let outcome = tokio::select! {
        outcome = export(&converter, &urls, &options, config.batch.max_urls, progress) => outcome,
        signal = shutdown_signal() => {
            warn!(signal, "interrupted, closing Chrome");
            session.shutdown().await;
            return interrupted();
        }
    };
    session.shutdown().await;

    let export = match outcome {
        Ok(export) => export,
        Err(err) => return render_error(err, report, report_file),
    };

    let output_path = match write_export(&export, &out_dir) {
        Ok(path) => path,
        Err(err) => return render_error(err, report, report_file),
    };
    info!(path = %output_path.display(), "export written");

    let success = export.results().iter().filter(|r| r.success).count();
    let body = Web2PdfOutput::Convert(ConvertOutput::from_export(&export, output_path));
    if let Err(err) = write_output(&body, report, report_file.clone()) {
        return render_error(Web2PdfError::Unknown(err.to_string()), report, report_file);
    }
    exit_code_for_convert(success)
}

fn write_export(export: &Export, out_dir: &std::path::Path) -> Result<PathBuf, Web2PdfError> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(export.filename());
    std::fs::write(&path, export.bytes())?;
    Ok(path)
}
