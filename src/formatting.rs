use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use web2pdf_lib::output::{ItemReport, WEB2PDF_OUTPUT_VERSION};
use web2pdf_lib::{ErrorOutput, Web2PdfError, Web2PdfOutput};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &Web2PdfOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
///
/// A run where no URL converted exits with 1; every other error is fatal (2).
pub fn render_error(err: Web2PdfError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let (code, items) = match &err {
        Web2PdfError::NothingConverted { results, .. } => {
            (1, results.iter().map(ItemReport::from).collect())
        }
        _ => (2, Vec::new()),
    };
    let payload = Web2PdfOutput::Error(ErrorOutput {
        version: WEB2PDF_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
        items,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    ExitCode::from(code)
}

/// Write JSON output to file or stdout.
fn write_json_output(
    body: &Web2PdfOutput,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &Web2PdfOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

fn write_items(buf: &mut String, items: &[ItemReport], colorize: bool) {
    for item in items {
        if item.success {
            let mark = color("ok  ", "32", colorize);
            writeln!(
                buf,
                "{mark} {} -> {} ({} bytes, {} ms)",
                item.url, item.filename, item.bytes, item.duration_ms
            )
            .ok();
        } else {
            let mark = color("fail", "31", colorize);
            let reason = item.error.as_deref().unwrap_or("unknown error");
            writeln!(buf, "{mark} {} ({reason}, {} ms)", item.url, item.duration_ms).ok();
        }
    }
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &Web2PdfOutput, colorize: bool) -> String {
    match body {
        Web2PdfOutput::Convert(out) => {
            let mut buf = String::new();
            let header = color("[CONVERT]", "36", colorize);
            writeln!(buf, "{} Wrote {}", header, out.output_path.display()).ok();
            if let Some(summary) = &out.summary {
                writeln!(
                    buf,
                    "{} of {} pages converted, {} failed",
                    summary.success, summary.total, summary.failed
                )
                .ok();
            }
            write_items(&mut buf, &out.items, colorize);
            buf
        }
        Web2PdfOutput::Check(out) => {
            let mut buf = String::new();
            let header = color("[CHECK]", "34", colorize);
            let allowed = out.items.iter().filter(|i| i.allowed).count();
            writeln!(buf, "{} {} of {} URLs allowed", header, allowed, out.items.len()).ok();
            for item in &out.items {
                let status = if item.allowed {
                    color("allowed", "32", colorize)
                } else {
                    color("blocked", "31", colorize)
                };
                let shown = item.normalized.as_deref().unwrap_or(item.input.as_str());
                writeln!(buf, "- {status} {shown}").ok();
            }
            buf
        }
        Web2PdfOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            write_items(&mut buf, &out.items, colorize);
            buf
        }
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Exit code for a finished conversion: 0 once anything was written.
pub fn exit_code_for_convert(success: usize) -> ExitCode {
    if success > 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Exit code for `check`: 1 when any URL would be blocked.
pub fn exit_code_for_check(all_allowed: bool) -> ExitCode {
    if all_allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
