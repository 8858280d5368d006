use std::path::Path;

use web2pdf_lib::{Config, Margins, RenderOptions, Web2PdfError};

use crate::cli::RenderArgs;

/// Render options given on the command line. Only flags that were actually
/// passed are set, so the result can be layered over the config file.
pub fn cli_render_options(args: &RenderArgs) -> RenderOptions {
    let side = |specific: &Option<String>| specific.clone().or_else(|| args.margin.clone());
    let margins = Margins {
        top: side(&args.margin_top),
        right: side(&args.margin_right),
        bottom: side(&args.margin_bottom),
        left: side(&args.margin_left),
    };
    RenderOptions {
        page_format: args.format.map(Into::into),
        orientation: args.orientation.map(Into::into),
        print_background: args.no_background.then_some(false),
        scale: args.scale,
        margins: (margins != Margins::default()).then_some(margins),
        timeout_ms: args.timeout.map(|secs| secs.saturating_mul(1000)),
    }
}

/// Merge CLI arguments with the config file, preferring CLI when a flag is present.
pub fn resolve_render_options(args: &RenderArgs, config: &Config) -> RenderOptions {
    cli_render_options(args).or(&config.render.to_options())
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/web2pdf/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, Web2PdfError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        Web2PdfError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        Web2PdfError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Format effective config as a single-line string.
pub fn format_effective_config(
    options: &RenderOptions,
    config: &Config,
    config_source: Option<&Path>,
) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let resolved = options.resolve();
    let chrome = config
        .engine
        .chrome_executable
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "auto".to_string());
    format!(
        "Effective config [{source}]: format={:?}, landscape={}, background={}, scale={:.2}, margins={}/{}/{}/{}, timeout={}ms, throttle={}ms, max_urls={}, chrome={}",
        resolved.page_format,
        resolved.landscape,
        resolved.print_background,
        resolved.scale,
        resolved.margin_top,
        resolved.margin_right,
        resolved.margin_bottom,
        resolved.margin_left,
        resolved.timeout.as_millis(),
        config.batch.throttle.as_millis(),
        config.batch.max_urls,
        chrome,
    )
}

/// Log effective config to stderr (verbose mode).
pub fn log_effective_config(options: &RenderOptions, config: &Config, config_source: Option<&Path>) {
    eprintln!("{}", format_effective_config(options, config, config_source));
}
