use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use web2pdf_lib::{Orientation, PageFormat};

#[derive(Parser)]
#[command(name = "web2pdf")]
#[command(
    version,
    about = "Convert web pages to PDF with headless Chrome",
    long_about = "web2pdf\n\nModes:\n- convert: render up to 10 URLs; one URL writes a PDF, several write a ZIP of the PDFs that succeeded.\n- check: run URL normalization and the private-network filter without launching Chrome.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) with engine/render/batch/settle defaults; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render one or more URLs to PDF
    Convert {
        #[arg(required = true, value_name = "URL", help = "Pages to convert (scheme optional, https assumed)")]
        urls: Vec<String>,

        #[command(flatten)]
        render: RenderArgs,

        #[arg(
            long,
            default_value = ".",
            value_name = "DIR",
            help = "Directory the PDF or ZIP is written to; created if missing"
        )]
        out_dir: PathBuf,

        #[arg(long, value_enum, default_value = "json", help = "Report format")]
        report: OutputFormat,

        #[arg(long, value_name = "PATH", help = "Write the report to a file (stdout if omitted)")]
        report_file: Option<PathBuf>,
    },

    /// Check which URLs would be accepted, without rendering
    Check {
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,

        #[arg(long, value_enum, default_value = "json", help = "Report format")]
        report: OutputFormat,

        #[arg(long, value_name = "PATH", help = "Write the report to a file (stdout if omitted)")]
        report_file: Option<PathBuf>,
    },
}

/// Render option flags. Unset flags fall back to the config file, then to
/// built-in defaults.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct RenderArgs {
    #[arg(long, value_enum, help = "Paper size [default: a4]")]
    pub format: Option<PaperArg>,

    #[arg(long, value_enum, help = "Page orientation [default: portrait]")]
    pub orientation: Option<OrientationArg>,

    #[arg(long, help = "Do not print CSS backgrounds")]
    pub no_background: bool,

    #[arg(long, help = "Render scale, clamped to 0.1..=2.0 [default: 1.0]")]
    pub scale: Option<f64>,

    #[arg(long, value_name = "LEN", help = "Margin for all sides, e.g. 10mm, 0.5in, 24px")]
    pub margin: Option<String>,

    #[arg(long, value_name = "LEN")]
    pub margin_top: Option<String>,

    #[arg(long, value_name = "LEN")]
    pub margin_right: Option<String>,

    #[arg(long, value_name = "LEN")]
    pub margin_bottom: Option<String>,

    #[arg(long, value_name = "LEN")]
    pub margin_left: Option<String>,

    #[arg(long, value_name = "SECS", help = "Per-page timeout in seconds [default: 60]")]
    pub timeout: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PaperArg {
    A4,
    Letter,
    Legal,
}

impl From<PaperArg> for PageFormat {
    fn from(value: PaperArg) -> Self {
        match value {
            PaperArg::A4 => PageFormat::A4,
            PaperArg::Letter => PageFormat::Letter,
            PaperArg::Legal => PageFormat::Legal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<OrientationArg> for Orientation {
    fn from(value: OrientationArg) -> Self {
        match value {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
