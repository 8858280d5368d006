mod cli;
mod commands;
mod formatting;
mod progress;
mod settings;
mod shutdown;

use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::Commands;
use commands::{run_check, run_convert};

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();
}

async fn run() -> ExitCode {
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Convert {
            urls,
            render,
            out_dir,
            report,
            report_file,
        } => {
            run_convert(
                args.config,
                args.verbose,
                urls,
                render,
                out_dir,
                report,
                report_file,
            )
            .await
        }
        Commands::Check {
            urls,
            report,
            report_file,
        } => run_check(args.config, args.verbose, urls, report, report_file),
    }
}
