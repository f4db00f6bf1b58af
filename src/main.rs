mod charts;
mod cli;
mod compare;
mod error;
mod filter;
mod fmt;
mod loader;
mod models;
#[cfg(feature = "pdf")]
mod pdf;
mod pipeline;
mod remediation;
mod reports;
mod settings;
mod tui;

use clap::Parser;

use cli::config::ConfigChanges;
use cli::{Cli, Commands, Session};
use error::Result;

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Config {
            dataset,
            export_dir,
            preview_rows,
            completeness_rows,
            lowest_completeness,
        }) => {
            return cli::config::run(ConfigChanges {
                dataset: dataset.clone(),
                export_dir: export_dir.clone(),
                preview_rows: *preview_rows,
                completeness_rows: *completeness_rows,
                lowest_completeness: *lowest_completeness,
            })
        }
        Some(Commands::Completions { shell }) => return cli::completions(*shell),
        _ => {}
    }

    let session = Session::open(&cli)?;
    match cli.command {
        None | Some(Commands::Dashboard { .. }) => cli::dashboard::run(&session),
        Some(Commands::Explore { .. }) => cli::dashboard::explore(&session),
        Some(Commands::Costs { .. }) => cli::dashboard::costs(&session),
        Some(Commands::Compliance { export, .. }) => cli::dashboard::compliance(&session, export),
        Some(Commands::Charts { output, .. }) => cli::export::charts(&session, output),
        Some(Commands::Remediate {
            edits,
            chart,
            output_dir,
            ..
        }) => cli::remediate::run(session, edits, chart, output_dir),
        Some(Commands::Filters) => cli::filters::run(&session),
        Some(Commands::Config { .. } | Commands::Completions { .. }) => Ok(()),
    }
}

fn main() {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
