pub mod config;
pub mod dashboard;
pub mod export;
pub mod filters;
pub mod remediate;
pub mod report;

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;
use crate::filter::{FilterSet, Selection};
use crate::loader::{load_file, LoadReport};
use crate::models::Dataset;
use crate::settings::{load_settings, shellexpand_path, Settings};

#[derive(Parser)]
#[command(
    name = "cloudmart",
    version,
    about = "Cloud resource tagging and cost visibility reports."
)]
pub struct Cli {
    /// Dataset CSV (default: the `dataset` setting)
    #[arg(long, global = true, value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Filter flags, accepted after a report subcommand. Each flag takes every
/// following value up to the next flag, so they cannot sit before the
/// subcommand name.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Keep only these services; pass the flag with no values to select none
    #[arg(long, num_args = 0.., value_name = "SERVICE")]
    pub service: Option<Vec<String>>,

    /// Keep only these regions
    #[arg(long, num_args = 0.., value_name = "REGION")]
    pub region: Option<Vec<String>>,

    /// Keep only these departments; `(missing)` selects rows without one
    #[arg(long, num_args = 0.., value_name = "DEPARTMENT")]
    pub department: Option<Vec<String>>,

    /// Keep only these projects; `(missing)` selects rows without one
    #[arg(long, num_args = 0.., value_name = "PROJECT")]
    pub project: Option<Vec<String>>,
}

impl FilterArgs {
    pub fn filter_set(&self) -> FilterSet {
        FilterSet {
            service: Selection::from_arg(self.service.as_deref()),
            region: Selection::from_arg(self.region.as_deref()),
            department: Selection::from_arg(self.department.as_deref()),
            project: Selection::from_arg(self.project.as_deref()),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every panel in order.
    Dashboard {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// First rows, missing values per column and the tagging summary.
    Explore {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Cost by tagging status, top untagged department, top project, environments.
    Costs {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Tag completeness, missing tag fields and the untagged resources.
    Compliance {
        /// Also write untagged_resources.csv to the export directory
        #[arg(long)]
        export: bool,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Render the four dashboard charts to a PDF.
    Charts {
        /// Output file path
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Fill in missing tags for untagged resources and write the updated dataset.
    Remediate {
        /// Apply an edits CSV (Row,Department,Project,Owner) instead of the grid editor
        #[arg(long, value_name = "CSV")]
        edits: Option<PathBuf>,
        /// Also render the before/after comparison chart to a PDF
        #[arg(long)]
        chart: bool,
        /// Directory for the CSV and PDF outputs (default: the `export_dir` setting)
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// List the selectable values of each filter column.
    Filters,
    /// Show or change saved settings.
    Config {
        /// Default dataset path
        #[arg(long)]
        dataset: Option<String>,
        /// Default directory for exports
        #[arg(long = "export-dir")]
        export_dir: Option<String>,
        /// Rows in the exploration preview
        #[arg(long = "preview-rows")]
        preview_rows: Option<usize>,
        /// Rows in the tag completeness table
        #[arg(long = "completeness-rows")]
        completeness_rows: Option<usize>,
        /// Rows in the lowest completeness table
        #[arg(long = "lowest-completeness")]
        lowest_completeness: Option<usize>,
    },
    /// Print a shell completion script.
    Completions {
        shell: clap_complete::Shell,
    },
}

impl Commands {
    fn filter_args(&self) -> Option<&FilterArgs> {
        match self {
            Self::Dashboard { filters }
            | Self::Explore { filters }
            | Self::Costs { filters }
            | Self::Compliance { filters, .. }
            | Self::Charts { filters, .. }
            | Self::Remediate { filters, .. } => Some(filters),
            Self::Filters | Self::Config { .. } | Self::Completions { .. } => None,
        }
    }
}

impl Cli {
    /// Active filters; everything is selected when the command takes none.
    pub fn filters(&self) -> FilterSet {
        self.command
            .as_ref()
            .and_then(Commands::filter_args)
            .map(FilterArgs::filter_set)
            .unwrap_or_default()
    }

    pub fn dataset_path(&self, settings: &Settings) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| PathBuf::from(shellexpand_path(&settings.dataset)))
    }
}

/// Everything a command works on: the loaded dataset, the active filters and
/// the saved settings.
pub struct Session {
    pub path: PathBuf,
    pub dataset: Dataset,
    pub load: LoadReport,
    pub filters: FilterSet,
    pub settings: Settings,
}

impl Session {
    pub fn open(cli: &Cli) -> Result<Self> {
        let settings = load_settings();
        let path = cli.dataset_path(&settings);
        let (dataset, load) = load_file(&path)?;
        Ok(Self {
            path,
            dataset,
            load,
            filters: cli.filters(),
            settings,
        })
    }
}

/// RUST_LOG in the environment takes precedence; --verbose falls back to DEBUG.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

pub fn completions(shell: clap_complete::Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}
