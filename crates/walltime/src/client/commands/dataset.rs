use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::client::globalsettings::GlobalSettings;
use crate::dataset::load_dataset;

#[derive(Parser)]
pub struct DatasetOpts {
    #[clap(subcommand)]
    pub subcmd: DatasetCommand,
}

#[derive(Parser)]
pub enum DatasetCommand {
    /// Load and validate a dataset file
    ///
    /// Fails with the first malformed row.
    Check(DatasetFileOpts),
    /// Display an overview of the tasks stored in a dataset file
    Summary(DatasetFileOpts),
}

#[derive(Parser)]
pub struct DatasetFileOpts {
    /// Path to the dataset file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,
}

pub fn command_dataset(gsettings: &GlobalSettings, opts: DatasetOpts) -> anyhow::Result<()> {
    match opts.subcmd {
        DatasetCommand::Check(opts) => {
            let dataset = load_dataset(&opts.path)
                .with_context(|| format!("Dataset {} is not valid", opts.path.display()))?;
            gsettings.printer().print_dataset_check(&opts.path, &dataset);
        }
        DatasetCommand::Summary(opts) => {
            let dataset = load_dataset(&opts.path)
                .with_context(|| format!("Cannot load dataset {}", opts.path.display()))?;
            gsettings
                .printer()
                .print_dataset_summary(&opts.path, &dataset);
        }
    }
    Ok(())
}
