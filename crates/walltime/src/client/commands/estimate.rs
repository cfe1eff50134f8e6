use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use crate::client::globalsettings::GlobalSettings;
use crate::client::output::outputs::BatchItem;
use crate::common::format::TimeFormat;
use crate::common::utils::size::ArgMemory;
use crate::common::utils::time::ArgDuration;
use crate::dataset::load_dataset;
use crate::engine::WalltimeEngine;
use crate::estimate::normalize::EstimationRequest;
use crate::estimate::requests::load_requests;
use crate::policy::config::{ConfigOverrides, EstimatorConfig};

#[derive(Parser)]
pub struct EngineOpts {
    /// Path to the historical dataset (CSV with a header row)
    #[arg(long, env = "WTE_DATASET", value_hint = clap::ValueHint::FilePath)]
    pub dataset: PathBuf,

    /// Path to a TOML configuration file
    #[arg(long, env = "WTE_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub policy: PolicyOpts,

    /// How the wall-clock limit is displayed
    #[arg(long, default_value_t = TimeFormat::Human, value_enum)]
    pub time_format: TimeFormat,
}

/// Options that take precedence over the configuration file.
#[derive(Parser)]
pub struct PolicyOpts {
    /// Wall-clock limit used when there is no history for the task
    ///
    /// You can use either the humantime format (`2h`, `90m`) or `HH:MM:SS`.
    #[arg(long, env = "WTE_DEFAULT_TIME")]
    pub default_time: Option<ArgDuration>,

    /// Multiplier applied to the estimated execution time
    #[arg(long, env = "WTE_TIME_MULT")]
    pub time_mult: Option<f64>,

    /// Always use the default wall-clock limit
    #[arg(long, env = "WTE_TIME_OVERRIDE")]
    pub time_override: bool,

    /// Memory used when there is no history for the task (e.g. `8GB`, `512MiB`)
    #[arg(long, env = "WTE_DEFAULT_MEMORY")]
    pub default_memory: Option<ArgMemory>,

    /// Multiplier applied to the estimated peak memory
    #[arg(long, env = "WTE_MEMORY_MULT")]
    pub memory_mult: Option<f64>,

    /// Always use the default memory
    #[arg(long, env = "WTE_MEMORY_OVERRIDE")]
    pub memory_override: bool,
}

impl PolicyOpts {
    fn into_overrides(self) -> ConfigOverrides {
        let PolicyOpts {
            default_time,
            time_mult,
            time_override,
            default_memory,
            memory_mult,
            memory_override,
        } = self;
        // An unset flag keeps the value from the configuration file
        ConfigOverrides {
            default_time: default_time.map(|time| time.unpack()),
            time_mult,
            time_override: time_override.then_some(true),
            default_memory: default_memory.map(|memory| memory.unpack()),
            memory_mult,
            memory_override: memory_override.then_some(true),
        }
    }
}

#[derive(Parser)]
pub struct EstimateOpts {
    #[clap(flatten)]
    pub engine: EngineOpts,

    /// Name of the task (case-insensitive)
    pub task_name: String,

    /// Size of the task input in bytes
    pub sample_size: u64,

    /// Number of processes of the task (1, 2, 4, 8, 16 or 32)
    pub num_processes: u64,

    /// Number of structural features of the input, -1 if not applicable
    #[arg(default_value_t = -1, allow_negative_numbers = true)]
    pub structural_feature_count: i64,
}

#[derive(Parser)]
pub struct EstimateBatchOpts {
    #[clap(flatten)]
    pub engine: EngineOpts,

    /// Path to a CSV file with the columns
    /// `task_name,sample_size,num_processes,structural_feature_count`
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub requests: PathBuf,
}

fn create_engine(opts: EngineOpts) -> anyhow::Result<(WalltimeEngine, TimeFormat)> {
    let EngineOpts {
        dataset,
        config,
        policy,
        time_format,
    } = opts;

    let config = match config {
        Some(path) => EstimatorConfig::load(&path)
            .with_context(|| format!("Cannot load configuration {}", path.display()))?,
        None => EstimatorConfig::default(),
    };
    let config = config.apply(policy.into_overrides())?;

    let dataset = load_dataset(&dataset)
        .with_context(|| format!("Cannot load dataset {}", dataset.display()))?;
    Ok((WalltimeEngine::new(Arc::new(dataset), config), time_format))
}

pub fn command_estimate(gsettings: &GlobalSettings, opts: EstimateOpts) -> anyhow::Result<()> {
    let EstimateOpts {
        engine,
        task_name,
        sample_size,
        num_processes,
        structural_feature_count,
    } = opts;
    let (engine, time_format) = create_engine(engine)?;

    let request = EstimationRequest::new(
        task_name,
        sample_size,
        num_processes,
        structural_feature_count,
    );
    let reservation = engine.estimate(&request)?;
    gsettings
        .printer()
        .print_reservation(&reservation, time_format);
    Ok(())
}

/// Every row is estimated independently, failed rows are reported next to the others.
pub fn command_estimate_batch(
    gsettings: &GlobalSettings,
    opts: EstimateBatchOpts,
) -> anyhow::Result<()> {
    let (engine, time_format) = create_engine(opts.engine)?;
    let rows = load_requests(&opts.requests)
        .with_context(|| format!("Cannot load requests {}", opts.requests.display()))?;

    let items: Vec<BatchItem> = rows
        .into_iter()
        .map(|row| BatchItem {
            line: row.line,
            result: row.request.and_then(|request| engine.estimate(&request)),
        })
        .collect();

    let failed = items.iter().filter(|item| item.result.is_err()).count();
    if failed > 0 {
        log::warn!("{failed} of {} request(s) could not be estimated", items.len());
    }
    gsettings.printer().print_batch(&items, time_format);
    Ok(())
}
