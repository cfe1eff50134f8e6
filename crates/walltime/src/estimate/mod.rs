pub mod estimator;
pub mod normalize;
pub mod requests;

use serde::Serialize;

use crate::dataset::record::{HistoricalRecord, ProcessCount};

pub use estimator::Estimator;

/// Measured quantity that is being estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// Wall-clock seconds
    ExecutionTime,
    /// Peak memory in bytes
    PeakMemory,
}

impl Metric {
    #[inline]
    pub fn value(self, record: &HistoricalRecord) -> f64 {
        match self {
            Metric::ExecutionTime => record.execution_time,
            Metric::PeakMemory => record.peak_memory,
        }
    }
}

/// How a modeled value was derived from the observations of one process count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimateBasis {
    /// An observation with the same features exists
    Exact,
    /// Interpolated between two observations along the sample size
    Interpolated,
    /// Extrapolated beyond the largest observed sample size
    Extrapolated,
    /// The closest observation was used as is
    Nearest,
}

/// Which process counts contributed to a modeled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProcessSelection {
    /// Observations with the requested process count exist
    Exact { processes: ProcessCount },
    /// Interpolated between the closest lower and higher process counts with data
    Bracketed {
        lower: ProcessCount,
        upper: ProcessCount,
    },
    /// Only one side of the requested process count has data
    Nearest { processes: ProcessCount },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeledValue {
    pub value: f64,
    pub basis: EstimateBasis,
    pub processes: ProcessSelection,
}

/// Outcome of the estimator for a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Estimate {
    Modeled(ModeledValue),
    /// The dataset contains no record of the task
    NoHistory,
}

impl Estimate {
    pub fn modeled_value(&self) -> Option<f64> {
        match self {
            Estimate::Modeled(modeled) => Some(modeled.value),
            Estimate::NoHistory => None,
        }
    }

    pub fn is_no_history(&self) -> bool {
        matches!(self, Estimate::NoHistory)
    }
}
