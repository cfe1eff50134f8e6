use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};

use crate::common::error::WalltimeError;

/// Process counts for which historical runs are collected.
pub const SUPPORTED_PROCESS_COUNTS: [u32; 6] = [1, 2, 4, 8, 16, 32];

/// Number of processes of a run, restricted to [`SUPPORTED_PROCESS_COUNTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProcessCount(u32);

impl ProcessCount {
    pub fn new(count: u64) -> Option<Self> {
        SUPPORTED_PROCESS_COUNTS
            .iter()
            .find(|&&supported| u64::from(supported) == count)
            .map(|&supported| ProcessCount(supported))
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Position on the doubling scale of supported counts (1 -> 0, 2 -> 1, 4 -> 2, ...).
    #[inline]
    pub fn log2(self) -> f64 {
        f64::from(self.0.trailing_zeros())
    }
}

impl TryFrom<u64> for ProcessCount {
    type Error = WalltimeError;

    fn try_from(count: u64) -> Result<Self, Self::Error> {
        ProcessCount::new(count).ok_or(WalltimeError::UnsupportedProcessCount(count))
    }
}

impl Display for ProcessCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Count of domain-specific structural units of a task input (e.g. annotation entries).
///
/// Datasets and requests encode [`FeatureCount::NotApplicable`] as `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureCount {
    NotApplicable,
    Count(u64),
}

impl FeatureCount {
    pub const NOT_APPLICABLE_WIRE: i64 = -1;

    /// Decodes the wire value. Returns `None` for negative values other than `-1`.
    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            Self::NOT_APPLICABLE_WIRE => Some(FeatureCount::NotApplicable),
            value if value >= 0 => Some(FeatureCount::Count(value as u64)),
            _ => None,
        }
    }

    pub fn to_wire(self) -> i64 {
        match self {
            FeatureCount::NotApplicable => Self::NOT_APPLICABLE_WIRE,
            FeatureCount::Count(count) => count.min(i64::MAX as u64) as i64,
        }
    }

    pub fn count(self) -> Option<u64> {
        match self {
            FeatureCount::NotApplicable => None,
            FeatureCount::Count(count) => Some(count),
        }
    }

    pub fn is_applicable(self) -> bool {
        matches!(self, FeatureCount::Count(_))
    }
}

impl Serialize for FeatureCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.to_wire())
    }
}

impl Display for FeatureCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureCount::NotApplicable => f.write_str("n/a"),
            FeatureCount::Count(count) => count.fmt(f),
        }
    }
}

/// Identity of a historical record. Unique within a dataset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub task_name: String,
    pub num_processes: ProcessCount,
    pub feature_count: FeatureCount,
    pub sample_size: u64,
}

/// Observed (averaged) execution behavior of one task configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRecord {
    pub task_name: String,
    /// Input size in bytes
    pub sample_size: u64,
    pub num_processes: ProcessCount,
    #[serde(rename = "structural_feature_count")]
    pub feature_count: FeatureCount,
    /// Mean wall-clock seconds
    pub execution_time: f64,
    /// Mean peak memory in bytes
    pub peak_memory: f64,
}

impl HistoricalRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            task_name: self.task_name.clone(),
            num_processes: self.num_processes,
            feature_count: self.feature_count,
            sample_size: self.sample_size,
        }
    }
}
