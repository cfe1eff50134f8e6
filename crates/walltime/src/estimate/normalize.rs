use serde::{Deserialize, Serialize};

use crate::common::error::WalltimeError;
use crate::dataset::record::{FeatureCount, ProcessCount};

/// Runtime parameters of a single task, as supplied by the workflow before submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationRequest {
    pub task_name: String,
    pub sample_size: u64,
    pub num_processes: u64,
    /// `-1` when the task type has no structural feature count
    pub structural_feature_count: i64,
}

impl EstimationRequest {
    pub fn new(
        task_name: impl Into<String>,
        sample_size: u64,
        num_processes: u64,
        structural_feature_count: i64,
    ) -> Self {
        EstimationRequest {
            task_name: task_name.into(),
            sample_size,
            num_processes,
            structural_feature_count,
        }
    }
}

/// Request mapped into the estimator input space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFeatures {
    pub task_name: String,
    pub sample_size: u64,
    pub num_processes: ProcessCount,
    pub feature_count: FeatureCount,
}

/// Normalizes the task name and validates the process and feature counts.
/// Unsupported process counts are rejected, never rounded to a nearby value.
pub fn normalize(request: &EstimationRequest) -> crate::Result<NormalizedFeatures> {
    let num_processes = ProcessCount::try_from(request.num_processes)?;
    let feature_count = FeatureCount::from_wire(request.structural_feature_count).ok_or(
        WalltimeError::InvalidFeatureCount(request.structural_feature_count),
    )?;
    Ok(NormalizedFeatures {
        task_name: request.task_name.trim().to_lowercase(),
        sample_size: request.sample_size,
        num_processes,
        feature_count,
    })
}
