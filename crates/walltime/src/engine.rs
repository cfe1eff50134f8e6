use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::dataset::Dataset;
use crate::estimate::normalize::{EstimationRequest, normalize};
use crate::estimate::{Estimate, Estimator};
use crate::policy::config::EstimatorConfig;
use crate::policy::{ResolutionSource, Resolved};

/// Resources that should be requested from the scheduler for a single task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReservation {
    pub task_name: String,
    /// Raw estimate of the execution time in seconds
    pub time_estimate: Estimate,
    #[serde(serialize_with = "serialize_resolved_duration")]
    pub walltime: Resolved<Duration>,
    /// Raw estimate of the peak memory in bytes
    pub memory_estimate: Estimate,
    #[serde(serialize_with = "serialize_resolved_memory")]
    pub memory: Resolved<u64>,
}

#[derive(Serialize)]
struct ResolvedDef<T> {
    value: T,
    source: ResolutionSource,
}

fn serialize_resolved_duration<S: Serializer>(
    resolved: &Resolved<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    ResolvedDef {
        value: resolved.value.as_secs_f64(),
        source: resolved.source,
    }
    .serialize(serializer)
}

fn serialize_resolved_memory<S: Serializer>(
    resolved: &Resolved<u64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    ResolvedDef {
        value: resolved.value,
        source: resolved.source,
    }
    .serialize(serializer)
}

/// Entry point of the estimation: normalizes a request, estimates its execution time
/// and peak memory from the dataset and applies the policy.
///
/// The engine only reads the dataset and the configuration, so a single instance
/// (or its clones) can be used from several threads at once.
#[derive(Debug, Clone)]
pub struct WalltimeEngine {
    dataset: Arc<Dataset>,
    config: EstimatorConfig,
}

impl WalltimeEngine {
    pub fn new(dataset: Arc<Dataset>, config: EstimatorConfig) -> Self {
        WalltimeEngine { dataset, config }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn estimate(&self, request: &EstimationRequest) -> crate::Result<TaskReservation> {
        let features = normalize(request)?;
        let estimator = Estimator::new(&self.dataset);

        let time_estimate = estimator.estimate_time(&features);
        let memory_estimate = estimator.estimate_memory(&features);
        let walltime = self.config.time.resolve_detailed(&time_estimate);
        let memory = self.config.memory.resolve_detailed(&memory_estimate);

        log::debug!(
            "Task `{}` (sample size {}, {} process(es)): walltime {:?}, memory {} B",
            features.task_name,
            features.sample_size,
            features.num_processes,
            walltime.value,
            memory.value
        );

        Ok(TaskReservation {
            task_name: features.task_name,
            time_estimate,
            walltime,
            memory_estimate,
            memory,
        })
    }

    /// Wall-clock limit for the request, the single value that ends up in the
    /// scheduler directive.
    pub fn walltime(&self, request: &EstimationRequest) -> crate::Result<Duration> {
        Ok(self.estimate(request)?.walltime.value)
    }
}
