pub mod config;

use std::time::Duration;

use serde::Serialize;

use crate::estimate::Estimate;

pub const DEFAULT_TIME: Duration = Duration::from_secs(2 * 3600);
pub const DEFAULT_TIME_MULT: f64 = 3.0;
pub const DEFAULT_MEMORY: u64 = 8 * 1024 * 1024 * 1024;
pub const DEFAULT_MEMORY_MULT: f64 = 2.0;

/// Which rule produced the final value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionSource {
    /// The estimate was ignored because of the override flag
    Override,
    /// There was no history for the task
    NoHistory,
    /// Modeled value scaled by the multiplier
    Modeled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ResolutionSource,
}

/// Turns a raw time estimate into the wall-clock limit requested from the scheduler.
///
/// The estimate is a point value, so it is scaled by `time_mult` to prefer a longer
/// queue wait over a task killed at its limit.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationPolicy {
    pub default_time: Duration,
    pub time_mult: f64,
    /// Always use `default_time`
    pub time_override: bool,
}

impl Default for EstimationPolicy {
    fn default() -> Self {
        EstimationPolicy {
            default_time: DEFAULT_TIME,
            time_mult: DEFAULT_TIME_MULT,
            time_override: false,
        }
    }
}

impl EstimationPolicy {
    pub fn resolve(&self, estimate: &Estimate) -> Duration {
        self.resolve_detailed(estimate).value
    }

    pub fn resolve_detailed(&self, estimate: &Estimate) -> Resolved<Duration> {
        let resolved = match (self.time_override, estimate) {
            (true, _) => Resolved {
                value: self.default_time,
                source: ResolutionSource::Override,
            },
            // The default is not multiplied, it is already meant to be safe
            (false, Estimate::NoHistory) => Resolved {
                value: self.default_time,
                source: ResolutionSource::NoHistory,
            },
            (false, Estimate::Modeled(modeled)) => Resolved {
                value: Duration::try_from_secs_f64(modeled.value * self.time_mult)
                    .unwrap_or(Duration::MAX),
                source: ResolutionSource::Modeled,
            },
        };
        log::debug!(
            "Resolved wall-clock time {:?} ({:?})",
            resolved.value,
            resolved.source
        );
        resolved
    }
}

/// Memory counterpart of [`EstimationPolicy`], values are in bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPolicy {
    pub default_memory: u64,
    pub memory_mult: f64,
    /// Always use `default_memory`
    pub memory_override: bool,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        MemoryPolicy {
            default_memory: DEFAULT_MEMORY,
            memory_mult: DEFAULT_MEMORY_MULT,
            memory_override: false,
        }
    }
}

impl MemoryPolicy {
    pub fn resolve(&self, estimate: &Estimate) -> u64 {
        self.resolve_detailed(estimate).value
    }

    pub fn resolve_detailed(&self, estimate: &Estimate) -> Resolved<u64> {
        match (self.memory_override, estimate) {
            (true, _) => Resolved {
                value: self.default_memory,
                source: ResolutionSource::Override,
            },
            (false, Estimate::NoHistory) => Resolved {
                value: self.default_memory,
                source: ResolutionSource::NoHistory,
            },
            (false, Estimate::Modeled(modeled)) => Resolved {
                // Saturating conversion
                value: (modeled.value * self.memory_mult).ceil() as u64,
                source: ResolutionSource::Modeled,
            },
        }
    }
}
