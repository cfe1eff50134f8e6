pub mod client;
pub mod common;
pub mod dataset;
pub mod engine;
pub mod estimate;
pub mod policy;

#[cfg(test)]
pub(crate) mod tests;

pub type Error = crate::common::error::WalltimeError;
pub type Result<T> = std::result::Result<T, Error>;

pub use dataset::Dataset;
pub use engine::{TaskReservation, WalltimeEngine};
pub use estimate::normalize::EstimationRequest;
pub use policy::config::EstimatorConfig;

pub const WALLTIME_VERSION: &str = {
    match option_env!("WTE_BUILD_VERSION") {
        Some(version) => version,
        None => const_format::concatcp!(env!("CARGO_PKG_VERSION"), "-dev"),
    }
};
