use std::path::Path;

use crate::common::format::TimeFormat;
use crate::dataset::Dataset;
use crate::engine::TaskReservation;

#[derive(clap::ValueEnum, Clone)]
pub enum Outputs {
    CLI,
    JSON,
    Quiet,
}

/// Outcome of one row of a batch estimation.
pub struct BatchItem {
    pub line: usize,
    pub result: crate::Result<TaskReservation>,
}

pub trait Output {
    // Estimation
    fn print_reservation(&self, reservation: &TaskReservation, time_format: TimeFormat);
    fn print_batch(&self, items: &[BatchItem], time_format: TimeFormat);

    // Dataset
    fn print_dataset_check(&self, path: &Path, dataset: &Dataset);
    fn print_dataset_summary(&self, path: &Path, dataset: &Dataset);

    fn print_error(&self, error: anyhow::Error);
}
