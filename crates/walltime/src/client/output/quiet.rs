use std::path::Path;

use crate::client::output::outputs::{BatchItem, Output};
use crate::common::format::TimeFormat;
use crate::dataset::Dataset;
use crate::engine::TaskReservation;

/// Prints only the values, e.g. for embedding the walltime into a submission script.
#[derive(Default)]
pub struct Quiet;

impl Output for Quiet {
    fn print_reservation(&self, reservation: &TaskReservation, time_format: TimeFormat) {
        println!("{}", time_format.format(&reservation.walltime.value));
    }

    fn print_batch(&self, items: &[BatchItem], time_format: TimeFormat) {
        for item in items {
            match &item.result {
                Ok(reservation) => println!(
                    "{} {}",
                    item.line,
                    time_format.format(&reservation.walltime.value)
                ),
                Err(_) => println!("{} FAILED", item.line),
            }
        }
    }

    fn print_dataset_check(&self, _path: &Path, _dataset: &Dataset) {}

    fn print_dataset_summary(&self, _path: &Path, dataset: &Dataset) {
        for task in dataset.summary() {
            println!("{} {}", task.task_name, task.records);
        }
    }

    fn print_error(&self, error: anyhow::Error) {
        eprintln!("{error:?}");
    }
}
