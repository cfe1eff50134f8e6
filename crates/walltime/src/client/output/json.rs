use std::path::Path;

use serde_json::{Value, json};

use crate::client::output::outputs::{BatchItem, Output};
use crate::common::format::TimeFormat;
use crate::dataset::Dataset;
use crate::engine::TaskReservation;

#[derive(Default)]
pub struct JsonOutput;

impl JsonOutput {
    fn print(&self, data: Value) {
        match serde_json::to_string_pretty(&data) {
            Ok(text) => println!("{text}"),
            Err(e) => log::error!("Cannot serialize output: {e:?}"),
        }
    }
}

fn format_reservation(reservation: &TaskReservation, time_format: TimeFormat) -> Value {
    json!({
        "reservation": reservation,
        "walltime": time_format.format(&reservation.walltime.value),
    })
}

impl Output for JsonOutput {
    fn print_reservation(&self, reservation: &TaskReservation, time_format: TimeFormat) {
        self.print(format_reservation(reservation, time_format));
    }

    fn print_batch(&self, items: &[BatchItem], time_format: TimeFormat) {
        let items: Vec<Value> = items
            .iter()
            .map(|item| match &item.result {
                Ok(reservation) => {
                    let mut value = format_reservation(reservation, time_format);
                    value["line"] = json!(item.line);
                    value
                }
                Err(error) => json!({
                    "line": item.line,
                    "error": error.to_string(),
                }),
            })
            .collect();
        self.print(json!(items));
    }

    fn print_dataset_check(&self, path: &Path, dataset: &Dataset) {
        self.print(json!({
            "path": path,
            "valid": true,
            "records": dataset.len(),
            "tasks": dataset.task_count(),
            "version": dataset.version(),
        }));
    }

    fn print_dataset_summary(&self, path: &Path, dataset: &Dataset) {
        self.print(json!({
            "path": path,
            "version": dataset.version(),
            "tasks": dataset.summary(),
        }));
    }

    fn print_error(&self, error: anyhow::Error) {
        self.print(json!({
            "error": format!("{error:?}"),
        }));
    }
}
