use std::path::Path;

use cli_table::format::{Justify, Separator};
use cli_table::{Cell, CellStruct, Color, ColorChoice, Style, Table, TableStruct, print_stdout};
use colored::Colorize;
use itertools::Itertools;

use crate::client::output::outputs::{BatchItem, Output};
use crate::common::format::{TimeFormat, human_size};
use crate::dataset::Dataset;
use crate::engine::TaskReservation;
use crate::estimate::{Estimate, EstimateBasis, ProcessSelection};
use crate::policy::ResolutionSource;

pub struct CliOutput {
    color_policy: ColorChoice,
}

impl CliOutput {
    pub fn new(color_policy: ColorChoice) -> CliOutput {
        CliOutput { color_policy }
    }

    fn print_vertical_table(&self, rows: Vec<Vec<CellStruct>>) {
        let table = rows.table().separator(
            Separator::builder()
                .column(Some(Default::default()))
                .build(),
        );
        self.print_table(table);
    }

    fn print_horizontal_table(&self, rows: Vec<Vec<CellStruct>>, header: Vec<CellStruct>) {
        let table = rows
            .table()
            .separator(
                Separator::builder()
                    .title(Some(Default::default()))
                    .column(Some(Default::default()))
                    .build(),
            )
            .title(header);
        self.print_table(table);
    }

    fn print_table(&self, table: TableStruct) {
        let table = table.color_choice(self.color_policy);
        if let Err(e) = print_stdout(table) {
            log::error!("Cannot print table to stdout: {e:?}");
        }
    }
}

impl Output for CliOutput {
    fn print_reservation(&self, reservation: &TaskReservation, time_format: TimeFormat) {
        let TaskReservation {
            task_name,
            time_estimate,
            walltime,
            memory_estimate,
            memory,
        } = reservation;

        let rows = vec![
            vec!["Task".cell().bold(true), task_name.cell()],
            vec![
                "Walltime".cell().bold(true),
                time_format.format(&walltime.value).cell().bold(true),
            ],
            vec![
                "Walltime source".cell().bold(true),
                source_cell(walltime.source),
            ],
            vec![
                "Time estimate".cell().bold(true),
                format_estimate(time_estimate, |value| format!("{value:.2} s")).cell(),
            ],
            vec!["Memory".cell().bold(true), human_size(memory.value).cell()],
            vec!["Memory source".cell().bold(true), source_cell(memory.source)],
            vec![
                "Memory estimate".cell().bold(true),
                format_estimate(memory_estimate, |value| human_size(value.ceil() as u64)).cell(),
            ],
        ];
        self.print_vertical_table(rows);
    }

    fn print_batch(&self, items: &[BatchItem], time_format: TimeFormat) {
        let rows: Vec<_> = items
            .iter()
            .map(|item| match &item.result {
                Ok(reservation) => vec![
                    item.line.cell().justify(Justify::Right),
                    reservation.task_name.as_str().cell(),
                    time_format.format(&reservation.walltime.value).cell(),
                    source_cell(reservation.walltime.source),
                    human_size(reservation.memory.value).cell(),
                    source_cell(reservation.memory.source),
                ],
                Err(error) => vec![
                    item.line.cell().justify(Justify::Right),
                    error
                        .to_string()
                        .cell()
                        .foreground_color(Some(Color::Red)),
                    "".cell(),
                    "".cell(),
                    "".cell(),
                    "".cell(),
                ],
            })
            .collect();

        let header = vec![
            "Line".cell().bold(true),
            "Task".cell().bold(true),
            "Walltime".cell().bold(true),
            "Walltime source".cell().bold(true),
            "Memory".cell().bold(true),
            "Memory source".cell().bold(true),
        ];
        self.print_horizontal_table(rows, header);

        let failed = items.iter().filter(|item| item.result.is_err()).count();
        if failed > 0 {
            println!(
                "{} of {} request(s) {}",
                failed,
                items.len(),
                "failed".color(colored::Color::Red)
            );
        }
    }

    fn print_dataset_check(&self, path: &Path, dataset: &Dataset) {
        println!(
            "Dataset {} is {}: {} record(s) of {} task(s), version {}",
            path.display(),
            "valid".color(colored::Color::Green),
            dataset.len(),
            dataset.task_count(),
            dataset.version()
        );
    }

    fn print_dataset_summary(&self, path: &Path, dataset: &Dataset) {
        let rows: Vec<_> = dataset
            .summary()
            .into_iter()
            .map(|task| {
                vec![
                    task.task_name.cell(),
                    task.records.cell().justify(Justify::Right),
                    task.process_counts.iter().join(", ").cell(),
                    format!("{} - {}", task.min_sample_size, task.max_sample_size).cell(),
                    (if task.uses_feature_count { "yes" } else { "no" }).cell(),
                ]
            })
            .collect();
        let header = vec![
            "Task".cell().bold(true),
            "Records".cell().bold(true),
            "Processes".cell().bold(true),
            "Sample sizes".cell().bold(true),
            "Structural features".cell().bold(true),
        ];
        self.print_horizontal_table(rows, header);
        println!(
            "{}: {} record(s), version {}",
            path.display(),
            dataset.len(),
            dataset.version()
        );
    }

    fn print_error(&self, error: anyhow::Error) {
        eprintln!("{error:?}");
    }
}

fn source_cell(source: ResolutionSource) -> CellStruct {
    let (text, color) = match source {
        ResolutionSource::Modeled => ("modeled", Color::Green),
        ResolutionSource::NoHistory => ("no history (default)", Color::Yellow),
        ResolutionSource::Override => ("override (default)", Color::Cyan),
    };
    text.cell().foreground_color(Some(color))
}

fn format_estimate(estimate: &Estimate, format_value: impl Fn(f64) -> String) -> String {
    let modeled = match estimate {
        Estimate::Modeled(modeled) => modeled,
        Estimate::NoHistory => return "no history".to_string(),
    };
    let basis = match modeled.basis {
        EstimateBasis::Exact => "exact",
        EstimateBasis::Interpolated => "interpolated",
        EstimateBasis::Extrapolated => "extrapolated",
        EstimateBasis::Nearest => "nearest",
    };
    let processes = match modeled.processes {
        ProcessSelection::Exact { processes } => format!("{processes} process(es)"),
        ProcessSelection::Bracketed { lower, upper } => {
            format!("between {lower} and {upper} processes")
        }
        ProcessSelection::Nearest { processes } => {
            format!("nearest available: {processes} process(es)")
        }
    };
    format!("{} ({basis}, {processes})", format_value(modeled.value))
}
