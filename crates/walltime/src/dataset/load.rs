use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::common::error::{DatasetIssue, WalltimeError};
use crate::common::parser::{consume_all, p_f64, p_i64, p_u64};
use crate::dataset::Dataset;
use crate::dataset::record::{FeatureCount, HistoricalRecord, ProcessCount, RecordKey};

/// Column names, in the order in which they appear in a dataset file.
pub const DATASET_COLUMNS: [&str; 6] = [
    "task_name",
    "sample_size",
    "num_processes",
    "structural_feature_count",
    "execution_time",
    "peak_memory",
];

/// Loads, validates and freezes the historical dataset stored in a file.
pub fn load_dataset(path: &Path) -> crate::Result<Dataset> {
    let file = std::fs::File::open(path)?;
    let dataset = load_dataset_from_reader(file)?;
    log::info!(
        "Loaded {} historical record(s) for {} task(s) from {} (version {})",
        dataset.len(),
        dataset.task_count(),
        path.display(),
        dataset.version()
    );
    Ok(dataset)
}

pub fn load_dataset_from_reader<R: Read>(mut reader: R) -> crate::Result<Dataset> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Dataset::from_records(parse_records(&text)?)
}

/// Splits a comma-separated row into trimmed fields.
pub(crate) fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

/// Returns the non-blank lines of the input together with their 1-based line numbers.
pub(crate) fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.trim_start_matches('\u{feff}')
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Checks the header row of a delimited table with the given number of columns.
/// A first row whose second column is an integer is treated as data, i.e. a missing header.
pub(crate) fn check_header(header: Option<(usize, &str)>, columns: usize) -> crate::Result<()> {
    let Some((line, header)) = header else {
        return Err(WalltimeError::dataset(1, DatasetIssue::MissingHeader));
    };
    let fields = split_fields(header);
    if fields.len() != columns {
        return Err(WalltimeError::dataset(
            line,
            DatasetIssue::ColumnCount {
                expected: columns,
                found: fields.len(),
            },
        ));
    }
    if consume_all(p_u64, fields[1]).is_ok() {
        return Err(WalltimeError::dataset(line, DatasetIssue::MissingHeader));
    }
    Ok(())
}

pub(crate) fn parse_u64_field(line: usize, column: &'static str, value: &str) -> crate::Result<u64> {
    consume_all(p_u64, value).map_err(|_| {
        WalltimeError::dataset(
            line,
            DatasetIssue::NotNumeric {
                column,
                value: value.to_string(),
            },
        )
    })
}

pub(crate) fn parse_i64_field(line: usize, column: &'static str, value: &str) -> crate::Result<i64> {
    consume_all(p_i64, value).map_err(|_| {
        WalltimeError::dataset(
            line,
            DatasetIssue::NotNumeric {
                column,
                value: value.to_string(),
            },
        )
    })
}

fn parse_positive_field(line: usize, column: &'static str, value: &str) -> crate::Result<f64> {
    let number = consume_all(p_f64, value).map_err(|_| {
        WalltimeError::dataset(
            line,
            DatasetIssue::NotNumeric {
                column,
                value: value.to_string(),
            },
        )
    })?;
    if !number.is_finite() || number <= 0.0 {
        return Err(WalltimeError::dataset(
            line,
            DatasetIssue::NonPositive {
                column,
                value: value.to_string(),
            },
        ));
    }
    Ok(number)
}

fn parse_record(line: usize, row: &str) -> crate::Result<HistoricalRecord> {
    let fields = split_fields(row);
    if fields.len() != DATASET_COLUMNS.len() {
        return Err(WalltimeError::dataset(
            line,
            DatasetIssue::ColumnCount {
                expected: DATASET_COLUMNS.len(),
                found: fields.len(),
            },
        ));
    }

    let task_name = fields[0].to_lowercase();
    if task_name.is_empty() {
        return Err(WalltimeError::dataset(line, DatasetIssue::EmptyTaskName));
    }
    let sample_size = parse_u64_field(line, DATASET_COLUMNS[1], fields[1])?;

    let num_processes = parse_u64_field(line, DATASET_COLUMNS[2], fields[2])?;
    let num_processes = ProcessCount::new(num_processes).ok_or_else(|| {
        WalltimeError::dataset(line, DatasetIssue::UnsupportedProcessCount(num_processes))
    })?;

    let feature_count = parse_i64_field(line, DATASET_COLUMNS[3], fields[3])?;
    let feature_count = FeatureCount::from_wire(feature_count).ok_or_else(|| {
        WalltimeError::dataset(line, DatasetIssue::InvalidFeatureCount(feature_count))
    })?;

    Ok(HistoricalRecord {
        task_name,
        sample_size,
        num_processes,
        feature_count,
        execution_time: parse_positive_field(line, DATASET_COLUMNS[4], fields[4])?,
        peak_memory: parse_positive_field(line, DATASET_COLUMNS[5], fields[5])?,
    })
}

/// Parses the dataset table and returns its records in file order.
///
/// Fails on the first malformed row. Rows sharing a [`RecordKey`] are rejected,
/// repeated runs have to be averaged before they are stored.
pub fn parse_records(text: &str) -> crate::Result<Vec<HistoricalRecord>> {
    let mut lines = numbered_lines(text);
    check_header(lines.next(), DATASET_COLUMNS.len())?;

    let mut seen: HashMap<RecordKey, usize> = HashMap::new();
    let mut records = Vec::new();
    for (line, row) in lines {
        let record = parse_record(line, row)?;
        if let Some(&first_line) = seen.get(&record.key()) {
            return Err(WalltimeError::dataset(
                line,
                DatasetIssue::DuplicateKey { first_line },
            ));
        }
        seen.insert(record.key(), line);
        records.push(record);
    }
    Ok(records)
}
