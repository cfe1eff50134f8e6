use std::path::Path;

use crate::common::error::{DatasetIssue, WalltimeError};
use crate::dataset::load::{check_header, numbered_lines, parse_i64_field, parse_u64_field, split_fields};
use crate::estimate::normalize::EstimationRequest;

pub const REQUEST_COLUMNS: [&str; 4] = [
    "task_name",
    "sample_size",
    "num_processes",
    "structural_feature_count",
];

/// A single row of a requests file. Malformed rows keep their error so that the
/// remaining rows can still be estimated.
#[derive(Debug)]
pub struct RequestRow {
    /// 1-based line number in the requests file
    pub line: usize,
    pub request: crate::Result<EstimationRequest>,
}

pub fn load_requests(path: &Path) -> crate::Result<Vec<RequestRow>> {
    let text = std::fs::read_to_string(path)?;
    parse_requests(&text)
}

/// Parses a table of estimation requests (header row followed by one request per row).
/// Only a missing or malformed header fails the whole file.
pub fn parse_requests(text: &str) -> crate::Result<Vec<RequestRow>> {
    let mut lines = numbered_lines(text);
    check_header(lines.next(), REQUEST_COLUMNS.len()).map_err(as_request_error)?;

    Ok(lines
        .map(|(line, row)| RequestRow {
            line,
            request: parse_request(line, row).map_err(as_request_error),
        })
        .collect())
}

fn parse_request(line: usize, row: &str) -> crate::Result<EstimationRequest> {
    let fields = split_fields(row);
    if fields.len() != REQUEST_COLUMNS.len() {
        return Err(WalltimeError::dataset(
            line,
            DatasetIssue::ColumnCount {
                expected: REQUEST_COLUMNS.len(),
                found: fields.len(),
            },
        ));
    }
    if fields[0].is_empty() {
        return Err(WalltimeError::dataset(line, DatasetIssue::EmptyTaskName));
    }
    Ok(EstimationRequest::new(
        fields[0],
        parse_u64_field(line, REQUEST_COLUMNS[1], fields[1])?,
        parse_u64_field(line, REQUEST_COLUMNS[2], fields[2])?,
        parse_i64_field(line, REQUEST_COLUMNS[3], fields[3])?,
    ))
}

fn as_request_error(error: WalltimeError) -> WalltimeError {
    match error {
        WalltimeError::DatasetFormat { line, issue } => WalltimeError::RequestFormat { line, issue },
        error => error,
    }
}
