use crate::dataset::Dataset;
use crate::dataset::load::{DATASET_COLUMNS, parse_records};

/// Builds a dataset from CSV rows (without the header).
pub fn dataset_from_rows(rows: &[&str]) -> Dataset {
    let mut text = DATASET_COLUMNS.join(",");
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    Dataset::from_records(parse_records(&text).unwrap()).unwrap()
}

pub fn assert_close(actual: f64, expected: f64) {
    let tolerance = 1e-9 * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance,
        "{actual} is not close to {expected}"
    );
}
