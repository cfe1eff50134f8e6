pub mod load;
pub mod record;

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::common::error::{DatasetIssue, WalltimeError};
use crate::dataset::record::{HistoricalRecord, RecordKey};

pub use load::{load_dataset, load_dataset_from_reader, parse_records};

/// Identifies the content of a loaded dataset.
/// Two loads of the same rows (in any order) have the same version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetVersion {
    pub records: usize,
    pub fingerprint: u64,
}

impl Display for DatasetVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:016x}", self.records, self.fingerprint)
    }
}

/// Per-task overview of the historical data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub task_name: String,
    pub records: usize,
    pub process_counts: Vec<u32>,
    pub min_sample_size: u64,
    pub max_sample_size: u64,
    /// At least one record has a structural feature count
    pub uses_feature_count: bool,
}

/// Validated historical execution metadata.
///
/// A dataset is immutable once created, so it can be shared between threads
/// (e.g. in an `Arc`) while several tasks are estimated at once.
#[derive(Debug)]
pub struct Dataset {
    /// Records grouped by task name, each group sorted by [`RecordKey`]
    tasks: BTreeMap<String, Vec<HistoricalRecord>>,
    version: DatasetVersion,
}

impl Dataset {
    /// Freezes the given records into a dataset.
    ///
    /// Task names are expected to be normalized already (see [`load::parse_records`]).
    /// Duplicate keys are reported with the 1-based position of the record in `records`.
    pub fn from_records(records: Vec<HistoricalRecord>) -> crate::Result<Self> {
        let mut seen: HashMap<RecordKey, usize> = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if let Some(first) = seen.insert(record.key(), index + 1) {
                return Err(WalltimeError::dataset(
                    index + 1,
                    DatasetIssue::DuplicateKey { first_line: first },
                ));
            }
        }

        let count = records.len();
        let mut tasks: BTreeMap<String, Vec<HistoricalRecord>> = BTreeMap::new();
        for record in records {
            tasks
                .entry(record.task_name.clone())
                .or_default()
                .push(record);
        }
        for group in tasks.values_mut() {
            group.sort_by(|a, b| a.key().cmp(&b.key()));
        }

        let version = DatasetVersion {
            records: count,
            fingerprint: fingerprint(&tasks),
        };
        Ok(Dataset { tasks, version })
    }

    pub fn len(&self) -> usize {
        self.version.records
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn version(&self) -> DatasetVersion {
        self.version
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|name| name.as_str())
    }

    /// Records of the given (already normalized) task, sorted by key.
    pub fn task_records(&self, task_name: &str) -> &[HistoricalRecord] {
        self.tasks
            .get(task_name)
            .map(|records| records.as_slice())
            .unwrap_or_default()
    }

    /// All records, grouped by task name.
    pub fn records(&self) -> impl Iterator<Item = &HistoricalRecord> {
        self.tasks.values().flatten()
    }

    pub fn summary(&self) -> Vec<TaskSummary> {
        self.tasks
            .iter()
            .map(|(task_name, records)| {
                let process_counts: BTreeSet<u32> =
                    records.iter().map(|r| r.num_processes.get()).collect();
                TaskSummary {
                    task_name: task_name.clone(),
                    records: records.len(),
                    process_counts: process_counts.into_iter().collect(),
                    min_sample_size: records.iter().map(|r| r.sample_size).min().unwrap_or(0),
                    max_sample_size: records.iter().map(|r| r.sample_size).max().unwrap_or(0),
                    uses_feature_count: records.iter().any(|r| r.feature_count.is_applicable()),
                }
            })
            .collect()
    }
}

fn fingerprint(tasks: &BTreeMap<String, Vec<HistoricalRecord>>) -> u64 {
    let mut hasher = DefaultHasher::new();
    for record in tasks.values().flatten() {
        record.key().hash(&mut hasher);
        record.execution_time.to_bits().hash(&mut hasher);
        record.peak_memory.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use crate::common::error::{DatasetIssue, WalltimeError};
    use crate::dataset::Dataset;
    use crate::dataset::record::{FeatureCount, HistoricalRecord, ProcessCount};
    use crate::tests::utils::dataset_from_rows;

    fn record(task: &str, sample_size: u64, processes: u64, time: f64) -> HistoricalRecord {
        HistoricalRecord {
            task_name: task.to_string(),
            sample_size,
            num_processes: ProcessCount::new(processes).unwrap(),
            feature_count: FeatureCount::NotApplicable,
            execution_time: time,
            peak_memory: 1000.0,
        }
    }

    #[test]
    fn groups_and_sorts_by_task() {
        let dataset = Dataset::from_records(vec![
            record("star", 300, 4, 3.0),
            record("cutadapt", 200, 4, 2.0),
            record("star", 100, 4, 1.0),
            record("star", 100, 1, 1.5),
        ])
        .unwrap();
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.task_count(), 2);
        assert_eq!(
            dataset.task_names().collect::<Vec<_>>(),
            vec!["cutadapt", "star"]
        );
        let star: Vec<_> = dataset
            .task_records("star")
            .iter()
            .map(|r| (r.num_processes.get(), r.sample_size))
            .collect();
        assert_eq!(star, vec![(1, 100), (4, 100), (4, 300)]);
        assert!(dataset.task_records("unknown").is_empty());
    }

    #[test]
    fn rejects_duplicates() {
        let result = Dataset::from_records(vec![
            record("star", 100, 4, 1.0),
            record("star", 200, 4, 2.0),
            record("star", 100, 4, 1.1),
        ]);
        assert!(matches!(
            result,
            Err(WalltimeError::DatasetFormat {
                line: 3,
                issue: DatasetIssue::DuplicateKey { first_line: 1 }
            })
        ));
    }

    #[test]
    fn version_ignores_row_order() {
        let a = dataset_from_rows(&["star,100,4,-1,1,10", "star,200,4,-1,2,20"]);
        let b = dataset_from_rows(&["star,200,4,-1,2,20", "star,100,4,-1,1,10"]);
        let c = dataset_from_rows(&["star,200,4,-1,2.5,20", "star,100,4,-1,1,10"]);
        assert_eq!(a.version(), b.version());
        assert_ne!(a.version(), c.version());
        assert_eq!(a.version().records, 2);
    }

    #[test]
    fn summary_per_task() {
        let dataset = dataset_from_rows(&[
            "cutadapt,1000,4,-1,120,500",
            "cutadapt,4000,4,-1,480,900",
            "cutadapt,4000,8,-1,260,900",
            "hisat2,1000,1,6000,10,100",
        ]);
        let summary = dataset.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].task_name, "cutadapt");
        assert_eq!(summary[0].records, 3);
        assert_eq!(summary[0].process_counts, vec![4, 8]);
        assert_eq!(summary[0].min_sample_size, 1000);
        assert_eq!(summary[0].max_sample_size, 4000);
        assert!(!summary[0].uses_feature_count);
        assert!(summary[1].uses_feature_count);
    }

    #[test]
    fn dataset_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dataset>();
    }
}
