use std::collections::BTreeMap;

use crate::dataset::Dataset;
use crate::dataset::record::{FeatureCount, HistoricalRecord, ProcessCount};
use crate::estimate::normalize::NormalizedFeatures;
use crate::estimate::{Estimate, EstimateBasis, Metric, ModeledValue, ProcessSelection};

/// Predicts execution time (or peak memory) of a task from the historical records
/// of the same task.
///
/// The estimator holds no state besides the dataset, so the same request always
/// produces the same estimate.
#[derive(Clone, Copy)]
pub struct Estimator<'a> {
    dataset: &'a Dataset,
}

impl<'a> Estimator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Estimator { dataset }
    }

    pub fn estimate_time(&self, features: &NormalizedFeatures) -> Estimate {
        self.estimate(features, Metric::ExecutionTime)
    }

    pub fn estimate_memory(&self, features: &NormalizedFeatures) -> Estimate {
        self.estimate(features, Metric::PeakMemory)
    }

    pub fn estimate(&self, features: &NormalizedFeatures, metric: Metric) -> Estimate {
        let records = self.dataset.task_records(&features.task_name);
        if records.is_empty() {
            log::warn!(
                "No historical records for task `{}`, the default will be used",
                features.task_name
            );
            return Estimate::NoHistory;
        }

        let mut by_processes: BTreeMap<ProcessCount, Vec<&HistoricalRecord>> = BTreeMap::new();
        for record in records {
            by_processes
                .entry(record.num_processes)
                .or_default()
                .push(record);
        }

        let requested = features.num_processes;
        let modeled = if let Some(candidates) = by_processes.get(&requested) {
            let Some((value, basis)) = estimate_within(candidates, features, metric) else {
                return Estimate::NoHistory;
            };
            ModeledValue {
                value,
                basis,
                processes: ProcessSelection::Exact {
                    processes: requested,
                },
            }
        } else {
            let lower = by_processes.range(..requested).next_back();
            let upper = by_processes.range(requested..).next();
            match (lower, upper) {
                (Some((&lower, lower_records)), Some((&upper, upper_records))) => {
                    let (
                        Some((lower_value, lower_basis)),
                        Some((upper_value, upper_basis)),
                    ) = (
                        estimate_within(lower_records, features, metric),
                        estimate_within(upper_records, features, metric),
                    )
                    else {
                        return Estimate::NoHistory;
                    };
                    // Supported counts double at each step, interpolate on that scale
                    let ratio =
                        (requested.log2() - lower.log2()) / (upper.log2() - lower.log2());
                    ModeledValue {
                        value: lerp(lower_value, upper_value, ratio),
                        basis: if lower_basis == upper_basis {
                            lower_basis
                        } else {
                            EstimateBasis::Interpolated
                        },
                        processes: ProcessSelection::Bracketed { lower, upper },
                    }
                }
                (Some((&processes, candidates)), None) | (None, Some((&processes, candidates))) => {
                    let Some((value, basis)) = estimate_within(candidates, features, metric) else {
                        return Estimate::NoHistory;
                    };
                    ModeledValue {
                        value,
                        basis,
                        processes: ProcessSelection::Nearest { processes },
                    }
                }
                (None, None) => return Estimate::NoHistory,
            }
        };

        log::debug!(
            "Estimated {:?} of task `{}` (sample size {}, {} process(es), features {}): {} ({:?}, {:?})",
            metric,
            features.task_name,
            features.sample_size,
            requested,
            features.feature_count,
            modeled.value,
            modeled.basis,
            modeled.processes
        );
        Estimate::Modeled(modeled)
    }
}

#[inline]
fn lerp(from: f64, to: f64, ratio: f64) -> f64 {
    from + (to - from) * ratio
}

/// Estimates the metric from records that all share one process count.
///
/// Records are grouped into slices by their feature count. The slices are chosen by the
/// feature count alone, then each chosen slice is interpolated along the sample size.
/// `candidates` have to be sorted by record key. Returns `None` if there are no candidates.
fn estimate_within(
    candidates: &[&HistoricalRecord],
    features: &NormalizedFeatures,
    metric: Metric,
) -> Option<(f64, EstimateBasis)> {
    // Candidates are sorted by feature count first, so every slice stays sorted by sample size
    let mut slices: BTreeMap<FeatureCount, Vec<&HistoricalRecord>> = BTreeMap::new();
    for &record in candidates {
        slices.entry(record.feature_count).or_default().push(record);
    }
    let sample_size = features.sample_size;

    let requested = match features.feature_count {
        FeatureCount::NotApplicable => {
            // Prefer records without a feature count, then the most populated slice
            let slice = match slices.get(&FeatureCount::NotApplicable) {
                Some(slice) => slice,
                None => slices
                    .values()
                    .rev()
                    .max_by_key(|slice| slice.len())?,
            };
            return Some(estimate_along_sample_size(slice, sample_size, metric));
        }
        FeatureCount::Count(count) => count,
    };

    if let Some(slice) = slices.get(&FeatureCount::Count(requested)) {
        return Some(estimate_along_sample_size(slice, sample_size, metric));
    }

    let lower = slices
        .range(FeatureCount::Count(0)..FeatureCount::Count(requested))
        .next_back();
    let upper = slices.range(FeatureCount::Count(requested)..).next();
    let (value, basis) = match (lower, upper) {
        (Some((&lower_count, lower_slice)), Some((&upper_count, upper_slice))) => {
            let (lower_value, _) = estimate_along_sample_size(lower_slice, sample_size, metric);
            let (upper_value, _) = estimate_along_sample_size(upper_slice, sample_size, metric);
            let (Some(lower_count), Some(upper_count)) = (lower_count.count(), upper_count.count())
            else {
                return None;
            };
            let ratio = (requested - lower_count) as f64 / (upper_count - lower_count) as f64;
            return Some((
                lerp(lower_value, upper_value, ratio),
                EstimateBasis::Interpolated,
            ));
        }
        (Some((_, slice)), None) | (None, Some((_, slice))) => {
            estimate_along_sample_size(slice, sample_size, metric)
        }
        // Only records without a feature count
        (None, None) => estimate_along_sample_size(
            slices.get(&FeatureCount::NotApplicable)?,
            sample_size,
            metric,
        ),
    };
    let basis = match basis {
        EstimateBasis::Exact => EstimateBasis::Nearest,
        basis => basis,
    };
    Some((value, basis))
}

/// Estimates the metric from a non-empty slice of records sorted by sample size.
fn estimate_along_sample_size(
    slice: &[&HistoricalRecord],
    sample_size: u64,
    metric: Metric,
) -> (f64, EstimateBasis) {
    let position = slice.partition_point(|r| r.sample_size < sample_size);
    if let Some(record) = slice.get(position) {
        if record.sample_size == sample_size {
            return (metric.value(record), EstimateBasis::Exact);
        }
    }

    if slice.len() == 1 || position == 0 {
        // A single observation, or below the observed range
        (metric.value(slice[0]), EstimateBasis::Nearest)
    } else if position == slice.len() {
        // Above the observed range
        let last = slice[slice.len() - 1];
        let previous = slice[slice.len() - 2];
        let slope = (metric.value(last) - metric.value(previous))
            / (last.sample_size - previous.sample_size) as f64;
        if slope > 0.0 {
            let value = metric.value(last) + slope * (sample_size - last.sample_size) as f64;
            (value, EstimateBasis::Extrapolated)
        } else {
            (metric.value(last), EstimateBasis::Nearest)
        }
    } else {
        let lower = slice[position - 1];
        let upper = slice[position];
        let ratio = (sample_size - lower.sample_size) as f64
            / (upper.sample_size - lower.sample_size) as f64;
        (
            lerp(metric.value(lower), metric.value(upper), ratio),
            EstimateBasis::Interpolated,
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::dataset::Dataset;
    use crate::estimate::normalize::{EstimationRequest, normalize};
    use crate::estimate::{Estimate, EstimateBasis, Estimator, Metric, ProcessSelection};
    use crate::tests::utils::{assert_close, dataset_from_rows};

    fn estimate(dataset: &Dataset, task: &str, size: u64, processes: u64, features: i64) -> Estimate {
        let features = normalize(&EstimationRequest::new(task, size, processes, features)).unwrap();
        Estimator::new(dataset).estimate_time(&features)
    }

    fn modeled(estimate: Estimate) -> (f64, EstimateBasis, ProcessSelection) {
        match estimate {
            Estimate::Modeled(modeled) => (modeled.value, modeled.basis, modeled.processes),
            Estimate::NoHistory => panic!("Expected a modeled value"),
        }
    }

    fn cutadapt() -> Dataset {
        dataset_from_rows(&[
            "cutadapt,1000000,4,-1,120,500000000",
            "cutadapt,4000000,4,-1,480,900000000",
        ])
    }

    #[test]
    fn exact_match_returns_observation() {
        let dataset = dataset_from_rows(&[
            "cutadapt,1000000,4,-1,120,500000000",
            "cutadapt,4000000,4,-1,480,900000000",
            "cutadapt,4000000,8,-1,250,900000000",
            "hisat2,1000000,4,6000,77.7,1",
            "hisat2,1000000,4,7000,88.8,1",
            "hisat2,1000000,4,-1,99.9,1",
        ]);
        for record in dataset.records() {
            let (value, basis, _) = modeled(estimate(
                &dataset,
                &record.task_name,
                record.sample_size,
                record.num_processes.get() as u64,
                record.feature_count.to_wire(),
            ));
            assert_eq!(value, record.execution_time);
            assert_eq!(basis, EstimateBasis::Exact);
        }
    }

    #[test]
    fn task_name_is_case_insensitive() {
        let (value, _, _) = modeled(estimate(&cutadapt(), " CUTADAPT", 1000000, 4, -1));
        assert_eq!(value, 120.0);
    }

    #[test]
    fn unknown_task_has_no_history() {
        assert_eq!(
            estimate(&cutadapt(), "unknownstage", 1000000, 4, -1),
            Estimate::NoHistory
        );
    }

    #[test]
    fn interpolates_along_sample_size() {
        let (value, basis, processes) = modeled(estimate(&cutadapt(), "cutadapt", 2500000, 4, -1));
        assert_close(value, 300.0);
        assert_eq!(basis, EstimateBasis::Interpolated);
        assert!(matches!(processes, ProcessSelection::Exact { processes } if processes.get() == 4));
    }

    #[test]
    fn single_observation_is_used_directly() {
        let dataset = dataset_from_rows(&["star,1000,2,-1,42,10"]);
        let (value, basis, _) = modeled(estimate(&dataset, "star", 50000, 2, -1));
        assert_eq!(value, 42.0);
        assert_eq!(basis, EstimateBasis::Nearest);
    }

    #[test]
    fn below_range_uses_smallest_observation() {
        let (value, basis, _) = modeled(estimate(&cutadapt(), "cutadapt", 10, 4, -1));
        assert_eq!(value, 120.0);
        assert_eq!(basis, EstimateBasis::Nearest);
    }

    #[test]
    fn above_range_extrapolates() {
        let (value, basis, _) = modeled(estimate(&cutadapt(), "cutadapt", 5000000, 4, -1));
        assert_close(value, 600.0);
        assert_eq!(basis, EstimateBasis::Extrapolated);
    }

    #[test]
    fn above_range_with_flat_trend_uses_largest() {
        let dataset = dataset_from_rows(&["star,1000,2,-1,50,10", "star,2000,2,-1,40,10"]);
        let (value, basis, _) = modeled(estimate(&dataset, "star", 3000, 2, -1));
        assert_eq!(value, 40.0);
        assert_eq!(basis, EstimateBasis::Nearest);
    }

    #[test]
    fn process_counts_are_not_blended_when_exact_exists() {
        let dataset = dataset_from_rows(&[
            "cutadapt,1000000,4,-1,120,1",
            "cutadapt,4000000,4,-1,480,1",
            "cutadapt,2500000,8,-1,10,1",
        ]);
        let (value, _, _) = modeled(estimate(&dataset, "cutadapt", 2500000, 4, -1));
        assert_close(value, 300.0);
    }

    #[test]
    fn brackets_missing_process_count() {
        let dataset = dataset_from_rows(&[
            "bowtie,1000,2,-1,400,1",
            "bowtie,1000,8,-1,100,1",
        ]);
        // 4 lies halfway between 2 and 8 on the doubling scale
        let (value, basis, processes) = modeled(estimate(&dataset, "bowtie", 1000, 4, -1));
        assert_close(value, 250.0);
        assert_eq!(basis, EstimateBasis::Exact);
        assert!(matches!(
            processes,
            ProcessSelection::Bracketed { lower, upper } if lower.get() == 2 && upper.get() == 8
        ));
    }

    #[test]
    fn brackets_with_uneven_distance() {
        let dataset = dataset_from_rows(&[
            "bowtie,1000,1,-1,320,1",
            "bowtie,1000,16,-1,20,1",
        ]);
        // log2(4) = 2 is halfway between log2(1) = 0 and log2(16) = 4
        let (value, _, _) = modeled(estimate(&dataset, "bowtie", 1000, 4, -1));
        assert_close(value, 170.0);
        // log2(2) = 1 is a quarter of the way
        let (value, _, _) = modeled(estimate(&dataset, "bowtie", 1000, 2, -1));
        assert_close(value, 245.0);
    }

    #[test]
    fn uses_only_side_with_data() {
        let dataset = dataset_from_rows(&["bowtie,1000,2,-1,400,1", "bowtie,2000,2,-1,800,1"]);
        let (value, _, processes) = modeled(estimate(&dataset, "bowtie", 1500, 16, -1));
        assert_close(value, 600.0);
        assert!(matches!(processes, ProcessSelection::Nearest { processes } if processes.get() == 2));

        let dataset = dataset_from_rows(&["bowtie,1000,32,-1,40,1"]);
        let (value, _, processes) = modeled(estimate(&dataset, "bowtie", 1000, 1, -1));
        assert_eq!(value, 40.0);
        assert!(matches!(processes, ProcessSelection::Nearest { processes } if processes.get() == 32));
    }

    #[test]
    fn feature_count_selects_slice() {
        let dataset = dataset_from_rows(&[
            "hisat2,1000,4,100,10,1",
            "hisat2,3000,4,100,30,1",
            "hisat2,1000,4,5000,100,1",
            "hisat2,3000,4,5000,300,1",
        ]);
        let (value, basis, _) = modeled(estimate(&dataset, "hisat2", 2000, 4, 5000));
        assert_close(value, 200.0);
        assert_eq!(basis, EstimateBasis::Interpolated);

        let (value, _, _) = modeled(estimate(&dataset, "hisat2", 2000, 4, 100));
        assert_close(value, 20.0);
    }

    #[test]
    fn interpolates_between_feature_slices() {
        let dataset = dataset_from_rows(&[
            "hisat2,1000,4,100,10,1",
            "hisat2,3000,4,100,30,1",
            "hisat2,1000,4,5000,100,1",
            "hisat2,3000,4,5000,300,1",
        ]);
        // 2550 lies halfway between the feature counts 100 and 5000
        let (value, basis, _) = modeled(estimate(&dataset, "hisat2", 2000, 4, 2550));
        assert_close(value, 110.0);
        assert_eq!(basis, EstimateBasis::Interpolated);

        let (value, basis, _) = modeled(estimate(&dataset, "hisat2", 1000, 4, 2550));
        assert_close(value, 55.0);
        assert_eq!(basis, EstimateBasis::Interpolated);
    }

    #[test]
    fn feature_count_outside_observed_slices() {
        let dataset = dataset_from_rows(&[
            "hisat2,1000,4,100,10,1",
            "hisat2,3000,4,100,30,1",
            "hisat2,1000,4,5000,100,1",
            "hisat2,3000,4,5000,300,1",
        ]);
        let (value, basis, _) = modeled(estimate(&dataset, "hisat2", 2000, 4, 9000));
        assert_close(value, 200.0);
        assert_eq!(basis, EstimateBasis::Interpolated);

        let (value, basis, _) = modeled(estimate(&dataset, "hisat2", 1000, 4, 50));
        assert_eq!(value, 10.0);
        assert_eq!(basis, EstimateBasis::Nearest);
    }

    #[test]
    fn feature_count_without_counted_records() {
        let dataset = dataset_from_rows(&["star,1000,4,-1,10,1", "star,3000,4,-1,30,1"]);
        let (value, basis, _) = modeled(estimate(&dataset, "star", 3000, 4, 700));
        assert_eq!(value, 30.0);
        assert_eq!(basis, EstimateBasis::Nearest);

        let (value, basis, _) = modeled(estimate(&dataset, "star", 2000, 4, 700));
        assert_close(value, 20.0);
        assert_eq!(basis, EstimateBasis::Interpolated);
    }

    #[test]
    fn inapplicable_request_prefers_records_without_features() {
        let rows = [
            "hisat2,1000,4,100,10,1",
            "hisat2,3000,4,100,30,1",
            "hisat2,9000,4,5000,90,1",
        ];
        // Without such records the most populated slice is used
        let dataset = dataset_from_rows(&rows);
        let (value, basis, _) = modeled(estimate(&dataset, "hisat2", 8000, 4, -1));
        assert_close(value, 80.0);
        assert_eq!(basis, EstimateBasis::Extrapolated);

        let mut rows = rows.to_vec();
        rows.push("hisat2,1000,4,-1,7,1");
        let dataset = dataset_from_rows(&rows);
        let (value, basis, _) = modeled(estimate(&dataset, "hisat2", 8000, 4, -1));
        assert_eq!(value, 7.0);
        assert_eq!(basis, EstimateBasis::Nearest);
    }

    #[test]
    fn same_sample_size_with_different_features() {
        let dataset = dataset_from_rows(&["hisat2,1000,4,100,10,1", "hisat2,1000,4,5000,90,1"]);
        let (value, basis, _) = modeled(estimate(&dataset, "hisat2", 1000, 4, 4000));
        assert_close(value, 10.0 + 80.0 * 3900.0 / 4900.0);
        assert_eq!(basis, EstimateBasis::Interpolated);

        let (value, basis, _) = modeled(estimate(&dataset, "hisat2", 1000, 4, 9000));
        assert_eq!(value, 90.0);
        assert_eq!(basis, EstimateBasis::Nearest);
    }

    #[test]
    fn monotonic_in_sample_size() {
        let dataset = dataset_from_rows(&[
            "star,1000,4,-1,10,1",
            "star,2000,4,-1,15,1",
            "star,8000,4,-1,80,1",
            "star,16000,4,-1,90,1",
            "star,1000,16,-1,3,1",
            "star,16000,16,-1,30,1",
        ]);
        for processes in [1, 2, 4, 8, 16, 32] {
            let mut previous = f64::MIN;
            for size in (0..40_000).step_by(250) {
                let (value, _, _) = modeled(estimate(&dataset, "star", size, processes, -1));
                assert!(
                    value >= previous,
                    "estimate decreased at size {size} with {processes} processes"
                );
                previous = value;
            }
        }
    }

    #[test]
    fn monotonic_in_sample_size_between_feature_slices() {
        let dataset = dataset_from_rows(&[
            "hisat2,1000,4,100,10,1",
            "hisat2,3000,4,100,30,1",
            "hisat2,2000,4,5000,200,1",
        ]);
        let mut previous = f64::MIN;
        for size in [1000, 1500, 2000, 2500, 3000, 3500] {
            let (value, _, _) = modeled(estimate(&dataset, "hisat2", size, 4, 2000));
            assert!(value >= previous, "estimate decreased at size {size}");
            previous = value;
        }
    }

    #[test]
    fn monotonic_in_sample_size_with_feature_counts() {
        let dataset = dataset_from_rows(&[
            "hisat2,1000,4,100,10,1",
            "hisat2,3000,4,100,30,1",
            "hisat2,2000,4,5000,200,1",
            "hisat2,500,4,1000,8,1",
            "hisat2,6000,4,1000,70,1",
            "hisat2,12000,4,1000,150,1",
            "hisat2,2500,4,-1,25,1",
            "hisat2,7000,4,-1,90,1",
            "hisat2,4000,16,2000,20,1",
            "hisat2,9000,16,2000,60,1",
            "hisat2,1500,16,8000,40,1",
        ]);
        for processes in [1, 2, 4, 8, 16, 32] {
            for features in [-1, 50, 100, 700, 1000, 2000, 4900, 5000, 9000] {
                let mut previous = f64::MIN;
                for size in (0..20_000).step_by(100) {
                    let (value, _, _) =
                        modeled(estimate(&dataset, "hisat2", size, processes, features));
                    assert!(
                        value >= previous,
                        "estimate decreased at size {size} with {processes} processes \
                         and {features} features"
                    );
                    previous = value;
                }
            }
        }
    }

    #[test]
    fn estimates_memory() {
        let features = normalize(&EstimationRequest::new("cutadapt", 2500000, 4, -1)).unwrap();
        let dataset = cutadapt();
        let estimate = Estimator::new(&dataset).estimate(&features, Metric::PeakMemory);
        assert_close(estimate.modeled_value().unwrap(), 700000000.0);
    }

    #[test]
    fn deterministic() {
        let dataset = dataset_from_rows(&[
            "hisat2,1000,4,100,10,1",
            "hisat2,3000,4,200,30,1",
            "hisat2,2000,8,150,12,1",
        ]);
        let first = estimate(&dataset, "hisat2", 1700, 2, 160);
        for _ in 0..10 {
            assert_eq!(estimate(&dataset, "hisat2", 1700, 2, 160), first);
        }
    }
}
