use std::time::Duration;

/// Human readable duration with reduced precision, rounded up.
pub fn human_duration(duration: Duration) -> String {
    let rounded = if duration.as_secs() >= 3600 {
        Duration::from_secs(ceil_seconds(&duration).div_ceil(60).saturating_mul(60))
    } else if duration.as_secs() >= 60 {
        Duration::from_secs(ceil_seconds(&duration))
    } else {
        Duration::from_millis(duration.as_nanos().div_ceil(1_000_000) as u64)
    };
    humantime::format_duration(rounded).to_string()
}

pub fn human_size(size: u64) -> String {
    if size < 2048 {
        format!("{size} B")
    } else if size < 2 * 1024 * 1024 {
        format!("{:.2} KiB", size as f64 / 1024.0)
    } else if size < 2 * 1024 * 1024 * 1024 {
        format!("{:.2} MiB", size as f64 / (1024 * 1024) as f64)
    } else {
        format!("{:.2} GiB", size as f64 / (1024 * 1024 * 1024) as f64)
    }
}

/// Whole seconds of a duration, rounded up.
/// A scheduler limit must never be shorter than the estimate.
fn ceil_seconds(duration: &Duration) -> u64 {
    duration
        .as_secs()
        .saturating_add(u64::from(duration.subsec_nanos() > 0))
}

/// Format a duration as a PBS time string, e.g. 01:05:02
pub fn format_hms_duration(duration: &Duration) -> String {
    let mut seconds = ceil_seconds(duration);
    let hours = seconds / 3600;
    seconds %= 3600;
    let minutes = seconds / 60;
    seconds %= 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Format a duration as a Slurm time string, e.g. 1-02:05:02 or 02:05:02
pub fn format_slurm_duration(duration: &Duration) -> String {
    let seconds = ceil_seconds(duration);
    let days = seconds / 86400;
    let rest = Duration::from_secs(seconds % 86400);
    if days > 0 {
        format!("{days}-{}", format_hms_duration(&rest))
    } else {
        format_hms_duration(&rest)
    }
}

pub fn seconds_duration(duration: &Duration) -> String {
    ceil_seconds(duration).to_string()
}

/// Rendering of a wall-clock limit.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeFormat {
    /// Human readable, e.g. `2h 30m`
    #[default]
    Human,
    /// `HH:MM:SS`, as used by PBS
    Hms,
    /// `D-HH:MM:SS`, as used by Slurm
    Slurm,
    /// Whole seconds
    Seconds,
}

impl TimeFormat {
    pub fn format(self, duration: &Duration) -> String {
        match self {
            TimeFormat::Human => human_duration(*duration),
            TimeFormat::Hms => format_hms_duration(duration),
            TimeFormat::Slurm => format_slurm_duration(duration),
            TimeFormat::Seconds => seconds_duration(duration),
        }
    }
}
