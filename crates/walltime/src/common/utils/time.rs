use std::time::Duration;

use anyhow::anyhow;
use nom::character::complete::char;
use nom::combinator::{map_res, opt};
use nom::error::context;
use nom::sequence::{preceded, tuple};

use crate::common::parser::{NomResult, consume_all, p_u32};

// Allows specifying humantime format (2h, 3m, etc.) or HH:MM:SS
crate::arg_wrapper!(ArgDuration, Duration, parse_human_time);

/// Parses a duration either in the humantime format (`2h`, `90m`, `1h 30m`)
/// or as `[[HH:]MM:]SS`.
pub fn parse_human_time(text: &str) -> anyhow::Result<Duration> {
    let text = text.trim();
    parse_hms_time(text)
        .or_else(|_| humantime::parse_duration(text))
        .map_err(|e| {
            anyhow!(
                "Could not parse duration `{text}`. Use either `HH:MM:SS` or humantime format (2h, 30m): {e}"
            )
        })
}

fn p_hms_time(input: &str) -> NomResult<Duration> {
    map_res(
        context(
            "[[HH:]MM:]SS value",
            tuple((
                p_u32,
                opt(preceded(char(':'), p_u32)),
                opt(preceded(char(':'), p_u32)),
            )),
        ),
        |parsed| match parsed {
            (seconds, None, None) => Ok(Duration::from_secs(seconds as u64)),
            (minutes, Some(seconds), None) => {
                Ok(Duration::from_secs(minutes as u64 * 60 + seconds as u64))
            }
            (hours, Some(minutes), Some(seconds)) => Ok(Duration::from_secs(
                hours as u64 * 3600 + minutes as u64 * 60 + seconds as u64,
            )),
            _ => Err(anyhow!("Invalid time specification")),
        },
    )(input)
}

/// Parses time strings in the format [[hh:]mm:]ss.
/// Individual time values may be zero padded.
pub fn parse_hms_time(input: &str) -> anyhow::Result<Duration> {
    consume_all(p_hms_time, input)
}
