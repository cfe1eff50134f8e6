use anyhow::anyhow;
use nom::character::complete::{alpha0, space0};
use nom::combinator::map_res;
use nom::error::context;
use nom::sequence::tuple;

use crate::common::parser::{NomResult, consume_all, p_f64};

// Allows specifying memory amounts (8GB, 512MiB, 1024, etc.)
crate::arg_wrapper!(ArgMemory, u64, parse_memory_amount);

const KIB: f64 = 1024.0;

/// Multiplier for a memory unit suffix. Decimal-looking suffixes (`GB`) follow the
/// batch scheduler convention and are interpreted as binary multiples.
fn unit_multiplier(unit: &str) -> anyhow::Result<f64> {
    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 1.0,
        "k" | "kb" | "kib" => KIB,
        "m" | "mb" | "mib" => KIB * KIB,
        "g" | "gb" | "gib" => KIB * KIB * KIB,
        "t" | "tb" | "tib" => KIB * KIB * KIB * KIB,
        _ => return Err(anyhow!("Unknown memory unit `{unit}`")),
    };
    Ok(multiplier)
}

fn p_memory_amount(input: &str) -> NomResult<u64> {
    map_res(
        context("memory amount", tuple((p_f64, space0, alpha0))),
        |(amount, _, unit)| {
            if !amount.is_finite() || amount < 0.0 {
                return Err(anyhow!("Memory amount must be a non-negative number"));
            }
            let bytes = (amount * unit_multiplier(unit)?).ceil();
            if bytes > u64::MAX as f64 {
                return Err(anyhow!("Memory amount is too large"));
            }
            Ok(bytes as u64)
        },
    )(input)
}

/// Parses a memory amount such as `8GB`, `512 MiB`, `1.5G` or a plain number of bytes.
pub fn parse_memory_amount(text: &str) -> anyhow::Result<u64> {
    consume_all(p_memory_amount, text.trim())
        .map_err(|e| anyhow!("Could not parse memory amount `{text}`: {e}"))
}
