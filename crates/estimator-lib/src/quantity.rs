//! Kubernetes resource quantity parsing
//!
//! Metrics API usage arrives as quantity strings such as `"12345678n"`,
//! `"250m"` or `"128Mi"`. Values are converted to milli-units, rounded up,
//! then into the billing units the estimator works with.

use crate::error::{EstimatorError, Result};
use crate::models::ContainerUsage;

const BYTES_PER_MIB_FROM_MILLI: u64 = 1_000_000_000;

/// Parse a quantity into milli-units, rounding up
pub fn parse_milli(quantity: &str) -> Result<u64> {
    let value = quantity.trim();
    let invalid = |reason: &str| EstimatorError::InvalidQuantity {
        value: quantity.to_string(),
        reason: reason.to_string(),
    };

    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(value.len());
    let (number, suffix) = value.split_at(split);

    if number.starts_with('-') {
        return Err(invalid("negative quantity"));
    }
    let (mantissa, scale) = parse_decimal(number.strip_prefix('+').unwrap_or(number))
        .ok_or_else(|| invalid("not a number"))?;
    let (numerator, denominator) =
        suffix_milli_ratio(suffix).ok_or_else(|| invalid("unknown suffix"))?;

    let out_of_range = || invalid("quantity out of range");
    let dividend = mantissa.checked_mul(numerator).ok_or_else(out_of_range)?;
    let divisor = 10u128
        .checked_pow(scale)
        .and_then(|p| p.checked_mul(denominator))
        .ok_or_else(out_of_range)?;

    let milli = dividend.div_ceil(divisor);
    u64::try_from(milli).map_err(|_| out_of_range())
}

/// Split `"123.45"` into `(12345, 2)`
fn parse_decimal(number: &str) -> Option<(u128, u32)> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{}{}", whole, fraction);
    let mantissa = digits.parse().ok()?;
    Some((mantissa, fraction.len() as u32))
}

/// Milli-units per unit of `suffix`, as a fraction
fn suffix_milli_ratio(suffix: &str) -> Option<(u128, u128)> {
    const KI: u128 = 1024;
    let ratio = match suffix {
        "" => (1_000, 1),
        "n" => (1, 1_000_000),
        "u" => (1, 1_000),
        "m" => (1, 1),
        "k" => (1_000_000, 1),
        "M" => (1_000_000_000, 1),
        "G" => (1_000_000_000_000, 1),
        "T" => (1_000_000_000_000_000, 1),
        "P" => (1_000_000_000_000_000_000, 1),
        "E" => (1_000_000_000_000_000_000_000, 1),
        "Ki" => (KI * 1_000, 1),
        "Mi" => (KI.pow(2) * 1_000, 1),
        "Gi" => (KI.pow(3) * 1_000, 1),
        "Ti" => (KI.pow(4) * 1_000, 1),
        "Pi" => (KI.pow(5) * 1_000, 1),
        "Ei" => (KI.pow(6) * 1_000, 1),
        exp if exp.starts_with(['e', 'E']) => {
            let power: i32 = exp[1..].parse().ok()?;
            let shifted = power.checked_add(3)?;
            if shifted >= 0 {
                (10u128.checked_pow(shifted as u32)?, 1)
            } else {
                (1, 10u128.checked_pow(shifted.unsigned_abs())?)
            }
        }
        _ => return None,
    };
    Some(ratio)
}

/// CPU quantity in millicores
pub fn cpu_milli(quantity: &str) -> Result<u64> {
    parse_milli(quantity)
}

/// Memory or storage quantity in the estimator's MiB column unit
///
/// Milli-bytes divided by 10^9, truncated: the value is in units of
/// 10^6 bytes.
pub fn mebibytes(quantity: &str) -> Result<u64> {
    Ok(parse_milli(quantity)? / BYTES_PER_MIB_FROM_MILLI)
}

/// Convert one container's raw usage strings
pub fn container_usage(cpu: &str, memory: &str, storage: Option<&str>) -> Result<ContainerUsage> {
    Ok(ContainerUsage {
        cpu_milli: cpu_milli(cpu)?,
        memory_mib: mebibytes(memory)?,
        storage_mib: storage.map(mebibytes).transpose()?.unwrap_or(0),
    })
}
