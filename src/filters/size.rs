//! Size range parsing and the two size predicates.
//!
//! Size strings use binary units regardless of spelling: `1KB`, `1K` and
//! `1KiB` are all 1024 bytes. Both bounds are inclusive.

use anyhow::{Result, anyhow};
use byte_unit::{Byte, Unit};
use tracing::debug;

use crate::filters::FilterSpec;
use crate::types::ObjectRecord;
use crate::types::error::S3cleanerError;

const MIN_SIZE_FILTER_NAME: &str = "MinSizeFilter";
const MAX_SIZE_FILTER_NAME: &str = "MaxSizeFilter";

/// Parse `min_size` / `max_size` into exact byte counts.
pub fn parse_size_filter(
    min_size: Option<&str>,
    max_size: Option<&str>,
) -> Result<(Option<u64>, Option<u64>)> {
    let parse = |value: Option<&str>| -> Result<Option<u64>> {
        value
            .map(|value| {
                parse_size(value).map_err(|e| {
                    anyhow!(S3cleanerError::InvalidFilter(format!(
                        "invalid size format '{value}': {e}"
                    )))
                })
            })
            .transpose()
    };

    Ok((parse(min_size)?, parse(max_size)?))
}

/// Parse one human-readable size such as `500KB`, `10 MiB` or `2g`.
pub fn parse_size(value: &str) -> std::result::Result<u64, String> {
    let value = value.trim();
    let split_at = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split_at);

    let unit = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => Unit::B,
        "k" | "kb" | "kib" => Unit::KiB,
        "m" | "mb" | "mib" => Unit::MiB,
        "g" | "gb" | "gib" => Unit::GiB,
        "t" | "tb" | "tib" => Unit::TiB,
        "p" | "pb" | "pib" => Unit::PiB,
        other => return Err(format!("unknown unit '{other}'")),
    };

    // Whole numbers stay in integer arithmetic so large byte counts are exact.
    let byte = if number.contains('.') {
        let number: f64 = number
            .parse()
            .map_err(|_| format!("'{number}' is not a number"))?;
        Byte::from_f64_with_unit(number, unit)
    } else {
        let number: u64 = number
            .parse()
            .map_err(|e| format!("'{number}' is not a number: {e}"))?;
        Byte::from_u64_with_unit(number, unit)
    }
    .ok_or_else(|| "out of range".to_string())?;

    u64::try_from(byte.as_u128()).map_err(|_| "out of range".to_string())
}

pub(crate) fn is_larger_or_equal(record: &ObjectRecord, spec: &FilterSpec) -> bool {
    let Some(min_size_bytes) = spec.min_size_bytes else {
        return true;
    };

    if record.size < min_size_bytes {
        debug!(
            name = MIN_SIZE_FILTER_NAME,
            key = record.key,
            content_length = record.size,
            config_size = min_size_bytes,
            "object filtered."
        );
        return false;
    }

    true
}

pub(crate) fn is_smaller_or_equal(record: &ObjectRecord, spec: &FilterSpec) -> bool {
    let Some(max_size_bytes) = spec.max_size_bytes else {
        return true;
    };

    if record.size > max_size_bytes {
        debug!(
            name = MAX_SIZE_FILTER_NAME,
            key = record.key,
            content_length = record.size,
            config_size = max_size_bytes,
            "object filtered."
        );
        return false;
    }

    true
}
