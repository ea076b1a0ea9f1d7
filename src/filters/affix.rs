//! Key suffix / prefix predicates.

use tracing::debug;

use crate::filters::FilterSpec;
use crate::types::ObjectRecord;

const SUFFIX_FILTER_NAME: &str = "SuffixFilter";
const PREFIX_FILTER_NAME: &str = "PrefixFilter";

pub(crate) fn has_required_suffix(record: &ObjectRecord, spec: &FilterSpec) -> bool {
    match spec.required_suffix.as_deref() {
        Some(suffix) if !record.key.ends_with(suffix) => {
            debug!(
                name = SUFFIX_FILTER_NAME,
                key = record.key,
                suffix = suffix,
                "object filtered."
            );
            false
        }
        _ => true,
    }
}

pub(crate) fn has_required_prefix(record: &ObjectRecord, spec: &FilterSpec) -> bool {
    match spec.required_prefix.as_deref() {
        Some(prefix) if !record.key.starts_with(prefix) => {
            debug!(
                name = PREFIX_FILTER_NAME,
                key = record.key,
                prefix = prefix,
                "object filtered."
            );
            false
        }
        _ => true,
    }
}
