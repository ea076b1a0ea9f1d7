//! Substring include / exclude predicates.

use tracing::debug;

use crate::filters::FilterSpec;
use crate::types::ObjectRecord;

const EXCLUDE_FILTER_NAME: &str = "ExcludeSubstringFilter";
const INCLUDE_FILTER_NAME: &str = "IncludeSubstringFilter";

/// Rejects a record when any exclude substring occurs in its key.
pub(crate) fn is_not_excluded(record: &ObjectRecord, spec: &FilterSpec) -> bool {
    let Some(pattern) = spec
        .exclude_substrings
        .iter()
        .find(|pattern| record.key.contains(pattern.as_str()))
    else {
        return true;
    };

    debug!(
        name = EXCLUDE_FILTER_NAME,
        key = record.key,
        pattern = pattern,
        "object filtered."
    );
    false
}

/// With include substrings set, rejects a record whose key contains none of them.
pub(crate) fn is_included(record: &ObjectRecord, spec: &FilterSpec) -> bool {
    if spec.include_substrings.is_empty()
        || spec
            .include_substrings
            .iter()
            .any(|pattern| record.key.contains(pattern.as_str()))
    {
        return true;
    }

    debug!(
        name = INCLUDE_FILTER_NAME,
        key = record.key,
        "object filtered."
    );
    false
}
