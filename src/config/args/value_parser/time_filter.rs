use crate::filters::mtime::{parse_age, parse_since};

/// Clap value_parser for `--older-than` (`<integer><unit>`, unit one of d, h, m, w).
pub fn check_older_than(value: &str) -> Result<String, String> {
    parse_age(value)?;

    Ok(value.to_string())
}

/// Clap value_parser for `--since`.
pub fn check_since(value: &str) -> Result<String, String> {
    parse_since(value).map_err(|e| e.to_string())?;

    Ok(value.to_string())
}
