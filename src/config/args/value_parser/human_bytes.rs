use crate::filters::size::parse_size;

/// Clap value_parser that validates a size string without consuming it.
pub fn check_human_bytes(value: &str) -> Result<String, String> {
    parse_size(value)?;

    Ok(value.to_string())
}
