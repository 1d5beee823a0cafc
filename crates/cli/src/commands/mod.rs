pub mod dump;
pub mod replay;

use anyhow::{bail, Context, Result};

/// Parse a u64 that may carry a 0x prefix.
pub fn parse_u64(text: &str) -> Result<u64> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.with_context(|| format!("invalid number: {text}"))
}

/// Parse a START:SIZE range spec.
pub fn parse_range(spec: &str) -> Result<(u64, u64)> {
    let Some((start, size)) = spec.split_once(':') else {
        bail!("range spec must be START:SIZE, got {spec}");
    };
    Ok((parse_u64(start)?, parse_u64(size)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_specs() {
        assert_eq!(parse_range("0x1000:64").unwrap(), (0x1000, 64));
        assert_eq!(parse_range("4096:0x40").unwrap(), (4096, 0x40));
        assert!(parse_range("4096").is_err());
        assert!(parse_range("zz:1").is_err());
    }
}
