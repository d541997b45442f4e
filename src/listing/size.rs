//! Human-readable size parsing for listing rows.

use std::sync::LazyLock;

use regex::Regex;

/// A number followed by a size unit and then whitespace or end of text.
#[allow(clippy::expect_used)]
static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(B|KiB|MiB|GiB|TiB|KB|MB|GB|TB|K|M|G|T)(?:\s|$)")
        .expect("size regex is valid") // Static pattern, safe to panic
});

/// Parses the first size token in `text` into bytes.
///
/// Listings print sizes like `70.5 KiB`, `1.2M` or `500 B`. Every multiple
/// is binary, including the `KB`/`MB` spellings. Fractional results are
/// truncated. Text without a recognisable size, including a bare number with
/// no unit, yields 0.
///
/// # Examples
///
/// ```
/// use myrient_dl::listing::parse_size;
///
/// assert_eq!(parse_size("70.5 KiB"), 72_192);
/// assert_eq!(parse_size("  - "), 0);
/// ```
#[must_use]
pub fn parse_size(text: &str) -> u64 {
    let Some(caps) = SIZE_PATTERN.captures(text) else {
        return 0;
    };
    let Ok(value) = caps[1].parse::<f64>() else {
        return 0;
    };

    let multiplier: u64 = match &caps[2] {
        "K" | "KiB" | "KB" => 1 << 10,
        "M" | "MiB" | "MB" => 1 << 20,
        "G" | "GiB" | "GB" => 1 << 30,
        "T" | "TiB" | "TB" => 1 << 40,
        _ => 1,
    };

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let bytes = (value * multiplier as f64) as u64;
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_binary_units() {
        assert_eq!(parse_size("70.5 KiB"), 72_192);
        assert_eq!(parse_size("1.2 MiB"), 1_258_291);
        assert_eq!(parse_size("500 B"), 500);
        assert_eq!(parse_size("2.5 GiB"), 2_684_354_560);
        assert_eq!(parse_size("1 TiB"), 1_099_511_627_776);
    }

    #[test]
    fn test_parse_size_short_units() {
        assert_eq!(parse_size("4K"), 4096);
        assert_eq!(parse_size("1.5M"), 1_572_864);
        assert_eq!(parse_size("2G"), 2_147_483_648);
    }

    #[test]
    fn test_parse_size_decimal_spellings_are_binary() {
        assert_eq!(parse_size("1 KB"), 1024);
        assert_eq!(parse_size("3 MB"), 3 * 1_048_576);
    }

    #[test]
    fn test_parse_size_without_unit_is_zero() {
        assert_eq!(parse_size("123"), 0);
        assert_eq!(parse_size("invalid"), 0);
        assert_eq!(parse_size(""), 0);
        assert_eq!(parse_size("  - "), 0);
    }

    #[test]
    fn test_parse_size_requires_boundary_after_unit() {
        assert_eq!(parse_size("5 Kilobytes"), 0);
    }

    #[test]
    fn test_parse_size_skips_dates_in_row_text() {
        assert_eq!(parse_size("  2023-09-11 09:52     70.5 KiB  "), 72_192);
    }
}
