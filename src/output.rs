//! CLI output formatting and display helpers.

use std::borrow::Cow;
use std::fmt::Display;
use std::path::PathBuf;

use myrient_dl::FileDescriptor;
use url::Url;

/// Directory used when the URL has no usable last path component.
pub const FALLBACK_OUTPUT_DIR: &str = "myrient-downloads";

/// Characters that are replaced in directory names derived from URLs.
const UNSAFE_NAME_CHARS: &[char] = &[':', '|', '<', '>', '"', '?', '*'];

/// Prints user-facing status lines unless quiet mode is on.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    quiet: bool,
}

impl Console {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Prints `line` to stdout unless quiet.
    pub fn say(&self, line: impl Display) {
        if !self.quiet {
            println!("{line}");
        }
    }
}

/// Formats a byte count with binary units and one decimal.
///
/// ```text
/// 500         -> "500 B"
/// 72_192      -> "70.5 KiB"
/// 1_073_741_824 -> "1.0 GiB"
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: &[char] = &['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut divisor = UNIT;
    let mut exponent = 0usize;
    let mut remaining = bytes / UNIT;
    while remaining >= UNIT {
        divisor *= UNIT;
        exponent += 1;
        remaining /= UNIT;
    }

    #[allow(clippy::cast_precision_loss)]
    let value = bytes as f64 / divisor as f64;
    format!("{value:.1} {}iB", PREFIXES[exponent])
}

/// Derives the default output directory from the listing URL.
///
/// Uses the last path segment, percent-decoded and with characters that are
/// awkward in file names replaced by `_`.
pub fn default_output_dir(url: &Url) -> PathBuf {
    let path = url.path().trim_end_matches('/');
    let last = path.rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode(last).unwrap_or(Cow::Borrowed(last));
    let sanitized = sanitize_dir_name(&decoded);

    if sanitized.is_empty() || sanitized == "." || sanitized == "/" {
        return PathBuf::from(FALLBACK_OUTPUT_DIR);
    }
    PathBuf::from(format!("./{sanitized}"))
}

/// Replaces characters that are invalid or awkward in directory names.
pub fn sanitize_dir_name(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Lines printed for a dry run, one per matched file.
pub fn dry_run_lines(files: &[FileDescriptor]) -> Vec<String> {
    files
        .iter()
        .map(|f| format!("  - {} ({})", f.name, format_bytes(f.expected_size)))
        .collect()
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_below_one_kib() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1023), "1023 B");
    }

    #[test]
    fn test_format_bytes_binary_units() {
        assert_eq!(format_bytes(1024), "1.0 KiB");
        assert_eq!(format_bytes(72_192), "70.5 KiB");
        assert_eq!(format_bytes(1_258_291), "1.2 MiB");
        assert_eq!(format_bytes(2_684_354_560), "2.5 GiB");
        assert_eq!(format_bytes(1 << 40), "1.0 TiB");
        assert_eq!(format_bytes(1 << 50), "1.0 PiB");
        assert_eq!(format_bytes(u64::MAX), "16.0 EiB");
    }

    fn dir_for(url: &str) -> PathBuf {
        default_output_dir(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_default_output_dir_uses_last_segment() {
        assert_eq!(
            dir_for("https://myrient.erista.me/files/No-Intro/Nintendo%20-%20Game%20Boy/"),
            PathBuf::from("./Nintendo - Game Boy")
        );
        assert_eq!(
            dir_for("https://example.com/files/arcade"),
            PathBuf::from("./arcade")
        );
    }

    #[test]
    fn test_default_output_dir_sanitizes() {
        assert_eq!(
            dir_for("https://example.com/files/Sega%3A%20Mega%20Drive%20%7C%20Genesis%3F/"),
            PathBuf::from("./Sega_ Mega Drive _ Genesis_")
        );
    }

    #[test]
    fn test_default_output_dir_fallback() {
        assert_eq!(dir_for("https://example.com/"), PathBuf::from(FALLBACK_OUTPUT_DIR));
        assert_eq!(dir_for("https://example.com"), PathBuf::from(FALLBACK_OUTPUT_DIR));
    }

    #[test]
    fn test_sanitize_dir_name_replaces_all_unsafe_chars() {
        assert_eq!(sanitize_dir_name(r#"a:b|c<d>e"f?g*h"#), "a_b_c_d_e_f_g_h");
        assert_eq!(sanitize_dir_name("Game (En,Fr)"), "Game (En,Fr)");
    }

    #[test]
    fn test_dry_run_lines() {
        let files = vec![
            FileDescriptor::new("a.zip", "http://example.com/a.zip", 500),
            FileDescriptor::new("b.zip", "http://example.com/b.zip", 72_192),
        ];
        assert_eq!(
            dry_run_lines(&files),
            ["  - a.zip (500 B)", "  - b.zip (70.5 KiB)"]
        );
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
        assert_eq!(truncate_to_width("abc", 0), "");
        assert_eq!(truncate_to_width("abc", 1), "…");
    }
}
