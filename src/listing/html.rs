//! Extraction of file entries from Apache-style directory listing HTML.
//!
//! Only links inside the `<table id="list">` element are considered, so
//! navigation, banner and footer links elsewhere on the page are ignored.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, trace, warn};
use url::Url;

use super::size::parse_size;
use crate::FileDescriptor;
use crate::descriptor::is_safe_file_name;

/// Body of the listing table.
#[allow(clippy::expect_used)]
static LIST_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<table\b[^>]*\bid\s*=\s*["']?list\b["']?[^>]*>(.*?)(?:</table\s*>|\z)"#)
        .expect("table regex is valid") // Static pattern, safe to panic
});

/// An anchor element with its attributes and inner HTML.
#[allow(clippy::expect_used)]
static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").expect("anchor regex is valid") // Static pattern, safe to panic
});

/// The href attribute in double-quoted, single-quoted or bare form.
#[allow(clippy::expect_used)]
static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("href regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static ROW_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<tr\b").expect("row regex is valid")); // Static pattern, safe to panic

#[allow(clippy::expect_used)]
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid")); // Static pattern, safe to panic

#[allow(clippy::expect_used)]
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("entity regex is valid") // Static pattern, safe to panic
});

/// Suffix Apache uses when it truncates a long name in the link text.
const TRUNCATED_NAME_SUFFIX: &str = "..>";

/// Extracts file entries from a directory listing page.
///
/// Parent links (`../`), column sort links (`?C=...`) and sub-directories
/// (hrefs ending in `/`) are skipped. Each entry's URL is the href resolved
/// against `base_url`; its name is the link text, or the percent-decoded
/// href when the text is empty or truncated. The size is the first size token
/// in the rest of the row, or 0 when the row shows none.
///
/// Entries are returned in page order. A page without a listing table yields
/// an empty vector.
#[tracing::instrument(skip(html), fields(html_len = html.len(), base = %base_url))]
#[must_use]
pub fn parse_listing(html: &str, base_url: &Url) -> Vec<FileDescriptor> {
    let Some(table) = LIST_TABLE.captures(html).and_then(|caps| caps.get(1)) else {
        debug!("no listing table found");
        return Vec::new();
    };
    let table = table.as_str();

    let mut files = Vec::new();
    for anchor in ANCHOR.captures_iter(table) {
        let (Some(whole), Some(attributes), Some(inner)) =
            (anchor.get(0), anchor.get(1), anchor.get(2))
        else {
            continue;
        };
        let Some(href) = extract_href(attributes.as_str()) else {
            continue;
        };
        if is_navigation_link(&href) {
            trace!(href = %href, "skipping navigation link");
            continue;
        }

        let url = match base_url.join(&href) {
            Ok(url) => url,
            Err(e) => {
                debug!(href = %href, error = %e, "skipping unresolvable link");
                continue;
            }
        };

        let name = display_name(inner.as_str(), &href);
        if !is_safe_file_name(&name) {
            warn!(name = %name, href = %href, "skipping entry with unsafe file name");
            continue;
        }
        let size = parse_size(&row_text(&table[whole.end()..]));
        trace!(name = %name, size, "listing entry");

        files.push(FileDescriptor::new(name, url.as_str(), size));
    }

    debug!(count = files.len(), "parsed listing entries");
    files
}

fn extract_href(attributes: &str) -> Option<String> {
    let caps = HREF.captures(attributes)?;
    let raw = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
    Some(decode_entities(raw.as_str().trim()).into_owned())
}

fn is_navigation_link(href: &str) -> bool {
    href == "../" || href == ".." || href.contains("?C=") || href.ends_with('/')
}

fn display_name(inner_html: &str, href: &str) -> String {
    let text = TAG.replace_all(inner_html, "");
    let text = decode_entities(&text);
    let text = text.trim();

    if text.is_empty() || text.ends_with(TRUNCATED_NAME_SUFFIX) {
        return urlencoding::decode(href).map_or_else(|_| href.to_string(), Cow::into_owned);
    }
    text.to_string()
}

/// Plain text of the remainder of the row that starts at `rest`.
fn row_text(rest: &str) -> String {
    let end = ROW_START.find(rest).map_or(rest.len(), |m| m.start());
    let text = TAG.replace_all(&rest[..end], " ");
    decode_entities(&text).into_owned()
}

/// Decodes the character references that appear in listing pages.
///
/// Unknown named references are left as written.
fn decode_entities(text: &str) -> Cow<'_, str> {
    ENTITY.replace_all(text, |caps: &Captures<'_>| {
        let reference = &caps[1];
        let decoded = match reference {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => numeric_reference(reference),
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    })
}

fn numeric_reference(reference: &str) -> Option<char> {
    let digits = reference.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}
