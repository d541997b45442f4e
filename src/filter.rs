//! Include/exclude filtering of listing entries by glob pattern.
//!
//! A name passes when it matches at least one include pattern (or the include
//! list is empty or contains `*`) and matches no exclude pattern. Patterns
//! are whole-name globs as understood by [`glob::Pattern`]; they are never
//! split on commas, since ROM names routinely contain them.

use glob::Pattern;
use tracing::{debug, warn};

use crate::FileDescriptor;

/// Compiled include/exclude rules.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    include_all: bool,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PatternFilter {
    /// Compiles the include and exclude patterns.
    ///
    /// Invalid patterns are logged and dropped: an invalid include pattern
    /// matches nothing and an invalid exclude pattern excludes nothing.
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let include: Vec<String> = include
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();
        let include_all = include.is_empty() || include.iter().any(|p| p.is_empty() || p == "*");

        Self {
            include_all,
            include: compile("include", &include),
            exclude: compile("exclude", exclude),
        }
    }

    /// Returns true if `name` passes the filter.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let included = self.include_all || self.include.iter().any(|p| p.matches(name));
        included && !self.exclude.iter().any(|p| p.matches(name))
    }

    /// Keeps the descriptors whose names pass, preserving their order.
    #[must_use]
    pub fn apply(&self, files: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
        let before = files.len();
        let kept: Vec<FileDescriptor> = files.into_iter().filter(|f| self.matches(&f.name)).collect();
        debug!(before, after = kept.len(), "applied pattern filter");
        kept
    }
}

impl Default for PatternFilter {
    fn default() -> Self {
        Self::new(Vec::<String>::new(), Vec::<String>::new())
    }
}

fn compile<P>(kind: &str, patterns: P) -> Vec<Pattern>
where
    P: IntoIterator,
    P::Item: AsRef<str>,
{
    patterns
        .into_iter()
        .filter_map(|raw| {
            let raw = raw.as_ref();
            match Pattern::new(raw) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(kind, pattern = %raw, error = %e, "ignoring invalid pattern");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<FileDescriptor> {
        names
            .iter()
            .map(|name| FileDescriptor::new(*name, format!("http://example.com/{name}"), 0))
            .collect()
    }

    fn names(files: &[FileDescriptor]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    const CATALOGUE: &[&str] = &[
        "mario.zip",
        "mario_beta.zip",
        "sonic.zip",
        "sonic_proto.zip",
        "readme.txt",
        "game.rar",
    ];

    fn run(include: &[&str], exclude: &[&str]) -> Vec<String> {
        let filter = PatternFilter::new(include, exclude);
        names(&filter.apply(files(CATALOGUE)))
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_include_all() {
        assert_eq!(run(&["*"], &[]), CATALOGUE);
        assert_eq!(run(&[], &[]), CATALOGUE);
        assert_eq!(run(&[""], &[]), CATALOGUE);
    }

    #[test]
    fn test_include_by_extension() {
        assert_eq!(
            run(&["*.zip"], &[]),
            ["mario.zip", "mario_beta.zip", "sonic.zip", "sonic_proto.zip"]
        );
    }

    #[test]
    fn test_include_prefix() {
        assert_eq!(run(&["mario*"], &[]), ["mario.zip", "mario_beta.zip"]);
    }

    #[test]
    fn test_exclude_beta() {
        assert_eq!(
            run(&["*"], &["*beta*"]),
            ["mario.zip", "sonic.zip", "sonic_proto.zip", "readme.txt", "game.rar"]
        );
    }

    #[test]
    fn test_include_and_exclude_combined() {
        assert_eq!(
            run(&["*.zip"], &["*proto*"]),
            ["mario.zip", "mario_beta.zip", "sonic.zip"]
        );
        assert_eq!(run(&["sonic*"], &["*proto*"]), ["sonic.zip"]);
    }

    #[test]
    fn test_include_without_matches() {
        assert!(run(&["zelda*"], &[]).is_empty());
    }

    #[test]
    fn test_multiple_includes_are_alternatives() {
        assert_eq!(
            run(&["*.zip", "*.rar"], &[]),
            ["mario.zip", "mario_beta.zip", "sonic.zip", "sonic_proto.zip", "game.rar"]
        );
    }

    #[test]
    fn test_multiple_excludes_are_alternatives() {
        assert_eq!(
            run(&["*"], &["*beta*", "*proto*"]),
            ["mario.zip", "sonic.zip", "readme.txt", "game.rar"]
        );
    }

    #[test]
    fn test_archive_includes_with_beta_exclude() {
        let filter = PatternFilter::new(["*.zip", "*.rar"], ["*beta*"]);
        assert!(!filter.matches("game_beta.zip"));
        assert!(filter.matches("game.zip"));
        assert!(!filter.matches("game.txt"));
    }

    #[test]
    fn test_commas_in_names_match_literally() {
        let filter = PatternFilter::new(["*(En,Fr,De)*"], Vec::<String>::new());
        assert!(filter.matches("Game (Europe) (En,Fr,De).zip"));
        assert!(!filter.matches("Game (Europe) (En).zip"));
    }

    #[test]
    fn test_character_classes() {
        let filter = PatternFilter::new(["[ms]*.zip"], ["[!m]*_proto.zip"]);
        assert!(filter.matches("mario.zip"));
        assert!(filter.matches("sonic.zip"));
        assert!(!filter.matches("sonic_proto.zip"));
        assert!(!filter.matches("zelda.zip"));
    }

    #[test]
    fn test_invalid_include_matches_nothing() {
        let filter = PatternFilter::new(["[abc"], Vec::<String>::new());
        assert!(!filter.matches("a"));
        assert!(!filter.matches("[abc"));
    }

    #[test]
    fn test_invalid_exclude_excludes_nothing() {
        let filter = PatternFilter::new(["*.zip"], ["[abc"]);
        assert!(filter.matches("abc.zip"));
    }

    #[test]
    fn test_invalid_include_alongside_valid_one() {
        let filter = PatternFilter::new(["[abc", "*.zip"], Vec::<String>::new());
        assert!(filter.matches("game.zip"));
        assert!(!filter.matches("game.rar"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let filter = PatternFilter::new(["*.ZIP"], Vec::<String>::new());
        assert!(!filter.matches("game.zip"));
    }

    #[test]
    fn test_default_passes_everything() {
        assert!(PatternFilter::default().matches("anything.bin"));
    }
}
