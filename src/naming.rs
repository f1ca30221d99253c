//! Output naming for files and directories.
//!
//! Every output name is a slug: lowercase, whitespace turned into dashes,
//! characters that are illegal or awkward on common filesystems removed.
//! The same input always yields the same slug.
//!
//! - `Getting Started.md` → `getting-started.md`
//! - `FAQ: What & Why?` → `faq-what-why`
//! - `Überblick` → `überblick`
//!
//! Slugs only need to be unique among siblings. [`SiblingNames`] hands out
//! names for one directory and appends the sidebar position on collision.

use std::collections::HashSet;
use std::path::Path;

const MAX_SLUG_LEN: usize = 80;

/// Fallback for inputs that slug down to nothing.
const EMPTY_SLUG: &str = "section";

/// Turn a title or file stem into a filesystem-safe name.
///
/// - Lowercases
/// - Replaces whitespace with dashes
/// - Keeps alphanumerics, `-`, `_` and `.`; drops everything else
/// - Collapses consecutive dashes
/// - Strips leading and trailing dashes and dots
/// - Truncates to `MAX_SLUG_LEN` characters (breaks at last dash before limit)
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut prev_dash = false;
    for c in input.chars().flat_map(char::to_lowercase) {
        let mapped = if c.is_whitespace() || c == '-' {
            Some('-')
        } else if c.is_alphanumeric() || c == '_' || c == '.' {
            Some(c)
        } else {
            None
        };
        match mapped {
            Some('-') if prev_dash => {}
            Some('-') => {
                slug.push('-');
                prev_dash = true;
            }
            Some(c) => {
                slug.push(c);
                prev_dash = false;
            }
            None => {}
        }
    }

    let trimmed = slug.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        return EMPTY_SLUG.to_string();
    }
    if trimmed.chars().count() <= MAX_SLUG_LEN {
        return trimmed.to_string();
    }

    let cut = trimmed
        .char_indices()
        .nth(MAX_SLUG_LEN)
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    let truncated = &trimmed[..cut];
    match truncated.rfind('-') {
        Some(pos) if pos > 0 => truncated[..pos].to_string(),
        _ => truncated.to_string(),
    }
}

/// File stem of a link target: `guide/Getting Started.md` → `Getting Started`.
pub fn link_stem(link: &str) -> &str {
    Path::new(link)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(link)
}

/// Human label for a path segment: `getting-started` → `getting started`.
pub fn display_label(segment: &str) -> String {
    segment.replace(['-', '_'], " ").trim().to_string()
}

/// Names already taken inside one output directory.
///
/// Comparison is case-insensitive so the result is safe on case-insensitive
/// filesystems.
#[derive(Debug, Default)]
pub struct SiblingNames {
    taken: HashSet<String>,
}

impl SiblingNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as taken without handing it out.
    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_lowercase());
    }

    /// Claim `<slug><extension>`, or `<slug>-<position><extension>` if the
    /// plain name is taken. Further collisions keep adding `-<position>`.
    pub fn claim(&mut self, slug: &str, extension: &str, position: u32) -> String {
        let mut stem = slug.to_string();
        loop {
            let candidate = format!("{stem}{extension}");
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            stem = format!("{stem}-{position}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_lowercases_and_dashes_spaces() {
        assert_eq!(slugify("Getting Started"), "getting-started");
    }

    #[test]
    fn slug_strips_illegal_characters() {
        assert_eq!(slugify("FAQ: What & Why?"), "faq-what-why");
        assert_eq!(slugify(r#"a/b\c*d"e<f>g|h"#), "abcdefgh");
    }

    #[test]
    fn slug_collapses_whitespace_runs() {
        assert_eq!(slugify("  lots   of\tspace  "), "lots-of-space");
    }

    #[test]
    fn slug_keeps_underscores_and_inner_dots() {
        assert_eq!(slugify("v1.2_notes"), "v1.2_notes");
        assert_eq!(slugify(".hidden."), "hidden");
    }

    #[test]
    fn slug_keeps_unicode_letters() {
        assert_eq!(slugify("Überblick"), "überblick");
    }

    #[test]
    fn slug_empty_falls_back() {
        assert_eq!(slugify("???"), "section");
        assert_eq!(slugify(""), "section");
    }

    #[test]
    fn slug_truncates_at_dash() {
        let long = "word ".repeat(30);
        let slug = slugify(&long);
        assert!(slug.chars().count() <= MAX_SLUG_LEN);
        assert!(slug.ends_with("word"));
    }

    #[test]
    fn slug_is_deterministic() {
        assert_eq!(slugify("Same Input"), slugify("Same Input"));
    }

    #[test]
    fn link_stem_strips_directories_and_extension() {
        assert_eq!(link_stem("guide/Getting Started.md"), "Getting Started");
        assert_eq!(link_stem("intro.md"), "intro");
    }

    #[test]
    fn display_label_from_segment() {
        assert_eq!(display_label("getting-started"), "getting started");
        assert_eq!(display_label("api_reference"), "api reference");
    }

    #[test]
    fn claim_plain_name_first() {
        let mut names = SiblingNames::new();
        assert_eq!(names.claim("intro", ".md", 1), "intro.md");
    }

    #[test]
    fn claim_appends_position_on_collision() {
        let mut names = SiblingNames::new();
        assert_eq!(names.claim("intro", ".md", 1), "intro.md");
        assert_eq!(names.claim("intro", ".md", 3), "intro-3.md");
    }

    #[test]
    fn claim_is_case_insensitive() {
        let mut names = SiblingNames::new();
        names.reserve("IMG");
        assert_eq!(names.claim("img", "", 2), "img-2");
    }

    #[test]
    fn file_and_directory_with_same_slug_coexist() {
        let mut names = SiblingNames::new();
        assert_eq!(names.claim("setup", ".md", 1), "setup.md");
        assert_eq!(names.claim("setup", "", 2), "setup");
    }
}
