//! `SUMMARY.md` outline parsing.
//!
//! The outline is an indented list of links. Indentation encodes nesting and
//! document order encodes sidebar order:
//!
//! ```text
//! # Summary                          <- outline title, ignored
//!
//! - [Introduction](intro.md)         depth 0, position 1
//!   - [Setup](setup/install.md)      depth 1, position 1 (under Introduction)
//!   - [Usage](usage.md)              depth 1, position 2
//! - [Reference](reference.md)        depth 0, position 2
//!
//! # Appendix                         <- section: directory-only entry
//!
//! - [Glossary](glossary.md)          depth 1, position 1 (under Appendix)
//! ```
//!
//! Entries are stored in an arena in document order; parents and children
//! refer to each other by index.
//!
//! ## Indentation
//!
//! Tabs count as four spaces. Indentation common to every entry is ignored.
//! The indent unit is either configured or taken from the smallest non-zero
//! indentation on any entry line. An entry indented more than one level below
//! its predecessor is kept at its predecessor's depth and reported as
//! [`Warning::OverIndented`].

use crate::report::{ConversionLog, Warning};
use regex::Regex;
use std::sync::LazyLock;

static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([ \t]*)(?:[-*+][ \t]+)?\[(.*?)\]\(([^)]*)\)").unwrap()
});

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}[ \t]+(.+?)[ \t#]*$").unwrap());

const TAB_WIDTH: usize = 4;
const DEFAULT_INDENT_UNIT: usize = 2;

/// Headings that name the outline itself rather than a section.
const OUTLINE_TITLES: &[&str] = &["summary", "table of contents"];

/// One node of the parsed outline.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    pub title: String,
    /// Link target as written (fragment and query stripped). `None` for
    /// section headings.
    pub source_path: Option<String>,
    pub depth: usize,
    /// 1-based position among siblings.
    pub position: u32,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// 1-based line in the outline file.
    pub line: usize,
}

impl OutlineEntry {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Parsed outline: an arena of entries in document order.
#[derive(Debug, Default, Clone)]
pub struct Outline {
    pub entries: Vec<OutlineEntry>,
    pub roots: Vec<usize>,
}

impl Outline {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> &OutlineEntry {
        &self.entries[index]
    }

    /// Children of `parent`, or the top-level entries for `None`.
    pub fn children_of(&self, parent: Option<usize>) -> &[usize] {
        match parent {
            Some(i) => &self.entries[i].children,
            None => &self.roots,
        }
    }

    fn push(&mut self, mut entry: OutlineEntry) -> usize {
        let index = self.entries.len();
        let siblings = match entry.parent {
            Some(p) => &mut self.entries[p].children,
            None => &mut self.roots,
        };
        siblings.push(index);
        entry.position = siblings.len() as u32;
        self.entries.push(entry);
        index
    }
}

/// A recognised outline line before depths are assigned.
enum RawLine {
    Heading {
        line: usize,
        title: String,
    },
    Entry {
        line: usize,
        indent: usize,
        title: String,
        path: String,
    },
}

/// Parse outline text into an [`Outline`].
///
/// `indent_unit` overrides indentation detection. Malformed and over-indented
/// lines are reported to `log`; parsing never fails.
pub fn parse_outline(text: &str, indent_unit: Option<usize>, log: &mut ConversionLog) -> Outline {
    let raw = scan_lines(text, log);
    let base = base_indent(&raw);
    let unit = indent_unit
        .filter(|u| *u > 0)
        .unwrap_or_else(|| detect_indent_unit(&raw, base));

    let mut outline = Outline::default();
    // ancestors[d] is the most recent entry at depth d
    let mut ancestors: Vec<usize> = Vec::new();
    let mut offset = 0;

    for item in raw {
        match item {
            RawLine::Heading { line, title } => {
                ancestors.clear();
                let index = outline.push(OutlineEntry {
                    title,
                    source_path: None,
                    depth: 0,
                    position: 0,
                    parent: None,
                    children: Vec::new(),
                    line,
                });
                ancestors.push(index);
                offset = 1;
            }
            RawLine::Entry {
                line,
                indent,
                title,
                path,
            } => {
                let wanted = (indent - base) / unit + offset;
                let depth = if wanted > ancestors.len() {
                    log.warn(Warning::OverIndented {
                        line,
                        title: title.clone(),
                    });
                    ancestors.len().saturating_sub(1)
                } else {
                    wanted
                };
                ancestors.truncate(depth);
                let parent = depth.checked_sub(1).map(|d| ancestors[d]);
                let index = outline.push(OutlineEntry {
                    title,
                    source_path: Some(path),
                    depth,
                    position: 0,
                    parent,
                    children: Vec::new(),
                    line,
                });
                ancestors.push(index);
            }
        }
    }

    outline
}

fn scan_lines(text: &str, log: &mut ConversionLog) -> Vec<RawLine> {
    let mut raw = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = ENTRY_RE.captures(line) {
            let title = caps[2].trim().to_string();
            let path = strip_link_suffix(caps[3].trim()).to_string();
            if title.is_empty() || path.is_empty() {
                log.warn(Warning::MalformedLine {
                    line: line_no,
                    text: line.trim().to_string(),
                });
                continue;
            }
            raw.push(RawLine::Entry {
                line: line_no,
                indent: indent_width(&caps[1]),
                title,
                path,
            });
        } else if let Some(caps) = HEADING_RE.captures(line.trim_end()) {
            let title = caps[1].trim().to_string();
            if OUTLINE_TITLES.contains(&title.to_lowercase().as_str()) {
                continue;
            }
            raw.push(RawLine::Heading {
                line: line_no,
                title,
            });
        }
    }
    raw
}

/// Drop `#fragment` and `?query` suffixes from a link target.
fn strip_link_suffix(path: &str) -> &str {
    let end = path.find(&['#', '?'][..]).unwrap_or(path.len());
    path[..end].trim()
}

fn indent_width(prefix: &str) -> usize {
    prefix
        .chars()
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

fn entry_indents(raw: &[RawLine]) -> impl Iterator<Item = usize> + '_ {
    raw.iter().filter_map(|r| match r {
        RawLine::Entry { indent, .. } => Some(*indent),
        RawLine::Heading { .. } => None,
    })
}

/// Indentation shared by every entry; an outline indented as a whole is
/// treated as if it started at column 0.
fn base_indent(raw: &[RawLine]) -> usize {
    entry_indents(raw).min().unwrap_or(0)
}

/// Smallest non-zero indentation above `base`, or the default unit.
fn detect_indent_unit(raw: &[RawLine], base: usize) -> usize {
    entry_indents(raw)
        .map(|i| i - base)
        .filter(|i| *i > 0)
        .min()
        .unwrap_or(DEFAULT_INDENT_UNIT)
}
