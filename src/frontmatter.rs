//! Frontmatter splitting and merging.
//!
//! Converted pages start with a YAML block that the site generator reads:
//!
//! ```text
//! ---
//! title: "Getting Started"
//! sidebar_position: 2
//! ---
//!
//! # Getting Started
//! ...
//! ```
//!
//! Only `title` and `sidebar_position` are managed. A page that already has a
//! block keeps every other key and line untouched; the managed keys are
//! overwritten in place or added at the top of the block. A page never ends
//! up with two blocks.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

const DELIMITER: &str = "---";
const BOM: char = '\u{feff}';
const MANAGED_KEYS: [&str; 2] = ["title", "sidebar_position"];

/// Split `text` into its frontmatter block (without delimiters) and body.
///
/// A block must open on the very first line and close with a `---` line.
/// Without a closing delimiter the whole text is body. A leading byte order
/// mark is dropped either way.
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let Some(rest) = strip_delimiter_line(text) else {
        return (None, text);
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let block = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(block), body);
        }
        offset += line.len();
    }
    (None, text)
}

fn strip_delimiter_line(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(DELIMITER)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

/// Prepend or merge the managed frontmatter fields.
///
/// `existing` is the block returned by [`split_frontmatter`] for the original
/// text; `body` is the (already rewritten) text that followed it.
pub fn apply_frontmatter(existing: Option<&str>, title: &str, position: u32, body: &str) -> String {
    let managed = [
        format!("title: {}", quote(title)),
        format!("sidebar_position: {position}"),
    ];

    match existing {
        None => format!("{DELIMITER}\n{}\n{DELIMITER}\n\n{body}", managed.join("\n")),
        Some(block) => {
            let merged = merge_block(block, &managed);
            format!("{DELIMITER}\n{merged}{DELIMITER}\n{body}")
        }
    }
}

/// Replace managed keys inside `block`, keeping everything else. Keys that
/// were absent are added at the top. The result ends with a newline.
fn merge_block(block: &str, managed: &[String; 2]) -> String {
    let mut seen = [false; 2];
    let mut lines: Vec<String> = Vec::new();
    let mut skipping_continuation = false;

    for line in block.lines() {
        if skipping_continuation && line.starts_with([' ', '\t']) {
            continue;
        }
        skipping_continuation = false;

        match managed_key(line) {
            Some(k) => {
                // A multi-line value continues on indented lines.
                skipping_continuation = true;
                if !seen[k] {
                    seen[k] = true;
                    lines.push(managed[k].clone());
                }
            }
            None => lines.push(line.to_string()),
        }
    }

    let missing: Vec<String> = (0..MANAGED_KEYS.len())
        .filter(|&k| !seen[k])
        .map(|k| managed[k].clone())
        .collect();

    missing
        .into_iter()
        .chain(lines)
        .map(|l| format!("{l}\n"))
        .collect()
}

fn managed_key(line: &str) -> Option<usize> {
    let (key, _) = line.split_once(':')?;
    MANAGED_KEYS.iter().position(|k| *k == key)
}

/// Double-quoted YAML scalar. JSON string syntax is valid YAML.
fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

/// Text of the first heading in a markdown body, if any.
pub fn first_heading(body: &str) -> Option<String> {
    let mut in_heading = false;
    let mut text = String::new();
    for event in Parser::new(body) {
        match event {
            Event::Start(Tag::Heading { .. }) => in_heading = true,
            Event::End(TagEnd::Heading(_)) => {
                let title = text.trim();
                if !title.is_empty() {
                    return Some(title.to_string());
                }
                in_heading = false;
                text.clear();
            }
            Event::Text(t) | Event::Code(t) if in_heading => text.push_str(&t),
            _ => {}
        }
    }
    None
}
