//! Page content rewriting.
//!
//! Each converted page goes through the same steps:
//!
//! ```text
//! raw text ──split──▶ frontmatter block + body
//!                          │
//!                          ├─ images:   ![alt](pics/a.png)  →  ![alt](./img/a.png)
//!                          ├─ includes: !!wiki.include(x.md) →  x.md's body, rewritten
//!                          ▼
//!                 frontmatter merged (title, sidebar_position) + body
//! ```
//!
//! Fenced code blocks (```` ``` ```` or `~~~`) pass through untouched, so a
//! page can show the directive syntax without it being expanded.
//!
//! Included files are rewritten relative to their own directory, so an image
//! inside an include resolves next to the included file. The chain of files
//! currently being expanded is tracked; a directive that would re-enter it is
//! left as written and reported once.
//!
//! Nothing is written to disk here. The returned [`ImageReference`] list
//! tells the image materializer what to copy.

use crate::frontmatter::{apply_frontmatter, first_heading, split_frontmatter};
use crate::report::{ConversionLog, Warning};
use crate::resolve::Resolver;
use crate::tree::IMAGE_DIR;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `![alt](path)` or `![alt](path "title")`.
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[(?P<alt>[^\]]*)\]\((?P<path>[^)"]*?)\s*(?P<title>"[^"]*")?\s*\)"#)
        .unwrap()
});

/// `!!wiki.include(path)`, `!!wiki.include page:'coll:name'`,
/// `!!wiki.include page:name`.
static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"!!wiki\.include(?:\(\s*(?P<paren>[^)]*?)\s*\)|[ \t]+page:[ \t]*(?:'(?P<quoted>[^']*)'|(?P<bare>[\w./:-]+)))"#,
    )
    .unwrap()
});

/// Characters that would break a markdown link destination.
const LINK_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'(')
    .add(b')')
    .add(b'<')
    .add(b'>')
    .add(b'#')
    .add(b'?')
    .add(b'%');

const REMOTE_PREFIXES: [&str; 4] = ["http:", "https:", "data:", "//"];

/// One image reference found while rewriting a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Path as written in the source.
    pub original_path: String,
    pub resolved_source_path: Option<PathBuf>,
    /// `./img/<basename>` when resolved.
    pub rewritten_path: Option<String>,
}

/// A rewritten page, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub text: String,
    pub images: Vec<ImageReference>,
}

/// Rewrite one page: images, includes, then frontmatter.
///
/// `title` is the outline title; when empty the first heading of the body,
/// then the file stem, is used instead.
pub fn transform_document(
    text: &str,
    source: &Path,
    title: &str,
    position: u32,
    resolver: &Resolver,
    log: &mut ConversionLog,
) -> Transformed {
    let (existing, body) = split_frontmatter(text);
    let mut expander = Expander {
        resolver,
        log,
        chain: vec![canonical(source)],
        images: Vec::new(),
    };
    let body = expander.expand(body, source);
    let title = page_title(title, &body, source);
    Transformed {
        text: apply_frontmatter(existing, &title, position, &body),
        images: expander.images,
    }
}

/// Landing page for a directory that has no page of its own.
pub fn generated_index(title: &str, position: u32) -> String {
    apply_frontmatter(None, title, position, &format!("# {title}\n"))
}

fn page_title(outline_title: &str, body: &str, source: &Path) -> String {
    let trimmed = outline_title.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    first_heading(body).unwrap_or_else(|| {
        source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    })
}

struct Expander<'a> {
    resolver: &'a Resolver,
    log: &'a mut ConversionLog,
    /// Canonical paths of the files currently being expanded.
    chain: Vec<PathBuf>,
    images: Vec<ImageReference>,
}

impl Expander<'_> {
    fn expand(&mut self, body: &str, file: &Path) -> String {
        let dir = file.parent().unwrap_or(Path::new("."));
        let mut out = String::with_capacity(body.len());
        for chunk in split_fences(body) {
            match chunk {
                Chunk::Prose(text) => {
                    let text = self.rewrite_images(text, dir);
                    out.push_str(&self.expand_includes(&text, file));
                }
                Chunk::Fenced(text) => out.push_str(text),
            }
        }
        out
    }

    fn rewrite_images(&mut self, body: &str, dir: &Path) -> String {
        IMAGE_RE
            .replace_all(body, |caps: &Captures| {
                let whole = &caps[0];
                let path = caps["path"].trim();
                if path.is_empty() || is_remote(path) || is_already_local(path) {
                    return whole.to_string();
                }

                let resolved = self.resolver.resolve_image(path, dir);
                let rewritten = resolved.as_deref().and_then(local_image_path);
                self.images.push(ImageReference {
                    original_path: path.to_string(),
                    resolved_source_path: resolved,
                    rewritten_path: rewritten.clone(),
                });

                match rewritten {
                    Some(new_path) => {
                        let alt = &caps["alt"];
                        match caps.name("title") {
                            Some(t) => format!("![{alt}]({new_path} {})", t.as_str()),
                            None => format!("![{alt}]({new_path})"),
                        }
                    }
                    None => whole.to_string(),
                }
            })
            .into_owned()
    }

    fn expand_includes(&mut self, body: &str, file: &Path) -> String {
        if !INCLUDE_RE.is_match(body) {
            return body.to_string();
        }
        let mut out = String::with_capacity(body.len());
        for line in body.split_inclusive('\n') {
            let content = line.trim_end_matches(['\r', '\n']);
            let ending = &line[content.len()..];

            // A directive alone on its line replaces the whole line.
            let whole_line = INCLUDE_RE
                .find(content)
                .filter(|m| m.as_str() == content.trim());
            if let Some(m) = whole_line {
                match self.include(m.as_str(), file) {
                    Some(included) => {
                        out.push_str(included.trim_end());
                        out.push_str(ending);
                    }
                    None => out.push_str(line),
                }
                continue;
            }

            let replaced = INCLUDE_RE.replace_all(content, |caps: &Captures| {
                self.include(&caps[0], file)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            });
            out.push_str(&replaced);
            out.push_str(ending);
        }
        out
    }

    /// Expanded body of the file named by `directive`, or `None` to leave the
    /// directive as written.
    fn include(&mut self, directive: &str, file: &Path) -> Option<String> {
        let target = parse_include(directive)?;
        let dir = file.parent().unwrap_or(Path::new("."));
        let Some(path) = self
            .resolver
            .resolve_include(target.collection.as_deref(), &target.name, dir)
        else {
            self.log.warn(Warning::MissingInclude {
                file: file.to_path_buf(),
                target: target.display(),
            });
            return None;
        };

        let key = canonical(&path);
        if self.chain.contains(&key) {
            self.log.warn(Warning::CircularInclude {
                file: file.to_path_buf(),
                target: target.display(),
            });
            return None;
        }

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                self.log.warn(Warning::Io {
                    path,
                    message: e.to_string(),
                });
                return None;
            }
        };
        tracing::debug!(include = %path.display(), into = %file.display(), "expanding include");

        let (_, body) = split_frontmatter(&raw);
        self.chain.push(key);
        let expanded = self.expand(body, &path);
        self.chain.pop();
        Some(expanded)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Prose(&'a str),
    /// A fenced code block including its fence lines.
    Fenced(&'a str),
}

/// Split `body` into prose and fenced code blocks, in order. An unclosed
/// fence runs to the end of the body.
fn split_fences(body: &str) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    let mut open: Option<(char, usize)> = None;

    for line in body.split_inclusive('\n') {
        let marker = fence_marker(line.trim());
        match (open, marker) {
            (None, Some(fence)) => {
                if offset > start {
                    chunks.push(Chunk::Prose(&body[start..offset]));
                }
                start = offset;
                open = Some(fence);
            }
            (Some((ch, len)), Some((m_ch, m_len)))
                if m_ch == ch && m_len >= len && line.trim().trim_start_matches(ch).is_empty() =>
            {
                let end = offset + line.len();
                chunks.push(Chunk::Fenced(&body[start..end]));
                start = end;
                open = None;
            }
            _ => {}
        }
        offset += line.len();
    }

    if start < body.len() {
        let rest = &body[start..];
        chunks.push(match open {
            Some(_) => Chunk::Fenced(rest),
            None => Chunk::Prose(rest),
        });
    }
    chunks
}

/// Fence character and run length when `line` opens or closes a fence.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let ch = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = line.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

#[derive(Debug, PartialEq, Eq)]
struct IncludeTarget {
    collection: Option<String>,
    name: String,
}

impl IncludeTarget {
    fn display(&self) -> String {
        match &self.collection {
            Some(c) => format!("{c}:{}", self.name),
            None => self.name.clone(),
        }
    }
}

fn parse_include(directive: &str) -> Option<IncludeTarget> {
    let caps = INCLUDE_RE.captures(directive)?;
    let raw = ["paren", "quoted", "bare"]
        .iter()
        .find_map(|g| caps.name(g))?
        .as_str()
        .trim();
    let (collection, name) = match raw.split_once(':') {
        Some((c, n)) if !c.trim().is_empty() => (Some(c.trim().to_string()), n.trim()),
        Some((_, n)) => (None, n.trim()),
        None => (None, raw),
    };
    if name.is_empty() {
        return None;
    }
    let name = if name.to_lowercase().ends_with(".md") {
        name.to_string()
    } else {
        format!("{name}.md")
    };
    Some(IncludeTarget { collection, name })
}

fn is_remote(path: &str) -> bool {
    let lower = path.to_lowercase();
    REMOTE_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn is_already_local(path: &str) -> bool {
    path.strip_prefix("./")
        .and_then(|rest| rest.strip_prefix(IMAGE_DIR))
        .is_some_and(|rest| rest.starts_with('/'))
}

fn local_image_path(resolved: &Path) -> Option<String> {
    let name = resolved.file_name()?.to_string_lossy();
    Some(format!(
        "./{IMAGE_DIR}/{}",
        utf8_percent_encode(&name, LINK_UNSAFE)
    ))
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
