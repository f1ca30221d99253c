//! Warnings collected during a conversion run.
//!
//! Nothing short of a setup failure stops a conversion. Every other problem
//! (a malformed outline line, a missing chapter, an image that cannot be found)
//! is recorded here and the run carries on. At the end the orchestrator writes
//! the log file and prints a count, so a single bad reference never blocks the
//! rest of the book.
//!
//! The log is an explicit value passed by `&mut` through the call chain; there
//! is no global state.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One non-fatal problem found during conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An outline line looked like an entry but had an empty title or path.
    MalformedLine { line: usize, text: String },
    /// An outline entry was indented more than one level below its
    /// predecessor and was kept at the predecessor's depth.
    OverIndented { line: usize, title: String },
    /// An outline entry's markdown file could not be found.
    MissingFile { title: String, path: String },
    /// An image referenced from `file` could not be found.
    MissingImage { file: PathBuf, reference: String },
    /// An include directive in `file` names a file that could not be found.
    MissingInclude { file: PathBuf, target: String },
    /// An include directive in `file` would re-enter the inclusion chain.
    CircularInclude { file: PathBuf, target: String },
    /// Two different source images were copied to the same destination.
    ImageNameCollision {
        destination: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
    /// A per-file read, write or copy failed.
    Io { path: PathBuf, message: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MalformedLine { line, text } => {
                write!(f, "SUMMARY line {line}: malformed entry skipped: {text}")
            }
            Warning::OverIndented { line, title } => write!(
                f,
                "SUMMARY line {line}: \"{title}\" is indented too deep, kept as a sibling of the previous entry"
            ),
            Warning::MissingFile { title, path } => {
                write!(f, "File \"{path}\" for \"{title}\" cannot be found.")
            }
            Warning::MissingImage { file, reference } => write!(
                f,
                "Image \"{reference}\" referenced in {} cannot be found.",
                file.display()
            ),
            Warning::MissingInclude { file, target } => write!(
                f,
                "Included file \"{target}\" referenced in {} cannot be found.",
                file.display()
            ),
            Warning::CircularInclude { file, target } => write!(
                f,
                "Circular include of \"{target}\" in {} left unexpanded.",
                file.display()
            ),
            Warning::ImageNameCollision {
                destination,
                first,
                second,
            } => write!(
                f,
                "Image {} from {} overwrote the copy of {}.",
                destination.display(),
                second.display(),
                first.display()
            ),
            Warning::Io { path, message } => write!(f, "{}: {message}", path.display()),
        }
    }
}

/// Ordered warnings for a single run.
#[derive(Debug, Default)]
pub struct ConversionLog {
    warnings: Vec<Warning>,
}

impl ConversionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and emit it as a `tracing` event.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Render the log file contents: one warning per line.
    pub fn render(&self) -> String {
        self.warnings
            .iter()
            .map(|w| format!("{w}\n"))
            .collect()
    }

    /// Overwrite `path` with the rendered log. A clean run leaves an empty
    /// file so stale warnings from earlier runs do not linger.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())
    }
}
