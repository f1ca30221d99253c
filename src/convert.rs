//! Conversion orchestration for one book.
//!
//! ```text
//! <books_dir>/<book>/SUMMARY.md
//!        │
//!        ▼
//!  parse_outline ──▶ plan_tree ──▶ materialize_directories
//!                        │
//!                        ▼  (per node, outline order)
//!        resolve_document ──▶ transform_document ──▶ write page
//!                                      │
//!                                      ▼
//!                              materialize_images
//!        │
//!        ▼
//!  <log_file> + ConversionReport
//! ```
//!
//! Only setup problems are errors: a missing source root, an unreadable
//! outline, or an output root that cannot be created. Everything that goes
//! wrong for a single page or image is recorded in the [`ConversionLog`] and
//! the run continues.

use crate::config::{ConfigError, ConvertConfig};
use crate::images::{ImageCopies, ImageStats, materialize_images};
use crate::report::{ConversionLog, Warning};
use crate::resolve::Resolver;
use crate::summary::{Outline, parse_outline};
use crate::transform::{generated_index, transform_document};
use crate::tree::{TargetNode, TreePlan, materialize_directories, plan_tree};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Invalid book name: {0:?} (expected a single directory name)")]
    InvalidBookName(String),
    #[error("Source directory not found: {0}")]
    MissingSourceRoot(PathBuf),
    #[error("Cannot read outline {path}: {source}")]
    MissingSummary {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot create output directory {path}: {source}")]
    OutputRoot {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Where one book is read from and written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookPaths {
    pub book: String,
    pub source_root: PathBuf,
    pub summary_path: PathBuf,
    pub output_root: PathBuf,
    pub log_path: PathBuf,
}

impl BookPaths {
    /// Derive the paths for `book` from the config.
    ///
    /// `book` must be a single directory name; anything that could escape
    /// `books_dir` or `output_dir` is rejected.
    pub fn for_book(config: &ConvertConfig, book: &str) -> Result<Self, ConvertError> {
        let mut components = Path::new(book).components();
        let valid = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !valid {
            return Err(ConvertError::InvalidBookName(book.to_string()));
        }

        let source_root = config.books_dir.join(book);
        Ok(Self {
            book: book.to_string(),
            summary_path: source_root.join(&config.summary_file),
            source_root,
            output_root: config.output_dir.join(book),
            log_path: config.log_file.clone(),
        })
    }
}

/// What happened to one outline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// Source found, rewritten and written.
    Written,
    /// Directory without a source page; a landing page was generated.
    Generated,
    /// Source could not be found; nothing was written.
    Missing,
    /// Source found but reading or writing failed.
    Failed,
}

/// One converted outline entry, in outline order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub title: String,
    pub depth: usize,
    pub position: u32,
    pub is_directory: bool,
    /// Page path relative to the book's output root.
    pub output: PathBuf,
    pub status: PageStatus,
}

/// Summary of a finished conversion.
#[derive(Debug)]
pub struct ConversionReport {
    pub paths: BookPaths,
    pub pages: Vec<PageOutcome>,
    pub directories: usize,
    pub images: ImageStats,
    pub log: ConversionLog,
}

impl ConversionReport {
    pub fn count(&self, status: PageStatus) -> usize {
        self.pages.iter().filter(|p| p.status == status).count()
    }
}

/// Convert `book` using the paths and options in `config`.
pub fn convert(config: &ConvertConfig, book: &str) -> Result<ConversionReport, ConvertError> {
    let paths = BookPaths::for_book(config, book)?;
    convert_book(config, paths)
}

/// Convert the book at `paths`.
pub fn convert_book(
    config: &ConvertConfig,
    paths: BookPaths,
) -> Result<ConversionReport, ConvertError> {
    if !paths.source_root.is_dir() {
        return Err(ConvertError::MissingSourceRoot(paths.source_root.clone()));
    }
    let summary =
        fs::read_to_string(&paths.summary_path).map_err(|source| ConvertError::MissingSummary {
            path: paths.summary_path.clone(),
            source,
        })?;
    fs::create_dir_all(&paths.output_root).map_err(|source| ConvertError::OutputRoot {
        path: paths.output_root.clone(),
        source,
    })?;
    tracing::debug!(
        book = %paths.book,
        source = %paths.source_root.display(),
        output = %paths.output_root.display(),
        "converting"
    );

    let mut log = ConversionLog::new();
    let outline = parse_outline(&summary, config.indent_unit, &mut log);
    let plan = plan_tree(&outline, &paths.output_root);
    let directories = materialize_directories(&plan, &mut log);

    let summary_dir = paths.summary_path.parent().unwrap_or(&paths.source_root);
    let resolver = Resolver::new(
        &paths.source_root,
        summary_dir,
        &config.search_roots,
        config.normalized_image_extensions(),
        std::slice::from_ref(&paths.output_root),
    );

    let mut run = Run {
        outline: &outline,
        resolver: &resolver,
        output_root: &paths.output_root,
        copies: ImageCopies::new(),
        images: ImageStats::default(),
        log: &mut log,
    };
    let pages = run.convert_pages(&plan);
    let images = run.images;

    log.write_to(&paths.log_path)?;
    tracing::debug!(warnings = log.len(), log = %paths.log_path.display(), "log written");

    Ok(ConversionReport {
        paths,
        pages,
        directories,
        images,
        log,
    })
}

struct Run<'a> {
    outline: &'a Outline,
    resolver: &'a Resolver,
    output_root: &'a Path,
    copies: ImageCopies,
    images: ImageStats,
    log: &'a mut ConversionLog,
}

impl Run<'_> {
    fn convert_pages(&mut self, plan: &TreePlan) -> Vec<PageOutcome> {
        plan.nodes.iter().map(|node| self.convert_node(node)).collect()
    }

    fn convert_node(&mut self, node: &TargetNode) -> PageOutcome {
        let outline = self.outline;
        let entry = outline.get(node.entry);
        tracing::debug!(line = entry.line, title = %entry.title, "converting outline entry");
        let source = entry
            .source_path
            .as_deref()
            .and_then(|link| self.resolver.resolve_document(link));

        if let (None, Some(link)) = (&source, &entry.source_path) {
            self.log.warn(Warning::MissingFile {
                title: entry.title.clone(),
                path: link.clone(),
            });
        }

        let (page, status) = match (source, node.is_directory) {
            (Some(source), _) => {
                let page = node.page_path();
                let status = self.write_page(&source, &page, node);
                (page, status)
            }
            (None, true) => {
                let page = node.index_path();
                let index = generated_index(&node.label, node.sidebar_position);
                let status = match fs::write(&page, index) {
                    Ok(()) => PageStatus::Generated,
                    Err(e) => {
                        self.log.warn(Warning::Io {
                            path: page.clone(),
                            message: e.to_string(),
                        });
                        PageStatus::Failed
                    }
                };
                (page, status)
            }
            (None, false) => (node.page_path(), PageStatus::Missing),
        };

        PageOutcome {
            title: entry.title.clone(),
            depth: entry.depth,
            position: entry.position,
            is_directory: node.is_directory,
            output: page
                .strip_prefix(self.output_root)
                .map(Path::to_path_buf)
                .unwrap_or(page),
            status,
        }
    }

    fn write_page(&mut self, source: &Path, page: &Path, node: &TargetNode) -> PageStatus {
        let text = match fs::read_to_string(source) {
            Ok(text) => text,
            Err(e) => {
                self.log.warn(Warning::Io {
                    path: source.to_path_buf(),
                    message: e.to_string(),
                });
                return PageStatus::Failed;
            }
        };

        let entry = self.outline.get(node.entry);
        let transformed = transform_document(
            &text,
            source,
            &entry.title,
            node.sidebar_position,
            self.resolver,
            self.log,
        );

        let written = page
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(page, &transformed.text));
        if let Err(e) = written {
            self.log.warn(Warning::Io {
                path: page.to_path_buf(),
                message: e.to_string(),
            });
            return PageStatus::Failed;
        }
        tracing::debug!(from = %source.display(), to = %page.display(), "page written");

        let stats = materialize_images(page, &transformed.images, &mut self.copies, self.log);
        self.images.add(stats);
        PageStatus::Written
    }
}
