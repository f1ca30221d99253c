//! # mdtodocu
//!
//! Converts an mdbook-style book into a Docusaurus docs tree. The book's
//! `SUMMARY.md` outline is the data source: nesting becomes directories,
//! outline order becomes sidebar order, and every page gets the frontmatter
//! the site generator needs.
//!
//! # Architecture: One Pass Per Book
//!
//! ```text
//! ../books/<book>/SUMMARY.md ──▶ outline ──▶ tree plan ──▶ docu_book/<book>/
//!                                                 │
//!                 markdown + images ──▶ resolve ──┴──▶ rewrite ──▶ pages + img/
//! ```
//!
//! A run never stops for a single bad reference. Missing files, images and
//! includes are collected as warnings, written to `mdtodocu.log`, and counted
//! in the CLI output. Only setup problems (no source directory, no outline,
//! unwritable output) abort.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`summary`] | Parses `SUMMARY.md` into an arena of outline entries with depth and position |
//! | [`naming`] | Filesystem-safe slugs and per-directory collision handling |
//! | [`tree`] | Plans output paths and writes directories with `_category_.json` |
//! | [`resolve`] | Finds referenced documents, images and includes on disk |
//! | [`frontmatter`] | Splits, merges and renders the `title` / `sidebar_position` block |
//! | [`transform`] | Rewrites image references, expands includes, applies frontmatter |
//! | [`images`] | Copies resolved images into `img/` beside each page |
//! | [`report`] | Warnings collected during a run and the log file |
//! | [`convert`] | Orchestrates a full conversion and reports what happened |
//! | [`config`] | `mdtodocu.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Outline Order Is Sidebar Order
//!
//! Docusaurus sorts by `sidebar_position`. Every page and category gets the
//! 1-based position of its outline entry among its siblings, so the sidebar
//! reads exactly like the book's table of contents.
//!
//! ## Reruns Are Idempotent
//!
//! Converting the same input twice yields byte-identical output. Directories
//! are created with `create_dir_all`, existing frontmatter is merged rather
//! than stacked, and images are only copied when their content differs.

pub mod config;
pub mod convert;
pub mod frontmatter;
pub mod images;
pub mod naming;
pub mod output;
pub mod report;
pub mod resolve;
pub mod summary;
pub mod transform;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_helpers;
