//! Output tree synthesis.
//!
//! Turns the parsed outline into one [`TargetNode`] per entry and creates the
//! resulting directory tree with its category descriptors.
//!
//! ## Layout
//!
//! ```text
//! - [Intro](intro.md)              docu_book/manual/
//!   - [Setup](setup.md)            ├── intro/
//! - [FAQ](faq.md)                  │   ├── _category_.json   {"label": "Intro", "position": 1}
//!                                  │   ├── intro.md          sidebar_position: 1
//! # Appendix                       │   └── setup.md          sidebar_position: 1
//!                                  ├── faq.md                sidebar_position: 2
//! - [Glossary](glossary.md)        └── appendix/
//!                                      ├── _category_.json   {"label": "Appendix", "position": 3}
//!                                      ├── index.md          generated landing page
//!                                      └── glossary.md       sidebar_position: 1
//! ```
//!
//! An entry becomes a directory when it has children or when it has no link
//! (a section heading). A directory's own page keeps the entry's file name;
//! a directory without one gets a generated `index.md`.

use crate::naming::{SiblingNames, display_label, link_stem, slugify};
use crate::report::{ConversionLog, Warning};
use crate::summary::Outline;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CATEGORY_FILENAME: &str = "_category_.json";
pub const INDEX_PAGE: &str = "index.md";
pub const IMAGE_DIR: &str = "img";

/// Contents of a `_category_.json` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDescriptor {
    pub label: String,
    pub position: u32,
}

/// Where one outline entry lands in the output tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetNode {
    /// Index of the outline entry.
    pub entry: usize,
    /// Directory path for directory nodes, file path for file nodes.
    pub output_path: PathBuf,
    pub is_directory: bool,
    pub sidebar_position: u32,
    /// Sidebar label (the entry title).
    pub label: String,
    /// File name of a directory's own page (`<slug>.md`, or `index.md` for
    /// entries without a link). `None` for file nodes.
    pub page_name: Option<String>,
}

impl TargetNode {
    /// The markdown file written for this node.
    pub fn page_path(&self) -> PathBuf {
        match &self.page_name {
            Some(name) => self.output_path.join(name),
            None => self.output_path.clone(),
        }
    }

    /// The generated landing page of a directory whose own page is missing.
    pub fn index_path(&self) -> PathBuf {
        self.output_path.join(INDEX_PAGE)
    }

    pub fn category(&self) -> CategoryDescriptor {
        CategoryDescriptor {
            label: self.label.clone(),
            position: self.sidebar_position,
        }
    }
}

/// The planned output tree. `nodes[i]` belongs to outline entry `i`.
#[derive(Debug, Default)]
pub struct TreePlan {
    pub nodes: Vec<TargetNode>,
}

impl TreePlan {
    pub fn directories(&self) -> impl Iterator<Item = &TargetNode> {
        self.nodes.iter().filter(|n| n.is_directory)
    }
}

/// Plan output paths for every outline entry under `output_root`.
pub fn plan_tree(outline: &Outline, output_root: &Path) -> TreePlan {
    let mut nodes = Vec::with_capacity(outline.len());
    let mut names = reserved_names();
    plan_children(outline, None, output_root, &mut names, &mut nodes);
    nodes.sort_by_key(|n| n.entry);
    TreePlan { nodes }
}

fn reserved_names() -> SiblingNames {
    let mut names = SiblingNames::new();
    for reserved in [IMAGE_DIR, CATEGORY_FILENAME, INDEX_PAGE] {
        names.reserve(reserved);
    }
    names
}

fn plan_children(
    outline: &Outline,
    parent: Option<usize>,
    dir: &Path,
    names: &mut SiblingNames,
    nodes: &mut Vec<TargetNode>,
) {
    for &index in outline.children_of(parent) {
        let entry = outline.get(index);
        let is_directory = entry.has_children() || entry.source_path.is_none();
        let slug = match &entry.source_path {
            Some(link) => slugify(link_stem(link)),
            None => slugify(&entry.title),
        };

        if is_directory {
            let dir_name = names.claim(&slug, "", entry.position);
            let own_dir = dir.join(&dir_name);
            let mut child_names = reserved_names();
            let page_name = match entry.source_path {
                Some(_) => child_names.claim(&slug, ".md", entry.position),
                None => INDEX_PAGE.to_string(),
            };
            nodes.push(TargetNode {
                entry: index,
                output_path: own_dir.clone(),
                is_directory: true,
                sidebar_position: entry.position,
                label: label_for(&entry.title, &dir_name),
                page_name: Some(page_name),
            });
            plan_children(outline, Some(index), &own_dir, &mut child_names, nodes);
        } else {
            let file_name = names.claim(&slug, ".md", entry.position);
            nodes.push(TargetNode {
                entry: index,
                output_path: dir.join(&file_name),
                is_directory: false,
                sidebar_position: entry.position,
                label: label_for(&entry.title, &slug),
                page_name: None,
            });
        }
    }
}

fn label_for(title: &str, segment: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        display_label(segment)
    } else {
        title.to_string()
    }
}

/// Create every planned directory and write its `_category_.json`.
///
/// Existing directories are reused. Failures are recorded per directory.
/// Returns the number of directories written.
pub fn materialize_directories(plan: &TreePlan, log: &mut ConversionLog) -> usize {
    let mut written = 0;
    for node in plan.directories() {
        match write_directory(node) {
            Ok(()) => written += 1,
            Err(e) => log.warn(Warning::Io {
                path: node.output_path.clone(),
                message: e.to_string(),
            }),
        }
    }
    written
}

fn write_directory(node: &TargetNode) -> std::io::Result<()> {
    fs::create_dir_all(&node.output_path)?;
    let json = serde_json::to_string_pretty(&node.category())?;
    fs::write(node.output_path.join(CATEGORY_FILENAME), format!("{json}\n"))?;
    tracing::debug!(dir = %node.output_path.display(), "category written");
    Ok(())
}
