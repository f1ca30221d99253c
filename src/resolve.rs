//! Locating referenced files on disk.
//!
//! Outline links, image references and include directives are written by
//! hand and often do not point exactly where the file lives. Each kind of
//! reference is resolved by trying an ordered list of [`Strategy`] values and
//! taking the first existing file:
//!
//! | Reference | Strategies, in order |
//! |-----------|----------------------|
//! | outline link | source root, SUMMARY.md directory, file name search |
//! | include | referring file's directory, then as for outline links |
//! | image | referring file's directory, source root, SUMMARY.md directory, name and stem search under the referring file's directory, name and stem search everywhere |
//!
//! File name search is case-insensitive and covers the source root followed by
//! any configured extra search roots, in sorted walk order, so the same tree
//! always resolves the same way. Stem search lets `diagram.jpg` find
//! `diagram.jpeg` or `diagram.png`. An image found anywhere below the page
//! that references it wins over a same-named image elsewhere in the book.
//!
//! Lookups are pure: nothing is logged here and "not found" is `None`. The
//! callers decide whether a miss is worth a warning.

use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// One way of turning a reference into a candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Relative to the directory of the file containing the reference.
    ReferrerDir,
    /// Relative to the book's source root.
    SourceRoot,
    /// Relative to the directory holding SUMMARY.md.
    SummaryDir,
    /// Case-insensitive file name match below the referring file's directory.
    ReferrerNameSearch,
    /// Stem match with an interchangeable image extension below the referring
    /// file's directory.
    ReferrerStemSearch,
    /// Case-insensitive file name match anywhere under the search roots.
    FileNameSearch,
    /// Case-insensitive stem match with an interchangeable image extension.
    StemSearch,
}

pub const DOCUMENT_STRATEGIES: &[Strategy] = &[
    Strategy::SourceRoot,
    Strategy::SummaryDir,
    Strategy::FileNameSearch,
];

pub const INCLUDE_STRATEGIES: &[Strategy] = &[
    Strategy::ReferrerDir,
    Strategy::SourceRoot,
    Strategy::SummaryDir,
    Strategy::FileNameSearch,
];

pub const IMAGE_STRATEGIES: &[Strategy] = &[
    Strategy::ReferrerDir,
    Strategy::SourceRoot,
    Strategy::SummaryDir,
    Strategy::ReferrerNameSearch,
    Strategy::ReferrerStemSearch,
    Strategy::FileNameSearch,
    Strategy::StemSearch,
];

/// Files under the search roots keyed by lowercase name and stem.
#[derive(Debug, Default)]
struct FileIndex {
    by_name: HashMap<String, Vec<PathBuf>>,
    by_stem: HashMap<String, Vec<PathBuf>>,
}

impl FileIndex {
    fn build(roots: &[PathBuf], excluded: &[PathBuf]) -> Self {
        let mut index = Self::default();
        for root in roots {
            let walker = WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    let hidden = e.depth() > 0 && e.file_name().to_string_lossy().starts_with('.');
                    !hidden && !excluded.iter().any(|x| e.path() == x)
                });
            for entry in walker.filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.into_path();
                if let Some(name) = path.file_name() {
                    let key = name.to_string_lossy().to_lowercase();
                    index.by_name.entry(key).or_default().push(path.clone());
                }
                if let Some(stem) = path.file_stem() {
                    let key = stem.to_string_lossy().to_lowercase();
                    index.by_stem.entry(key).or_default().push(path);
                }
            }
        }
        index
    }

    fn first_by_name(&self, name: &str, under: Option<&Path>) -> Option<&PathBuf> {
        self.by_name
            .get(&name.to_lowercase())?
            .iter()
            .find(|p| under.is_none_or(|dir| p.starts_with(dir)))
    }

    fn first_by_stem(
        &self,
        stem: &str,
        extensions: &[String],
        under: Option<&Path>,
    ) -> Option<&PathBuf> {
        self.by_stem.get(&stem.to_lowercase())?.iter().find(|p| {
            let extension_matches = p
                .extension()
                .map(|e| extensions.contains(&e.to_string_lossy().to_lowercase()))
                .unwrap_or(false);
            extension_matches && under.is_none_or(|dir| p.starts_with(dir))
        })
    }
}

/// Resolves references against one book's source tree.
#[derive(Debug)]
pub struct Resolver {
    source_root: PathBuf,
    summary_dir: PathBuf,
    search_roots: Vec<PathBuf>,
    image_extensions: Vec<String>,
    index: FileIndex,
}

impl Resolver {
    /// Build a resolver and index every file under `source_root` and
    /// `search_roots`. Paths in `excluded` (typically the output root) are
    /// skipped. Roots that do not exist are ignored.
    pub fn new(
        source_root: &Path,
        summary_dir: &Path,
        search_roots: &[PathBuf],
        image_extensions: Vec<String>,
        excluded: &[PathBuf],
    ) -> Self {
        let source_root = canonical(source_root);
        let summary_dir = canonical(summary_dir);
        let search_roots: Vec<PathBuf> = search_roots
            .iter()
            .filter(|r| r.is_dir())
            .map(|r| canonical(r))
            .collect();
        let excluded: Vec<PathBuf> = excluded.iter().map(|p| canonical(p)).collect();

        let mut roots = vec![source_root.clone()];
        roots.extend(search_roots.iter().cloned());
        let index = FileIndex::build(&roots, &excluded);

        Self {
            source_root,
            summary_dir,
            search_roots,
            image_extensions,
            index,
        }
    }

    /// Resolve an outline link target.
    pub fn resolve_document(&self, link: &str) -> Option<PathBuf> {
        self.resolve_with(link, None, DOCUMENT_STRATEGIES)
    }

    /// Resolve an image reference found in a file living in `referrer_dir`.
    pub fn resolve_image(&self, reference: &str, referrer_dir: &Path) -> Option<PathBuf> {
        self.resolve_with(reference, Some(referrer_dir), IMAGE_STRATEGIES)
    }

    /// Resolve an include target found in a file living in `referrer_dir`.
    ///
    /// A collection-qualified include only looks under
    /// `<root>/<collection>` for each search root.
    pub fn resolve_include(
        &self,
        collection: Option<&str>,
        name: &str,
        referrer_dir: &Path,
    ) -> Option<PathBuf> {
        match collection {
            Some(collection) => {
                let name = normalize_reference(name)?;
                let file_name = Path::new(&name).file_name()?.to_string_lossy().to_string();
                std::iter::once(&self.source_root)
                    .chain(&self.search_roots)
                    .map(|root| root.join(collection))
                    .find_map(|dir| {
                        let literal = dir.join(&name);
                        if literal.is_file() {
                            return Some(literal);
                        }
                        self.index.first_by_name(&file_name, Some(dir.as_path())).cloned()
                    })
            }
            None => self.resolve_with(name, Some(referrer_dir), INCLUDE_STRATEGIES),
        }
    }

    /// Try `strategies` in order and return the first hit.
    pub fn resolve_with(
        &self,
        reference: &str,
        referrer_dir: Option<&Path>,
        strategies: &[Strategy],
    ) -> Option<PathBuf> {
        let name = normalize_reference(reference)?;
        strategies
            .iter()
            .find_map(|s| self.try_strategy(*s, &name, referrer_dir))
    }

    fn try_strategy(
        &self,
        strategy: Strategy,
        name: &str,
        referrer_dir: Option<&Path>,
    ) -> Option<PathBuf> {
        match strategy {
            Strategy::ReferrerDir => existing_file(referrer_dir?.join(name)),
            Strategy::SourceRoot => existing_file(self.source_root.join(name)),
            Strategy::SummaryDir => existing_file(self.summary_dir.join(name)),
            Strategy::ReferrerNameSearch => {
                let dir = canonical(referrer_dir?);
                self.search_name(name, Some(dir.as_path()))
            }
            Strategy::ReferrerStemSearch => {
                let dir = canonical(referrer_dir?);
                self.search_stem(name, Some(dir.as_path()))
            }
            Strategy::FileNameSearch => self.search_name(name, None),
            Strategy::StemSearch => self.search_stem(name, None),
        }
    }

    fn search_name(&self, name: &str, under: Option<&Path>) -> Option<PathBuf> {
        let file_name = Path::new(name).file_name()?.to_string_lossy();
        self.index.first_by_name(&file_name, under).cloned()
    }

    fn search_stem(&self, name: &str, under: Option<&Path>) -> Option<PathBuf> {
        let path = Path::new(name);
        let stem = path.file_stem()?.to_string_lossy();
        let mut extensions = self.image_extensions.clone();
        if let Some(ext) = path.extension() {
            extensions.push(ext.to_string_lossy().to_lowercase());
        }
        self.index.first_by_stem(&stem, &extensions, under).cloned()
    }
}

/// Percent-decode a reference and make it relative.
///
/// `./a/b.png`, `/a/b.png` and `a/b%20c.png` become `a/b.png`, `a/b.png` and
/// `a/b c.png`. Returns `None` for references with nothing left to look up.
pub fn normalize_reference(reference: &str) -> Option<String> {
    let decoded = percent_decode_str(reference.trim()).decode_utf8_lossy();
    let relative: PathBuf = Path::new(decoded.as_ref())
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_) | Component::CurDir))
        .collect();
    let normalized = relative.to_string_lossy().to_string();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn existing_file(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn resolver(root: &Path) -> Resolver {
        Resolver::new(root, root, &[], vec!["jpg".into(), "jpeg".into(), "png".into()], &[])
    }

    #[test]
    fn normalize_strips_leading_markers() {
        assert_eq!(normalize_reference("./a/b.png").as_deref(), Some("a/b.png"));
        assert_eq!(normalize_reference("/a/b.png").as_deref(), Some("a/b.png"));
        assert_eq!(normalize_reference("a/b%20c.png").as_deref(), Some("a/b c.png"));
        assert_eq!(normalize_reference("  "), None);
        assert_eq!(normalize_reference("./"), None);
    }

    #[test]
    fn literal_path_under_source_root() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("guide/intro.md"));
        let r = resolver(tmp.path());
        let found = r.resolve_document("guide/intro.md").unwrap();
        assert!(found.ends_with("guide/intro.md"));
    }

    #[test]
    fn summary_dir_checked_before_search() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("src/intro.md"));
        touch(&tmp.path().join("aaa/intro.md"));
        let r = Resolver::new(tmp.path(), &tmp.path().join("src"), &[], vec![], &[]);
        let found = r.resolve_document("intro.md").unwrap();
        assert!(found.ends_with("src/intro.md"));
    }

    #[test]
    fn file_name_search_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("deep/nested/Intro.MD"));
        let r = resolver(tmp.path());
        let found = r.resolve_document("elsewhere/intro.md").unwrap();
        assert!(found.ends_with("deep/nested/Intro.MD"));
    }

    #[test]
    fn file_name_search_takes_first_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("b/page.md"));
        touch(&tmp.path().join("a/page.md"));
        let r = resolver(tmp.path());
        assert!(r.resolve_document("page.md").unwrap().ends_with("a/page.md"));
    }

    #[test]
    fn hidden_directories_not_searched() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join(".git/page.md"));
        let r = resolver(tmp.path());
        assert_eq!(r.resolve_document("page.md"), None);
    }

    #[test]
    fn excluded_directory_not_searched() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("out/page.md"));
        let out = tmp.path().join("out");
        let r = Resolver::new(tmp.path(), tmp.path(), &[], vec![], &[out]);
        assert_eq!(r.resolve_document("page.md"), None);
    }

    #[test]
    fn extra_search_roots_used_after_source_root() {
        let tmp = TempDir::new().unwrap();
        let book = tmp.path().join("book");
        let shared = tmp.path().join("shared");
        touch(&book.join("SUMMARY.md"));
        touch(&shared.join("common.md"));
        let r = Resolver::new(&book, &book, &[shared], vec![], &[]);
        assert!(r.resolve_document("common.md").unwrap().ends_with("shared/common.md"));
    }

    #[test]
    fn image_relative_to_referrer_first() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("chapter/pics/a.png"));
        touch(&tmp.path().join("pics/a.png"));
        let r = resolver(tmp.path());
        let found = r
            .resolve_image("pics/a.png", &tmp.path().join("chapter"))
            .unwrap();
        assert!(found.ends_with("chapter/pics/a.png"));
    }

    #[test]
    fn image_below_referrer_wins_over_earlier_match_elsewhere() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("aaa/diagram.png"));
        touch(&tmp.path().join("chapter/pics/diagram.png"));
        let r = resolver(tmp.path());
        let found = r
            .resolve_image("diagram.png", &tmp.path().join("chapter"))
            .unwrap();
        assert!(found.ends_with("chapter/pics/diagram.png"));
    }

    #[test]
    fn image_stem_below_referrer_wins_over_exact_name_elsewhere() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("aaa/diagram.jpg"));
        touch(&tmp.path().join("chapter/pics/diagram.png"));
        let r = resolver(tmp.path());
        let found = r
            .resolve_image("diagram.jpg", &tmp.path().join("chapter"))
            .unwrap();
        assert!(found.ends_with("chapter/pics/diagram.png"));
    }

    #[test]
    fn image_falls_back_to_whole_tree() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("aaa/diagram.png"));
        touch(&tmp.path().join("chapter/page.md"));
        let r = resolver(tmp.path());
        let found = r
            .resolve_image("diagram.png", &tmp.path().join("chapter"))
            .unwrap();
        assert!(found.ends_with("aaa/diagram.png"));
    }

    #[test]
    fn image_extension_equivalence() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("img/diagram.jpeg"));
        let r = resolver(tmp.path());
        let found = r.resolve_image("diagram.jpg", tmp.path()).unwrap();
        assert!(found.ends_with("img/diagram.jpeg"));
    }

    #[test]
    fn stem_search_ignores_non_image_extensions() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("diagram.md"));
        let r = resolver(tmp.path());
        assert_eq!(r.resolve_image("diagram.png", tmp.path()), None);
    }

    #[test]
    fn missing_reference_is_none() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(tmp.path());
        assert_eq!(r.resolve_document("nope.md"), None);
        assert_eq!(r.resolve_image("nope.png", tmp.path()), None);
    }

    #[test]
    fn collection_include_limited_to_collection() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("tech/sub/mycelium.md"));
        touch(&tmp.path().join("other/note.md"));
        let r = resolver(tmp.path());
        let found = r
            .resolve_include(Some("tech"), "mycelium.md", tmp.path())
            .unwrap();
        assert!(found.ends_with("tech/sub/mycelium.md"));
        assert_eq!(r.resolve_include(Some("tech"), "note.md", tmp.path()), None);
    }
}
