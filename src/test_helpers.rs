//! Shared test utilities for the mdtodocu test suite.
//!
//! Provides a fixture book in an isolated temp directory, a config pointing
//! at it, and helpers for reading and asserting on the converted tree.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let report = convert(&fixture_config(tmp.path()), FIXTURE_BOOK).unwrap();
//!
//! assert_files(tmp.path(), &["intro/intro.md", "intro/setup.md"]);
//! assert!(read_output(tmp.path(), "faq.md").contains("sidebar_position: 2"));
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::config::ConvertConfig;

/// Book name the fixture is installed under.
pub const FIXTURE_BOOK: &str = "manual";

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/book/` to `<tmp>/books/manual/` and return the temp dir.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/book");
    let book = tmp.path().join("books").join(FIXTURE_BOOK);
    std::fs::create_dir_all(&book).unwrap();
    copy_dir_recursive(&fixtures, &book).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Config with every path inside `root`.
pub fn fixture_config(root: &Path) -> ConvertConfig {
    ConvertConfig {
        books_dir: root.join("books"),
        output_dir: root.join("docu_book"),
        log_file: root.join("mdtodocu.log"),
        ..ConvertConfig::default()
    }
}

// =========================================================================
// Output inspection
// =========================================================================

/// Output root of the fixture book.
pub fn output_root(root: &Path) -> PathBuf {
    root.join("docu_book").join(FIXTURE_BOOK)
}

/// Read a converted file by path relative to the output root. Panics if
/// missing.
pub fn read_output(root: &Path, rel: &str) -> String {
    let path = output_root(root).join(rel);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

/// Every file under the output root, relative and sorted.
pub fn output_files(root: &Path) -> Vec<String> {
    let out = output_root(root);
    WalkDir::new(&out)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(&out)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

/// Assert that each of `expected` exists under the output root.
pub fn assert_files(root: &Path, expected: &[&str]) {
    let actual = output_files(root);
    for file in expected {
        assert!(
            actual.iter().any(|a| a == file),
            "'{file}' not in output. Available: {actual:?}"
        );
    }
}
