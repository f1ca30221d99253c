//! Copying referenced images next to the pages that use them.
//!
//! Every page's images land in an `img/` directory beside the page:
//!
//! ```text
//! docu_book/manual/intro/
//! ├── intro.md        ![Diagram](./img/flow.png)
//! └── img/
//!     └── flow.png    copied from ../books/manual/pics/flow.png
//! ```
//!
//! ## Reruns
//!
//! Copies are content-addressed: before copying, the SHA-256 of the source is
//! compared with the file already at the destination and identical files are
//! left alone. A rerun over unchanged input touches nothing.
//!
//! ## Collisions
//!
//! Destinations only use the source's file name, so two different
//! `diagram.png` files referenced from pages in the same directory end up on
//! the same path. [`ImageCopies`] remembers which source each destination got
//! during this run and reports the second one.

use crate::report::{ConversionLog, Warning};
use crate::transform::ImageReference;
use crate::tree::IMAGE_DIR;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Destinations written during one run, keyed to the source they came from.
#[derive(Debug, Default)]
pub struct ImageCopies {
    sources: HashMap<PathBuf, PathBuf>,
}

impl ImageCopies {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Counts for one call to [`materialize_images`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImageStats {
    pub copied: usize,
    pub unchanged: usize,
}

impl ImageStats {
    pub fn add(&mut self, other: ImageStats) {
        self.copied += other.copied;
        self.unchanged += other.unchanged;
    }
}

/// Copy the resolved images of the page at `page` into `<page dir>/img/`.
///
/// Unresolved references are reported once per distinct reference.
/// Per-image failures become warnings.
pub fn materialize_images(
    page: &Path,
    images: &[ImageReference],
    copies: &mut ImageCopies,
    log: &mut ConversionLog,
) -> ImageStats {
    let mut stats = ImageStats::default();
    let img_dir = page.parent().unwrap_or(Path::new(".")).join(IMAGE_DIR);
    let mut missing_reported = HashSet::new();

    for image in images {
        let Some(source) = &image.resolved_source_path else {
            if missing_reported.insert(image.original_path.as_str()) {
                log.warn(Warning::MissingImage {
                    file: page.to_path_buf(),
                    reference: image.original_path.clone(),
                });
            }
            continue;
        };
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let destination = img_dir.join(file_name);

        match copies.sources.get(&destination) {
            Some(previous) if previous == source => continue,
            Some(previous) => log.warn(Warning::ImageNameCollision {
                destination: destination.clone(),
                first: previous.clone(),
                second: source.clone(),
            }),
            None => {}
        }
        copies.sources.insert(destination.clone(), source.clone());

        match copy_if_changed(source, &destination) {
            Ok(true) => stats.copied += 1,
            Ok(false) => stats.unchanged += 1,
            Err(e) => log.warn(Warning::Io {
                path: destination,
                message: e.to_string(),
            }),
        }
    }
    stats
}

/// Copy `source` to `destination` unless the destination already holds the
/// same bytes. Returns whether a copy happened.
fn copy_if_changed(source: &Path, destination: &Path) -> io::Result<bool> {
    if destination.is_file() && hash_file(source)? == hash_file(destination)? {
        tracing::debug!(image = %destination.display(), "image unchanged");
        return Ok(false);
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, destination)?;
    tracing::debug!(from = %source.display(), to = %destination.display(), "image copied");
    Ok(true)
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolved(original: &str, source: &Path) -> ImageReference {
        ImageReference {
            original_path: original.into(),
            resolved_source_path: Some(source.to_path_buf()),
            rewritten_path: source
                .file_name()
                .map(|n| format!("./img/{}", n.to_string_lossy())),
        }
    }

    fn unresolved(original: &str) -> ImageReference {
        ImageReference {
            original_path: original.into(),
            resolved_source_path: None,
            rewritten_path: None,
        }
    }

    #[test]
    fn hash_file_is_hex_sha256() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.bin");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            hash_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn copies_into_img_beside_page() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src/pics/flow.png");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, b"png-bytes").unwrap();
        let page = tmp.path().join("out/intro/intro.md");

        let mut log = ConversionLog::new();
        let stats = materialize_images(
            &page,
            &[resolved("pics/flow.png", &src)],
            &mut ImageCopies::new(),
            &mut log,
        );

        assert_eq!(stats, ImageStats { copied: 1, unchanged: 0 });
        assert_eq!(
            fs::read(tmp.path().join("out/intro/img/flow.png")).unwrap(),
            b"png-bytes"
        );
        assert!(log.is_empty());
    }

    #[test]
    fn identical_destination_not_recopied() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("flow.png");
        fs::write(&src, b"same").unwrap();
        let page = tmp.path().join("out/page.md");
        let images = [resolved("flow.png", &src)];
        let mut log = ConversionLog::new();

        materialize_images(&page, &images, &mut ImageCopies::new(), &mut log);
        let again = materialize_images(&page, &images, &mut ImageCopies::new(), &mut log);
        assert_eq!(again, ImageStats { copied: 0, unchanged: 1 });
    }

    #[test]
    fn changed_source_is_recopied() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("flow.png");
        fs::write(&src, b"v1").unwrap();
        let page = tmp.path().join("out/page.md");
        let images = [resolved("flow.png", &src)];
        let mut log = ConversionLog::new();

        materialize_images(&page, &images, &mut ImageCopies::new(), &mut log);
        fs::write(&src, b"v2").unwrap();
        let stats = materialize_images(&page, &images, &mut ImageCopies::new(), &mut log);
        assert_eq!(stats.copied, 1);
        assert_eq!(fs::read(tmp.path().join("out/img/flow.png")).unwrap(), b"v2");
    }

    #[test]
    fn same_image_twice_in_a_run_copied_once() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.png");
        fs::write(&src, b"a").unwrap();
        let page = tmp.path().join("out/page.md");
        let mut log = ConversionLog::new();
        let stats = materialize_images(
            &page,
            &[resolved("a.png", &src), resolved("./a.png", &src)],
            &mut ImageCopies::new(),
            &mut log,
        );
        assert_eq!(stats.copied, 1);
        assert!(log.is_empty());
    }

    #[test]
    fn missing_image_reported_once_per_reference() {
        let tmp = TempDir::new().unwrap();
        let page = tmp.path().join("out/page.md");
        let mut log = ConversionLog::new();
        materialize_images(
            &page,
            &[unresolved("x.png"), unresolved("x.png"), unresolved("y.png")],
            &mut ImageCopies::new(),
            &mut log,
        );
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.warnings()[0],
            Warning::MissingImage {
                file: page.clone(),
                reference: "x.png".into()
            }
        );
    }

    #[test]
    fn name_collision_reported() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a/diagram.png");
        let b = tmp.path().join("b/diagram.png");
        for (path, bytes) in [(&a, b"A"), (&b, b"B")] {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, bytes).unwrap();
        }
        let out = tmp.path().join("out");
        let mut copies = ImageCopies::new();
        let mut log = ConversionLog::new();

        materialize_images(&out.join("one.md"), &[resolved("a/diagram.png", &a)], &mut copies, &mut log);
        materialize_images(&out.join("two.md"), &[resolved("b/diagram.png", &b)], &mut copies, &mut log);

        assert_eq!(log.len(), 1);
        assert!(matches!(
            &log.warnings()[0],
            Warning::ImageNameCollision { first, second, .. } if first == &a && second == &b
        ));
        assert_eq!(fs::read(out.join("img/diagram.png")).unwrap(), b"B");
    }
}
