//! Partition an extracted file tree into media categories by extension.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "flac", "ogg", "m4a"];
const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "doc", "docx"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Images,
    Videos,
    Audio,
    Documents,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Images,
        Category::Videos,
        Category::Audio,
        Category::Documents,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Videos => "videos",
            Category::Audio => "audio",
            Category::Documents => "documents",
            Category::Other => "other",
        }
    }

    /// Categorize a path by its extension, case-insensitively. Unknown and
    /// missing extensions land in [`Category::Other`].
    pub fn of_path(path: &Path) -> Category {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Category::Other;
        };
        let ext = ext.to_ascii_lowercase();
        let ext = ext.as_str();
        if IMAGE_EXTENSIONS.contains(&ext) {
            Category::Images
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Category::Videos
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            Category::Audio
        } else if DOCUMENT_EXTENSIONS.contains(&ext) {
            Category::Documents
        } else {
            Category::Other
        }
    }
}

/// File paths found under a root, partitioned by [`Category`]. Within a
/// category, paths keep the (sorted) traversal order.
#[derive(Clone, Debug, Default)]
pub struct CategorizedFiles {
    pub images: Vec<PathBuf>,
    pub videos: Vec<PathBuf>,
    pub audio: Vec<PathBuf>,
    pub documents: Vec<PathBuf>,
    pub other: Vec<PathBuf>,
}

impl CategorizedFiles {
    pub fn files(&self, category: Category) -> &[PathBuf] {
        match category {
            Category::Images => &self.images,
            Category::Videos => &self.videos,
            Category::Audio => &self.audio,
            Category::Documents => &self.documents,
            Category::Other => &self.other,
        }
    }

    fn push(&mut self, category: Category, path: PathBuf) {
        match category {
            Category::Images => self.images.push(path),
            Category::Videos => self.videos.push(path),
            Category::Audio => self.audio.push(path),
            Category::Documents => self.documents.push(path),
            Category::Other => self.other.push(path),
        }
    }

    /// Total number of classified files across all categories.
    pub fn total(&self) -> usize {
        Category::ALL
            .iter()
            .map(|&c| self.files(c).len())
            .sum()
    }
}

/// Recursively walk `root` and classify every regular file.
///
/// Traversal is sorted by file name so the result is deterministic for a
/// given tree. Unreadable entries are logged and skipped; this never
/// fails. Directories themselves are never included.
pub fn classify(root: &Path) -> CategorizedFiles {
    let mut found = CategorizedFiles::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry under '{}': {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        found.push(Category::of_path(entry.path()), entry.into_path());
    }

    info!("found {} files under '{}'", found.total(), root.display());
    for category in Category::ALL {
        let files = found.files(category);
        if !files.is_empty() {
            debug!("  {}: {} files", category.label(), files.len());
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn extension_table_is_case_insensitive() {
        assert_eq!(Category::of_path(Path::new("a.JPG")), Category::Images);
        assert_eq!(Category::of_path(Path::new("b.Mp4")), Category::Videos);
        assert_eq!(Category::of_path(Path::new("c.FLAC")), Category::Audio);
        assert_eq!(Category::of_path(Path::new("d.Md")), Category::Documents);
    }

    #[test]
    fn unknown_extensions_fall_through_to_other() {
        assert_eq!(Category::of_path(Path::new("a.dat")), Category::Other);
        assert_eq!(Category::of_path(Path::new("noext")), Category::Other);
        assert_eq!(Category::of_path(Path::new("archive.tar.gz")), Category::Other);
    }

    #[test]
    fn classify_partitions_a_nested_tree() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("one.jpg"));
        touch(&root.path().join("sub/two.png"));
        touch(&root.path().join("sub/deeper/song.mp3"));
        touch(&root.path().join("notes.txt"));
        touch(&root.path().join("blob.dat"));
        fs::create_dir_all(root.path().join("empty_dir")).unwrap();

        let found = classify(root.path());
        assert_eq!(found.images.len(), 2);
        assert_eq!(found.audio.len(), 1);
        assert_eq!(found.documents.len(), 1);
        assert_eq!(found.other.len(), 1);
        assert_eq!(found.videos.len(), 0);
        assert_eq!(found.total(), 5);
    }

    #[test]
    fn classify_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("b.jpg"));
        touch(&root.path().join("a.jpg"));
        touch(&root.path().join("c.wav"));

        let first = classify(root.path());
        let second = classify(root.path());
        assert_eq!(first.images, second.images);
        assert_eq!(first.audio, second.audio);
        // Sorted traversal makes the order reproducible.
        assert!(first.images[0].ends_with("a.jpg"));
        assert!(first.images[1].ends_with("b.jpg"));
    }
}
