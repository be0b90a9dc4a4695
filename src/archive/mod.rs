//! Zip archive access with scratch-directory lifecycle management.
//!
//! [`ArchiveReader`] lists entries without extraction, reads single
//! entries on demand, and extracts full archives into uniquely named
//! scratch directories that it removes again on [`ArchiveReader::cleanup`]
//! or drop.

mod parser;
mod structures;

use std::{
    fmt,
    fs,
    path::{Component, Path, PathBuf},
};

use anyhow::Context as _;
use tracing::{debug, info, warn};

use crate::error::{ZipreelError, ZipreelResult};

use parser::ZipParser;
pub use structures::CompressionMethod;
use structures::ZipEntryRecord;

/// Modification timestamp of an archive entry, decoded from DOS date/time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct EntryTimestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl fmt::Display for EntryTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Immutable snapshot of one archive record, produced by listing.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub is_directory: bool,
    pub modified: EntryTimestamp,
}

impl ArchiveEntry {
    fn from_record(record: &ZipEntryRecord) -> Self {
        let (year, month, day) = record.mod_date();
        let (hour, minute, second) = record.mod_time();
        Self {
            name: record.file_name.clone(),
            uncompressed_size: record.uncompressed_size,
            compressed_size: record.compressed_size,
            is_directory: record.is_directory,
            modified: EntryTimestamp {
                year,
                month,
                day,
                hour,
                minute,
                second,
            },
        }
    }
}

/// Zip reader that owns every scratch directory it creates.
///
/// Cleanup is guaranteed on drop, so scoping a reader to a composition
/// releases its scratch storage on success and failure alike.
pub struct ArchiveReader {
    temp_root: PathBuf,
    scratch_dirs: Vec<PathBuf>,
}

impl ArchiveReader {
    pub fn new() -> Self {
        Self::with_temp_root(std::env::temp_dir())
    }

    /// Use a custom root for scratch extraction directories.
    pub fn with_temp_root(temp_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: temp_root.into(),
            scratch_dirs: Vec::new(),
        }
    }

    /// List the archive's entries without extracting anything.
    pub fn list_entries(&self, archive_path: &Path) -> ZipreelResult<Vec<ArchiveEntry>> {
        let mut parser = ZipParser::open(archive_path)?;
        let records = parser.entries()?;
        Ok(records.iter().map(ArchiveEntry::from_record).collect())
    }

    /// Read a single entry's bytes without extracting the full archive.
    pub fn read_entry(&self, archive_path: &Path, entry_name: &str) -> ZipreelResult<Vec<u8>> {
        let mut parser = ZipParser::open(archive_path)?;
        let records = parser.entries()?;
        let record = records
            .iter()
            .find(|r| r.file_name == entry_name)
            .ok_or_else(|| ZipreelError::EntryNotFound(entry_name.to_string()))?;
        parser.read_entry_bytes(record)
    }

    /// Extract every entry into a fresh scratch directory and return its
    /// path. The directory is registered for cleanup before extraction
    /// starts, so a failed extraction is still removed.
    pub fn extract_all(&mut self, archive_path: &Path) -> ZipreelResult<PathBuf> {
        let mut parser = ZipParser::open(archive_path)?;
        let records = parser.entries()?;

        let scratch = tempfile::Builder::new()
            .prefix("zipreel-")
            .tempdir_in(&self.temp_root)
            .with_context(|| {
                format!(
                    "failed to create scratch directory under '{}'",
                    self.temp_root.display()
                )
            })?
            .keep();
        self.scratch_dirs.push(scratch.clone());

        for record in &records {
            let dest = resolve_entry_path(&scratch, &record.file_name)?;
            if record.is_directory {
                fs::create_dir_all(&dest)
                    .with_context(|| format!("failed to create '{}'", dest.display()))?;
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create '{}'", parent.display()))?;
            }
            let data = parser.read_entry_bytes(record)?;
            fs::write(&dest, data)
                .with_context(|| format!("failed to write '{}'", dest.display()))?;
        }

        info!(
            "extracted '{}' ({} entries) to '{}'",
            archive_path.display(),
            records.len(),
            scratch.display()
        );
        Ok(scratch)
    }

    /// Remove every scratch directory this reader created. Idempotent;
    /// individual removal errors are logged and swallowed since cleanup
    /// usually runs while unwinding from another failure.
    pub fn cleanup(&mut self) {
        for dir in self.scratch_dirs.drain(..) {
            if !dir.exists() {
                continue;
            }
            match fs::remove_dir_all(&dir) {
                Ok(()) => debug!("removed scratch directory '{}'", dir.display()),
                Err(e) => warn!("failed to remove scratch directory '{}': {e}", dir.display()),
            }
        }
    }
}

impl Default for ArchiveReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ArchiveReader {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Join an entry name onto the scratch root, rejecting names that would
/// escape it (absolute paths, `..`, drive prefixes).
fn resolve_entry_path(root: &Path, name: &str) -> ZipreelResult<PathBuf> {
    let mut dest = root.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => dest.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ZipreelError::corrupt(format!(
                    "entry name escapes extraction root: '{name}'"
                )));
            }
        }
    }
    Ok(dest)
}
