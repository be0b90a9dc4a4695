mod support;

use std::path::PathBuf;

use support::ZipBuilder;
use zipreel::{ArchiveReader, ZipreelError, classify};

#[test]
fn list_entries_reports_names_sizes_and_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("fixture.zip");
    ZipBuilder::new()
        .stored("readme.txt", b"hello there")
        .dir("media/")
        .deflated("media/essay.txt", b"the quick brown fox jumps over the lazy dog")
        .write_to(&archive);

    let reader = ArchiveReader::new();
    let entries = reader.list_entries(&archive).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].name, "readme.txt");
    assert_eq!(entries[0].uncompressed_size, 11);
    assert!(!entries[0].is_directory);
    assert_eq!(entries[0].modified.to_string(), "2024-06-01 12:00:00");

    assert!(entries[1].is_directory);

    let deflated = &entries[2];
    assert_eq!(deflated.uncompressed_size, 43);
    assert!(deflated.compressed_size > 0);
}

#[test]
fn read_entry_roundtrips_stored_and_deflated_data() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("fixture.zip");
    let body = b"content that should deflate: aaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    ZipBuilder::new()
        .stored("a.txt", b"plain")
        .deflated("b.txt", body)
        .write_to(&archive);

    let reader = ArchiveReader::new();
    assert_eq!(reader.read_entry(&archive, "a.txt").unwrap(), b"plain");
    assert_eq!(reader.read_entry(&archive, "b.txt").unwrap(), body);
}

#[test]
fn missing_entry_is_entry_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("fixture.zip");
    ZipBuilder::new().stored("a.txt", b"x").write_to(&archive);

    let reader = ArchiveReader::new();
    let err = reader.read_entry(&archive, "nope.txt").unwrap_err();
    assert!(matches!(err, ZipreelError::EntryNotFound(name) if name == "nope.txt"));
}

#[test]
fn crc_mismatch_is_corrupt_archive() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("bad_crc.zip");
    ZipBuilder::new()
        .stored("a.txt", b"payload")
        .corrupt_crc()
        .write_to(&archive);

    let reader = ArchiveReader::new();
    let err = reader.read_entry(&archive, "a.txt").unwrap_err();
    assert!(matches!(err, ZipreelError::CorruptArchive(_)));
}

#[test]
fn archives_with_comments_still_parse() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("commented.zip");
    ZipBuilder::new()
        .stored("a.txt", b"x")
        .comment("made by the test suite")
        .write_to(&archive);

    let reader = ArchiveReader::new();
    assert_eq!(reader.list_entries(&archive).unwrap().len(), 1);
}

#[test]
fn extract_all_preserves_relative_paths_and_matches_listing() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("tree.zip");
    ZipBuilder::new()
        .dir("photos/")
        .stored("photos/a.jpg", b"not really a jpeg")
        .stored("photos/nested/b.png", b"nor a png")
        .deflated("notes.txt", b"some notes")
        .write_to(&archive);

    let mut reader = ArchiveReader::with_temp_root(dir.path());
    let listed_files = reader
        .list_entries(&archive)
        .unwrap()
        .iter()
        .filter(|e| !e.is_directory)
        .count();

    let extracted = reader.extract_all(&archive).unwrap();
    assert!(extracted.join("photos/a.jpg").is_file());
    assert!(extracted.join("photos/nested/b.png").is_file());
    assert_eq!(
        std::fs::read(extracted.join("notes.txt")).unwrap(),
        b"some notes"
    );

    // Listing and a classified walk of the extraction agree on the file
    // count, directories excluded on both sides.
    let found = classify(&extracted);
    assert_eq!(found.total(), listed_files);

    reader.cleanup();
    assert!(!extracted.exists());
}

#[test]
fn dropping_the_reader_cleans_up_scratch_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("tree.zip");
    ZipBuilder::new().stored("a.txt", b"x").write_to(&archive);

    let extracted: PathBuf;
    {
        let mut reader = ArchiveReader::with_temp_root(dir.path());
        extracted = reader.extract_all(&archive).unwrap();
        assert!(extracted.exists());
    }
    assert!(!extracted.exists());
}

#[test]
fn traversal_entry_names_are_rejected_and_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("evil.zip");
    ZipBuilder::new()
        .stored("ok.txt", b"fine")
        .stored("../escape.txt", b"nope")
        .write_to(&archive);

    let leftover: PathBuf;
    {
        let mut reader = ArchiveReader::with_temp_root(dir.path());
        let err = reader.extract_all(&archive).unwrap_err();
        assert!(matches!(err, ZipreelError::CorruptArchive(_)));

        // The partially filled scratch dir is still registered.
        let scratch: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        assert_eq!(scratch.len(), 1);
        leftover = scratch.into_iter().next().unwrap();
    }
    assert!(!leftover.exists());
    assert!(!dir.path().join("escape.txt").exists());
}

#[test]
fn concurrent_readers_get_distinct_scratch_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("tree.zip");
    ZipBuilder::new().stored("a.txt", b"x").write_to(&archive);

    let mut first = ArchiveReader::with_temp_root(dir.path());
    let mut second = ArchiveReader::with_temp_root(dir.path());
    let a = first.extract_all(&archive).unwrap();
    let b = second.extract_all(&archive).unwrap();
    assert_ne!(a, b);
}
