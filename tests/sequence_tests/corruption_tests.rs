//! Tests for damaged sequence files
//!
//! These tests verify:
//! - A truncated file yields a prefix of its records, never a panic
//! - Flipped bytes surface as framing errors
//! - Foreign sync tokens, bad magic and bad versions are diagnosed

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seqfile::storage::sequence::{
    CompressionType, Header, RawSequenceReader, SequenceReader, SequenceWriter, WriterOptions, SYNC_SIZE,
};
use seqfile::writable::{IntWritable, Text};
use seqfile::{Config, SeqFileError, StorageContext};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_seq() -> (TempDir, PathBuf, StorageContext) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("damaged.seq");
    let ctx = StorageContext::local(Config::default()).unwrap();
    (temp_dir, path, ctx)
}

fn write_file(ctx: &StorageContext, path: &Path, count: i32, options: WriterOptions) {
    let mut writer = SequenceWriter::<IntWritable, Text>::create(ctx, path, options).unwrap();
    for i in 0..count {
        writer
            .append(&IntWritable::new(i), &Text::from(format!("record number {}", i)))
            .unwrap();
    }
    writer.close().unwrap();
}

/// Read until the end or the first error; returns the keys read and the error
fn read_until_failure(ctx: &StorageContext, path: &Path) -> (Vec<i32>, Option<SeqFileError>) {
    let mut reader = match SequenceReader::<IntWritable, Text>::open(ctx, path) {
        Ok(reader) => reader,
        Err(e) => return (Vec::new(), Some(e)),
    };
    let mut key = IntWritable::default();
    let mut value = Text::new();
    let mut keys = Vec::new();
    loop {
        match reader.next(&mut key, &mut value) {
            Ok(true) => keys.push(key.get()),
            Ok(false) => return (keys, None),
            Err(e) => return (keys, Some(e)),
        }
    }
}

fn truncate(path: &Path, len: u64) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(len).unwrap();
}

fn marker_offsets(path: &Path, header: &Header) -> Vec<usize> {
    let bytes = std::fs::read(path).unwrap();
    let mut pattern = (-1i32).to_be_bytes().to_vec();
    pattern.extend_from_slice(&header.sync);
    bytes
        .windows(SYNC_SIZE)
        .enumerate()
        .filter(|(_, w)| *w == pattern.as_slice())
        .map(|(i, _)| i)
        .collect()
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncation_yields_prefix() {
    let modes = [
        WriterOptions::new().sync_interval(150),
        WriterOptions::new().compression(CompressionType::Record),
        WriterOptions::new().compression(CompressionType::Block).block_size(200),
    ];
    let mut rng = StdRng::seed_from_u64(2024);

    for options in modes {
        let (_temp, path, ctx) = setup_temp_seq();
        write_file(&ctx, &path, 300, options.clone());
        let original = std::fs::read(&path).unwrap();

        let mut cuts: Vec<u64> = (0..60).map(|_| rng.gen_range(0..original.len() as u64)).collect();
        cuts.extend([0, 3, 4, 5, original.len() as u64 - 1]);

        for cut in cuts {
            std::fs::write(&path, &original).unwrap();
            truncate(&path, cut);

            let (keys, error) = read_until_failure(&ctx, &path);
            let expected: Vec<i32> = (0..keys.len() as i32).collect();
            assert_eq!(keys, expected, "{:?} cut at {}", options.compression, cut);
            if let Some(e) = error {
                assert!(e.is_framing(), "{:?} cut at {}: {}", options.compression, cut, e);
            }
        }
    }
}

#[test]
fn test_truncated_tail_is_clean_end() {
    let (_temp, path, ctx) = setup_temp_seq();
    write_file(&ctx, &path, 50, WriterOptions::new());
    let len = std::fs::metadata(&path).unwrap().len();
    truncate(&path, len - 5);

    let (keys, error) = read_until_failure(&ctx, &path);
    assert!(error.is_none());
    assert_eq!(keys.len(), 49);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_random_byte_flips_never_panic() {
    let mut rng = StdRng::seed_from_u64(99);
    for compression in [CompressionType::None, CompressionType::Record, CompressionType::Block] {
        let (_temp, path, ctx) = setup_temp_seq();
        write_file(&ctx, &path, 200, WriterOptions::new().compression(compression).block_size(300));
        let original = std::fs::read(&path).unwrap();

        for _ in 0..50 {
            let mut damaged = original.clone();
            let at = rng.gen_range(0..damaged.len());
            damaged[at] ^= 1 << rng.gen_range(0..8);
            std::fs::write(&path, &damaged).unwrap();

            // Any outcome is acceptable except a panic
            let _ = read_until_failure(&ctx, &path);
        }
    }
}

#[test]
fn test_negative_record_length() {
    let (_temp, path, ctx) = setup_temp_seq();
    write_file(&ctx, &path, 5, WriterOptions::new().sync_interval(0));
    let header_end = RawSequenceReader::open(&ctx, &path).unwrap().header_end() as usize;

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[header_end..header_end + 4].copy_from_slice(&(-7i32).to_be_bytes());
    std::fs::write(&path, &bytes).unwrap();

    let (keys, error) = read_until_failure(&ctx, &path);
    assert!(keys.is_empty());
    match error {
        Some(SeqFileError::Framing { offset, .. }) => assert_eq!(offset, header_end as u64),
        other => panic!("expected framing error, got {:?}", other),
    }
}

#[test]
fn test_key_length_beyond_record() {
    let (_temp, path, ctx) = setup_temp_seq();
    write_file(&ctx, &path, 5, WriterOptions::new().sync_interval(0));
    let header_end = RawSequenceReader::open(&ctx, &path).unwrap().header_end() as usize;

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[header_end + 4..header_end + 8].copy_from_slice(&1000i32.to_be_bytes());
    std::fs::write(&path, &bytes).unwrap();

    let (_, error) = read_until_failure(&ctx, &path);
    assert!(matches!(error, Some(SeqFileError::Framing { .. })));
}

#[test]
fn test_foreign_sync_token() {
    for compression in [CompressionType::None, CompressionType::Block] {
        let (_temp, path, ctx) = setup_temp_seq();
        write_file(
            &ctx,
            &path,
            400,
            WriterOptions::new().compression(compression).sync_interval(200).block_size(400),
        );
        let header = Header::read_from(&ctx, &path).unwrap();
        let markers = marker_offsets(&path, &header);
        assert!(markers.len() > 2);

        let victim = markers[1];
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[victim + 4 + 3] ^= 0x55;
        std::fs::write(&path, &bytes).unwrap();

        let (keys, error) = read_until_failure(&ctx, &path);
        assert!(!keys.is_empty());
        match error {
            Some(SeqFileError::SyncMismatch { offset, .. }) => assert_eq!(offset, victim as u64),
            other => panic!("expected sync mismatch, got {:?}", other),
        }
    }
}

#[test]
fn test_bad_magic_and_version() {
    let (_temp, path, ctx) = setup_temp_seq();
    write_file(&ctx, &path, 3, WriterOptions::new());
    let original = std::fs::read(&path).unwrap();

    let mut bad_magic = original.clone();
    bad_magic[0] = b'X';
    std::fs::write(&path, &bad_magic).unwrap();
    assert!(matches!(
        RawSequenceReader::open(&ctx, &path),
        Err(SeqFileError::NotAContainer { .. })
    ));

    let mut bad_version = original.clone();
    bad_version[4] = 9;
    std::fs::write(&path, &bad_version).unwrap();
    assert!(matches!(
        RawSequenceReader::open(&ctx, &path),
        Err(SeqFileError::VersionMismatch { found: 9, .. })
    ));

    std::fs::write(&path, b"").unwrap();
    assert!(matches!(
        RawSequenceReader::open(&ctx, &path),
        Err(SeqFileError::NotAContainer { .. })
    ));
}
