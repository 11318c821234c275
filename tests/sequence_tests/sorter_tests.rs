//! Tests for the external sorter
//!
//! These tests verify:
//! - In-memory and multi-pass sorts order records by raw key
//! - Records with equal keys keep their input order
//! - Merging sorted inputs and rejecting inputs of different types
//! - Intermediate runs are cleaned up

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seqfile::storage::sequence::{
    sort_file, CompressionType, SequenceReader, SequenceWriter, SortOptions, Sorter, WriterOptions,
};
use seqfile::writable::{IntWritable, LongWritable, Text};
use seqfile::{Config, SeqFileError, StorageContext};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_dir() -> (TempDir, PathBuf, StorageContext) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    let ctx = StorageContext::local(Config::default()).unwrap();
    (temp_dir, path, ctx)
}

/// Write `keys` in order; each value records the key's input position
fn write_keys(ctx: &StorageContext, path: &Path, keys: &[i32], options: WriterOptions) {
    let mut writer = SequenceWriter::<IntWritable, Text>::create(ctx, path, options).unwrap();
    for (i, key) in keys.iter().enumerate() {
        writer
            .append(&IntWritable::new(*key), &Text::from(i.to_string()))
            .unwrap();
    }
    writer.close().unwrap();
}

fn read_all(ctx: &StorageContext, path: &Path) -> Vec<(i32, usize)> {
    let mut reader = SequenceReader::<IntWritable, Text>::open(ctx, path).unwrap();
    reader
        .records()
        .map(|record| {
            let (key, value) = record.unwrap();
            (key.get(), value.as_str().unwrap().parse().unwrap())
        })
        .collect()
}

fn random_keys(seed: u64, count: usize, range: i32) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen_range(-range..range)).collect()
}

fn assert_sorted_and_stable(records: &[(i32, usize)]) {
    for pair in records.windows(2) {
        let ((k1, i1), (k2, i2)) = (pair[0], pair[1]);
        assert!(k1 < k2 || (k1 == k2 && i1 < i2), "{:?} then {:?}", pair[0], pair[1]);
    }
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// =============================================================================
// Sort Tests
// =============================================================================

#[test]
fn test_sort_in_memory() {
    let (_temp, dir, ctx) = setup_temp_dir();
    let input = dir.join("input.seq");
    let output = dir.join("sorted.seq");
    let keys = random_keys(11, 1000, 10_000);
    write_keys(&ctx, &input, &keys, WriterOptions::new());

    let count = sort_file::<IntWritable, Text>(&ctx, &input, &output, SortOptions::default()).unwrap();
    assert_eq!(count, 1000);

    let records = read_all(&ctx, &output);
    assert_eq!(records.len(), 1000);
    assert_sorted_and_stable(&records);

    let mut expected = keys.clone();
    expected.sort();
    let sorted: Vec<i32> = records.iter().map(|(k, _)| *k).collect();
    assert_eq!(sorted, expected);
}

#[test]
fn test_sort_multi_pass() {
    let (_temp, dir, ctx) = setup_temp_dir();
    let input = dir.join("input.seq");
    let output = dir.join("sorted.seq");
    // Narrow key range forces many duplicates across runs
    let keys = random_keys(12, 3000, 50);
    write_keys(&ctx, &input, &keys, WriterOptions::new().compression(CompressionType::Block));

    let options = SortOptions {
        memory_budget: 4 * 1024,
        merge_factor: 2,
        output: WriterOptions::new().compression(CompressionType::Record),
        temp_dir: None,
    };
    let count = sort_file::<IntWritable, Text>(&ctx, &input, &output, options).unwrap();
    assert_eq!(count, 3000);

    let records = read_all(&ctx, &output);
    assert_eq!(records.len(), 3000);
    assert_sorted_and_stable(&records);

    let header = SequenceReader::<IntWritable, Text>::open(&ctx, &output).unwrap().header().clone();
    assert_eq!(header.compression, CompressionType::Record);

    // Only the input and output remain
    assert_eq!(dir_entries(&dir), vec!["input.seq".to_string(), "sorted.seq".to_string()]);
}

#[test]
fn test_sort_with_separate_temp_dir() {
    let (_temp, dir, ctx) = setup_temp_dir();
    let scratch = TempDir::new().unwrap();
    let input = dir.join("input.seq");
    let output = dir.join("sorted.seq");
    write_keys(&ctx, &input, &random_keys(13, 500, 1000), WriterOptions::new());

    let options = SortOptions {
        memory_budget: 1024,
        merge_factor: 3,
        temp_dir: Some(scratch.path().to_path_buf()),
        ..SortOptions::default()
    };
    sort_file::<IntWritable, Text>(&ctx, &input, &output, options).unwrap();

    assert_sorted_and_stable(&read_all(&ctx, &output));
    assert!(dir_entries(scratch.path()).is_empty());
}

#[test]
fn test_sort_empty_input() {
    let (_temp, dir, ctx) = setup_temp_dir();
    let input = dir.join("input.seq");
    let output = dir.join("sorted.seq");
    write_keys(&ctx, &input, &[], WriterOptions::new());

    let count = sort_file::<IntWritable, Text>(&ctx, &input, &output, SortOptions::default()).unwrap();
    assert_eq!(count, 0);
    assert!(read_all(&ctx, &output).is_empty());
}

#[test]
fn test_sort_file_checks_types() {
    let (_temp, dir, ctx) = setup_temp_dir();
    let input = dir.join("input.seq");
    let output = dir.join("sorted.seq");
    write_keys(&ctx, &input, &[3, 1, 2], WriterOptions::new());

    let result = sort_file::<LongWritable, Text>(&ctx, &input, &output, SortOptions::default());
    assert!(matches!(result, Err(SeqFileError::TypeMismatch { .. })));
    assert!(!output.exists());
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_merge_sorted_inputs() {
    let (_temp, dir, ctx) = setup_temp_dir();
    let mut inputs = Vec::new();
    for part in 0..5 {
        let path = dir.join(format!("part-{}.seq", part));
        let mut keys = random_keys(100 + part, 200, 300);
        keys.sort();
        write_keys(&ctx, &path, &keys, WriterOptions::new());
        inputs.push(path);
    }
    let output = dir.join("merged.seq");

    let options = SortOptions {
        merge_factor: 2,
        ..SortOptions::default()
    };
    let count = Sorter::for_key::<IntWritable>(&ctx, options).merge(&inputs, &output).unwrap();
    assert_eq!(count, 1000);

    let merged: Vec<i32> = read_all(&ctx, &output).iter().map(|(k, _)| *k).collect();
    let mut expected: Vec<i32> = (0..5).flat_map(|part| random_keys(100 + part, 200, 300)).collect();
    expected.sort();
    assert_eq!(merged, expected);

    // Inputs survive a merge
    for input in &inputs {
        assert!(input.exists());
    }
}

#[test]
fn test_merge_rejects_mixed_types() {
    let (_temp, dir, ctx) = setup_temp_dir();
    let ints = dir.join("ints.seq");
    let longs = dir.join("longs.seq");
    write_keys(&ctx, &ints, &[1, 2, 3], WriterOptions::new());

    let mut writer = SequenceWriter::<LongWritable, Text>::create(&ctx, &longs, WriterOptions::new()).unwrap();
    writer.append(&LongWritable::new(1), &Text::from("one")).unwrap();
    writer.close().unwrap();

    let sorter = Sorter::for_key::<IntWritable>(&ctx, SortOptions::default());
    let result = sorter.merge(&[ints, longs], &dir.join("merged.seq"));
    assert!(matches!(result, Err(SeqFileError::TypeMismatch { .. })));

    assert!(matches!(
        sorter.merge(&[], &dir.join("nothing.seq")),
        Err(SeqFileError::InvalidArgument(_))
    ));
}
