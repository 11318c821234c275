//! Tests for raw comparators
//!
//! These tests verify:
//! - Built-in comparators agree with decoded ordering on random values
//! - Overriding a comparator changes how files are sorted and searched
//! - Types without a registered comparator fall back to decoding

use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seqfile::comparator::{compare_bytes, compare_bytes_bytewise, ComparatorRegistry, RawComparator};
use seqfile::storage::map::{MapFileReader, MapFileWriter};
use seqfile::storage::sequence::{sort_file, SequenceReader, SequenceWriter, SortOptions, WriterOptions};
use seqfile::writable::{
    from_bytes, to_bytes, BytesWritable, DoubleWritable, FloatWritable, IntWritable, LongWritable, ShortWritable, Text,
    VIntWritable, VLongWritable, Writable,
};
use seqfile::{Config, Result, StorageContext};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// Compare every pair through the registry and through `Ord`
fn assert_matches_ord<T>(values: &[T])
where
    T: Writable + Ord + Default + Debug + 'static,
{
    let registry = ComparatorRegistry::new();
    let comparator = registry.get::<T>();
    let encoded: Vec<Vec<u8>> = values.iter().map(|v| to_bytes(v).unwrap()).collect();

    for (a, ea) in values.iter().zip(&encoded) {
        for (b, eb) in values.iter().zip(&encoded) {
            assert_eq!(
                comparator.compare(ea, eb).unwrap(),
                a.cmp(b),
                "{}: {:?} vs {:?}",
                T::type_name(),
                a,
                b
            );
        }
    }
}

fn random_text(rng: &mut StdRng) -> String {
    let len = rng.gen_range(0..12);
    (0..len)
        .map(|_| match rng.gen_range(0..4) {
            0 => 'é',
            1 => '中',
            _ => rng.gen_range(b'a'..=b'e') as char,
        })
        .collect()
}

/// Orders encoded ints from largest to smallest
struct DescendingInt;

impl RawComparator for DescendingInt {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        let x: IntWritable = from_bytes(a)?;
        let y: IntWritable = from_bytes(b)?;
        Ok(y.cmp(&x))
    }
}

fn descending_context() -> StorageContext {
    let ctx = StorageContext::local(Config::builder().index_interval(8).build()).unwrap();
    ctx.comparators.define_for::<IntWritable>(Arc::new(DescendingInt));
    ctx
}

// =============================================================================
// Built-in Comparator Tests
// =============================================================================

#[test]
fn test_integer_comparators_match_ord() {
    let mut rng = StdRng::seed_from_u64(5);

    let mut shorts: Vec<ShortWritable> = (0..40).map(|_| ShortWritable::new(rng.gen())).collect();
    shorts.extend([i16::MIN, -1, 0, 1, i16::MAX].map(ShortWritable::new));
    assert_matches_ord(&shorts);

    let mut ints: Vec<IntWritable> = (0..40).map(|_| IntWritable::new(rng.gen())).collect();
    ints.extend([i32::MIN, -1, 0, 1, i32::MAX].map(IntWritable::new));
    assert_matches_ord(&ints);

    let mut longs: Vec<LongWritable> = (0..40).map(|_| LongWritable::new(rng.gen())).collect();
    longs.extend([i64::MIN, -1, 0, 1, i64::MAX].map(LongWritable::new));
    assert_matches_ord(&longs);
}

#[test]
fn test_variable_length_comparators_match_ord() {
    let mut rng = StdRng::seed_from_u64(6);

    // Mix magnitudes so encodings of every length appear
    let mut vlongs: Vec<VLongWritable> = (0..60)
        .map(|_| {
            let bits = rng.gen_range(0..63);
            let magnitude = rng.gen_range(0..=(1i64 << bits));
            VLongWritable::new(if rng.gen() { magnitude } else { -magnitude - 1 })
        })
        .collect();
    vlongs.extend([i64::MIN, -113, -112, 0, 127, 128, i64::MAX].map(VLongWritable::new));
    assert_matches_ord(&vlongs);

    let vints: Vec<VIntWritable> = (0..60).map(|_| VIntWritable::new(rng.gen())).collect();
    assert_matches_ord(&vints);
}

#[test]
fn test_float_comparators_match_ord() {
    let mut rng = StdRng::seed_from_u64(8);

    let mut floats: Vec<FloatWritable> = (0..40).map(|_| FloatWritable::new(rng.gen_range(-1e6..1e6))).collect();
    floats.extend([f32::MIN, f32::MAX, 0.0, f32::INFINITY, f32::NEG_INFINITY].map(FloatWritable::new));
    assert_matches_ord(&floats);

    let mut doubles: Vec<DoubleWritable> = (0..40).map(|_| DoubleWritable::new(rng.gen_range(-1e12..1e12))).collect();
    doubles.extend([f64::MIN, f64::MAX, 0.0, f64::INFINITY, f64::NEG_INFINITY].map(DoubleWritable::new));
    assert_matches_ord(&doubles);
}

#[test]
fn test_byte_comparators_match_ord() {
    let mut rng = StdRng::seed_from_u64(9);

    let texts: Vec<Text> = (0..60).map(|_| Text::from(random_text(&mut rng))).collect();
    assert_matches_ord(&texts);

    let blobs: Vec<BytesWritable> = (0..60)
        .map(|_| {
            let len = rng.gen_range(0..20);
            BytesWritable::new((0..len).map(|_| rng.gen_range(0..4u8) * 85).collect())
        })
        .collect();
    assert_matches_ord(&blobs);
}

#[test]
fn test_word_compare_matches_bytewise() {
    let mut rng = StdRng::seed_from_u64(10);
    for _ in 0..500 {
        let len = rng.gen_range(0..64);
        let a: Vec<u8> = (0..len).map(|_| rng.gen_range(0..3u8)).collect();
        let mut b = a.clone();
        match rng.gen_range(0..3) {
            0 => b.truncate(rng.gen_range(0..=len)),
            1 if len > 0 => {
                let at = rng.gen_range(0..len);
                b[at] = rng.gen();
            }
            _ => b.push(rng.gen()),
        }
        assert_eq!(compare_bytes(&a, &b), compare_bytes_bytewise(&a, &b), "{:?} vs {:?}", a, b);
        assert_eq!(compare_bytes(&a, &b), a.cmp(&b));
    }
}

// =============================================================================
// Custom Comparator Tests
// =============================================================================

#[test]
fn test_override_drives_sort_order() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = descending_context();
    let input = temp_dir.path().join("input.seq");
    let output = temp_dir.path().join("sorted.seq");

    let mut rng = StdRng::seed_from_u64(21);
    let mut keys: Vec<i32> = (0..500).map(|_| rng.gen_range(0..1000)).collect();
    let mut writer = SequenceWriter::<IntWritable, Text>::create(&ctx, &input, WriterOptions::new()).unwrap();
    for key in &keys {
        writer.append(&IntWritable::new(*key), &Text::from("v")).unwrap();
    }
    writer.close().unwrap();

    sort_file::<IntWritable, Text>(&ctx, &input, &output, SortOptions::default()).unwrap();

    let mut reader = SequenceReader::<IntWritable, Text>::open(&ctx, &output).unwrap();
    let sorted: Vec<i32> = reader.records().map(|r| r.unwrap().0.get()).collect();
    keys.sort_by(|a, b| b.cmp(a));
    assert_eq!(sorted, keys);
}

#[test]
fn test_override_drives_map_lookups() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = descending_context();
    let dir = temp_dir.path().join("map");

    // Keys 998, 996, ..., 0: ascending under the descending comparator
    let mut writer = MapFileWriter::<IntWritable, Text>::create(&ctx, &dir, WriterOptions::new()).unwrap();
    for key in (0..500).rev().map(|i| i * 2) {
        writer.append(&IntWritable::new(key), &Text::from(key.to_string())).unwrap();
    }
    writer.close().unwrap();

    let mut reader = MapFileReader::<IntWritable, Text>::open(&ctx, &dir).unwrap();
    let mut value = Text::new();
    for key in (0..1000).step_by(3) {
        let found = reader.get(&IntWritable::new(key), &mut value).unwrap();
        assert_eq!(found, key % 2 == 0, "key {}", key);
        if found {
            assert_eq!(value, Text::from(key.to_string()));
        }
    }

    // "After" in comparator order means numerically smaller
    let closest = reader.get_closest(&IntWritable::new(501), &mut value, false).unwrap();
    assert_eq!(closest, Some(IntWritable::new(500)));
}

#[test]
fn test_unregistered_type_falls_back_to_decoding() {
    let registry = ComparatorRegistry::empty();
    assert!(registry.lookup(&IntWritable::type_name()).is_none());

    let comparator = registry.get::<IntWritable>();
    let a = to_bytes(&IntWritable::new(-3)).unwrap();
    let b = to_bytes(&IntWritable::new(2)).unwrap();
    assert_eq!(comparator.compare(&a, &b).unwrap(), Ordering::Less);

    // Operands that are not one whole value are an error, not an ordering
    assert!(comparator.compare(&a[..2], &b).is_err());
}
