//! Tests for sequence file writing and reading
//!
//! These tests verify:
//! - Round trips for 0, 1 and 1000 records in every compression mode
//! - Header contents (types, codec, metadata)
//! - Sync marker placement and exact seeks to writer positions
//! - Type checks at open and writer misuse

use std::path::{Path, PathBuf};

use seqfile::storage::sequence::{
    CompressionType, Header, Metadata, RawSequenceReader, RawSequenceWriter, SequenceReader, SequenceWriter,
    WriterOptions, SYNC_SIZE,
};
use seqfile::writable::{BytesWritable, IntWritable, LongWritable, Text};
use seqfile::{Config, SeqFileError, StorageContext};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_seq() -> (TempDir, PathBuf, StorageContext) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.seq");
    let ctx = StorageContext::local(Config::default()).unwrap();
    (temp_dir, path, ctx)
}

fn value_for(i: i32) -> Text {
    Text::from(format!("value-{}-{}", i, "x".repeat((i % 17) as usize)))
}

fn write_records(ctx: &StorageContext, path: &Path, count: i32, options: WriterOptions) -> Vec<u64> {
    let mut writer = SequenceWriter::<IntWritable, Text>::create(ctx, path, options).unwrap();
    let mut positions = Vec::new();
    for i in 0..count {
        positions.push(writer.position());
        writer.append(&IntWritable::new(i), &value_for(i)).unwrap();
    }
    assert_eq!(writer.record_count(), count as u64);
    writer.close().unwrap();
    positions
}

fn read_all(ctx: &StorageContext, path: &Path) -> Vec<(i32, String)> {
    let mut reader = SequenceReader::<IntWritable, Text>::open(ctx, path).unwrap();
    let mut key = IntWritable::default();
    let mut value = Text::new();
    let mut records = Vec::new();
    while reader.next(&mut key, &mut value).unwrap() {
        records.push((key.get(), value.to_string()));
    }
    records
}

fn all_modes() -> Vec<WriterOptions> {
    vec![
        WriterOptions::new(),
        WriterOptions::new().compression(CompressionType::Record),
        WriterOptions::new().compression(CompressionType::Record).codec("snappy"),
        WriterOptions::new().compression(CompressionType::Block),
        WriterOptions::new().compression(CompressionType::Block).codec("snappy"),
        WriterOptions::new().compression(CompressionType::Block).block_size(256),
    ]
}

fn count_markers(path: &Path, header: &Header) -> usize {
    let bytes = std::fs::read(path).unwrap();
    let mut pattern = (-1i32).to_be_bytes().to_vec();
    pattern.extend_from_slice(&header.sync);
    bytes.windows(SYNC_SIZE).filter(|w| *w == pattern.as_slice()).count()
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip_every_mode() {
    for options in all_modes() {
        for count in [0, 1, 1000] {
            let (_temp, path, ctx) = setup_temp_seq();
            write_records(&ctx, &path, count, options.clone());

            let records = read_all(&ctx, &path);
            assert_eq!(records.len(), count as usize, "{:?}", options);
            for (i, (key, value)) in records.iter().enumerate() {
                assert_eq!(*key, i as i32);
                assert_eq!(*value, value_for(i as i32).to_string());
            }
        }
    }
}

#[test]
fn test_records_iterator() {
    let (_temp, path, ctx) = setup_temp_seq();
    write_records(&ctx, &path, 10, WriterOptions::new().compression(CompressionType::Block));

    let mut reader = SequenceReader::<IntWritable, Text>::open(&ctx, &path).unwrap();
    let records: Vec<(IntWritable, Text)> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 10);
    assert_eq!(records[9].0.get(), 9);
    assert_eq!(records[9].1, value_for(9));
}

#[test]
fn test_next_key_then_value() {
    let (_temp, path, ctx) = setup_temp_seq();
    write_records(&ctx, &path, 20, WriterOptions::new().compression(CompressionType::Record));

    let mut reader = SequenceReader::<IntWritable, Text>::open(&ctx, &path).unwrap();
    let mut key = IntWritable::default();
    let mut value = Text::new();
    let mut decoded = 0;
    while reader.next_key(&mut key).unwrap() {
        if key.get() % 5 == 0 {
            reader.current_value(&mut value).unwrap();
            assert_eq!(value, value_for(key.get()));
            decoded += 1;
        }
    }
    assert_eq!(decoded, 4);
}

#[test]
fn test_raw_writer_and_reader() {
    let (_temp, path, ctx) = setup_temp_seq();
    let mut writer = RawSequenceWriter::create(&ctx, &path, "custom.Key", "custom.Value", WriterOptions::new()).unwrap();
    writer.append_raw(b"k1", b"first").unwrap();
    writer.append_raw(b"", b"").unwrap();
    writer.append_raw(b"k3", &[0xff; 300]).unwrap();
    writer.close().unwrap();

    let mut reader = RawSequenceReader::open(&ctx, &path).unwrap();
    assert_eq!(reader.header().key_type, "custom.Key");

    assert!(reader.next_record().unwrap());
    assert_eq!(reader.record().unwrap(), (&b"k1"[..], &b"first"[..]));
    assert!(reader.next_record().unwrap());
    assert_eq!(reader.record().unwrap(), (&b""[..], &b""[..]));
    assert!(reader.next_record().unwrap());
    assert_eq!(reader.value_bytes().unwrap().len(), 300);
    assert!(!reader.next_record().unwrap());
    assert!(!reader.next_record().unwrap());
}

#[test]
fn test_large_values() {
    let (_temp, path, ctx) = setup_temp_seq();
    let big = BytesWritable::new(vec![7u8; 3 * 1024 * 1024]);

    let mut writer = SequenceWriter::<LongWritable, BytesWritable>::create(
        &ctx,
        &path,
        WriterOptions::new().compression(CompressionType::Block),
    )
    .unwrap();
    writer.append(&LongWritable::new(1), &big).unwrap();
    writer.append(&LongWritable::new(2), &BytesWritable::default()).unwrap();
    writer.close().unwrap();

    let mut reader = SequenceReader::<LongWritable, BytesWritable>::open(&ctx, &path).unwrap();
    let mut key = LongWritable::default();
    let mut value = BytesWritable::default();
    assert!(reader.next(&mut key, &mut value).unwrap());
    assert_eq!(value, big);
    assert!(reader.next(&mut key, &mut value).unwrap());
    assert!(value.is_empty());
}

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_header_contents() {
    let (_temp, path, ctx) = setup_temp_seq();
    let mut metadata = Metadata::new();
    metadata.set("source", "unit-test").set("author", "nobody");

    let options = WriterOptions::new()
        .compression(CompressionType::Block)
        .codec("snappy")
        .metadata(metadata.clone());
    write_records(&ctx, &path, 3, options);

    let header = Header::read_from(&ctx, &path).unwrap();
    assert_eq!(header.key_type, "IntWritable");
    assert_eq!(header.value_type, "Text");
    assert_eq!(header.compression, CompressionType::Block);
    assert_eq!(header.codec.as_deref(), Some("snappy"));
    assert_eq!(header.metadata, metadata);
    let names: Vec<&str> = header.metadata.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["author", "source"]);
}

#[test]
fn test_sync_tokens_differ_between_files() {
    let (temp, path, ctx) = setup_temp_seq();
    let other = temp.path().join("other.seq");
    write_records(&ctx, &path, 1, WriterOptions::new());
    write_records(&ctx, &other, 1, WriterOptions::new());

    let a = Header::read_from(&ctx, &path).unwrap();
    let b = Header::read_from(&ctx, &other).unwrap();
    assert_ne!(a.sync, b.sync);
}

#[test]
fn test_default_codec_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("snappy.seq");
    let ctx = StorageContext::local(Config::builder().default_codec("snappy").build()).unwrap();

    write_records(&ctx, &path, 5, WriterOptions::new().compression(CompressionType::Record));
    assert_eq!(Header::read_from(&ctx, &path).unwrap().codec.as_deref(), Some("snappy"));
    assert_eq!(read_all(&ctx, &path).len(), 5);
}

// =============================================================================
// Sync Marker and Seek Tests
// =============================================================================

#[test]
fn test_sync_markers_follow_interval() {
    let (temp, path, ctx) = setup_temp_seq();
    write_records(&ctx, &path, 500, WriterOptions::new().sync_interval(200));
    let header = Header::read_from(&ctx, &path).unwrap();
    let len = std::fs::metadata(&path).unwrap().len() as usize;
    let markers = count_markers(&path, &header);
    assert!(markers >= len / 400, "{} markers in {} bytes", markers, len);

    let unsynced = temp.path().join("unsynced.seq");
    write_records(&ctx, &unsynced, 500, WriterOptions::new().sync_interval(0));
    let header = Header::read_from(&ctx, &unsynced).unwrap();
    assert_eq!(count_markers(&unsynced, &header), 0);
}

#[test]
fn test_every_block_starts_with_marker() {
    let (_temp, path, ctx) = setup_temp_seq();
    let options = WriterOptions::new().compression(CompressionType::Block).block_size(100);
    write_records(&ctx, &path, 300, options);

    let header = Header::read_from(&ctx, &path).unwrap();
    let mut reader = RawSequenceReader::open(&ctx, &path).unwrap();
    let mut block_starts = 0;
    while reader.next_record().unwrap() {
        if reader.sync_seen() {
            block_starts += 1;
        }
    }
    assert!(block_starts > 1);
    assert_eq!(count_markers(&path, &header), block_starts);
}

#[test]
fn test_explicit_sync() {
    let (_temp, path, ctx) = setup_temp_seq();
    let mut writer =
        SequenceWriter::<IntWritable, Text>::create(&ctx, &path, WriterOptions::new().sync_interval(0)).unwrap();
    writer.append(&IntWritable::new(1), &value_for(1)).unwrap();
    writer.sync().unwrap();
    writer.sync().unwrap();
    writer.append(&IntWritable::new(2), &value_for(2)).unwrap();
    writer.close().unwrap();

    let header = Header::read_from(&ctx, &path).unwrap();
    assert_eq!(count_markers(&path, &header), 1);
    assert_eq!(read_all(&ctx, &path).len(), 2);
}

#[test]
fn test_seek_to_writer_positions() {
    for compression in [CompressionType::None, CompressionType::Record] {
        let (_temp, path, ctx) = setup_temp_seq();
        let options = WriterOptions::new().compression(compression).sync_interval(100);
        let positions = write_records(&ctx, &path, 200, options);

        let mut reader = SequenceReader::<IntWritable, Text>::open(&ctx, &path).unwrap();
        let mut key = IntWritable::default();
        let mut value = Text::new();
        for i in [150usize, 3, 0, 199, 77] {
            reader.seek(positions[i]).unwrap();
            assert!(reader.next(&mut key, &mut value).unwrap());
            assert_eq!(key.get(), i as i32, "{}", compression);
            assert_eq!(value, value_for(i as i32));
        }
    }
}

#[test]
fn test_seek_to_block_positions() {
    let (_temp, path, ctx) = setup_temp_seq();
    let options = WriterOptions::new().compression(CompressionType::Block).block_size(128);
    let positions = write_records(&ctx, &path, 200, options);

    let mut reader = SequenceReader::<IntWritable, Text>::open(&ctx, &path).unwrap();
    let mut key = IntWritable::default();
    let mut value = Text::new();
    for i in [0usize, 57, 199] {
        // A block position leads to the start of the record's block
        reader.seek(positions[i]).unwrap();
        let mut found = false;
        while reader.next(&mut key, &mut value).unwrap() {
            if key.get() == i as i32 {
                found = true;
                break;
            }
            assert!(key.get() < i as i32);
        }
        assert!(found, "record {} not reached", i);
    }
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_type_mismatch_at_open() {
    let (_temp, path, ctx) = setup_temp_seq();
    write_records(&ctx, &path, 2, WriterOptions::new());

    match SequenceReader::<LongWritable, Text>::open(&ctx, &path) {
        Err(SeqFileError::TypeMismatch { expected, found, .. }) => {
            assert_eq!(expected, "LongWritable");
            assert_eq!(found, "IntWritable");
        }
        other => panic!("expected type mismatch, got {:?}", other.map(|_| ())),
    }
    assert!(matches!(
        SequenceReader::<IntWritable, IntWritable>::open(&ctx, &path),
        Err(SeqFileError::TypeMismatch { .. })
    ));
}

#[test]
fn test_create_refuses_existing_file() {
    let (_temp, path, ctx) = setup_temp_seq();
    write_records(&ctx, &path, 1, WriterOptions::new());

    assert!(matches!(
        SequenceWriter::<IntWritable, Text>::create(&ctx, &path, WriterOptions::new()),
        Err(SeqFileError::Io(_))
    ));
    write_records(&ctx, &path, 4, WriterOptions::new().overwrite(true));
    assert_eq!(read_all(&ctx, &path).len(), 4);
}

#[test]
fn test_unknown_codec() {
    let (_temp, path, ctx) = setup_temp_seq();
    let options = WriterOptions::new().compression(CompressionType::Block).codec("lzo");
    assert!(matches!(
        SequenceWriter::<IntWritable, Text>::create(&ctx, &path, options),
        Err(SeqFileError::UnknownCodec(_))
    ));
}

#[test]
fn test_append_after_close() {
    let (_temp, path, ctx) = setup_temp_seq();
    let mut writer = SequenceWriter::<IntWritable, Text>::create(&ctx, &path, WriterOptions::new()).unwrap();
    writer.close().unwrap();
    writer.close().unwrap();
    assert!(matches!(
        writer.append(&IntWritable::new(1), &Text::new()),
        Err(SeqFileError::InvalidArgument(_))
    ));
}

#[test]
fn test_drop_without_close_flushes_block() {
    let (_temp, path, ctx) = setup_temp_seq();
    {
        let mut writer = SequenceWriter::<IntWritable, Text>::create(
            &ctx,
            &path,
            WriterOptions::new().compression(CompressionType::Block),
        )
        .unwrap();
        for i in 0..5 {
            writer.append(&IntWritable::new(i), &value_for(i)).unwrap();
        }
    }
    assert_eq!(read_all(&ctx, &path).len(), 5);
}
