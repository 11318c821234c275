//! seqfile CLI
//!
//! Inspects sequence files and map file directories.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use seqfile::buffer::DataInputBuffer;
use seqfile::storage::bloom::BLOOM_FILE_NAME;
use seqfile::storage::map::{DATA_FILE_NAME, INDEX_FILE_NAME};
use seqfile::storage::sequence::{compute_splits, scan_splits_parallel, RawSequenceReader};
use seqfile::writable::{
    from_bytes, BooleanWritable, ByteWritable, BytesWritable, DoubleWritable, FloatWritable, IntWritable,
    LongWritable, NullWritable, ObjectWritable, ShortWritable, Text, VIntWritable, VLongWritable, Writable,
};
use seqfile::{Config, Result, StorageContext};

/// seqfile CLI
#[derive(Parser, Debug)]
#[command(name = "seqfile-cli")]
#[command(about = "Inspect sequence files and map files")]
#[command(version)]
struct Args {
    /// Configuration property as name=value (repeatable)
    #[arg(short = 'D', long = "property", value_parser = parse_property)]
    properties: Vec<(String, String)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a sequence file's header
    Header {
        /// Sequence file
        file: PathBuf,
    },

    /// Print records
    Dump {
        /// Sequence file
        file: PathBuf,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Count records
    Count {
        /// Sequence file
        file: PathBuf,
    },

    /// Decode every record and check that parallel splits agree
    Verify {
        /// Sequence file
        file: PathBuf,

        /// Number of splits to read concurrently
        #[arg(short, long, default_value = "4")]
        splits: usize,
    },

    /// Print the index of a map file directory
    Index {
        /// Map file directory
        dir: PathBuf,
    },
}

fn parse_property(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .ok_or_else(|| format!("expected name=value, got {:?}", s))
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,seqfile=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let ctx = match Config::from_properties(args.properties).and_then(StorageContext::local) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Commands::Header { file } => print_header(&ctx, &file),
        Commands::Dump { file, limit } => dump(&ctx, &file, limit),
        Commands::Count { file } => count(&ctx, &file).map(|n| println!("{}", n)),
        Commands::Verify { file, splits } => verify(&ctx, &file, splits),
        Commands::Index { dir } => print_index(&ctx, &dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

fn print_header(ctx: &StorageContext, file: &Path) -> Result<()> {
    let reader = RawSequenceReader::open(ctx, file)?;
    let header = reader.header();
    println!("file:        {}", file.display());
    println!("length:      {}", reader.len());
    println!("version:     {}", header.version);
    println!("key type:    {}", header.key_type);
    println!("value type:  {}", header.value_type);
    println!("compression: {}", header.compression);
    if let Some(codec) = &header.codec {
        println!("codec:       {}", codec);
    }
    println!("sync:        {}", hex(&header.sync));
    println!("metadata:    {} entries", header.metadata.len());
    for (name, value) in header.metadata.iter() {
        println!("  {} = {}", name, value);
    }
    Ok(())
}

fn dump(ctx: &StorageContext, file: &Path, limit: Option<u64>) -> Result<()> {
    let mut reader = RawSequenceReader::open(ctx, file)?;
    let key_type = reader.header().key_type.clone();
    let value_type = reader.header().value_type.clone();

    let mut printed = 0u64;
    while limit.map_or(true, |limit| printed < limit) && reader.next_record()? {
        let (key, value) = reader.record()?;
        println!("{}\t{}", render(ctx, &key_type, key)?, render(ctx, &value_type, value)?);
        printed += 1;
    }
    Ok(())
}

fn count(ctx: &StorageContext, file: &Path) -> Result<u64> {
    let mut reader = RawSequenceReader::open(ctx, file)?;
    let mut records = 0;
    while reader.next_record()? {
        records += 1;
    }
    Ok(records)
}

fn verify(ctx: &StorageContext, file: &Path, splits: usize) -> Result<()> {
    let mut reader = RawSequenceReader::open(ctx, file)?;
    let key_type = reader.header().key_type.clone();
    let value_type = reader.header().value_type.clone();

    let mut sequential = 0u64;
    while reader.next_record()? {
        let (key, value) = reader.record()?;
        render(ctx, &key_type, key)?;
        render(ctx, &value_type, value)?;
        sequential += 1;
    }

    let ranges = compute_splits(ctx, file, splits)?;
    let per_split = scan_splits_parallel(ctx, &ranges, |split| {
        let mut n = 0u64;
        while split.next_record()? {
            n += 1;
        }
        Ok(n)
    })?;
    let parallel: u64 = per_split.iter().sum();

    if parallel != sequential {
        return Err(seqfile::SeqFileError::Framing {
            path: file.display().to_string(),
            offset: 0,
            reason: format!("{} records sequentially but {} across splits", sequential, parallel),
        });
    }
    println!("OK: {} records, {} splits {:?}", sequential, ranges.len(), per_split);
    Ok(())
}

fn print_index(ctx: &StorageContext, dir: &Path) -> Result<()> {
    let mut index = RawSequenceReader::open(ctx, &dir.join(INDEX_FILE_NAME))?;
    let data_len = ctx.fs.len(&dir.join(DATA_FILE_NAME))?;
    let key_type = index.header().key_type.clone();

    println!("data:  {} bytes", data_len);
    println!("bloom: {}", if ctx.fs.exists(&dir.join(BLOOM_FILE_NAME)) { "present" } else { "absent" });

    let mut entries = 0u64;
    while index.next_record()? {
        let (key, value) = index.record()?;
        let offset = from_bytes::<LongWritable>(value)?;
        println!("{}\t{}", offset, render(ctx, &key_type, key)?);
        entries += 1;
    }
    println!("{} index entries", entries);
    Ok(())
}

// =============================================================================
// Rendering
// =============================================================================

/// Format an encoded value by its header type name; unknown types as hex
fn render(ctx: &StorageContext, type_name: &str, bytes: &[u8]) -> Result<String> {
    fn show<W: Writable + Default + std::fmt::Display>(bytes: &[u8]) -> Result<String> {
        from_bytes::<W>(bytes).map(|value| value.to_string())
    }

    match type_name {
        "BooleanWritable" => show::<BooleanWritable>(bytes),
        "ByteWritable" => show::<ByteWritable>(bytes),
        "ShortWritable" => show::<ShortWritable>(bytes),
        "IntWritable" => show::<IntWritable>(bytes),
        "LongWritable" => show::<LongWritable>(bytes),
        "FloatWritable" => show::<FloatWritable>(bytes),
        "DoubleWritable" => show::<DoubleWritable>(bytes),
        "VIntWritable" => show::<VIntWritable>(bytes),
        "VLongWritable" => show::<VLongWritable>(bytes),
        "NullWritable" => show::<NullWritable>(bytes),
        "Text" => show::<Text>(bytes),
        "BytesWritable" => show::<BytesWritable>(bytes),
        "ObjectWritable" => {
            let mut value = ObjectWritable::with_registry(ctx.types.clone());
            let mut input = DataInputBuffer::new();
            input.reset_from_slice(bytes);
            value.read_fields(&mut input)?;
            Ok(format!("{:?}", value.get()))
        }
        _ => Ok(hex(bytes)),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
