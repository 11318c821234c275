//! External sort and merge
//!
//! Sorts containers by raw key comparison without decoding records. Input is
//! read into memory up to a budget, each full buffer is sorted and spilled as
//! a run, and runs are merged `merge_factor` at a time until one remains.
//! Records with equal keys keep their input order.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::comparator::RawComparator;
use crate::context::StorageContext;
use crate::error::{Result, SeqFileError};
use crate::writable::{Writable, WritableComparable};

use super::{CompressionType, Header, RawSequenceReader, RawSequenceWriter, WriterOptions};

/// Per-record bookkeeping charged against the memory budget
const RECORD_OVERHEAD: usize = 48;

/// Options for [`Sorter`]
#[derive(Debug, Clone)]
pub struct SortOptions {
    /// Bytes of records held in memory before a run is spilled
    pub memory_budget: usize,
    /// Runs merged at once
    pub merge_factor: usize,
    /// Options for the final output file
    pub output: WriterOptions,
    /// Directory for intermediate runs; defaults to the output's directory
    pub temp_dir: Option<PathBuf>,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            memory_budget: 64 * 1024 * 1024,
            merge_factor: 10,
            output: WriterOptions::default(),
            temp_dir: None,
        }
    }
}

/// Sorts and merges containers by key
pub struct Sorter {
    ctx: StorageContext,
    comparator: Arc<dyn RawComparator>,
    options: SortOptions,
}

impl Sorter {
    pub fn new(ctx: &StorageContext, comparator: Arc<dyn RawComparator>, options: SortOptions) -> Self {
        Self {
            ctx: ctx.clone(),
            comparator,
            options,
        }
    }

    /// Sorter using the registered comparator for `K`
    pub fn for_key<K: WritableComparable + Default + 'static>(ctx: &StorageContext, options: SortOptions) -> Self {
        Self::new(ctx, ctx.comparators.get::<K>(), options)
    }

    /// Sort all records of `inputs` into `output`, returning the record count
    pub fn sort(&self, inputs: &[PathBuf], output: &Path) -> Result<u64> {
        let (key_type, value_type) = self.common_types(inputs)?;
        let temp_dir = self.temp_dir(output);
        let budget = self.options.memory_budget.max(1);

        let mut runs: Vec<PathBuf> = Vec::new();
        let mut buffer: Vec<(Bytes, Bytes)> = Vec::new();
        let mut buffered = 0usize;

        for input in inputs {
            let mut reader = RawSequenceReader::open(&self.ctx, input)?;
            while reader.next_record()? {
                let (key, value) = reader.record()?;
                buffered += key.len() + value.len() + RECORD_OVERHEAD;
                buffer.push((Bytes::copy_from_slice(key), Bytes::copy_from_slice(value)));
                if buffered >= budget {
                    let run = self.temp_path(&temp_dir, output, 0, runs.len());
                    self.write_run(&mut buffer, &run, &key_type, &value_type, run_options())?;
                    runs.push(run);
                    buffered = 0;
                }
            }
        }

        if runs.is_empty() {
            // Everything fit in memory
            let count = buffer.len() as u64;
            self.write_run(&mut buffer, output, &key_type, &value_type, self.options.output.clone())?;
            debug!(output = %output.display(), records = count, "Sorted in memory");
            return Ok(count);
        }

        if !buffer.is_empty() {
            let run = self.temp_path(&temp_dir, output, 0, runs.len());
            self.write_run(&mut buffer, &run, &key_type, &value_type, run_options())?;
            runs.push(run);
        }

        debug!(output = %output.display(), runs = runs.len(), "Merging sorted runs");
        let result = self.merge_runs(runs.clone(), &temp_dir, output, &key_type, &value_type);
        self.remove_all(&runs);
        result
    }

    /// Merge already-sorted `inputs` into `output`, returning the record count
    pub fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<u64> {
        let (key_type, value_type) = self.common_types(inputs)?;
        let temp_dir = self.temp_dir(output);
        self.merge_runs(inputs.to_vec(), &temp_dir, output, &key_type, &value_type)
    }

    /// Merge in passes of `merge_factor` until one output remains
    fn merge_runs(
        &self,
        mut runs: Vec<PathBuf>,
        temp_dir: &Path,
        output: &Path,
        key_type: &str,
        value_type: &str,
    ) -> Result<u64> {
        let factor = self.options.merge_factor.max(2);
        let mut pass = 1;
        let mut intermediates: Vec<PathBuf> = Vec::new();

        let result = (|| {
            while runs.len() > factor {
                let mut next = Vec::new();
                for (i, group) in runs.chunks(factor).enumerate() {
                    let merged = self.temp_path(temp_dir, output, pass, i);
                    self.merge_group(group, &merged, key_type, value_type, run_options())?;
                    intermediates.push(merged.clone());
                    next.push(merged);
                }
                runs = next;
                pass += 1;
            }
            self.merge_group(&runs, output, key_type, value_type, self.options.output.clone())
        })();

        self.remove_all(&intermediates);
        result
    }

    /// K-way merge; ties go to the earliest input
    fn merge_group(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        key_type: &str,
        value_type: &str,
        options: WriterOptions,
    ) -> Result<u64> {
        let mut readers = inputs
            .iter()
            .map(|path| RawSequenceReader::open(&self.ctx, path))
            .collect::<Result<Vec<_>>>()?;
        let mut live = readers
            .iter_mut()
            .map(|reader| reader.next_record())
            .collect::<Result<Vec<bool>>>()?;

        let mut writer = RawSequenceWriter::create(&self.ctx, output, key_type, value_type, options)?;
        loop {
            let mut best: Option<usize> = None;
            for i in 0..readers.len() {
                if !live[i] {
                    continue;
                }
                best = match best {
                    Some(b) if self.comparator.compare(readers[i].key_bytes(), readers[b].key_bytes())?
                        != Ordering::Less =>
                    {
                        Some(b)
                    }
                    _ => Some(i),
                };
            }
            let Some(i) = best else { break };

            let (key, value) = readers[i].record()?;
            writer.append_raw(key, value)?;
            live[i] = readers[i].next_record()?;
        }
        writer.close()?;
        Ok(writer.record_count())
    }

    /// Sort `records` in memory and write them out, leaving `records` empty
    fn write_run(
        &self,
        records: &mut Vec<(Bytes, Bytes)>,
        path: &Path,
        key_type: &str,
        value_type: &str,
        options: WriterOptions,
    ) -> Result<()> {
        let mut error = None;
        records.sort_by(|a, b| match self.comparator.compare(&a.0, &b.0) {
            Ok(ordering) => ordering,
            Err(e) => {
                error.get_or_insert(e);
                Ordering::Equal
            }
        });
        if let Some(e) = error {
            return Err(e);
        }

        let mut writer = RawSequenceWriter::create(&self.ctx, path, key_type, value_type, options)?;
        for (key, value) in records.drain(..) {
            writer.append_raw(&key, &value)?;
        }
        writer.close()
    }

    /// Key and value types shared by every input
    fn common_types(&self, inputs: &[PathBuf]) -> Result<(String, String)> {
        let first = inputs
            .first()
            .ok_or_else(|| SeqFileError::InvalidArgument("no inputs to sort".into()))?;
        let header = Header::read_from(&self.ctx, first)?;
        for path in &inputs[1..] {
            let other = Header::read_from(&self.ctx, path)?;
            for (expected, found) in [(&header.key_type, &other.key_type), (&header.value_type, &other.value_type)] {
                if expected != found {
                    return Err(SeqFileError::TypeMismatch {
                        path: path.display().to_string(),
                        expected: expected.clone(),
                        found: found.clone(),
                    });
                }
            }
        }
        Ok((header.key_type, header.value_type))
    }

    fn temp_dir(&self, output: &Path) -> PathBuf {
        self.options.temp_dir.clone().unwrap_or_else(|| {
            output
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    fn temp_path(&self, temp_dir: &Path, output: &Path, pass: usize, index: usize) -> PathBuf {
        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sort".to_string());
        temp_dir.join(format!(".{}.pass{}.run{}", name, pass, index))
    }

    fn remove_all(&self, paths: &[PathBuf]) {
        for path in paths {
            if let Err(e) = self.ctx.fs.delete(path, false) {
                warn!(path = %path.display(), error = %e, "Failed to remove sort run");
            }
        }
    }
}

/// Intermediate runs are written uncompressed and replaced if stale
fn run_options() -> WriterOptions {
    WriterOptions::new()
        .compression(CompressionType::None)
        .sync_interval(0)
        .overwrite(true)
}

/// Sort one typed container by `K`'s registered comparator
pub fn sort_file<K, V>(ctx: &StorageContext, input: &Path, output: &Path, options: SortOptions) -> Result<u64>
where
    K: WritableComparable + Default + 'static,
    V: Writable,
{
    let header = Header::read_from(ctx, input)?;
    if header.key_type != K::type_name() || header.value_type != V::type_name() {
        return Err(SeqFileError::TypeMismatch {
            path: input.display().to_string(),
            expected: format!("{}/{}", K::type_name(), V::type_name()),
            found: format!("{}/{}", header.key_type, header.value_type),
        });
    }
    Sorter::for_key::<K>(ctx, options).sort(&[input.to_path_buf()], output)
}
