//! Multi-file decoding.
//!
//! Files are independent: each worker owns its file, cursor and record
//! builder. Per-file results are collected in input order and merged by a
//! single writer, so the output does not depend on scheduling.

use crate::error::{PolicyError, Result};
use crate::machine::DecodeOptions;
use crate::normalize::{NormalizedResultSet, Normalizer};
use crate::policy::PolicyFile;
use crate::record::RecordEntry;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// A file that could not be read; the rest of the batch still ran.
#[derive(Debug)]
pub struct FileFailure {
    /// Path as given by the caller.
    pub path: PathBuf,
    /// What went wrong.
    pub error: PolicyError,
}

/// Outcome of a batch decode.
#[derive(Debug)]
pub struct BatchReport {
    /// Merged, deduplicated and filtered records.
    pub results: NormalizedResultSet,
    /// Files skipped because they could not be read.
    pub failures: Vec<FileFailure>,
    /// Number of files decoded successfully.
    pub files_decoded: usize,
}

fn decode_path(path: &Path, options: DecodeOptions) -> Result<Vec<RecordEntry>> {
    PolicyFile::open(path).map(|file| file.decode(options))
}

fn decode_all<T, F>(items: &[T], options: DecodeOptions, decode: F) -> Vec<Result<Vec<RecordEntry>>>
where
    T: Sync,
    F: Fn(&T) -> Result<Vec<RecordEntry>> + Sync + Send,
{
    if options.parallel {
        items.par_iter().map(&decode).collect()
    } else {
        items.iter().map(&decode).collect()
    }
}

/// Decodes many policy files and merges their records.
///
/// Unreadable files are reported in [`BatchReport::failures`] and do not stop
/// the batch.
///
/// # Errors
///
/// Returns `NothingFound` if no record survives normalization.
#[instrument(skip_all, fields(files = paths.len(), parallel = options.parallel))]
pub fn decode_files<P>(paths: &[P], options: DecodeOptions) -> Result<BatchReport>
where
    P: AsRef<Path> + Sync,
{
    let outcomes = decode_all(paths, options, |path| decode_path(AsRef::<Path>::as_ref(path), options));

    let mut normalizer = Normalizer::new();
    let mut failures = Vec::new();
    let mut files_decoded = 0;

    for (path, outcome) in paths.iter().zip(outcomes) {
        let path: &Path = path.as_ref();
        match outcome {
            Ok(records) => {
                files_decoded += 1;
                normalizer.extend(records);
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "Skipping policy file");
                failures.push(FileFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }

    let results = normalizer.finish();
    info!(
        decoded = files_decoded,
        failed = failures.len(),
        records = results.len(),
        "Policy batch complete"
    );

    if results.is_empty() {
        return Err(PolicyError::NothingFound {
            attempted: paths.len(),
            failed: failures.len(),
        });
    }

    Ok(BatchReport {
        results,
        failures,
        files_decoded,
    })
}

/// Decodes already-loaded policy files and merges their records.
///
/// Unlike [`decode_files`], an empty result is returned as an empty set.
pub fn decode_buffers(files: &[PolicyFile], options: DecodeOptions) -> NormalizedResultSet {
    let outcomes = decode_all(files, options, |file| Ok(file.decode(options)));

    let mut normalizer = Normalizer::new();
    for records in outcomes.into_iter().flatten() {
        normalizer.extend(records);
    }
    normalizer.finish()
}
