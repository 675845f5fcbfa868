//! Copying or moving every record of a table to its destination.
//!
//! Each file is written to a temporary sibling of its destination and renamed
//! into place once complete, so an interrupted transfer never leaves a partial
//! file behind. Missing parent directories are created.

use crate::error::{Error, ErrorKind, Result};
use crate::table::{FileRecord, RecordTable};
use exn::{OptionExt, ResultExt};
use nisupply_compress::Compression;
use nisupply_storage::{copy_file, decompress_file, move_file};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::instrument;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

/// What [`transfer`] does when a record fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep going and report every failure at the end.
    #[default]
    Accumulate,
    /// Stop at the first failure.
    FailFast,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferOptions {
    pub mode: TransferMode,
    /// Replace existing destination files instead of failing the record.
    pub overwrite: bool,
    /// Decompress gzip and bzip2 files after transfer, removing the
    /// compressed copy.
    pub decompress: bool,
    pub policy: FailurePolicy,
}

/// What happened to a successfully transferred file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Copied,
    Moved,
    /// Source and destination are the same path; nothing was written.
    AlreadyInPlace,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transferred {
    pub source: PathBuf,
    /// Where the file ended up. Differs from the record's destination when
    /// it was decompressed (`a.nii.gz` → `a.nii`).
    pub destination: PathBuf,
    pub action: Action,
    pub decompressed: bool,
}

/// The outcome of a whole batch.
#[derive(Debug, Default)]
pub struct TransferReport {
    pub transferred: Vec<Transferred>,
    /// One [`ErrorKind::Transfer`] per failed record, in table order.
    pub failures: Vec<Error>,
}

impl TransferReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.transferred.len() + self.failures.len()
    }

    /// Turns a report with failures into [`ErrorKind::Incomplete`].
    pub fn into_result(self) -> Result<Vec<Transferred>> {
        if !self.is_success() {
            exn::bail!(ErrorKind::Incomplete { failed: self.failures.len(), total: self.total() });
        }
        Ok(self.transferred)
    }
}

/// Transfers every record of `table` to its `destination_path`.
///
/// Records are processed in table order. A record fails (with
/// [`ErrorKind::Transfer`] carrying its filepath) if it has no destination,
/// its destination (or, when decompressing, its decompressed name) was already
/// claimed by an earlier record, its source is
/// gone, its destination exists and `overwrite` is off, or any I/O fails.
///
/// # Errors
/// Only under [`FailurePolicy::FailFast`], with the first record failure.
/// Under [`FailurePolicy::Accumulate`] failures are collected in the report.
#[instrument(skip_all, fields(rows = table.len(), mode = ?options.mode))]
pub fn transfer(table: &RecordTable, options: &TransferOptions) -> Result<TransferReport> {
    let mut report = TransferReport::default();
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    for record in table {
        let duplicate = record.destination_path().and_then(|destination| {
            let names = final_names(destination, options);
            let clash = names.iter().find(|name| claimed.contains(*name)).cloned();
            claimed.extend(names);
            clash
        });
        let result = match duplicate {
            Some(destination) => Err(Error::from(ErrorKind::DuplicateDestination(destination))
                .raise(ErrorKind::Transfer(record.filepath().to_path_buf()))),
            None => transfer_record(record, options),
        };
        match result {
            Ok(transferred) => report.transferred.push(transferred),
            Err(err) if options.policy == FailurePolicy::FailFast => return Err(err),
            Err(err) => {
                tracing::warn!(filepath = %record.filepath().display(), "{err:?}");
                report.failures.push(err);
            },
        }
    }
    tracing::info!(transferred = report.transferred.len(), failed = report.failures.len(), "Transfer complete");
    Ok(report)
}

/// Every path a record will occupy once transferred: the destination itself
/// and, when decompressing, the name with its compression suffix removed.
fn final_names(destination: &Path, options: &TransferOptions) -> Vec<PathBuf> {
    let mut names = vec![destination.to_path_buf()];
    if options.decompress && Compression::from_path(destination) != Compression::None {
        names.push(Compression::strip_extension(destination));
    }
    names
}

/// Transfers a single record.
///
/// # Errors
/// [`ErrorKind::Transfer`] with the underlying cause attached.
pub fn transfer_record(record: &FileRecord, options: &TransferOptions) -> Result<Transferred> {
    let source = record.filepath();
    let failed = || ErrorKind::Transfer(source.to_path_buf());
    let destination = record.destination_path().ok_or_raise(|| ErrorKind::MissingDestination).or_raise(failed)?;

    let action = if source == destination {
        tracing::debug!(path = %source.display(), "Already in place");
        Action::AlreadyInPlace
    } else {
        match options.mode {
            TransferMode::Copy => {
                let bytes = copy_file(source, destination, options.overwrite).or_raise(failed)?;
                tracing::debug!(source = %source.display(), destination = %destination.display(), bytes, "Copied");
                Action::Copied
            },
            TransferMode::Move => {
                move_file(source, destination, options.overwrite).or_raise(failed)?;
                tracing::debug!(source = %source.display(), destination = %destination.display(), "Moved");
                Action::Moved
            },
        }
    };

    // A file copied onto itself is still the user's source; decompressing
    // it would delete the original.
    let keep_source = action == Action::AlreadyInPlace && options.mode == TransferMode::Copy;
    let decompressed = match options.decompress && !keep_source {
        true => decompress_file(destination, options.overwrite).or_raise(failed)?,
        false => None,
    };
    Ok(Transferred {
        source: source.to_path_buf(),
        decompressed: decompressed.is_some(),
        destination: decompressed.unwrap_or_else(|| destination.to_path_buf()),
        action,
    })
}
