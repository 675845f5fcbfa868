//! Building a [`RecordTable`] from the files below one or more directories.

mod filter;

pub use self::filter::{FilterSpec, MatchScope};
use crate::error::{ErrorKind, Result};
use crate::table::RecordTable;
use nisupply_storage::Walker;
use nisupply_storage::error::ErrorKind as StorageErrorKind;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Traversal options that are not about which files match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Resolve symbolic links instead of skipping them.
    pub follow_links: bool,
    /// Keep the same filepath twice when scanning overlapping roots.
    pub allow_duplicates: bool,
}

/// Scans a single root with default [`ScanOptions`].
pub fn scan(root: impl AsRef<Path>, filter: &FilterSpec) -> Result<RecordTable> {
    scan_with(root, filter, ScanOptions::default())
}

/// Lists every file below `root` that satisfies `filter`, in sorted
/// depth-first order.
///
/// Filepaths are `root` joined with the path below it, so a relative root
/// gives relative filepaths. Finding nothing is not an error, but is logged
/// as a warning.
///
/// # Errors
/// - [`ErrorKind::NotFound`] if `root` does not exist or is not a directory.
/// - [`ErrorKind::Scan`] if part of the tree cannot be read, or following
///   links runs into a cycle. The storage error is attached as a child.
#[instrument(skip(root, filter), fields(root = %root.as_ref().display()))]
pub fn scan_with(root: impl AsRef<Path>, filter: &FilterSpec, options: ScanOptions) -> Result<RecordTable> {
    let root = root.as_ref();
    let files = Walker::new(root)
        .exclude_dirs(filter.exclude_dirs.iter().cloned())
        .follow_links(options.follow_links)
        .files()
        .map_err(|err| {
            let kind = match &*err {
                StorageErrorKind::NotFound(_) | StorageErrorKind::NotADirectory(_) => ErrorKind::NotFound(root.to_path_buf()),
                _ => ErrorKind::Scan(root.to_path_buf()),
            };
            err.raise(kind)
        })?;

    let total = files.len();
    let matched: Vec<PathBuf> = files
        .into_iter()
        .filter(|path| path.strip_prefix(root).is_ok_and(|relative| filter.matches(relative)))
        .collect();
    if matched.is_empty() {
        tracing::warn!(root = %root.display(), "No files matching the filter were found");
    } else {
        tracing::info!(matched = matched.len(), total, "Scan complete");
    }
    RecordTable::from_filepaths(matched, options.allow_duplicates)
}

/// Scans several roots and concatenates the results in argument order.
///
/// # Errors
/// Anything [`scan_with`] returns for any root, plus
/// [`ErrorKind::DuplicateFilepath`] when roots overlap and
/// `options.allow_duplicates` is off.
pub fn scan_all<I, P>(roots: I, filter: &FilterSpec, options: ScanOptions) -> Result<RecordTable>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut table = RecordTable::new();
    for root in roots {
        let scanned = scan_with(root.as_ref(), filter, options)?;
        table.append(scanned, options.allow_duplicates)?;
    }
    Ok(table)
}
