use crate::error::{ErrorKind, Result};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::instrument;
use walkdir::{DirEntry, WalkDir};

/// Recursive, deterministic listing of regular files below a root directory.
///
/// Entries are visited depth-first with siblings sorted by file name, so two
/// walks over an unchanged tree always produce the same sequence. Yielded
/// paths are `root` joined with the path relative to it: a relative root
/// produces relative paths, an absolute root absolute ones.
///
/// # Symbolic links
/// By default links are not followed. Symlinked files and directories are
/// skipped entirely. With [`follow_links`](Self::follow_links) enabled, links
/// are resolved and a link that points back at one of its own ancestors fails
/// the walk with [`ErrorKind::SymlinkLoop`]. Dangling links are skipped.
///
/// ```no_run
/// use nisupply_storage::Walker;
///
/// # fn example() -> nisupply_storage::error::Result<()> {
/// let files = Walker::new("/data/raw").exclude_dirs(["derivatives", ".git"]).files()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Walker {
    root: PathBuf,
    exclude_dirs: Vec<String>,
    follow_links: bool,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), exclude_dirs: Vec::new(), follow_links: false }
    }

    /// Directory names that are pruned, together with everything below them.
    /// Matched against the directory's own name, never the root itself.
    pub fn exclude_dirs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dirs.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collects every regular file below the root.
    ///
    /// # Errors
    /// - [`ErrorKind::NotFound`] if the root does not exist.
    /// - [`ErrorKind::NotADirectory`] if the root is not a directory.
    /// - [`ErrorKind::SymlinkLoop`] when following links runs into a cycle.
    /// - [`ErrorKind::PermissionDenied`]/[`ErrorKind::Io`] for unreadable
    ///   directories; nothing is silently left out.
    #[instrument(skip(self), fields(root = %self.root.display(), follow_links = self.follow_links))]
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let metadata = fs::metadata(&self.root).map_err(|e| ErrorKind::from_io(e, &self.root))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::NotADirectory(self.root.clone()));
        }

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                    if err.loop_ancestor().is_some() {
                        exn::bail!(ErrorKind::SymlinkLoop(path));
                    }
                    match ErrorKind::from_io(io::Error::from(err), &path) {
                        ErrorKind::NotFound(path) if self.follow_links => {
                            tracing::warn!(path = %path.display(), "Skipping dangling symbolic link");
                            continue;
                        },
                        kind => exn::bail!(kind),
                    }
                },
            };
            let file_type = entry.file_type();
            if file_type.is_file() {
                files.push(entry.into_path());
            } else if file_type.is_symlink() {
                tracing::debug!(path = %entry.path().display(), "Skipping symbolic link");
            }
        }
        tracing::debug!(count = files.len(), "Walk complete");
        Ok(files)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir() && self.exclude_dirs.iter().any(|name| entry.file_name() == OsStr::new(name))
    }
}
