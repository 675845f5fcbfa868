use crate::Compression;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl Compression {
    /// Returns the short name for configuration and display.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Bzip2 => "bzip2",
            Compression::Gzip => "gzip",
        }
    }

    /// Verify that `bytes` start with the expected magic bytes for this format.
    ///
    /// Useful for cross-checking a format detected from a file extension
    /// against actual file contents before decompressing.
    #[must_use]
    pub fn check_magic_bytes(&self, bytes: &[u8]) -> bool {
        Self::from_magic_bytes(bytes) == *self
    }

    /// Removes the compression suffix from a path, leaving the native
    /// extension(s) intact.
    ///
    /// Paths without a recognised compression suffix are returned unchanged.
    ///
    /// ```
    /// use nisupply_compress::Compression;
    /// use std::path::Path;
    ///
    /// assert_eq!(Compression::strip_extension("sub-1/T1w.nii.gz"), Path::new("sub-1/T1w.nii"));
    /// assert_eq!(Compression::strip_extension("sub-1/T1w.nii"), Path::new("sub-1/T1w.nii"));
    /// ```
    #[must_use]
    pub fn strip_extension(path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match Self::from_path(path) {
            Compression::None => path.to_path_buf(),
            _ => path.with_extension(""),
        }
    }
}
