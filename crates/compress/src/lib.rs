//! Compression format detection and decompression.
//!
//! Scientific data files frequently arrive compressed (`.nii.gz` being the
//! usual suspect). This crate wraps the supported compression libraries behind
//! a single [`Compression`] enum, providing:
//!
//! - **Format detection** from file extensions ([`Compression::from_path`]) or
//!   magic bytes ([`Compression::from_magic_bytes`])
//! - **Name handling** for compound extensions
//!   ([`Compression::strip_extension`] turns `scan.nii.gz` into `scan.nii`)
//! - **In-memory** compression ([`Compression::compress`]) for building
//!   compressed files
//! - **Streaming** decompression via wrapped readers
//!   ([`Compression::wrap_reader`], [`Compression::decompress_stream`])

mod construct;
pub mod error;
mod ops;
mod util;

/// A supported compression format.
///
/// Defaults to [`None`](Self::None) (uncompressed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Bzip2 compression (.bz2)
    Bzip2,
    /// Gzip compression (.gz)
    Gzip,
}
