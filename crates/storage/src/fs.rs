use crate::error::{ErrorKind, Result};
use nisupply_compress::Compression;
use std::fs::{self, File, Metadata};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Copies `source` to `destination`, creating missing parent directories.
///
/// The bytes are written to a temporary file next to the destination and
/// renamed into place once complete. Permissions and modification time are
/// carried over from the source. Returns the number of bytes copied.
///
/// # Errors
/// - [`ErrorKind::NotFound`]/[`ErrorKind::NotAFile`] for a bad source.
/// - [`ErrorKind::AlreadyExists`] if the destination exists and `overwrite`
///   is `false`.
#[instrument(skip_all, fields(source = %source.as_ref().display(), destination = %destination.as_ref().display()))]
pub fn copy_file(source: impl AsRef<Path>, destination: impl AsRef<Path>, overwrite: bool) -> Result<u64> {
    let (source, destination) = (source.as_ref(), destination.as_ref());
    let metadata = regular_file(source)?;
    vacant(destination, overwrite)?;

    let mut reader = File::open(source).map_err(|e| ErrorKind::from_io(e, source))?;
    let mut staged = stage(destination)?;
    let bytes = io::copy(&mut reader, staged.as_file_mut()).map_err(ErrorKind::Io)?;
    let file = staged.as_file();
    file.set_permissions(metadata.permissions()).map_err(ErrorKind::Io)?;
    if let Ok(modified) = metadata.modified() {
        file.set_modified(modified).map_err(ErrorKind::Io)?;
    }
    file.sync_all().map_err(ErrorKind::Io)?;
    commit(staged, destination, overwrite)?;
    tracing::debug!(bytes, "Copied file");
    Ok(bytes)
}

/// Moves `source` to `destination`, creating missing parent directories.
///
/// A plain rename is attempted first. When source and destination live on
/// different filesystems the file is copied (see [`copy_file`]) and the
/// source removed afterwards.
///
/// # Errors
/// Same as [`copy_file`].
#[instrument(skip_all, fields(source = %source.as_ref().display(), destination = %destination.as_ref().display()))]
pub fn move_file(source: impl AsRef<Path>, destination: impl AsRef<Path>, overwrite: bool) -> Result<()> {
    let (source, destination) = (source.as_ref(), destination.as_ref());
    regular_file(source)?;
    vacant(destination, overwrite)?;
    create_parent(destination)?;
    match fs::rename(source, destination) {
        Ok(()) => {},
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!("Rename crosses filesystems; falling back to copy and delete");
            copy_file(source, destination, overwrite)?;
            fs::remove_file(source).map_err(|e| ErrorKind::from_io(e, source))?;
        },
        Err(e) => exn::bail!(ErrorKind::from_io(e, destination)),
    }
    tracing::debug!("Moved file");
    Ok(())
}

/// Decompresses `path` in place, removing the compressed file afterwards.
///
/// The output name is the input with its compression suffix dropped
/// (`bold.nii.gz` → `bold.nii`). Returns `Ok(None)` without touching the file
/// when the name carries no recognised compression suffix.
///
/// # Errors
/// - [`ErrorKind::AlreadyExists`] if the decompressed name is taken and
///   `overwrite` is `false`.
/// - [`ErrorKind::Compression`] if the content does not match the format
///   implied by the extension, or is corrupt. The compressed file is kept.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn decompress_file(path: impl AsRef<Path>, overwrite: bool) -> Result<Option<PathBuf>> {
    let path = path.as_ref();
    let compression = Compression::from_path(path);
    if compression == Compression::None {
        return Ok(None);
    }
    regular_file(path)?;
    let target = Compression::strip_extension(path);
    vacant(&target, overwrite)?;

    let mut reader = BufReader::new(File::open(path).map_err(|e| ErrorKind::from_io(e, path))?);
    let head = reader.fill_buf().map_err(ErrorKind::Io)?;
    if !compression.check_magic_bytes(head) {
        let err = exn::Exn::from(nisupply_compress::error::ErrorKind::InvalidData);
        return Err(ErrorKind::compression(err));
    }
    let mut staged = stage(&target)?;
    let bytes = compression.decompress_stream(reader, staged.as_file_mut()).map_err(ErrorKind::compression)?;
    staged.as_file().sync_all().map_err(ErrorKind::Io)?;
    commit(staged, &target, overwrite)?;
    fs::remove_file(path).map_err(|e| ErrorKind::from_io(e, path))?;
    tracing::debug!(format = %compression, bytes, target = %target.display(), "Decompressed file");
    Ok(Some(target))
}

fn regular_file(path: &Path) -> Result<Metadata> {
    let metadata = fs::metadata(path).map_err(|e| ErrorKind::from_io(e, path))?;
    if !metadata.is_file() {
        exn::bail!(ErrorKind::NotAFile(path.to_path_buf()));
    }
    Ok(metadata)
}

fn vacant(path: &Path, overwrite: bool) -> Result<()> {
    // symlink_metadata: a dangling link still occupies the name.
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => exn::bail!(ErrorKind::NotAFile(path.to_path_buf())),
        Ok(_) if !overwrite => exn::bail!(ErrorKind::AlreadyExists(path.to_path_buf())),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => exn::bail!(ErrorKind::from_io(e, path)),
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn create_parent(path: &Path) -> Result<()> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent).map_err(|e| ErrorKind::from_io(e, parent))?;
    Ok(())
}

/// Opens a hidden temporary file in the destination's directory, so the final
/// rename never crosses a filesystem boundary.
fn stage(destination: &Path) -> Result<NamedTempFile> {
    create_parent(destination)?;
    let parent = parent_dir(destination);
    let staged = tempfile::Builder::new()
        .prefix(".nisupply-")
        .suffix(".part")
        .tempfile_in(parent)
        .map_err(|e| ErrorKind::from_io(e, parent))?;
    Ok(staged)
}

fn commit(staged: NamedTempFile, destination: &Path, overwrite: bool) -> Result<()> {
    let persisted = match overwrite {
        true => staged.persist(destination),
        false => staged.persist_noclobber(destination),
    };
    // On failure the PersistError still owns the temporary file, which is
    // removed when it drops.
    persisted.map(drop).map_err(|e| ErrorKind::from_io(e.error, destination).into())
}
