//! Archive extraction.
//!
//! The format is picked from the file's content signature first and from its
//! extension second. Zip goes through `zip`, tar through `tar`, and gzip
//! through `flate2`; a gzip stream that wraps a tar archive is unpacked as
//! one, any other gzip stream is decompressed into a single file.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Offset of the `ustar` magic inside a tar header block.
const USTAR_MAGIC_OFFSET: usize = 257;
const USTAR_MAGIC: &[u8] = b"ustar";

/// Archive formats that can be unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    /// A gzip stream, which may or may not contain a tar archive.
    Gzip,
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveFormat::Zip => f.write_str("zip"),
            ArchiveFormat::Tar => f.write_str("tar"),
            ArchiveFormat::Gzip => f.write_str("gzip"),
        }
    }
}

/// Errors raised while unpacking a single archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Neither the content nor the extension names a supported format.
    #[error("unknown archive format for {}", path.display())]
    Unsupported { path: PathBuf },

    /// The archive could not be read as the format it claims to be.
    #[error("{format} archive {} is unreadable: {reason}", path.display())]
    Corrupt {
        path: PathBuf,
        format: ArchiveFormat,
        reason: String,
    },

    /// Opening the archive or writing its contents failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Detects the archive format of `path`.
///
/// Content signatures win over the extension. Returns `None` when the file
/// is neither recognizably an archive nor named like one.
pub fn detect_format(path: &Path) -> Option<ArchiveFormat> {
    if let Ok(Some(kind)) = infer::get_from_path(path) {
        match kind.mime_type() {
            "application/zip" => return Some(ArchiveFormat::Zip),
            "application/x-tar" => return Some(ArchiveFormat::Tar),
            "application/gzip" => return Some(ArchiveFormat::Gzip),
            _ => {}
        }
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "zip" => Some(ArchiveFormat::Zip),
        "tar" => Some(ArchiveFormat::Tar),
        "gz" | "tgz" => Some(ArchiveFormat::Gzip),
        _ => None,
    }
}

/// Unpacks `archive` into the existing directory `dest`.
///
/// Nothing is ever written outside `dest`: unsafe tar entries are skipped
/// and a zip with an unsafe entry is rejected.
pub fn extract(archive: &Path, dest: &Path) -> Result<ArchiveFormat, ArchiveError> {
    let format = detect_format(archive).ok_or_else(|| ArchiveError::Unsupported {
        path: archive.to_path_buf(),
    })?;
    debug!("unpacking {} as {}", archive.display(), format);

    match format {
        ArchiveFormat::Zip => extract_zip(archive, dest)?,
        ArchiveFormat::Tar => {
            let file = open(archive)?;
            unpack_tar(archive, BufReader::new(file), dest, format)?;
        }
        ArchiveFormat::Gzip => extract_gzip(archive, dest)?,
    }

    Ok(format)
}

fn open(path: &Path) -> Result<File, ArchiveError> {
    File::open(path).map_err(|source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn corrupt(path: &Path, format: ArchiveFormat, reason: impl ToString) -> ArchiveError {
    ArchiveError::Corrupt {
        path: path.to_path_buf(),
        format,
        reason: reason.to_string(),
    }
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = open(archive)?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| corrupt(archive, ArchiveFormat::Zip, e))?;
    zip.extract(dest)
        .map_err(|e| corrupt(archive, ArchiveFormat::Zip, e))
}

fn unpack_tar<R: Read>(
    archive: &Path,
    reader: R,
    dest: &Path,
    format: ArchiveFormat,
) -> Result<(), ArchiveError> {
    tar::Archive::new(reader)
        .unpack(dest)
        .map_err(|e| corrupt(archive, format, e))
}

/// Returns true when the decompressed stream starts with a tar header.
fn gzip_wraps_tar(archive: &Path) -> Result<bool, ArchiveError> {
    let mut decoder = GzDecoder::new(BufReader::new(open(archive)?));
    let mut header = Vec::with_capacity(512);
    (&mut decoder)
        .take(512)
        .read_to_end(&mut header)
        .map_err(|e| corrupt(archive, ArchiveFormat::Gzip, e))?;

    Ok(header
        .get(USTAR_MAGIC_OFFSET..USTAR_MAGIC_OFFSET + USTAR_MAGIC.len())
        .is_some_and(|magic| magic == USTAR_MAGIC))
}

fn extract_gzip(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let is_tar = gzip_wraps_tar(archive)?;
    let decoder = GzDecoder::new(BufReader::new(open(archive)?));

    if is_tar {
        return unpack_tar(archive, decoder, dest, ArchiveFormat::Gzip);
    }

    let stem = archive
        .file_stem()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "contents".into());
    let out_path = dest.join(stem);
    let mut out = File::create(&out_path).map_err(|source| ArchiveError::Io {
        path: out_path.clone(),
        source,
    })?;

    let mut decoder = decoder;
    if let Err(e) = io::copy(&mut decoder, &mut out) {
        // Drop the partial output so a failed stream leaves nothing behind.
        drop(out);
        let _ = fs::remove_file(&out_path);
        return Err(corrupt(archive, ArchiveFormat::Gzip, e));
    }

    Ok(())
}
