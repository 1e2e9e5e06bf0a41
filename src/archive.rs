//! Result archive extraction
//!
//! Download responses are ZIP archives held in memory. They come from a remote
//! service, so every entry name is checked before anything is written: an entry
//! with an absolute path or a `..` component that climbs out of the destination
//! rejects the whole archive.

use crate::error::{Error, Result};
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Unpacks in-memory ZIP payloads into a directory
pub struct ArchivePackager;

impl ArchivePackager {
    /// Validate `payload` and extract all of its entries below `dest_path`
    ///
    /// The destination is created if missing. Returns the extracted files (not
    /// directories) in archive order. On failure the destination may hold a
    /// partial extraction.
    pub fn extract(payload: &[u8], dest_path: &Path) -> Result<Vec<PathBuf>> {
        debug!(
            payload_bytes = payload.len(),
            ?dest_path,
            "attempting ZIP extraction"
        );

        let mut archive = zip::ZipArchive::new(Cursor::new(payload)).map_err(|e| {
            Error::archive(format!("payload is not a valid ZIP archive: {}", e))
        })?;

        let entries = Self::validate_entries(&mut archive)?;

        std::fs::create_dir_all(dest_path).map_err(|e| Error::Io {
            path: dest_path.to_path_buf(),
            source: e,
        })?;

        let mut extracted_files = Vec::new();
        for (index, relative) in entries.into_iter().enumerate() {
            let file = archive.by_index(index).map_err(|e| Error::Archive {
                reason: format!("failed to read ZIP entry: {}", e),
                entry: Some(relative.display().to_string()),
            })?;

            if let Some(file_path) = Self::extract_entry(file, &dest_path.join(&relative))? {
                extracted_files.push(file_path);
            }
        }

        info!(
            ?dest_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }

    /// Resolve every entry to a path relative to the destination, or fail
    fn validate_entries<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let file = archive.by_index(index).map_err(|e| {
                Error::archive(format!("failed to read ZIP entry {}: {}", index, e))
            })?;

            match file.enclosed_name() {
                Some(path) => entries.push(path.to_path_buf()),
                None => {
                    return Err(Error::Archive {
                        reason: "entry path escapes the destination directory".to_string(),
                        entry: Some(file.name().to_string()),
                    });
                }
            }
        }

        Ok(entries)
    }

    /// Write a single entry to `file_path`, creating directories as needed
    fn extract_entry(mut file: zip::read::ZipFile, file_path: &Path) -> Result<Option<PathBuf>> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |e: std::io::Error| Error::Io { path, source: e }
        };

        if file.is_dir() {
            std::fs::create_dir_all(file_path).map_err(io_err(file_path))?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let mut outfile = std::fs::File::create(file_path).map_err(io_err(file_path))?;

        std::io::copy(&mut file, &mut outfile).map_err(|e| Error::Archive {
            reason: format!("failed to extract entry: {}", e),
            entry: Some(file.name().to_string()),
        })?;

        Ok(Some(file_path.to_path_buf()))
    }
}
