//! Zip page archives: reading chapter pages in order and writing renumbered
//! output archives.
//!
//! Reading keeps every entry whose extension names a page image, skips
//! directories, and orders pages lexicographically by entry name. The whole
//! archive is held in memory; chapter archives are a few dozen pages, and the
//! size limits below keep a hostile archive from exhausting memory.

use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error_codes;

/// Extensions (compared case-insensitively) treated as page images.
pub const PAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveLimits {
    pub max_entries: usize,
    pub max_entry_uncompressed_bytes: u64,
    pub max_total_uncompressed_bytes: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_entry_uncompressed_bytes: 64 * 1024 * 1024,
            max_total_uncompressed_bytes: 1024 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    #[error("[PGALIGN_ARCHIVE_001] I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("[PGALIGN_ARCHIVE_002] not a ZIP archive. Suggestion: check that the chapter download completed.")]
    NotZip,
    #[error("[PGALIGN_ARCHIVE_003] archive has too many entries: {entries} (limit: {max_entries})")]
    TooManyEntries { entries: usize, max_entries: usize },
    #[error("[PGALIGN_ARCHIVE_004] entry '{name}' is too large: {size} bytes (limit: {limit} bytes)")]
    PartTooLarge { name: String, size: u64, limit: u64 },
    #[error("[PGALIGN_ARCHIVE_005] total uncompressed size exceeds limit of {limit} bytes")]
    TotalTooLarge { limit: u64 },
    #[error("[PGALIGN_ARCHIVE_006] failed to read ZIP entry '{name}': {reason}")]
    ZipRead { name: String, reason: String },
    #[error("[PGALIGN_ARCHIVE_007] failed to write ZIP archive: {reason}")]
    Write { reason: String },
}

impl ArchiveError {
    pub fn code(&self) -> &'static str {
        match self {
            ArchiveError::Io(_) => error_codes::ARCHIVE_IO,
            ArchiveError::NotZip => error_codes::ARCHIVE_NOT_ZIP,
            ArchiveError::TooManyEntries { .. } => error_codes::ARCHIVE_TOO_MANY_ENTRIES,
            ArchiveError::PartTooLarge { .. } => error_codes::ARCHIVE_PART_TOO_LARGE,
            ArchiveError::TotalTooLarge { .. } => error_codes::ARCHIVE_TOTAL_TOO_LARGE,
            ArchiveError::ZipRead { .. } => error_codes::ARCHIVE_ZIP_READ,
            ArchiveError::Write { .. } => error_codes::ARCHIVE_WRITE,
        }
    }
}

/// One page image as stored in its source archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePage {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct PageArchive {
    pages: Vec<ArchivePage>,
}

impl PageArchive {
    pub fn open(path: impl AsRef<Path>, limits: ArchiveLimits) -> Result<Self, ArchiveError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file), limits)
    }

    pub fn from_reader<R: Read + Seek>(
        reader: R,
        limits: ArchiveLimits,
    ) -> Result<Self, ArchiveError> {
        let mut archive = ZipArchive::new(reader).map_err(|err| match err {
            ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => ArchiveError::NotZip,
            ZipError::Io(e) => ArchiveError::Io(e),
            other => ArchiveError::ZipRead {
                name: String::new(),
                reason: other.to_string(),
            },
        })?;

        if archive.len() > limits.max_entries {
            return Err(ArchiveError::TooManyEntries {
                entries: archive.len(),
                max_entries: limits.max_entries,
            });
        }

        let mut pages = Vec::new();
        let mut total_read = 0u64;
        for idx in 0..archive.len() {
            let mut entry = archive.by_index(idx).map_err(|e| ArchiveError::ZipRead {
                name: format!("#{idx}"),
                reason: e.to_string(),
            })?;
            if entry.is_dir() || !is_page_name(entry.name()) {
                continue;
            }

            let name = entry.name().to_string();
            if entry.size() > limits.max_entry_uncompressed_bytes {
                return Err(ArchiveError::PartTooLarge {
                    name,
                    size: entry.size(),
                    limit: limits.max_entry_uncompressed_bytes,
                });
            }

            // declared sizes can lie; cap the actual read as well
            let mut data = Vec::with_capacity(entry.size() as usize);
            (&mut entry)
                .take(limits.max_entry_uncompressed_bytes + 1)
                .read_to_end(&mut data)
                .map_err(|e| ArchiveError::ZipRead {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let size = data.len() as u64;
            if size > limits.max_entry_uncompressed_bytes {
                return Err(ArchiveError::PartTooLarge {
                    name,
                    size,
                    limit: limits.max_entry_uncompressed_bytes,
                });
            }

            total_read = total_read.saturating_add(size);
            if total_read > limits.max_total_uncompressed_bytes {
                return Err(ArchiveError::TotalTooLarge {
                    limit: limits.max_total_uncompressed_bytes,
                });
            }

            pages.push(ArchivePage { name, data });
        }

        pages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { pages })
    }

    pub fn from_pages(mut pages: Vec<ArchivePage>) -> Self {
        pages.sort_by(|a, b| a.name.cmp(&b.name));
        Self { pages }
    }

    pub fn pages(&self) -> &[ArchivePage] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ArchivePage> {
        self.pages
            .binary_search_by(|page| page.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.pages[idx])
    }
}

pub fn is_page_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// `{index:03}` plus the source entry's extension, copied verbatim.
pub fn renumbered_name(index: usize, source_name: &str) -> String {
    match Path::new(source_name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{index:03}.{ext}"),
        None => format!("{index:03}"),
    }
}

/// Writes pages under their aligned index into a deflate-compressed zip.
pub struct RenumberedArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: FileOptions,
    written: usize,
}

impl<W: Write + Seek> RenumberedArchiveWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
            written: 0,
        }
    }

    pub fn add_page(
        &mut self,
        index: usize,
        source_name: &str,
        data: &[u8],
    ) -> Result<(), ArchiveError> {
        let name = renumbered_name(index, source_name);
        self.zip
            .start_file(name, self.options)
            .map_err(|e| ArchiveError::Write {
                reason: e.to_string(),
            })?;
        self.zip.write_all(data)?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<W, ArchiveError> {
        self.zip.finish().map_err(|e| ArchiveError::Write {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).expect("add dir");
            } else {
                writer.start_file(*name, options).expect("start file");
                writer.write_all(data).expect("write");
            }
        }
        writer.finish().expect("finish").into_inner()
    }

    #[test]
    fn keeps_only_page_images_in_name_order() {
        let bytes = zip_bytes(&[
            ("pages/", b""),
            ("pages/010.png", b"ten"),
            ("pages/002.JPG", b"two"),
            ("credits.txt", b"nope"),
            ("pages/001.webp", b"one"),
            ("Thumbs.db", b"nope"),
        ]);
        let archive =
            PageArchive::from_reader(Cursor::new(bytes), ArchiveLimits::default()).expect("open");

        let names: Vec<_> = archive.pages().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["pages/001.webp", "pages/002.JPG", "pages/010.png"]);
        assert_eq!(archive.get("pages/002.JPG").map(|p| p.data.as_slice()), Some(&b"two"[..]));
        assert!(archive.get("credits.txt").is_none());
    }

    #[test]
    fn rejects_non_zip_input() {
        let err = PageArchive::from_reader(Cursor::new(b"not a zip".to_vec()), ArchiveLimits::default())
            .expect_err("garbage is not a zip");
        assert!(matches!(err, ArchiveError::NotZip));
        assert_eq!(err.code(), error_codes::ARCHIVE_NOT_ZIP);
    }

    #[test]
    fn enforces_entry_limits() {
        let bytes = zip_bytes(&[("a.png", b"1234"), ("b.png", b"5678")]);

        let limits = ArchiveLimits {
            max_entries: 1,
            ..Default::default()
        };
        let err = PageArchive::from_reader(Cursor::new(bytes.clone()), limits).expect_err("entries");
        assert!(matches!(err, ArchiveError::TooManyEntries { entries: 2, max_entries: 1 }));

        let limits = ArchiveLimits {
            max_entry_uncompressed_bytes: 3,
            ..Default::default()
        };
        let err = PageArchive::from_reader(Cursor::new(bytes.clone()), limits).expect_err("size");
        assert!(matches!(err, ArchiveError::PartTooLarge { size: 4, limit: 3, .. }));

        let limits = ArchiveLimits {
            max_total_uncompressed_bytes: 6,
            ..Default::default()
        };
        let err = PageArchive::from_reader(Cursor::new(bytes), limits).expect_err("total");
        assert!(matches!(err, ArchiveError::TotalTooLarge { limit: 6 }));
    }

    #[test]
    fn renumbered_names_keep_extension() {
        assert_eq!(renumbered_name(0, "p01.jpg"), "000.jpg");
        assert_eq!(renumbered_name(7, "scans/Page 7.JPEG"), "007.JPEG");
        assert_eq!(renumbered_name(123, "x.webp"), "123.webp");
        assert_eq!(renumbered_name(1000, "x.png"), "1000.png");
        assert_eq!(renumbered_name(4, "noext"), "004");
    }

    #[test]
    fn writer_output_reads_back() {
        let mut writer = RenumberedArchiveWriter::new(Cursor::new(Vec::new()));
        writer.add_page(0, "src/a.png", b"first").expect("add");
        writer.add_page(2, "src/c.jpg", b"third").expect("add");
        assert_eq!(writer.written(), 2);
        let bytes = writer.finish().expect("finish").into_inner();

        let archive =
            PageArchive::from_reader(Cursor::new(bytes), ArchiveLimits::default()).expect("open");
        let names: Vec<_> = archive.pages().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["000.png", "002.jpg"]);
        assert_eq!(archive.pages()[1].data, b"third");
    }
}
