//! One chapter run: source archives in, manifest and renumbered archives out.
//!
//! Fingerprinting fans out across the rayon pool (one task per page); the
//! aligner then runs single-threaded over the gathered, position-ordered
//! sequences. Output files are staged as temp files next to their final
//! location and only renamed into place once every file of the chapter has
//! been written, so a failed or cancelled chapter leaves nothing behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::alignment::{align_sequences_guarded, AlignError};
use crate::archive::{ArchiveError, ArchivePage, PageArchive, RenumberedArchiveWriter};
use crate::cancel::{CancelToken, RunGuard};
use crate::classify::{classify, AlignmentResult};
use crate::config::{AlignConfig, ConfigError};
use crate::error_codes;
use crate::fingerprint::{fingerprint_bytes, DecodeError, Fingerprint, PageFingerprint};
use crate::manifest::{AlignmentManifest, ManifestError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    En,
    Es,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::En => "en",
            Side::Es => "es",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page that survived decoding. Its position in [`PageSequence::pages`] is
/// the position the aligner sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintedPage {
    pub name: String,
    pub page: PageFingerprint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedPage {
    pub name: String,
    pub error: DecodeError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSequence {
    pub pages: Vec<FingerprintedPage>,
    pub dropped: Vec<DroppedPage>,
}

impl PageSequence {
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.pages.iter().map(|p| p.page.fingerprint).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.name.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct ChapterAlignment {
    pub result: AlignmentResult,
    pub en: PageSequence,
    pub es: PageSequence,
    /// Human-readable notes about dropped pages and one-sided chapters.
    pub warnings: Vec<String>,
}

impl ChapterAlignment {
    pub fn manifest(&self) -> Result<AlignmentManifest, ManifestError> {
        AlignmentManifest::build(&self.result, &self.en.names(), &self.es.names())
    }

    fn sequence(&self, side: Side) -> &PageSequence {
        match side {
            Side::En => &self.en,
            Side::Es => &self.es,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChapterError {
    #[error("{side} archive '{}': {source}", .path.display())]
    Archive {
        side: Side,
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("[PGALIGN_CHAPTER_001] failed to write '{}': {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("[PGALIGN_CHAPTER_002] failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ChapterError {
    pub fn code(&self) -> &'static str {
        match self {
            ChapterError::Archive { source, .. } => source.code(),
            ChapterError::Config(err) => err.code(),
            ChapterError::Align(err) => err.code(),
            ChapterError::Manifest(err) => err.code(),
            ChapterError::Output { .. } => error_codes::CHAPTER_OUTPUT_IO,
            ChapterError::Serialize(_) => error_codes::CHAPTER_SERIALIZE,
        }
    }
}

/// Fingerprints every page of one side, dropping pages that fail to decode.
pub fn fingerprint_archive(
    side: Side,
    archive: &PageArchive,
    guard: &RunGuard,
) -> Result<PageSequence, AlignError> {
    let outcomes = fingerprint_pages(archive.pages(), guard)?;

    let mut sequence = PageSequence::default();
    for (page, outcome) in archive.pages().iter().zip(outcomes) {
        match outcome {
            Ok(fp) => {
                tracing::debug!(
                    side = side.as_str(),
                    page = %page.name,
                    fingerprint = %fp.fingerprint,
                    width = fp.width,
                    height = fp.height,
                    "fingerprinted page"
                );
                sequence.pages.push(FingerprintedPage {
                    name: page.name.clone(),
                    page: fp,
                });
            }
            Err(error) => {
                tracing::warn!(side = side.as_str(), page = %page.name, %error, "dropping unreadable page");
                sequence.dropped.push(DroppedPage {
                    name: page.name.clone(),
                    error,
                });
            }
        }
    }
    Ok(sequence)
}

#[cfg(feature = "parallel")]
fn fingerprint_pages(
    pages: &[ArchivePage],
    guard: &RunGuard,
) -> Result<Vec<Result<PageFingerprint, DecodeError>>, AlignError> {
    use rayon::prelude::*;

    pages
        .par_iter()
        .map(|page| {
            guard.check()?;
            Ok(fingerprint_bytes(&page.data))
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn fingerprint_pages(
    pages: &[ArchivePage],
    guard: &RunGuard,
) -> Result<Vec<Result<PageFingerprint, DecodeError>>, AlignError> {
    pages
        .iter()
        .map(|page| {
            guard.check()?;
            Ok(fingerprint_bytes(&page.data))
        })
        .collect()
}

/// Fingerprints both archives and aligns them.
pub fn align_archives(
    chapter: &str,
    en: &PageArchive,
    es: &PageArchive,
    config: &AlignConfig,
    guard: &RunGuard,
) -> Result<ChapterAlignment, AlignError> {
    let en_seq = fingerprint_archive(Side::En, en, guard)?;
    let es_seq = fingerprint_archive(Side::Es, es, guard)?;

    let mut warnings = Vec::new();
    for (side, seq) in [(Side::En, &en_seq), (Side::Es, &es_seq)] {
        for dropped in &seq.dropped {
            warnings.push(format!(
                "{} page '{}' dropped: {}",
                side.as_str(),
                dropped.name,
                dropped.error
            ));
        }
    }
    for (side, seq, other) in [(Side::En, &en_seq, Side::Es), (Side::Es, &es_seq, Side::En)] {
        if seq.pages.is_empty() {
            tracing::warn!(chapter, side = side.as_str(), "no readable pages on one side");
            warnings.push(format!(
                "{} side has no readable pages; every {} page is {}_only",
                side.as_str(),
                other.as_str(),
                other.as_str()
            ));
        }
    }

    let path = align_sequences_guarded(
        &en_seq.fingerprints(),
        &es_seq.fingerprints(),
        config,
        guard,
    )?;
    let result = classify(chapter, &path);

    tracing::info!(
        chapter,
        en_pages = en_seq.pages.len(),
        es_pages = es_seq.pages.len(),
        matched = result.matched,
        en_only = result.en_only,
        es_only = result.es_only,
        "aligned chapter"
    );

    Ok(ChapterAlignment {
        result,
        en: en_seq,
        es: es_seq,
        warnings,
    })
}

/// Opens both archives and aligns them. The chapter label defaults to the
/// number parsed from the EN file name.
pub fn align_chapter_files(
    en_path: &Path,
    es_path: &Path,
    chapter: Option<&str>,
    config: &AlignConfig,
    guard: &RunGuard,
) -> Result<(PageArchive, PageArchive, ChapterAlignment), ChapterError> {
    let en = open_side(Side::En, en_path, config)?;
    let es = open_side(Side::Es, es_path, config)?;
    let chapter = chapter
        .map(str::to_string)
        .unwrap_or_else(|| extract_chapter_number(en_path));
    let alignment = align_archives(&chapter, &en, &es, config, guard)?;
    Ok((en, es, alignment))
}

fn open_side(side: Side, path: &Path, config: &AlignConfig) -> Result<PageArchive, ChapterError> {
    PageArchive::open(path, config.archive_limits).map_err(|source| ChapterError::Archive {
        side,
        path: path.to_path_buf(),
        source,
    })
}

/// Writes one side's pages under their aligned index. Pairs missing this side
/// contribute nothing.
pub fn write_aligned_archive<W: Write + std::io::Seek>(
    side: Side,
    source: &PageArchive,
    alignment: &ChapterAlignment,
    writer: W,
) -> Result<W, ArchiveError> {
    let sequence = alignment.sequence(side);
    let mut out = RenumberedArchiveWriter::new(writer);

    for pair in &alignment.result.pairs {
        let position = match side {
            Side::En => pair.en_pos(),
            Side::Es => pair.es_pos(),
        };
        let Some(position) = position else {
            continue;
        };
        let name = &sequence.pages[position].name;
        let page = source.get(name).ok_or_else(|| ArchiveError::ZipRead {
            name: name.clone(),
            reason: "page vanished from source archive".to_string(),
        })?;
        out.add_page(pair.index, &page.name, &page.data)?;
    }

    out.finish()
}

#[derive(Debug, Clone)]
pub struct PrepareRequest {
    pub en_path: PathBuf,
    pub es_path: PathBuf,
    pub output_dir: PathBuf,
    /// Overrides the chapter number parsed from the EN file name.
    pub chapter: Option<String>,
    /// Places output under `{output_dir}/{manga}/chapters/`.
    pub manga: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PreparedChapter {
    pub chapter: String,
    pub en_archive: PathBuf,
    pub es_archive: PathBuf,
    pub manifest_path: PathBuf,
    pub result: AlignmentResult,
    pub en_pages: usize,
    pub es_pages: usize,
    pub warnings: Vec<String>,
}

pub fn chapter_output_dir(output_dir: &Path, manga: Option<&str>) -> PathBuf {
    match manga {
        Some(slug) => output_dir.join(slug).join("chapters"),
        None => output_dir.to_path_buf(),
    }
}

/// Aligns a chapter and writes `{chapter}_en.zip`, `{chapter}_es.zip` and
/// `{chapter}_alignment.json` atomically.
pub fn prepare_chapter(
    request: &PrepareRequest,
    config: &AlignConfig,
    token: &CancelToken,
) -> Result<PreparedChapter, ChapterError> {
    config.validate()?;
    let guard = RunGuard::new(token.clone(), config.timeout_seconds);
    let (en, es, alignment) = align_chapter_files(
        &request.en_path,
        &request.es_path,
        request.chapter.as_deref(),
        config,
        &guard,
    )?;
    let chapter = alignment.result.chapter.clone();
    let manifest = alignment.manifest()?;
    let manifest_json = manifest.to_json_pretty()?;

    let dir = chapter_output_dir(&request.output_dir, request.manga.as_deref());
    fs::create_dir_all(&dir).map_err(|source| ChapterError::Output {
        path: dir.clone(),
        source,
    })?;

    let en_archive = dir.join(format!("{chapter}_en.zip"));
    let es_archive = dir.join(format!("{chapter}_es.zip"));
    let manifest_path = dir.join(format!("{chapter}_alignment.json"));

    let en_tmp = stage_archive(&dir, Side::En, &en, &alignment, &en_archive)?;
    let es_tmp = stage_archive(&dir, Side::Es, &es, &alignment, &es_archive)?;
    let manifest_tmp = stage_file(&dir, manifest_json.as_bytes(), &manifest_path)?;

    // last chance to abort before anything becomes visible
    guard.check()?;

    persist(en_tmp, &en_archive)?;
    persist(es_tmp, &es_archive)?;
    persist(manifest_tmp, &manifest_path)?;

    tracing::info!(
        chapter = %chapter,
        manifest = %manifest_path.display(),
        "chapter prepared"
    );

    Ok(PreparedChapter {
        chapter,
        en_archive,
        es_archive,
        manifest_path,
        en_pages: alignment.en.pages.len(),
        es_pages: alignment.es.pages.len(),
        result: alignment.result,
        warnings: alignment.warnings,
    })
}

fn stage_archive(
    dir: &Path,
    side: Side,
    source: &PageArchive,
    alignment: &ChapterAlignment,
    target: &Path,
) -> Result<NamedTempFile, ChapterError> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(|source| ChapterError::Output {
        path: target.to_path_buf(),
        source,
    })?;
    write_aligned_archive(side, source, alignment, tmp.as_file_mut()).map_err(|source| {
        ChapterError::Archive {
            side,
            path: target.to_path_buf(),
            source,
        }
    })?;
    Ok(tmp)
}

/// Writes `bytes` to a temp file in `dir`; the caller persists it to `target`.
pub(crate) fn stage_file(
    dir: &Path,
    bytes: &[u8],
    target: &Path,
) -> Result<NamedTempFile, ChapterError> {
    let output_err = |source| ChapterError::Output {
        path: target.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(output_err)?;
    tmp.write_all(bytes).map_err(output_err)?;
    tmp.as_file().sync_all().map_err(output_err)?;
    Ok(tmp)
}

pub(crate) fn persist(tmp: NamedTempFile, target: &Path) -> Result<(), ChapterError> {
    tmp.persist(target)
        .map(|_| ())
        .map_err(|err| ChapterError::Output {
            path: target.to_path_buf(),
            source: err.error,
        })
}

/// Chapter label from an archive file name: the leading run of digits and
/// dots (`"001_en.zip"` gives `"001"`), else the stem without its `_lang`
/// suffix, else the bare stem.
pub fn extract_chapter_number(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let numeric: String = stem
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if !numeric.is_empty() {
        return numeric;
    }

    match stem.rsplit_once('_') {
        Some((head, _)) => head.to_string(),
        None => stem,
    }
}
