//! Page Align: pairs the pages of two translations of the same comic chapter.
//!
//! This crate provides functionality for:
//! - Fingerprinting page images with a 64-bit average hash
//! - Aligning two page sequences with a global, order-preserving alignment
//! - Writing renumbered per-language archives plus a JSON alignment manifest
//! - Batch-processing a directory of `{chapter}_{lang}.zip` archives
//!
//! # Quick Start
//!
//! ```ignore
//! use page_align::{AlignConfig, CancelToken, PrepareRequest, prepare_chapter};
//!
//! let request = PrepareRequest {
//!     en_path: "downloads/012_en.zip".into(),
//!     es_path: "downloads/012_es.zip".into(),
//!     output_dir: "upload".into(),
//!     chapter: None,
//!     manga: Some("chainsaw-man".into()),
//! };
//! let prepared = prepare_chapter(&request, &AlignConfig::default(), &CancelToken::new())?;
//! println!("{} pages, {} matched", prepared.result.total_pages, prepared.result.matched);
//! ```

pub(crate) mod alignment;
mod archive;
mod batch;
mod cancel;
mod chapter;
mod classify;
mod config;
pub mod error_codes;
mod fingerprint;
mod manifest;
mod report;
mod similarity;

pub use alignment::{
    align_sequences, align_sequences_guarded, AlignError, AlignStep, AlignmentCell, AlignmentPath,
    Move,
};
pub use archive::{
    is_page_name, renumbered_name, ArchiveError, ArchiveLimits, ArchivePage, PageArchive,
    RenumberedArchiveWriter, PAGE_EXTENSIONS,
};
pub use batch::{
    find_chapter_pairs, run_batch, BatchError, BatchOptions, BatchSummary, ChapterFailure,
    ChapterOutcome, ChapterPair, ChapterStats, ChapterStatus, SUMMARY_FILE_NAME,
};
pub use cancel::{CancelToken, RunGuard};
pub use chapter::{
    align_archives, align_chapter_files, chapter_output_dir, extract_chapter_number,
    fingerprint_archive, prepare_chapter, write_aligned_archive, ChapterAlignment, ChapterError,
    DroppedPage, FingerprintedPage, PageSequence, PrepareRequest, PreparedChapter, Side,
};
pub use classify::{classify, AlignmentPair, AlignmentResult, PairKind, PairType};
pub use config::{
    checked_threshold, AlignConfig, AlignConfigBuilder, ConfigError, CROSS_GROUP_THRESHOLD,
    DEFAULT_THRESHOLD, SAME_SOURCE_THRESHOLD,
};
pub use fingerprint::{
    fingerprint_bytes, fingerprint_gray, DecodeError, Fingerprint, PageFingerprint,
    FINGERPRINT_BITS,
};
pub use manifest::{AlignmentManifest, ManifestError, ManifestPage};
pub use report::{AlignmentReport, QualityCounts, ReportDropped, ReportPage, ReportSide};
pub use similarity::{distance, score, QualityBand, DISALLOWED_MATCH};
