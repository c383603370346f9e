//! Batch driver: prepares every EN/ES chapter pair found in a directory.
//!
//! Chapters are independent. With the `parallel` feature they are prepared
//! concurrently on the rayon pool; the summary always lists them in chapter
//! order. A failing chapter is recorded and never stops the batch.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::chapter::{persist, prepare_chapter, stage_file, ChapterError, PrepareRequest};
use crate::config::{AlignConfig, ConfigError};
use crate::error_codes;

pub const SUMMARY_FILE_NAME: &str = "summary.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterPair {
    pub chapter: String,
    pub en: PathBuf,
    pub es: PathBuf,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BatchError {
    #[error("[PGALIGN_BATCH_001] failed to scan '{}': {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Summary(#[from] ChapterError),
}

impl BatchError {
    pub fn code(&self) -> &'static str {
        match self {
            BatchError::Scan { .. } => error_codes::BATCH_SCAN_IO,
            BatchError::Config(err) => err.code(),
            BatchError::Summary(err) => err.code(),
        }
    }
}

/// Lists `{chapter}_{lang}.zip` files in `dir` and keeps chapters that have
/// both an `en` and an `es` archive.
pub fn find_chapter_pairs(dir: &Path) -> Result<Vec<ChapterPair>, BatchError> {
    let scan_err = |source| BatchError::Scan {
        path: dir.to_path_buf(),
        source,
    };

    let mut by_chapter: BTreeMap<String, (Option<PathBuf>, Option<PathBuf>)> = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(scan_err)? {
        let path = entry.map_err(scan_err)?.path();
        if !path.is_file() {
            continue;
        }
        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
        if !is_zip {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some((chapter, lang)) = stem.rsplit_once('_') else {
            tracing::debug!(path = %path.display(), "skipping archive without language suffix");
            continue;
        };
        let slot = by_chapter.entry(chapter.to_string()).or_default();
        match lang {
            "en" => slot.0 = Some(path.clone()),
            "es" => slot.1 = Some(path.clone()),
            _ => {}
        }
    }

    let mut pairs: Vec<ChapterPair> = by_chapter
        .into_iter()
        .filter_map(|(chapter, slot)| match slot {
            (Some(en), Some(es)) => Some(ChapterPair { chapter, en, es }),
            (en, _) => {
                let missing = if en.is_none() { "en" } else { "es" };
                tracing::warn!(chapter = %chapter, missing, "chapter has only one language");
                None
            }
        })
        .collect();
    pairs.sort_by(|a, b| chapter_order(&a.chapter, &b.chapter));
    Ok(pairs)
}

/// Numeric chapters first in numeric order, the rest lexicographically.
fn chapter_order(a: &str, b: &str) -> Ordering {
    match (parse_chapter(a), parse_chapter(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn parse_chapter(chapter: &str) -> Option<f64> {
    if chapter.is_empty() || !chapter.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    chapter.parse::<f64>().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    Perfect,
    Diff,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterStats {
    pub chapter: String,
    pub pages_en: usize,
    pub pages_es: usize,
    pub matched: usize,
    pub en_only: usize,
    pub es_only: usize,
    pub avg_distance: f64,
    pub status: ChapterStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterFailure {
    pub chapter: String,
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChapterOutcome {
    Done(ChapterStats),
    Failed(ChapterFailure),
}

impl ChapterOutcome {
    pub fn chapter(&self) -> &str {
        match self {
            ChapterOutcome::Done(stats) => &stats.chapter,
            ChapterOutcome::Failed(failure) => &failure.chapter,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total_chapters: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub perfect_matches: usize,
    pub has_insertions: usize,
    pub chapters: Vec<ChapterOutcome>,
}

impl BatchSummary {
    pub fn from_outcomes(chapters: Vec<ChapterOutcome>) -> Self {
        let mut summary = BatchSummary {
            total_chapters: chapters.len(),
            succeeded: 0,
            failed: 0,
            perfect_matches: 0,
            has_insertions: 0,
            chapters: Vec::new(),
        };
        for outcome in &chapters {
            match outcome {
                ChapterOutcome::Done(stats) => {
                    summary.succeeded += 1;
                    match stats.status {
                        ChapterStatus::Perfect => summary.perfect_matches += 1,
                        ChapterStatus::Diff => summary.has_insertions += 1,
                    }
                }
                ChapterOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary.chapters = chapters;
        summary
    }

    pub fn exit_ok(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    pub manga: Option<String>,
}

/// Prepares every pair and writes `summary.json` into the output directory.
pub fn run_batch(
    pairs: &[ChapterPair],
    options: &BatchOptions,
    config: &AlignConfig,
    token: &CancelToken,
) -> Result<BatchSummary, BatchError> {
    config.validate()?;
    tracing::info!(chapters = pairs.len(), "starting batch");
    if pairs.is_empty() {
        tracing::warn!("no EN/ES chapter pairs found");
    }

    let outcomes = prepare_all(pairs, options, config, token);
    let summary = BatchSummary::from_outcomes(outcomes);
    write_summary(&summary, &options.output_dir)?;

    tracing::info!(
        total = summary.total_chapters,
        succeeded = summary.succeeded,
        failed = summary.failed,
        perfect = summary.perfect_matches,
        "batch finished"
    );
    Ok(summary)
}

#[cfg(feature = "parallel")]
fn prepare_all(
    pairs: &[ChapterPair],
    options: &BatchOptions,
    config: &AlignConfig,
    token: &CancelToken,
) -> Vec<ChapterOutcome> {
    use rayon::prelude::*;

    pairs
        .par_iter()
        .map(|pair| prepare_one(pair, options, config, token))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn prepare_all(
    pairs: &[ChapterPair],
    options: &BatchOptions,
    config: &AlignConfig,
    token: &CancelToken,
) -> Vec<ChapterOutcome> {
    pairs
        .iter()
        .map(|pair| prepare_one(pair, options, config, token))
        .collect()
}

fn prepare_one(
    pair: &ChapterPair,
    options: &BatchOptions,
    config: &AlignConfig,
    token: &CancelToken,
) -> ChapterOutcome {
    let request = PrepareRequest {
        en_path: pair.en.clone(),
        es_path: pair.es.clone(),
        output_dir: options.output_dir.clone(),
        chapter: Some(pair.chapter.clone()),
        manga: options.manga.clone(),
    };

    match prepare_chapter(&request, config, token) {
        Ok(prepared) => {
            let result = &prepared.result;
            let status = if result.is_perfect() {
                ChapterStatus::Perfect
            } else {
                ChapterStatus::Diff
            };
            ChapterOutcome::Done(ChapterStats {
                chapter: prepared.chapter.clone(),
                pages_en: prepared.en_pages,
                pages_es: prepared.es_pages,
                matched: result.matched,
                en_only: result.en_only,
                es_only: result.es_only,
                avg_distance: result.avg_distance(),
                status,
            })
        }
        Err(err) => {
            tracing::error!(chapter = %pair.chapter, code = err.code(), error = %err, "chapter failed");
            ChapterOutcome::Failed(ChapterFailure {
                chapter: pair.chapter.clone(),
                error: err.to_string(),
                code: err.code(),
            })
        }
    }
}

fn write_summary(summary: &BatchSummary, output_dir: &Path) -> Result<(), ChapterError> {
    fs::create_dir_all(output_dir).map_err(|source| ChapterError::Output {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let target = output_dir.join(SUMMARY_FILE_NAME);
    let json = serde_json::to_string_pretty(summary)?;
    let tmp = stage_file(output_dir, json.as_bytes(), &target)?;
    persist(tmp, &target)
}
