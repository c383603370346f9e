//! Diagnostic report for a single chapter alignment.
//!
//! Unlike the manifest, the report is meant for people tuning thresholds: it
//! carries per-page fingerprints, image dimensions, quality bands and any
//! pages dropped before alignment.

use serde::Serialize;

use crate::chapter::{ChapterAlignment, FingerprintedPage};
use crate::classify::PairType;
use crate::fingerprint::Fingerprint;
use crate::similarity::QualityBand;

#[derive(Debug, Clone, Serialize)]
pub struct AlignmentReport {
    pub chapter: String,
    pub en_source: String,
    pub es_source: String,
    pub threshold: u32,
    pub en_pages: usize,
    pub es_pages: usize,
    pub total_pages: usize,
    pub matched: usize,
    pub en_only: usize,
    pub es_only: usize,
    pub avg_distance: f64,
    pub quality: QualityCounts,
    pub pages: Vec<ReportPage>,
    pub dropped: Vec<ReportDropped>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QualityCounts {
    pub good: usize,
    pub weak: usize,
    pub poor: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportPage {
    pub index: usize,
    #[serde(rename = "type")]
    pub page_type: PairType,
    pub en: Option<ReportSide>,
    pub es: Option<ReportSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityBand>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSide {
    pub position: usize,
    pub name: String,
    pub fingerprint: Fingerprint,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDropped {
    pub side: &'static str,
    pub name: String,
    pub error: String,
    pub code: &'static str,
}

impl AlignmentReport {
    pub fn build(
        alignment: &ChapterAlignment,
        en_source: impl Into<String>,
        es_source: impl Into<String>,
        threshold: u32,
    ) -> Self {
        let result = &alignment.result;
        let side = |pages: &[FingerprintedPage], position: Option<usize>| {
            position.and_then(|pos| {
                pages.get(pos).map(|page| ReportSide {
                    position: pos,
                    name: page.name.clone(),
                    fingerprint: page.page.fingerprint,
                    width: page.page.width,
                    height: page.page.height,
                })
            })
        };

        let pages = result
            .pairs
            .iter()
            .map(|pair| ReportPage {
                index: pair.index,
                page_type: pair.pair_type(),
                en: side(&alignment.en.pages, pair.en_pos()),
                es: side(&alignment.es.pages, pair.es_pos()),
                distance: pair.distance(),
                quality: pair.quality(),
            })
            .collect();

        let dropped = [("en", &alignment.en), ("es", &alignment.es)]
            .into_iter()
            .flat_map(|(side, seq)| {
                seq.dropped.iter().map(move |d| ReportDropped {
                    side,
                    name: d.name.clone(),
                    error: d.error.to_string(),
                    code: d.error.code(),
                })
            })
            .collect();

        Self {
            chapter: result.chapter.clone(),
            en_source: en_source.into(),
            es_source: es_source.into(),
            threshold,
            en_pages: alignment.en.pages.len(),
            es_pages: alignment.es.pages.len(),
            total_pages: result.total_pages,
            matched: result.matched,
            en_only: result.en_only,
            es_only: result.es_only,
            avg_distance: result.avg_distance(),
            quality: QualityCounts {
                good: result.count_quality(QualityBand::Good),
                weak: result.count_quality(QualityBand::Weak),
                poor: result.count_quality(QualityBand::Poor),
            },
            pages,
            dropped,
            warnings: alignment.warnings.clone(),
        }
    }

    pub fn is_perfect(&self) -> bool {
        self.en_only == 0 && self.es_only == 0
    }
}
