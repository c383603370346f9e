//! Turns an alignment path into numbered, typed page pairs.

use serde::{Deserialize, Serialize};

use crate::alignment::{AlignStep, AlignmentPath};
use crate::similarity::QualityBand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairType {
    Matched,
    EnOnly,
    EsOnly,
}

impl PairType {
    pub fn as_str(self) -> &'static str {
        match self {
            PairType::Matched => "matched",
            PairType::EnOnly => "en_only",
            PairType::EsOnly => "es_only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairKind {
    Matched {
        en_pos: usize,
        es_pos: usize,
        distance: u32,
        quality: QualityBand,
    },
    EnOnly {
        en_pos: usize,
    },
    EsOnly {
        es_pos: usize,
    },
}

/// One logical page of the aligned chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlignmentPair {
    /// Shared page number in output order, contiguous from 0.
    pub index: usize,
    pub kind: PairKind,
}

impl AlignmentPair {
    pub fn pair_type(&self) -> PairType {
        match self.kind {
            PairKind::Matched { .. } => PairType::Matched,
            PairKind::EnOnly { .. } => PairType::EnOnly,
            PairKind::EsOnly { .. } => PairType::EsOnly,
        }
    }

    pub fn en_pos(&self) -> Option<usize> {
        match self.kind {
            PairKind::Matched { en_pos, .. } | PairKind::EnOnly { en_pos } => Some(en_pos),
            PairKind::EsOnly { .. } => None,
        }
    }

    pub fn es_pos(&self) -> Option<usize> {
        match self.kind {
            PairKind::Matched { es_pos, .. } | PairKind::EsOnly { es_pos } => Some(es_pos),
            PairKind::EnOnly { .. } => None,
        }
    }

    pub fn distance(&self) -> Option<u32> {
        match self.kind {
            PairKind::Matched { distance, .. } => Some(distance),
            _ => None,
        }
    }

    pub fn quality(&self) -> Option<QualityBand> {
        match self.kind {
            PairKind::Matched { quality, .. } => Some(quality),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentResult {
    pub chapter: String,
    pub total_pages: usize,
    pub matched: usize,
    pub en_only: usize,
    pub es_only: usize,
    pub pairs: Vec<AlignmentPair>,
}

impl AlignmentResult {
    /// True when no page is one-sided.
    pub fn is_perfect(&self) -> bool {
        self.en_only == 0 && self.es_only == 0
    }

    /// Mean distance over matched pairs, `0.0` when nothing matched.
    pub fn avg_distance(&self) -> f64 {
        if self.matched == 0 {
            return 0.0;
        }
        let total: u64 = self.pairs.iter().filter_map(|p| p.distance()).map(u64::from).sum();
        total as f64 / self.matched as f64
    }

    pub fn count_quality(&self, band: QualityBand) -> usize {
        self.pairs.iter().filter(|p| p.quality() == Some(band)).count()
    }

    /// Checks the count, numbering and no-crossing invariants.
    pub fn is_consistent(&self) -> bool {
        if self.total_pages != self.pairs.len()
            || self.total_pages != self.matched + self.en_only + self.es_only
        {
            return false;
        }

        let mut last_en: Option<usize> = None;
        let mut last_es: Option<usize> = None;
        let mut counts = [0usize; 3];
        for (expected_index, pair) in self.pairs.iter().enumerate() {
            if pair.index != expected_index {
                return false;
            }
            if let Some(en) = pair.en_pos() {
                if last_en.is_some_and(|prev| prev >= en) {
                    return false;
                }
                last_en = Some(en);
            }
            if let Some(es) = pair.es_pos() {
                if last_es.is_some_and(|prev| prev >= es) {
                    return false;
                }
                last_es = Some(es);
            }
            counts[pair.pair_type() as usize] += 1;
        }

        counts == [self.matched, self.en_only, self.es_only]
    }
}

/// Single pass over the path: numbers pairs from 0 and tallies each type.
pub fn classify(chapter: impl Into<String>, path: &AlignmentPath) -> AlignmentResult {
    let mut pairs = Vec::with_capacity(path.steps.len());
    let mut matched = 0;
    let mut en_only = 0;
    let mut es_only = 0;

    for (index, step) in path.steps.iter().enumerate() {
        let kind = match *step {
            AlignStep::Match { en, es, distance } => {
                matched += 1;
                PairKind::Matched {
                    en_pos: en,
                    es_pos: es,
                    distance,
                    quality: QualityBand::from_distance(distance),
                }
            }
            AlignStep::EnGap { en } => {
                en_only += 1;
                PairKind::EnOnly { en_pos: en }
            }
            AlignStep::EsGap { es } => {
                es_only += 1;
                PairKind::EsOnly { es_pos: es }
            }
        };
        pairs.push(AlignmentPair { index, kind });
    }

    let result = AlignmentResult {
        chapter: chapter.into(),
        total_pages: pairs.len(),
        matched,
        en_only,
        es_only,
        pairs,
    };
    debug_assert!(result.is_consistent(), "classified result violates invariants");
    result
}
