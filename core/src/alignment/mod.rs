//! Global page alignment (Needleman-Wunsch family).
//!
//! The two fingerprint sequences are aligned end-to-end with a fixed linear gap
//! penalty. Pairs are scored by [`crate::similarity::score`]; pairs beyond the
//! threshold are never considered for the diagonal move, so a page whose best
//! partner is too far away always ends up as a one-sided page.
//!
//! ## Determinism
//!
//! Ties are resolved with a fixed policy: the diagonal wins over either gap,
//! and the EN gap wins over the ES gap. Traceback walks from the bottom-right
//! cell, so for a duplicated page the later copy is the one that gets matched.

pub(crate) mod matrix;

use thiserror::Error;

use crate::cancel::RunGuard;
use crate::config::AlignConfig;
use crate::error_codes;
use crate::fingerprint::Fingerprint;

pub use matrix::{AlignmentCell, Move};

/// One step of the alignment path, in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlignStep {
    /// EN page `en` shown next to ES page `es`.
    Match { en: usize, es: usize, distance: u32 },
    /// EN page `en` has no ES counterpart.
    EnGap { en: usize },
    /// ES page `es` has no EN counterpart.
    EsGap { es: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentPath {
    pub steps: Vec<AlignStep>,
    /// Cumulative score of the optimal alignment, `F[m][n]`.
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AlignError {
    #[error(
        "[PGALIGN_ALIGN_001] chapter too large to align: en={en_pages}, es={es_pages} pages (limit: {max_pages} per side). Suggestion: raise `max_pages_per_side`."
    )]
    LimitsExceeded {
        en_pages: usize,
        es_pages: usize,
        max_pages: u32,
    },
    #[error("[PGALIGN_ALIGN_002] alignment cancelled")]
    Cancelled,
    #[error("[PGALIGN_ALIGN_003] alignment timed out after {seconds} seconds. Suggestion: raise the per-chapter timeout.")]
    TimedOut { seconds: u64 },
}

impl AlignError {
    pub fn code(&self) -> &'static str {
        match self {
            AlignError::LimitsExceeded { .. } => error_codes::ALIGN_LIMITS_EXCEEDED,
            AlignError::Cancelled => error_codes::ALIGN_CANCELLED,
            AlignError::TimedOut { .. } => error_codes::ALIGN_TIMED_OUT,
        }
    }
}

/// Aligns two fingerprint sequences without a deadline.
pub fn align_sequences(
    en: &[Fingerprint],
    es: &[Fingerprint],
    config: &AlignConfig,
) -> Result<AlignmentPath, AlignError> {
    align_sequences_guarded(en, es, config, &RunGuard::unbounded())
}

pub fn align_sequences_guarded(
    en: &[Fingerprint],
    es: &[Fingerprint],
    config: &AlignConfig,
    guard: &RunGuard,
) -> Result<AlignmentPath, AlignError> {
    let max_pages = config.max_pages_per_side as usize;
    if en.len() > max_pages || es.len() > max_pages {
        return Err(AlignError::LimitsExceeded {
            en_pages: en.len(),
            es_pages: es.len(),
            max_pages: config.max_pages_per_side,
        });
    }

    tracing::debug!(
        en_pages = en.len(),
        es_pages = es.len(),
        threshold = config.threshold,
        gap_penalty = config.effective_gap_penalty(),
        "filling alignment matrix"
    );

    let table = matrix::ScoreMatrix::fill(
        en,
        es,
        config.threshold,
        config.effective_gap_penalty() as i64,
        guard,
    )?;
    let steps = table.traceback(en, es);

    debug_assert!(
        is_monotonic(&steps),
        "alignment path must be strictly increasing on both sides"
    );

    Ok(AlignmentPath {
        score: table.final_score(),
        steps,
    })
}

fn is_monotonic(steps: &[AlignStep]) -> bool {
    let mut next_en = 0usize;
    let mut next_es = 0usize;
    for step in steps {
        match *step {
            AlignStep::Match { en, es, .. } => {
                if en != next_en || es != next_es {
                    return false;
                }
                next_en += 1;
                next_es += 1;
            }
            AlignStep::EnGap { en } => {
                if en != next_en {
                    return false;
                }
                next_en += 1;
            }
            AlignStep::EsGap { es } => {
                if es != next_es {
                    return false;
                }
                next_es += 1;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;

    const PAGE_A: Fingerprint = Fingerprint::from_bits(0);
    const PAGE_B: Fingerprint = Fingerprint::from_bits(0x0F0F_0F0F_0F0F_0F0F);
    const PAGE_C: Fingerprint = Fingerprint::from_bits(0xFFFF_FFFF_0000_0000);

    fn config(threshold: u32) -> AlignConfig {
        AlignConfig::builder()
            .threshold(threshold)
            .build()
            .expect("valid config")
    }

    /// Sylvester-Hadamard row `k`: distinct rows differ in exactly 32 bits.
    fn walsh(k: u32) -> Fingerprint {
        let bits = (0..64u32).fold(0u64, |acc, p| {
            acc | ((((p & k).count_ones() & 1) as u64) << p)
        });
        Fingerprint::from_bits(bits)
    }

    fn flip(fp: Fingerprint, nbits: u32) -> Fingerprint {
        let mask = if nbits == 0 { 0 } else { u64::MAX >> (64 - nbits) };
        Fingerprint::from_bits(fp.bits() ^ mask)
    }

    #[test]
    fn identical_sequences_align_on_the_diagonal() {
        let seq: Vec<_> = (1..=6).map(walsh).collect();
        let path = align_sequences(&seq, &seq, &config(20)).expect("align");
        let expected: Vec<_> = (0..6)
            .map(|i| AlignStep::Match {
                en: i,
                es: i,
                distance: 0,
            })
            .collect();
        assert_eq!(path.steps, expected);
        assert_eq!(path.score, 6 * 20);
    }

    #[test]
    fn missing_middle_page_becomes_en_gap() {
        let path = align_sequences(&[PAGE_A, PAGE_B, PAGE_C], &[PAGE_A, PAGE_C], &config(20))
            .expect("align");
        assert_eq!(
            path.steps,
            vec![
                AlignStep::Match {
                    en: 0,
                    es: 0,
                    distance: 0
                },
                AlignStep::EnGap { en: 1 },
                AlignStep::Match {
                    en: 2,
                    es: 1,
                    distance: 0
                },
            ]
        );
        assert_eq!(path.score, 20 - 21 + 20);
    }

    #[test]
    fn extra_es_cover_becomes_es_gap() {
        let cover = walsh(40);
        let en: Vec<_> = (1..=4).map(walsh).collect();
        let mut es = vec![cover];
        es.extend(en.iter().map(|fp| flip(*fp, 3)));

        let path = align_sequences(&en, &es, &config(20)).expect("align");
        assert_eq!(path.steps[0], AlignStep::EsGap { es: 0 });
        for (i, step) in path.steps[1..].iter().enumerate() {
            assert_eq!(
                *step,
                AlignStep::Match {
                    en: i,
                    es: i + 1,
                    distance: 3
                }
            );
        }
    }

    #[test]
    fn empty_sides_degenerate_to_gaps() {
        let seq = vec![PAGE_A, PAGE_B];

        let path = align_sequences(&[], &seq, &config(20)).expect("align");
        assert_eq!(
            path.steps,
            vec![AlignStep::EsGap { es: 0 }, AlignStep::EsGap { es: 1 }]
        );

        let path = align_sequences(&seq, &[], &config(20)).expect("align");
        assert_eq!(
            path.steps,
            vec![AlignStep::EnGap { en: 0 }, AlignStep::EnGap { en: 1 }]
        );

        let path = align_sequences(&[], &[], &config(20)).expect("align");
        assert!(path.steps.is_empty());
        assert_eq!(path.score, 0);
    }

    #[test]
    fn diagonal_wins_ties_so_later_duplicate_is_matched() {
        // F[2][1]: diagonal -21 + 20 == up 20 - 21
        let path = align_sequences(&[PAGE_A, PAGE_A], &[PAGE_A], &config(20)).expect("align");
        assert_eq!(
            path.steps,
            vec![
                AlignStep::EnGap { en: 0 },
                AlignStep::Match {
                    en: 1,
                    es: 0,
                    distance: 0
                },
            ]
        );
    }

    #[test]
    fn en_gap_wins_tie_between_gaps() {
        let path = align_sequences(&[PAGE_A], &[PAGE_C], &config(20)).expect("align");
        // traceback takes the EN gap first, so it lands last in forward order
        assert_eq!(
            path.steps,
            vec![AlignStep::EsGap { es: 0 }, AlignStep::EnGap { en: 0 }]
        );
    }

    #[test]
    fn pages_beyond_threshold_are_never_matched() {
        let en = vec![PAGE_A];
        let es = vec![flip(PAGE_A, 21)];
        let path = align_sequences(&en, &es, &config(20)).expect("align");
        assert!(
            path.steps
                .iter()
                .all(|s| !matches!(s, AlignStep::Match { .. }))
        );

        let path = align_sequences(&en, &es, &config(21)).expect("align");
        assert_eq!(
            path.steps,
            vec![AlignStep::Match {
                en: 0,
                es: 0,
                distance: 21
            }]
        );
    }

    #[test]
    fn huge_gap_penalty_still_never_matches_disallowed_pairs() {
        let cfg = AlignConfig::builder()
            .threshold(10)
            .gap_penalty(-1_000_000_000)
            .build()
            .expect("valid config");
        let path = align_sequences(&[PAGE_A, PAGE_B], &[PAGE_C, PAGE_B], &cfg).expect("align");
        assert!(path.steps.iter().all(|s| match s {
            AlignStep::Match { distance, .. } => *distance <= 10,
            _ => true,
        }));
        assert!(path.steps.contains(&AlignStep::Match {
            en: 1,
            es: 1,
            distance: 0
        }));
    }

    #[test]
    fn paths_never_cross() {
        let mut state = 0x2545_F491_4F6C_DD1Du64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        for _ in 0..25 {
            let en: Vec<_> = (0..(next() % 18)).map(|_| Fingerprint::from_bits(next())).collect();
            let mut es = Vec::new();
            for fp in &en {
                if next() % 4 != 0 {
                    es.push(flip(*fp, (next() % 6) as u32));
                }
            }
            if next() % 2 == 0 {
                es.insert(0, Fingerprint::from_bits(next()));
            }

            let path = align_sequences(&en, &es, &config(22)).expect("align");
            assert!(is_monotonic(&path.steps));
            let en_seen = path
                .steps
                .iter()
                .filter(|s| !matches!(s, AlignStep::EsGap { .. }))
                .count();
            let es_seen = path
                .steps
                .iter()
                .filter(|s| !matches!(s, AlignStep::EnGap { .. }))
                .count();
            assert_eq!(en_seen, en.len());
            assert_eq!(es_seen, es.len());
        }
    }

    #[test]
    fn oversized_input_is_rejected_before_allocation() {
        let cfg = AlignConfig::builder()
            .max_pages_per_side(3)
            .build()
            .expect("valid config");
        let seq: Vec<_> = (0..4).map(walsh).collect();
        let err = align_sequences(&seq, &seq[..1], &cfg).expect_err("too many pages");
        assert_eq!(
            err,
            AlignError::LimitsExceeded {
                en_pages: 4,
                es_pages: 1,
                max_pages: 3
            }
        );
        assert_eq!(err.code(), error_codes::ALIGN_LIMITS_EXCEEDED);
    }

    #[test]
    fn cancelled_guard_aborts_fill() {
        let token = CancelToken::new();
        token.cancel();
        let guard = RunGuard::new(token, None);
        let seq: Vec<_> = (0..3).map(walsh).collect();
        let err = align_sequences_guarded(&seq, &seq, &config(20), &guard)
            .expect_err("cancelled before fill");
        assert_eq!(err, AlignError::Cancelled);
    }
}
