use crate::alignment::{AlignError, AlignStep};
use crate::cancel::RunGuard;
use crate::fingerprint::Fingerprint;
use crate::similarity::{distance, score_distance, DISALLOWED_MATCH};

/// Winning move into a DP cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Match EN page `i-1` with ES page `j-1`.
    Diag,
    /// EN page `i-1` left unmatched.
    Up,
    /// ES page `j-1` left unmatched.
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentCell {
    pub score: i64,
    pub mv: Move,
}

/// Full `(m+1) x (n+1)` DP table, row-major in one allocation.
pub(crate) struct ScoreMatrix {
    cols: usize,
    cells: Vec<AlignmentCell>,
}

impl ScoreMatrix {
    pub(crate) fn fill(
        en: &[Fingerprint],
        es: &[Fingerprint],
        threshold: u32,
        gap: i64,
        guard: &RunGuard,
    ) -> Result<Self, AlignError> {
        let rows = en.len() + 1;
        let cols = es.len() + 1;
        let idx = |i: usize, j: usize| -> usize { i * cols + j };

        let mut cells = vec![
            AlignmentCell {
                score: 0,
                mv: Move::Diag,
            };
            rows * cols
        ];

        for j in 1..cols {
            cells[idx(0, j)] = AlignmentCell {
                score: cells[idx(0, j - 1)].score + gap,
                mv: Move::Left,
            };
        }

        for i in 1..rows {
            guard.check()?;

            cells[idx(i, 0)] = AlignmentCell {
                score: cells[idx(i - 1, 0)].score + gap,
                mv: Move::Up,
            };

            for j in 1..cols {
                let up = cells[idx(i - 1, j)].score + gap;
                let left = cells[idx(i, j - 1)].score + gap;
                let mut best = if up >= left {
                    AlignmentCell {
                        score: up,
                        mv: Move::Up,
                    }
                } else {
                    AlignmentCell {
                        score: left,
                        mv: Move::Left,
                    }
                };

                let pair_score = score_distance(distance(en[i - 1], es[j - 1]), threshold);
                if pair_score != DISALLOWED_MATCH {
                    let diag = cells[idx(i - 1, j - 1)].score + pair_score as i64;
                    if diag >= best.score {
                        best = AlignmentCell {
                            score: diag,
                            mv: Move::Diag,
                        };
                    }
                }

                cells[idx(i, j)] = best;
            }
        }

        Ok(Self { cols, cells })
    }

    pub(crate) fn cell(&self, i: usize, j: usize) -> AlignmentCell {
        self.cells[i * self.cols + j]
    }

    pub(crate) fn final_score(&self) -> i64 {
        self.cells.last().map(|c| c.score).unwrap_or(0)
    }

    /// Walks back from `F[m][n]` to the origin and returns the path in forward
    /// order.
    pub(crate) fn traceback(&self, en: &[Fingerprint], es: &[Fingerprint]) -> Vec<AlignStep> {
        let mut steps = Vec::with_capacity(en.len() + es.len());
        let mut i = en.len();
        let mut j = es.len();

        while i > 0 || j > 0 {
            let mv = if i == 0 {
                Move::Left
            } else if j == 0 {
                Move::Up
            } else {
                self.cell(i, j).mv
            };

            match mv {
                Move::Diag => {
                    steps.push(AlignStep::Match {
                        en: i - 1,
                        es: j - 1,
                        distance: distance(en[i - 1], es[j - 1]),
                    });
                    i -= 1;
                    j -= 1;
                }
                Move::Up => {
                    steps.push(AlignStep::EnGap { en: i - 1 });
                    i -= 1;
                }
                Move::Left => {
                    steps.push(AlignStep::EsGap { es: j - 1 });
                    j -= 1;
                }
            }
        }

        steps.reverse();
        steps
    }
}
