//! Hamming distance between fingerprints and the alignment score derived from it.

use serde::Serialize;

use crate::fingerprint::Fingerprint;

/// Score returned for pairs whose distance exceeds the threshold. Far below any
/// reachable cumulative gap score, so a disallowed diagonal never wins.
pub const DISALLOWED_MATCH: i32 = i32::MIN / 4;

const GOOD_MAX_DISTANCE: u32 = 12;
const WEAK_MAX_DISTANCE: u32 = 25;

/// Number of differing bits, in `0..=64`.
pub fn distance(a: Fingerprint, b: Fingerprint) -> u32 {
    (a.bits() ^ b.bits()).count_ones()
}

/// `threshold - distance` when the pair may be matched, [`DISALLOWED_MATCH`]
/// otherwise.
pub fn score(a: Fingerprint, b: Fingerprint, threshold: u32) -> i32 {
    score_distance(distance(a, b), threshold)
}

pub(crate) fn score_distance(distance: u32, threshold: u32) -> i32 {
    if distance <= threshold {
        threshold as i32 - distance as i32
    } else {
        DISALLOWED_MATCH
    }
}

/// Diagnostic label for a matched pair. Never consulted by the aligner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    Good,
    Weak,
    Poor,
}

impl QualityBand {
    pub fn from_distance(distance: u32) -> Self {
        if distance <= GOOD_MAX_DISTANCE {
            QualityBand::Good
        } else if distance <= WEAK_MAX_DISTANCE {
            QualityBand::Weak
        } else {
            QualityBand::Poor
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityBand::Good => "good",
            QualityBand::Weak => "weak",
            QualityBand::Poor => "poor",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(bits: u64) -> Fingerprint {
        Fingerprint::from_bits(bits)
    }

    #[test]
    fn distance_is_popcount_of_xor() {
        assert_eq!(distance(fp(0), fp(0)), 0);
        assert_eq!(distance(fp(0), fp(u64::MAX)), 64);
        assert_eq!(distance(fp(0b1011), fp(0b0001)), 2);
        assert_eq!(distance(fp(0xF0), fp(0x0F)), distance(fp(0x0F), fp(0xF0)));
    }

    #[test]
    fn score_is_gated_by_threshold() {
        assert_eq!(score(fp(0), fp(0), 20), 20);
        assert_eq!(score(fp(0), fp(0xF), 20), 16);
        assert_eq!(score(fp(0), fp(0xFFFFF), 20), 0);
        assert_eq!(score(fp(0), fp(0x1FFFFF), 20), DISALLOWED_MATCH);
    }

    #[test]
    fn quality_bands_cover_distance_range() {
        assert_eq!(QualityBand::from_distance(0), QualityBand::Good);
        assert_eq!(QualityBand::from_distance(12), QualityBand::Good);
        assert_eq!(QualityBand::from_distance(13), QualityBand::Weak);
        assert_eq!(QualityBand::from_distance(25), QualityBand::Weak);
        assert_eq!(QualityBand::from_distance(26), QualityBand::Poor);
        assert_eq!(QualityBand::from_distance(64), QualityBand::Poor);
        assert_eq!(QualityBand::Weak.as_str(), "weak");
    }
}
