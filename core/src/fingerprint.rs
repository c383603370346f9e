//! Average-hash fingerprints for page images.
//!
//! A page is reduced to grayscale, area-averaged onto an 8x8 grid and each cell
//! is compared with the grid mean. Cell `i` (row-major) becomes bit `63 - i`,
//! so the hex form of a fingerprint reads in raster order.
//!
//! All arithmetic after decoding is integer-only: cell means are kept as
//! fixed-point values with eight fractional bits, which keeps fingerprints
//! bit-identical across platforms and thread counts.

use std::fmt;

use image::GrayImage;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::error_codes;

pub const FINGERPRINT_BITS: u32 = 64;
const GRID: u32 = 8;
const FIXED_POINT_SHIFT: u32 = 8;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub const fn from_bits(bits: u64) -> Self {
        Fingerprint(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Bit for grid cell `cell` (row-major, `0..64`).
    pub fn cell(self, cell: u32) -> bool {
        debug_assert!(cell < FINGERPRINT_BITS);
        (self.0 >> (FINGERPRINT_BITS - 1 - cell)) & 1 == 1
    }

    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 16 {
            return None;
        }
        u64::from_str_radix(hex, 16).ok().map(Fingerprint)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:016x})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Fingerprint plus the decoded dimensions, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageFingerprint {
    pub fingerprint: Fingerprint,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("[PGALIGN_DECODE_001] image could not be decoded: {reason}")]
    Decode { reason: String },
    #[error("[PGALIGN_DECODE_002] image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

impl DecodeError {
    pub fn code(&self) -> &'static str {
        match self {
            DecodeError::Decode { .. } => error_codes::DECODE_FAILED,
            DecodeError::EmptyImage { .. } => error_codes::DECODE_EMPTY_IMAGE,
        }
    }
}

/// Decodes an encoded image (any format enabled on the `image` crate) and
/// fingerprints it.
pub fn fingerprint_bytes(bytes: &[u8]) -> Result<PageFingerprint, DecodeError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| DecodeError::Decode {
        reason: e.to_string(),
    })?;
    let gray = decoded.into_luma8();
    let fingerprint = fingerprint_gray(&gray)?;
    Ok(PageFingerprint {
        fingerprint,
        width: gray.width(),
        height: gray.height(),
    })
}

pub fn fingerprint_gray(image: &GrayImage) -> Result<Fingerprint, DecodeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage { width, height });
    }

    let cells = downsample(image);
    let total: u64 = cells.iter().sum();

    let mut bits = 0u64;
    for (idx, &cell) in cells.iter().enumerate() {
        // cell >= total / 64, without the division
        if cell * (GRID * GRID) as u64 >= total {
            bits |= 1 << (FINGERPRINT_BITS as usize - 1 - idx);
        }
    }

    Ok(Fingerprint(bits))
}

/// Box-filters the image onto the grid. Images narrower or shorter than the
/// grid reuse the nearest available pixel for each cell.
fn downsample(image: &GrayImage) -> [u64; (GRID * GRID) as usize] {
    let (width, height) = image.dimensions();
    let mut cells = [0u64; (GRID * GRID) as usize];

    for cy in 0..GRID {
        let (y0, y1) = cell_span(cy, height);
        for cx in 0..GRID {
            let (x0, x1) = cell_span(cx, width);
            let mut sum = 0u64;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += image.get_pixel(x, y).0[0] as u64;
                }
            }
            let count = ((x1 - x0) as u64) * ((y1 - y0) as u64);
            cells[(cy * GRID + cx) as usize] = (sum << FIXED_POINT_SHIFT) / count;
        }
    }

    cells
}

fn cell_span(cell: u32, extent: u32) -> (u32, u32) {
    let start = (cell as u64 * extent as u64 / GRID as u64) as u32;
    let end = ((cell as u64 + 1) * extent as u64 / GRID as u64) as u32;
    (start, end.max(start + 1))
}
