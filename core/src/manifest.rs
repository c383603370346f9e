//! The alignment manifest: the stable JSON document describing how the pages
//! of the two source archives map onto the shared page numbering.
//!
//! ```json
//! {
//!   "chapter": "012",
//!   "total_pages": 3,
//!   "matched": 2,
//!   "en_only": 1,
//!   "es_only": 0,
//!   "pages": [
//!     { "index": 0, "en": "p01.jpg", "es": "001.png", "type": "matched", "distance": 4 },
//!     { "index": 1, "en": "p02.jpg", "es": null, "type": "en_only" },
//!     { "index": 2, "en": "p03.jpg", "es": "002.png", "type": "matched", "distance": 0 }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::{AlignmentResult, PairType};
use crate::error_codes;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentManifest {
    pub chapter: String,
    pub total_pages: usize,
    pub matched: usize,
    pub en_only: usize,
    pub es_only: usize,
    pub pages: Vec<ManifestPage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPage {
    pub index: usize,
    pub en: Option<String>,
    pub es: Option<String>,
    #[serde(rename = "type")]
    pub page_type: PairType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ManifestError {
    #[error("[PGALIGN_CHAPTER_003] {side} page #{position} has no source name (only {available} pages known)")]
    UnknownPage {
        side: &'static str,
        position: usize,
        available: usize,
    },
}

impl ManifestError {
    pub fn code(&self) -> &'static str {
        match self {
            ManifestError::UnknownPage { .. } => error_codes::CHAPTER_MISSING_PAGE,
        }
    }
}

impl AlignmentManifest {
    /// Builds the manifest, resolving page positions to source entry names.
    /// `en_names[i]` must name EN page `i` of the aligned sequence, likewise ES.
    pub fn build<S: AsRef<str>>(
        result: &AlignmentResult,
        en_names: &[S],
        es_names: &[S],
    ) -> Result<Self, ManifestError> {
        let pages = result
            .pairs
            .iter()
            .map(|pair| {
                Ok(ManifestPage {
                    index: pair.index,
                    en: resolve_name("en", pair.en_pos(), en_names)?,
                    es: resolve_name("es", pair.es_pos(), es_names)?,
                    page_type: pair.pair_type(),
                    distance: pair.distance(),
                })
            })
            .collect::<Result<Vec<_>, ManifestError>>()?;

        Ok(Self {
            chapter: result.chapter.clone(),
            total_pages: result.total_pages,
            matched: result.matched,
            en_only: result.en_only,
            es_only: result.es_only,
            pages,
        })
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn resolve_name<S: AsRef<str>>(
    side: &'static str,
    position: Option<usize>,
    names: &[S],
) -> Result<Option<String>, ManifestError> {
    let Some(position) = position else {
        return Ok(None);
    };
    names
        .get(position)
        .map(|name| Some(name.as_ref().to_string()))
        .ok_or(ManifestError::UnknownPage {
            side,
            position,
            available: names.len(),
        })
}
