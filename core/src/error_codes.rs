//! Stable error codes attached to every library error.
//!
//! Codes are part of the public contract: they appear in error messages and in
//! the batch summary, so existing values must never be renumbered.

pub const CONFIG_INVALID_THRESHOLD: &str = "PGALIGN_CONFIG_001";
pub const CONFIG_INVALID_GAP_PENALTY: &str = "PGALIGN_CONFIG_002";
pub const CONFIG_NON_POSITIVE_LIMIT: &str = "PGALIGN_CONFIG_003";

pub const DECODE_FAILED: &str = "PGALIGN_DECODE_001";
pub const DECODE_EMPTY_IMAGE: &str = "PGALIGN_DECODE_002";

pub const ARCHIVE_IO: &str = "PGALIGN_ARCHIVE_001";
pub const ARCHIVE_NOT_ZIP: &str = "PGALIGN_ARCHIVE_002";
pub const ARCHIVE_TOO_MANY_ENTRIES: &str = "PGALIGN_ARCHIVE_003";
pub const ARCHIVE_PART_TOO_LARGE: &str = "PGALIGN_ARCHIVE_004";
pub const ARCHIVE_TOTAL_TOO_LARGE: &str = "PGALIGN_ARCHIVE_005";
pub const ARCHIVE_ZIP_READ: &str = "PGALIGN_ARCHIVE_006";
pub const ARCHIVE_WRITE: &str = "PGALIGN_ARCHIVE_007";

pub const ALIGN_LIMITS_EXCEEDED: &str = "PGALIGN_ALIGN_001";
pub const ALIGN_CANCELLED: &str = "PGALIGN_ALIGN_002";
pub const ALIGN_TIMED_OUT: &str = "PGALIGN_ALIGN_003";

pub const CHAPTER_OUTPUT_IO: &str = "PGALIGN_CHAPTER_001";
pub const CHAPTER_SERIALIZE: &str = "PGALIGN_CHAPTER_002";
pub const CHAPTER_MISSING_PAGE: &str = "PGALIGN_CHAPTER_003";

pub const BATCH_SCAN_IO: &str = "PGALIGN_BATCH_001";
