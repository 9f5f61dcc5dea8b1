use std::fmt;
use std::ops::AddAssign;

use serde::Serialize;

use super::filter::SkipReason;

/// Per-book counters. Every candidate image lands in exactly one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub saved: usize,
    /// Rejected by the explicit ignore-hash list.
    pub ignored: usize,
    /// Referenced but absent, or unreadable.
    pub missing: usize,
    /// Seen earlier in this book, or in the persistent cache.
    pub duplicates: usize,
    pub filtered_by_size: usize,
    pub filtered_by_dimensions: usize,
    pub filtered_by_aspect_ratio: usize,
}

impl ExtractionStats {
    pub fn record_skip(&mut self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::TooSmall => &mut self.filtered_by_size,
            SkipReason::TooNarrow | SkipReason::TooShort => &mut self.filtered_by_dimensions,
            SkipReason::ExtremeAspectRatio => &mut self.filtered_by_aspect_ratio,
            SkipReason::CachedDuplicate | SkipReason::Duplicate => &mut self.duplicates,
            SkipReason::IgnoredHash => &mut self.ignored,
        };
        *counter += 1;
    }

    pub fn skipped(&self) -> usize {
        self.ignored
            + self.duplicates
            + self.filtered_by_size
            + self.filtered_by_dimensions
            + self.filtered_by_aspect_ratio
    }
}

impl AddAssign for ExtractionStats {
    fn add_assign(&mut self, other: Self) {
        self.saved += other.saved;
        self.ignored += other.ignored;
        self.missing += other.missing;
        self.duplicates += other.duplicates;
        self.filtered_by_size += other.filtered_by_size;
        self.filtered_by_dimensions += other.filtered_by_dimensions;
        self.filtered_by_aspect_ratio += other.filtered_by_aspect_ratio;
    }
}

impl fmt::Display for ExtractionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} saved", self.saved)?;
        let others = [
            (self.ignored, "ignored by hash"),
            (self.duplicates, "duplicate"),
            (self.filtered_by_size, "too small"),
            (self.filtered_by_dimensions, "below minimum dimensions"),
            (self.filtered_by_aspect_ratio, "extreme aspect ratio"),
            (self.missing, "missing"),
        ];
        for (count, label) in others {
            if count > 0 {
                write!(f, ", {count} {label}")?;
            }
        }
        Ok(())
    }
}
