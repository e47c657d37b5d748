//! Dropout regions and their classification
//!
//! Raw dropouts arrive as `(start, end, line)` triples. Before correction each
//! one is assigned a [`Location`] from the column it starts in, and any region
//! crossing the colourburst/visible-video boundary is split in two, so that
//! no classified region spans both areas.

use crate::geometry::FieldGeometry;

/// Samples added on each side of a dropout in over-correct mode
pub const OVER_CORRECT_PADDING: usize = 24;

/// A dropout as reported by the capture metadata
///
/// Columns are half-open, `start..end`; `line` is a 0-based field line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dropout {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Dropout {
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Dropout { start, end, line }
    }
}

/// Part of the line a dropout sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// Sync tip through the end of the colourburst
    ColourBurst,
    /// Visible picture
    VisibleLine,
    /// After the visible picture; never corrected
    Unknown,
}

impl Location {
    pub fn name(self) -> &'static str {
        match self {
            Location::ColourBurst => "colour burst",
            Location::VisibleLine => "active video",
            Location::Unknown => "unknown",
        }
    }
}

/// A classified dropout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DropoutRegion {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub location: Location,
}

impl DropoutRegion {
    /// Whether this region shares columns with `start..end` on `line`
    ///
    /// Touching ranges count as overlapping.
    pub fn overlaps(&self, line: usize, start: usize, end: usize) -> bool {
        self.line == line && self.start <= end && start <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Classify the dropouts of one field
///
/// `padding` widens every dropout on both sides first (over-correct mode).
/// Empty ranges and ranges starting beyond the line are dropped. Line
/// numbers are kept as given; lines outside the active range are left for
/// the corrector to skip.
pub fn classify(dropouts: &[Dropout], geometry: &FieldGeometry, padding: usize) -> Vec<DropoutRegion> {
    let mut regions = Vec::with_capacity(dropouts.len());

    for dropout in dropouts {
        let start = dropout.start.saturating_sub(padding);
        let end = dropout.end.saturating_add(padding).min(geometry.width);
        if start >= end || dropout.line >= geometry.height {
            continue;
        }

        let mut start = start;
        if start < geometry.colour_burst_end {
            let burst_end = end.min(geometry.colour_burst_end);
            regions.push(DropoutRegion {
                start,
                end: burst_end,
                line: dropout.line,
                location: Location::ColourBurst,
            });
            if end <= geometry.colour_burst_end {
                continue;
            }
            // Remainder continues into the visible line
            start = geometry.colour_burst_end;
        }

        if start < geometry.active_video_end {
            regions.push(DropoutRegion {
                start,
                end: end.min(geometry.active_video_end),
                line: dropout.line,
                location: Location::VisibleLine,
            });
        } else {
            regions.push(DropoutRegion {
                start,
                end,
                line: dropout.line,
                location: Location::Unknown,
            });
        }
    }

    regions
}
