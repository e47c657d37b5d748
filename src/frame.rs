//! Frame data passed between the pool and its workers

use std::cmp::Ordering;

use crate::dropout::DropoutRegion;
use crate::geometry::FieldParity;
use crate::stats::CorrectionStats;

/// 16-bit composite sample as stored in a TBC field
pub type Sample = u16;

/// Opaque per-field quality score; higher is better
///
/// Only used to rank otherwise equal replacement candidates. Ordering is
/// total (`f64::total_cmp`), so NaN scores still sort deterministically.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quality(pub f64);

impl PartialEq for Quality {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Quality {}

impl PartialOrd for Quality {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quality {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One field of one source, ready for correction
#[derive(Debug, Clone)]
pub struct FieldData {
    /// Capture-order sequence number of the field (1-based)
    pub sequence: usize,
    pub pixels: Vec<Sample>,
    pub regions: Vec<DropoutRegion>,
    pub quality: Quality,
}

impl FieldData {
    /// Whether a dropout in this field overlaps `start..end` on `line`
    pub fn has_dropout(&self, line: usize, start: usize, end: usize) -> bool {
        self.regions.iter().any(|r| r.overlaps(line, start, end))
    }
}

/// Both fields of a frame from one source
#[derive(Debug, Clone)]
pub struct SourceFrame {
    /// Index of the source; 0 is the primary being corrected
    pub source: usize,
    pub first: FieldData,
    pub second: FieldData,
}

impl SourceFrame {
    pub fn field(&self, parity: FieldParity) -> &FieldData {
        match parity {
            FieldParity::First => &self.first,
            FieldParity::Second => &self.second,
        }
    }
}

/// Unit of work handed to a worker
///
/// `sources` holds only sources that have data for this frame; the primary
/// source is always the first entry.
#[derive(Debug, Clone)]
pub struct FrameWorkItem {
    /// Sequential frame number of the primary source (1-based)
    pub frame: usize,
    pub sources: Vec<SourceFrame>,
}

impl FrameWorkItem {
    pub fn primary(&self) -> &SourceFrame {
        &self.sources[0]
    }
}

/// A corrected frame waiting to be written
#[derive(Debug, Clone)]
pub struct OutputFrame {
    pub frame: usize,
    pub first: Vec<Sample>,
    pub second: Vec<Sample>,
    pub first_sequence: usize,
    pub second_sequence: usize,
    pub stats: CorrectionStats,
}

impl OutputFrame {
    /// Fields in original capture order
    pub fn fields_in_capture_order(&self) -> [&[Sample]; 2] {
        if self.first_sequence < self.second_sequence {
            [&self.first, &self.second]
        } else {
            [&self.second, &self.first]
        }
    }
}
