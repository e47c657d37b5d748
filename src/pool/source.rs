//! Frame sources
//!
//! A [`FrameSource`] is one capture of the media: random access to its
//! fields by sequential field number, the dropouts and quality score of each
//! field, and optionally a mapping between its own frame numbers and the
//! disc frame numbers shared by every capture of the same disc.

use std::ops::RangeInclusive;

use crate::dropout::Dropout;
use crate::error::Result;
use crate::frame::{Quality, Sample};
use crate::geometry::FieldGeometry;

/// One field as read from a source
#[derive(Debug, Clone)]
pub struct SourceField {
    pub pixels: Vec<Sample>,
    pub dropouts: Vec<Dropout>,
    pub quality: Quality,
}

/// A capture providing fields to the corrector
///
/// Frame and field numbers are 1-based. Implementations are read
/// concurrently, so interior state (file handles) must be synchronised.
pub trait FrameSource: Send + Sync {
    /// Layout of every field in this source
    fn geometry(&self) -> &FieldGeometry;

    /// Number of complete frames
    fn frame_count(&self) -> usize;

    /// Sequential field numbers of the first and second field of `frame`
    fn field_numbers(&self, frame: usize) -> Result<(usize, usize)>;

    /// Read a field by its sequential field number
    fn read_field(&self, field: usize) -> Result<SourceField>;

    /// Disc frame number of a local frame, if known
    fn disc_frame(&self, _frame: usize) -> Option<i32> {
        None
    }

    /// Local frame holding `disc_frame`, if this source has it
    fn sequential_frame(&self, _disc_frame: i32) -> Option<usize> {
        None
    }

    /// Disc frames covered by this source
    fn disc_frame_range(&self) -> Option<RangeInclusive<i32>> {
        None
    }
}
