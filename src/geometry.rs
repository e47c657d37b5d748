//! Field geometry for time-base-corrected interlaced video
//!
//! Every source carries one [`FieldGeometry`] describing the fixed sample
//! layout of its fields: line width, line count, where the colourburst sits
//! and which columns/lines hold visible picture. The video standard decides
//! how far apart two lines with the same subcarrier phase are.
//!
//! ## Line numbering
//!
//! Field lines are numbered from 0. The active line range is half-open,
//! `first_active_line..last_active_line`. Interleaving the two fields gives
//! output frame lines: `frame_line = 2 * field_line + parity`, where the
//! first field has parity 0 and the second field parity 1.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Analog video standard of a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoStandard {
    /// 625-line, 4.43 MHz subcarrier
    Pal,
    /// 525-line, 3.58 MHz subcarrier
    Ntsc,
}

impl VideoStandard {
    /// Same-field line step that keeps the subcarrier phase of a line
    ///
    /// PAL repeats its phase every 4 field lines (8 frame lines), NTSC every
    /// 2 field lines (4 frame lines).
    pub fn phase_step(self) -> usize {
        match self {
            VideoStandard::Pal => 4,
            VideoStandard::Ntsc => 2,
        }
    }

    /// Offset, in field lines, of the phase-matched lattice in the opposite field
    pub fn other_field_offset(self) -> usize {
        match self {
            VideoStandard::Pal => 2,
            VideoStandard::Ntsc => 1,
        }
    }

    /// Distance in frame lines of one phase-matched same-field step
    pub fn phase_stride_frame_lines(self) -> usize {
        self.phase_step() * 2
    }

    /// Sample rate of a 4fsc capture in Hz
    pub fn sample_rate(self) -> f64 {
        match self {
            VideoStandard::Pal => 17_734_472.0,
            VideoStandard::Ntsc => 14_318_180.0,
        }
    }

    /// Short name used in logs and metadata
    pub fn name(self) -> &'static str {
        match self {
            VideoStandard::Pal => "PAL",
            VideoStandard::Ntsc => "NTSC",
        }
    }
}

/// Which field of an interlaced frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldParity {
    First,
    Second,
}

impl FieldParity {
    /// Offset added to `2 * field_line` to get the frame line
    pub fn offset(self) -> usize {
        match self {
            FieldParity::First => 0,
            FieldParity::Second => 1,
        }
    }

    /// The opposite field
    pub fn other(self) -> FieldParity {
        match self {
            FieldParity::First => FieldParity::Second,
            FieldParity::Second => FieldParity::First,
        }
    }

    /// Both parities, first field first
    pub fn both() -> [FieldParity; 2] {
        [FieldParity::First, FieldParity::Second]
    }

    /// Frame line of `field_line` in this field
    pub fn frame_line(self, field_line: usize) -> usize {
        field_line * 2 + self.offset()
    }
}

/// Immutable per-source description of the field layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGeometry {
    pub standard: VideoStandard,
    /// Samples per line
    pub width: usize,
    /// Lines per field
    pub height: usize,
    pub colour_burst_start: usize,
    /// Exclusive end of the colourburst; visible video classification starts here
    pub colour_burst_end: usize,
    pub active_video_start: usize,
    /// Exclusive end of the visible part of a line
    pub active_video_end: usize,
    pub first_active_line: usize,
    /// Exclusive
    pub last_active_line: usize,
}

impl FieldGeometry {
    /// Default layout of a PAL 4fsc capture
    pub fn pal() -> Self {
        FieldGeometry {
            standard: VideoStandard::Pal,
            width: 1135,
            height: 313,
            colour_burst_start: 98,
            colour_burst_end: 138,
            active_video_start: 185,
            active_video_end: 1107,
            first_active_line: 22,
            last_active_line: 308,
        }
    }

    /// Default layout of an NTSC 4fsc capture
    pub fn ntsc() -> Self {
        FieldGeometry {
            standard: VideoStandard::Ntsc,
            width: 910,
            height: 263,
            colour_burst_start: 74,
            colour_burst_end: 110,
            active_video_start: 134,
            active_video_end: 894,
            first_active_line: 20,
            last_active_line: 259,
        }
    }

    /// Check that all column and line ranges are ordered and fit the field
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::geometry(format!(
                "Empty field {}x{}",
                self.width, self.height
            )));
        }
        if self.colour_burst_start > self.colour_burst_end
            || self.colour_burst_end > self.active_video_end
            || self.active_video_start > self.active_video_end
            || self.active_video_end > self.width
        {
            return Err(Error::geometry(format!(
                "Column ranges out of order: burst {}..{}, active {}..{}, width {}",
                self.colour_burst_start,
                self.colour_burst_end,
                self.active_video_start,
                self.active_video_end,
                self.width
            )));
        }
        if self.first_active_line >= self.last_active_line || self.last_active_line > self.height {
            return Err(Error::geometry(format!(
                "Active lines {}..{} do not fit a field of {} lines",
                self.first_active_line, self.last_active_line, self.height
            )));
        }
        Ok(())
    }

    /// Samples in one field buffer
    pub fn field_len(&self) -> usize {
        self.width * self.height
    }

    /// Sample range of `line` inside a field buffer
    pub fn line_range(&self, line: usize) -> Range<usize> {
        let start = line * self.width;
        start..start + self.width
    }

    /// Whether `line` is inside the active line range
    pub fn is_active_line(&self, line: usize) -> bool {
        (self.first_active_line..self.last_active_line).contains(&line)
    }

    /// Whether two sources can exchange lines
    pub fn is_compatible(&self, other: &FieldGeometry) -> bool {
        self.standard == other.standard && self.width == other.width && self.height == other.height
    }
}
