//! Common test utilities for dropfix integration tests
//!
//! In-memory frame sources with synthetic line patterns, plus sinks that
//! record what the corrector wrote or fail on demand.

#![allow(dead_code)]

use std::io;
use std::ops::RangeInclusive;
use std::sync::Arc;

use parking_lot::Mutex;

use dropfix_lib::dropout::Dropout;
use dropfix_lib::frame::{Quality, Sample};
use dropfix_lib::geometry::{FieldGeometry, VideoStandard};
use dropfix_lib::pool::{FieldSink, FrameSource, SourceField};
use dropfix_lib::{Error, Result};

// ============================================================================
// Geometry and line patterns
// ============================================================================

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 40;

/// Small PAL-like field: burst 4..10, picture 12..60, active lines 4..36
pub fn test_geometry() -> FieldGeometry {
    FieldGeometry {
        standard: VideoStandard::Pal,
        width: WIDTH,
        height: HEIGHT,
        colour_burst_start: 4,
        colour_burst_end: 10,
        active_video_start: 12,
        active_video_end: 60,
        first_active_line: 4,
        last_active_line: 36,
    }
}

/// Constant value of `line` in sequential field `field` of `source`
///
/// Distinct for up to four sources and 255 fields, so any sample identifies
/// where it was copied from.
pub fn pattern(source: usize, field: usize, line: usize) -> Sample {
    (source * 16384 + field * 64 + line) as Sample
}

pub fn pattern_field(geometry: &FieldGeometry, source: usize, field: usize) -> Vec<Sample> {
    (0..geometry.height)
        .flat_map(|line| std::iter::repeat(pattern(source, field, line)).take(geometry.width))
        .collect()
}

pub fn sample(field: &[Sample], line: usize, x: usize) -> Sample {
    field[line * WIDTH + x]
}

// ============================================================================
// In-memory frame source
// ============================================================================

/// A capture held in memory
///
/// Frame `n` is made of fields `2n - 1` and `2n` unless a leading field is
/// added, in which case every frame shifts by one field.
pub struct MemorySource {
    pub geometry: FieldGeometry,
    pub fields: Vec<SourceField>,
    pub frames: Vec<(usize, usize)>,
    /// Disc frame number of each local frame
    pub disc_frames: Vec<Option<i32>>,
    /// Field number whose read fails
    pub fail_on_field: Option<usize>,
}

impl MemorySource {
    pub fn new(source: usize, frames: usize) -> Self {
        Self::with_geometry(test_geometry(), source, frames)
    }

    pub fn with_geometry(geometry: FieldGeometry, source: usize, frames: usize) -> Self {
        let fields = (1..=frames * 2)
            .map(|field| SourceField {
                pixels: pattern_field(&geometry, source, field),
                dropouts: Vec::new(),
                quality: Quality(0.0),
            })
            .collect();
        MemorySource {
            geometry,
            fields,
            frames: (1..=frames).map(|f| (f * 2 - 1, f * 2)).collect(),
            disc_frames: vec![None; frames],
            fail_on_field: None,
        }
    }

    /// Number local frames as disc frames `first, first + 1, ...`
    pub fn with_disc_frames(mut self, first: i32) -> Self {
        self.disc_frames = (0..self.frames.len())
            .map(|i| Some(first + i as i32))
            .collect();
        self
    }

    /// Prepend an unpaired field before frame 1
    pub fn with_leading_field(mut self, source: usize) -> Self {
        let count = self.fields.len() + 1;
        self.fields = (1..=count)
            .map(|field| SourceField {
                pixels: pattern_field(&self.geometry, source, field),
                dropouts: Vec::new(),
                quality: Quality(0.0),
            })
            .collect();
        self.frames = self.frames.iter().map(|&(a, b)| (a + 1, b + 1)).collect();
        self
    }

    /// Store every frame with its second field captured first
    pub fn with_swapped_capture_order(mut self) -> Self {
        self.frames = self.frames.iter().map(|&(a, b)| (b, a)).collect();
        self
    }

    pub fn add_dropout(&mut self, field: usize, dropout: Dropout) {
        self.fields[field - 1].dropouts.push(dropout);
    }

    pub fn set_quality(&mut self, field: usize, quality: f64) {
        self.fields[field - 1].quality = Quality(quality);
    }

    pub fn field_pixels(&self, field: usize) -> &[Sample] {
        &self.fields[field - 1].pixels
    }

    pub fn boxed(self) -> Box<dyn FrameSource> {
        Box::new(self)
    }
}

impl FrameSource for MemorySource {
    fn geometry(&self) -> &FieldGeometry {
        &self.geometry
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn field_numbers(&self, frame: usize) -> Result<(usize, usize)> {
        frame
            .checked_sub(1)
            .and_then(|i| self.frames.get(i))
            .copied()
            .ok_or_else(|| Error::source_err(format!("No frame {}", frame)))
    }

    fn read_field(&self, field: usize) -> Result<SourceField> {
        if self.fail_on_field == Some(field) {
            return Err(Error::source_err(format!("Simulated read failure at field {}", field)));
        }
        field
            .checked_sub(1)
            .and_then(|i| self.fields.get(i))
            .cloned()
            .ok_or_else(|| Error::source_err(format!("No field {}", field)))
    }

    fn disc_frame(&self, frame: usize) -> Option<i32> {
        self.disc_frames.get(frame.checked_sub(1)?).copied().flatten()
    }

    fn sequential_frame(&self, disc_frame: i32) -> Option<usize> {
        self.disc_frames
            .iter()
            .position(|d| *d == Some(disc_frame))
            .map(|i| i + 1)
    }

    fn disc_frame_range(&self) -> Option<RangeInclusive<i32>> {
        let known = self.disc_frames.iter().flatten();
        let min = known.clone().min()?;
        let max = known.max()?;
        Some(*min..=*max)
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// One write call seen by a sink
#[derive(Debug, Clone, PartialEq)]
pub enum Written {
    Frame([Vec<Sample>; 2]),
    Field(Vec<Sample>),
}

impl Written {
    pub fn frame(&self) -> Option<&[Vec<Sample>; 2]> {
        match self {
            Written::Frame(fields) => Some(fields),
            Written::Field(_) => None,
        }
    }
}

/// Sink keeping every write, readable through a shared handle
#[derive(Clone, Default)]
pub struct RecordingSink {
    writes: Arc<Mutex<Vec<Written>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<Written> {
        self.writes.lock().clone()
    }

    pub fn frames(&self) -> Vec<[Vec<Sample>; 2]> {
        self.writes().iter().filter_map(|w| w.frame().cloned()).collect()
    }
}

impl FieldSink for RecordingSink {
    fn write_frame(&mut self, fields: [&[Sample]; 2]) -> io::Result<()> {
        self.writes
            .lock()
            .push(Written::Frame([fields[0].to_vec(), fields[1].to_vec()]));
        Ok(())
    }

    fn write_field(&mut self, field: &[Sample]) -> io::Result<()> {
        self.writes.lock().push(Written::Field(field.to_vec()));
        Ok(())
    }
}

/// Sink accepting `limit` frames, then failing every write
#[derive(Clone)]
pub struct FailingSink {
    pub recorder: RecordingSink,
    limit: usize,
    accepted: usize,
}

impl FailingSink {
    pub fn after(limit: usize) -> Self {
        FailingSink {
            recorder: RecordingSink::new(),
            limit,
            accepted: 0,
        }
    }
}

impl FieldSink for FailingSink {
    fn write_frame(&mut self, fields: [&[Sample]; 2]) -> io::Result<()> {
        if self.accepted >= self.limit {
            return Err(io::Error::new(io::ErrorKind::Other, "simulated disk full"));
        }
        self.accepted += 1;
        self.recorder.write_frame(fields)
    }

    fn write_field(&mut self, field: &[Sample]) -> io::Result<()> {
        self.recorder.write_field(field)
    }
}

/// Dropout on `line` covering columns `start..end`
pub fn dropout(line: usize, start: usize, end: usize) -> Dropout {
    Dropout::new(start, end, line)
}

/// Sequential field number a written field was taken from, by its pattern
pub fn field_number(field: &[Sample]) -> usize {
    ((field[0] as usize) % 16384) / 64
}

pub fn sources(list: Vec<MemorySource>) -> Vec<Box<dyn FrameSource>> {
    list.into_iter().map(MemorySource::boxed).collect()
}
