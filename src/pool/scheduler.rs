//! Corrector pool
//!
//! Frames of the primary source are handed out in order from a single input
//! cursor to a fixed set of worker threads. Workers finish in any order; the
//! output side keeps finished frames in a map keyed by frame number and
//! writes from the head whenever the next expected frame is present, so the
//! sink always sees frames strictly in order.
//!
//! ```text
//!            +-----------+      +----------+      +-------------+
//! sources -> | input lock| ---> | worker N | ---> | output lock | -> sink
//!            | (cursor)  |      | (search, |      | (reorder,   |
//!            +-----------+      |  filter) |      |  stats)     |
//!                               +----------+      +-------------+
//! ```
//!
//! Both locks are held only to move the cursor/read fields and to reorder
//! and write; all line-level work happens outside them. A write failure sets
//! the shared abort flag, after which no further frame is written and every
//! worker stops at its next frame.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::dropout::{classify, FrameCorrector, OVER_CORRECT_PADDING};
use crate::error::{Error, Result};
use crate::frame::{FieldData, FrameWorkItem, OutputFrame, SourceFrame};
use crate::stats::{CorrectionReport, CorrectionStats};

use super::sink::FieldSink;
use super::source::{FrameSource, SourceField};

/// Frames between progress messages
const PROGRESS_INTERVAL: usize = 100;

/// Number of worker threads to use when none is configured
pub fn default_threads() -> usize {
    thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

/// Run configuration of the corrector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectorConfig {
    /// Treat the second captured field of each frame as the first
    pub reverse: bool,
    /// Only take replacements from the dropout's own field
    pub intra_field: bool,
    /// Widen every dropout before correcting it
    pub over_correct: bool,
    /// Number of worker threads
    pub threads: usize,
}

impl Default for CorrectorConfig {
    fn default() -> Self {
        CorrectorConfig {
            reverse: false,
            intra_field: false,
            over_correct: false,
            threads: default_threads(),
        }
    }
}

impl CorrectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn with_intra_field(mut self, intra_field: bool) -> Self {
        self.intra_field = intra_field;
        self
    }

    pub fn with_over_correct(mut self, over_correct: bool) -> Self {
        self.over_correct = over_correct;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    fn padding(&self) -> usize {
        if self.over_correct {
            OVER_CORRECT_PADDING
        } else {
            0
        }
    }
}

struct InputState {
    next_frame: usize,
}

struct OutputState<K> {
    sink: K,
    next_frame: usize,
    pending: BTreeMap<usize, OutputFrame>,
    stats: CorrectionStats,
    frames_written: usize,
}

/// Fields of one source for one frame, before classification
struct RawSourceFrame {
    source: usize,
    first: (usize, SourceField),
    second: (usize, SourceField),
}

/// Multi-threaded dropout corrector writing to a [`FieldSink`]
pub struct CorrectorPool<K: FieldSink> {
    config: CorrectorConfig,
    sources: Vec<Box<dyn FrameSource>>,
    disc_ranges: Vec<Option<RangeInclusive<i32>>>,
    corrector: FrameCorrector,
    last_frame: usize,
    input: Mutex<InputState>,
    output: Mutex<OutputState<K>>,
    started: AtomicBool,
    abort: AtomicBool,
    failure: Mutex<Option<Error>>,
}

impl<K: FieldSink> CorrectorPool<K> {
    /// Create a pool correcting `sources[0]` with help from the others
    pub fn new(sources: Vec<Box<dyn FrameSource>>, sink: K, config: CorrectorConfig) -> Result<Self> {
        if config.threads == 0 {
            return Err(Error::config("Number of threads must be greater than zero"));
        }
        let primary = sources
            .first()
            .ok_or_else(|| Error::invalid_input("At least one source is required"))?;

        let geometry = primary.geometry().clone();
        geometry.validate()?;
        for (index, source) in sources.iter().enumerate().skip(1) {
            source.geometry().validate()?;
            if !geometry.is_compatible(source.geometry()) {
                return Err(Error::geometry(format!(
                    "Source {} does not match the field geometry of the primary source",
                    index
                )));
            }
        }

        let disc_ranges: Vec<_> = sources.iter().map(|s| s.disc_frame_range()).collect();
        if sources.len() > 1 && disc_ranges[0].is_none() {
            warn!("Primary source has no disc frame numbers; other sources will not be used");
        }

        let last_frame = primary.frame_count();
        let corrector = FrameCorrector::new(geometry, config.intra_field);

        Ok(CorrectorPool {
            config,
            sources,
            disc_ranges,
            corrector,
            last_frame,
            input: Mutex::new(InputState { next_frame: 1 }),
            output: Mutex::new(OutputState {
                sink,
                next_frame: 1,
                pending: BTreeMap::new(),
                stats: CorrectionStats::default(),
                frames_written: 0,
            }),
            started: AtomicBool::new(false),
            abort: AtomicBool::new(false),
            failure: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &CorrectorConfig {
        &self.config
    }

    /// Number of frames that will be processed
    pub fn frame_count(&self) -> usize {
        self.last_frame
    }

    /// Whether the run has been aborted
    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    /// Frames written to the sink so far
    pub fn frames_written(&self) -> usize {
        self.output.lock().frames_written
    }

    /// Give back the sink, e.g. to inspect it after a run
    pub fn into_sink(self) -> K {
        self.output.into_inner().sink
    }

    /// Correct every frame of the primary source
    ///
    /// Returns the run report, or [`Error::Aborted`] if writing, flushing or
    /// reading the primary source failed; frames written before the failure
    /// form a contiguous prefix.
    pub fn process(&self) -> Result<CorrectionReport> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(Error::invalid_state("Corrector pool has already been run"));
        }

        let timer = Instant::now();
        if let Err(err) = self.copy_leading_field() {
            self.fail(err);
            return Err(self.aborted());
        }

        info!(
            "Using {} threads to process {} frames",
            self.config.threads, self.last_frame
        );

        thread::scope(|scope| {
            for id in 0..self.config.threads {
                let spawned = thread::Builder::new()
                    .name(format!("dropfix-worker-{}", id))
                    .spawn_scoped(scope, || self.run_worker());
                if let Err(e) = spawned {
                    self.fail(Error::Io(e));
                    break;
                }
            }
        });

        if self.is_aborted() {
            return Err(self.aborted());
        }

        let mut output = self.output.lock();
        if output.frames_written != self.last_frame || !output.pending.is_empty() {
            return Err(Error::invalid_state(format!(
                "Wrote {} of {} frames with {} still pending",
                output.frames_written,
                self.last_frame,
                output.pending.len()
            )));
        }
        let flushed = output.sink.flush();
        if let Err(source) = flushed {
            drop(output);
            self.fail(Error::Write {
                frame: self.last_frame,
                source,
            });
            return Err(self.aborted());
        }

        let elapsed = timer.elapsed().as_secs_f64();
        let report = CorrectionReport::new(output.frames_written, &output.stats);
        info!(
            "Dropout correction complete - {} frames in {:.2} seconds ({:.2} FPS)",
            self.last_frame,
            elapsed,
            if elapsed > 0.0 {
                self.last_frame as f64 / elapsed
            } else {
                0.0
            }
        );
        info!(
            "Same-source concealments: {}, multi-source concealments: {}, multi-source corrections: {}, uncorrected: {}, average distance: {:.2}",
            report.same_source_concealments,
            report.multi_source_concealments,
            report.multi_source_corrections,
            report.uncorrected,
            report.average_distance
        );

        Ok(report)
    }

    /// Take the next frame to correct, or `None` once every frame is out
    ///
    /// Frames are returned in strictly increasing order. Other sources are
    /// read only when their disc frame range covers the frame.
    pub fn acquire_work(&self) -> Result<Option<FrameWorkItem>> {
        let (frame, raw) = {
            let mut input = self.input.lock();
            if input.next_frame > self.last_frame {
                return Ok(None);
            }
            let frame = input.next_frame;
            input.next_frame += 1;
            (frame, self.read_frame(frame)?)
        };

        debug!(frame, sources = raw.len(), "Dispatching frame");
        Ok(Some(self.build_item(frame, raw)))
    }

    /// Hand back a corrected frame and write out everything now in order
    ///
    /// Once the run is aborted, results are dropped without writing.
    pub fn submit_result(&self, frame: OutputFrame) -> Result<()> {
        let mut guard = self.output.lock();
        if self.is_aborted() {
            return Ok(());
        }

        let output = &mut *guard;
        output.stats += frame.stats;
        output.pending.insert(frame.frame, frame);

        while let Some(next) = output.pending.remove(&output.next_frame) {
            if let Err(source) = output.sink.write_frame(next.fields_in_capture_order()) {
                self.abort.store(true, Ordering::Release);
                error!("Writing frame {} to the output failed: {}", next.frame, source);
                return Err(Error::Write {
                    frame: next.frame,
                    source,
                });
            }
            output.frames_written += 1;
            if output.next_frame % PROGRESS_INTERVAL == 0 {
                info!("Processed and written frame {}", output.next_frame);
            }
            output.next_frame += 1;
        }

        Ok(())
    }

    fn run_worker(&self) {
        while !self.is_aborted() {
            let item = match self.acquire_work() {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(err) => {
                    self.fail(err);
                    break;
                }
            };

            let corrected = self.corrector.correct(&item);
            if let Err(err) = self.submit_result(corrected) {
                self.fail(err);
                break;
            }
        }
    }

    fn fail(&self, err: Error) {
        let mut failure = self.failure.lock();
        if failure.is_none() {
            error!("Aborting dropout correction: {}", err);
            *failure = Some(err);
        }
        self.abort.store(true, Ordering::Release);
    }

    fn aborted(&self) -> Error {
        let reason = self
            .failure
            .lock()
            .take()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "aborted".to_string());
        Error::Aborted {
            frames_written: self.frames_written(),
            reason,
        }
    }

    /// Copy sequential field 1 when it does not belong to frame 1
    fn copy_leading_field(&self) -> Result<()> {
        if self.last_frame == 0 {
            return Ok(());
        }
        let primary = &self.sources[0];
        let (first, second) = primary.field_numbers(1)?;
        if first == 1 || second == 1 {
            return Ok(());
        }

        warn!("Leading field 1 is out of field order; copying it unchanged");
        let field = primary.read_field(1)?;
        self.check_field_len(0, 1, &field)?;
        self.output
            .lock()
            .sink
            .write_field(&field.pixels)
            .map_err(|source| Error::Write { frame: 0, source })
    }

    /// Read the fields of every source that has data for `frame`
    fn read_frame(&self, frame: usize) -> Result<Vec<RawSourceFrame>> {
        let mut raw = vec![self.read_source_frame(0, frame)?];
        if self.sources.len() == 1 {
            return Ok(raw);
        }

        let Some(disc_frame) = self.sources[0].disc_frame(frame) else {
            debug!(frame, "No disc frame number; correcting from the primary source only");
            return Ok(raw);
        };

        for (index, source) in self.sources.iter().enumerate().skip(1) {
            let covered = self.disc_ranges[index]
                .as_ref()
                .map_or(false, |range| range.contains(&disc_frame));
            if !covered {
                continue;
            }
            let Some(local) = source.sequential_frame(disc_frame) else {
                continue;
            };
            // Other sources are optional per frame
            match self.read_source_frame(index, local) {
                Ok(source_frame) => raw.push(source_frame),
                Err(err) => warn!(
                    frame,
                    source = index,
                    "Skipping source for this frame: {}",
                    err
                ),
            }
        }

        Ok(raw)
    }

    fn read_source_frame(&self, index: usize, frame: usize) -> Result<RawSourceFrame> {
        let source = &self.sources[index];
        let (first_number, second_number) = source.field_numbers(frame)?;

        // Read in capture order to avoid seeking backwards
        let (first, second) = if first_number < second_number {
            let first = source.read_field(first_number)?;
            (first, source.read_field(second_number)?)
        } else {
            let second = source.read_field(second_number)?;
            (source.read_field(first_number)?, second)
        };
        self.check_field_len(index, first_number, &first)?;
        self.check_field_len(index, second_number, &second)?;

        Ok(RawSourceFrame {
            source: index,
            first: (first_number, first),
            second: (second_number, second),
        })
    }

    fn check_field_len(&self, index: usize, number: usize, field: &SourceField) -> Result<()> {
        let expected = self.sources[index].geometry().field_len();
        if field.pixels.len() != expected {
            return Err(Error::source_err(format!(
                "Source {} field {} has {} samples, expected {}",
                index,
                number,
                field.pixels.len(),
                expected
            )));
        }
        Ok(())
    }

    /// Classify dropouts and apply field-order reversal
    fn build_item(&self, frame: usize, raw: Vec<RawSourceFrame>) -> FrameWorkItem {
        let padding = self.config.padding();
        let sources = raw
            .into_iter()
            .map(|raw| {
                let geometry = self.sources[raw.source].geometry();
                let to_field = |(sequence, field): (usize, SourceField)| FieldData {
                    sequence,
                    regions: classify(&field.dropouts, geometry, padding),
                    pixels: field.pixels,
                    quality: field.quality,
                };
                let (first, second) = if self.config.reverse {
                    (raw.second, raw.first)
                } else {
                    (raw.first, raw.second)
                };
                SourceFrame {
                    source: raw.source,
                    first: to_field(first),
                    second: to_field(second),
                }
            })
            .collect();

        FrameWorkItem { frame, sources }
    }
}
