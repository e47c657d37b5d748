//! Replacement line search
//!
//! For a dropout on field line `L`, every available source is scanned for a
//! line whose own dropouts do not touch the damaged columns. Per source and
//! per field the scan runs upwards from `L` then downwards, keeping the first
//! clean line in each direction:
//!
//! ```text
//!   same field   L, L-s, L-2s, ...      then   L+s, L+2s, ...
//!   other field  nearest lattice line above    then   nearest below, ...
//! ```
//!
//! `s` is 1 when any line will do, or the standard's phase step when the
//! replacement must keep the colour subcarrier phase (PAL 4, NTSC 2). In the
//! other field the phase-matched lines sit on a lattice shifted by a
//! standard-specific offset. Colourburst dropouts never use the other field.
//!
//! Candidates are ranked by distance in output frame lines, then by higher
//! field quality, then by discovery order, so the choice is deterministic.

use std::iter;

use crate::frame::{Quality, SourceFrame};
use crate::geometry::{FieldGeometry, FieldParity};

use super::region::DropoutRegion;

/// A line chosen to replace a dropout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replacement {
    /// Index of the source the line comes from
    pub source: usize,
    /// Field line of the replacement
    pub line: usize,
    /// Whether the line is in the same field as the dropout
    pub same_field: bool,
    pub quality: Quality,
    /// Distance to the dropout in frame lines
    pub distance: usize,
}

impl Replacement {
    /// Field the replacement line lives in, given the dropout's field
    pub fn parity(&self, target: FieldParity) -> FieldParity {
        if self.same_field {
            target
        } else {
            target.other()
        }
    }

    /// Whether two replacements point at the same line of the same source
    pub fn same_line_as(&self, other: &Replacement) -> bool {
        self.source == other.source && self.line == other.line && self.same_field == other.same_field
    }
}

/// What to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRequest {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub parity: FieldParity,
    /// Only accept lines with the same subcarrier phase
    pub match_phase: bool,
    /// Also look in the opposite field
    pub allow_other_field: bool,
}

impl SearchRequest {
    pub fn for_region(
        region: &DropoutRegion,
        parity: FieldParity,
        match_phase: bool,
        allow_other_field: bool,
    ) -> Self {
        SearchRequest {
            line: region.line,
            start: region.start,
            end: region.end,
            parity,
            match_phase,
            allow_other_field,
        }
    }

    fn frame_line(&self) -> usize {
        self.parity.frame_line(self.line)
    }
}

/// Searches the sources of one frame for replacement lines
pub struct ReplacementSearch<'a> {
    geometry: &'a FieldGeometry,
    sources: &'a [SourceFrame],
}

impl<'a> ReplacementSearch<'a> {
    pub fn new(geometry: &'a FieldGeometry, sources: &'a [SourceFrame]) -> Self {
        ReplacementSearch { geometry, sources }
    }

    /// Best replacement for the request, if any source has a clean line
    pub fn find(&self, request: &SearchRequest) -> Option<Replacement> {
        best(self.candidates(request))
    }

    /// All candidates in discovery order
    pub fn candidates(&self, request: &SearchRequest) -> Vec<Replacement> {
        let mut candidates = Vec::new();
        if !self.geometry.is_active_line(request.line) {
            return candidates;
        }

        let stride = self.stride(request);
        for source in self.sources {
            // Same field: the dropout line itself first (clean in other sources)
            let same = request.parity;
            candidates.extend(self.scan(source, same, self.lines_up(Some(request.line as i64), stride), request));
            candidates.extend(self.scan(
                source,
                same,
                self.lines_down((request.line + stride) as i64, stride),
                request,
            ));

            if request.allow_other_field {
                let (up, down) = self.other_field_starts(request, stride);
                let other = request.parity.other();
                candidates.extend(self.scan(source, other, self.lines_up(up, stride), request));
                candidates.extend(self.scan(source, other, self.lines_down(down, stride), request));
            }
        }

        candidates
    }

    fn stride(&self, request: &SearchRequest) -> usize {
        if request.match_phase {
            self.geometry.standard.phase_step()
        } else {
            1
        }
    }

    /// Nearest other-field lattice lines above and below the dropout
    ///
    /// "Above" means a smaller frame line than the dropout's.
    fn other_field_starts(&self, request: &SearchRequest, stride: usize) -> (Option<i64>, i64) {
        let offset = if request.match_phase {
            self.geometry.standard.other_field_offset()
        } else {
            0
        };
        let anchor = (request.line + offset) as i64;
        let stride = stride as i64;

        // Largest other-field line whose frame line is above the dropout
        let highest_above = request.line as i64 - 1 + request.parity.offset() as i64;
        let up = highest_above - (highest_above - anchor).rem_euclid(stride);
        let up_start = if up >= 0 { Some(up) } else { None };
        (up_start, up + stride)
    }

    fn lines_up(&self, start: Option<i64>, stride: usize) -> impl Iterator<Item = usize> {
        let first = self.geometry.first_active_line;
        let last = self.geometry.last_active_line;
        let start = start.and_then(|s| usize::try_from(s).ok());
        iter::successors(start, move |&line| line.checked_sub(stride))
            .skip_while(move |&line| line >= last)
            .take_while(move |&line| line >= first)
    }

    fn lines_down(&self, start: i64, stride: usize) -> impl Iterator<Item = usize> {
        let first = self.geometry.first_active_line;
        let last = self.geometry.last_active_line;
        let start = usize::try_from(start).ok();
        iter::successors(start, move |&line| Some(line + stride))
            .skip_while(move |&line| line < first)
            .take_while(move |&line| line < last)
    }

    /// First line of `lines` in the given field with no overlapping dropout
    fn scan(
        &self,
        source: &SourceFrame,
        parity: FieldParity,
        mut lines: impl Iterator<Item = usize>,
        request: &SearchRequest,
    ) -> Option<Replacement> {
        let field = source.field(parity);
        let line = lines.find(|&line| !field.has_dropout(line, request.start, request.end))?;

        Some(Replacement {
            source: source.source,
            line,
            same_field: parity == request.parity,
            quality: field.quality,
            distance: parity.frame_line(line).abs_diff(request.frame_line()),
        })
    }
}

/// Pick the best candidate: shortest distance, then highest quality, then
/// earliest discovered
pub fn best(candidates: impl IntoIterator<Item = Replacement>) -> Option<Replacement> {
    candidates
        .into_iter()
        .min_by(|a, b| a.distance.cmp(&b.distance).then_with(|| b.quality.cmp(&a.quality)))
}
