//! Per-frame dropout correction
//!
//! A [`FrameCorrector`] takes one [`FrameWorkItem`] and returns the corrected
//! fields of the primary source. Colourburst dropouts get a single
//! phase-matched, same-field replacement copied verbatim. Visible-line
//! dropouts get two independent replacements: one for the whole signal and a
//! phase-matched one for chroma. When they differ, the low band of the first
//! and the high band of the second are recombined.

use tracing::{debug, trace};

use crate::filter::LumaFilter;
use crate::frame::{FrameWorkItem, OutputFrame, Sample, SourceFrame};
use crate::geometry::{FieldGeometry, FieldParity};
use crate::stats::CorrectionStats;

use super::region::{DropoutRegion, Location};
use super::search::{Replacement, ReplacementSearch, SearchRequest};

/// Stateless per-frame corrector shared by all workers
#[derive(Debug, Clone)]
pub struct FrameCorrector {
    geometry: FieldGeometry,
    filter: LumaFilter,
    intra_field: bool,
}

impl FrameCorrector {
    /// Create a corrector for fields with the given geometry
    ///
    /// With `intra_field` set, replacements only come from the dropout's own
    /// field.
    pub fn new(geometry: FieldGeometry, intra_field: bool) -> Self {
        let filter = LumaFilter::new(geometry.standard);
        FrameCorrector {
            geometry,
            filter,
            intra_field,
        }
    }

    pub fn geometry(&self) -> &FieldGeometry {
        &self.geometry
    }

    /// Correct every dropout of the primary source in this frame
    pub fn correct(&self, item: &FrameWorkItem) -> OutputFrame {
        let primary = item.primary();
        let search = ReplacementSearch::new(&self.geometry, &item.sources);
        let mut stats = CorrectionStats::default();

        let mut first = primary.first.pixels.clone();
        let mut second = primary.second.pixels.clone();

        for parity in FieldParity::both() {
            let target = match parity {
                FieldParity::First => &mut first,
                FieldParity::Second => &mut second,
            };
            for region in &primary.field(parity).regions {
                self.correct_region(item, &search, region, parity, target, &mut stats);
            }
        }

        debug!(
            frame = item.frame,
            sources = item.sources.len(),
            corrected = stats.corrected(),
            uncorrected = stats.uncorrected,
            "Frame corrected"
        );

        OutputFrame {
            frame: item.frame,
            first,
            second,
            first_sequence: primary.first.sequence,
            second_sequence: primary.second.sequence,
            stats,
        }
    }

    fn correct_region(
        &self,
        item: &FrameWorkItem,
        search: &ReplacementSearch<'_>,
        region: &DropoutRegion,
        parity: FieldParity,
        target: &mut [Sample],
        stats: &mut CorrectionStats,
    ) {
        if !self.geometry.is_active_line(region.line) || region.is_empty() {
            return;
        }

        let (replacement, chroma) = match region.location {
            Location::ColourBurst => {
                let request = SearchRequest::for_region(region, parity, true, false);
                (search.find(&request), None)
            }
            Location::VisibleLine => {
                let allow_other_field = !self.intra_field;
                let luma = SearchRequest::for_region(region, parity, false, allow_other_field);
                let chroma = SearchRequest::for_region(region, parity, true, allow_other_field);
                (search.find(&luma), search.find(&chroma))
            }
            Location::Unknown => return,
        };

        let Some(replacement) = replacement else {
            trace!(
                frame = item.frame,
                line = region.line,
                start = region.start,
                end = region.end,
                "No replacement for {} dropout",
                region.location.name()
            );
            stats.record_uncorrected();
            return;
        };

        let source_line = self.line_of(&item.sources, &replacement, parity);
        let columns = region.start..region.end;
        let dest = &mut target[self.geometry.line_range(region.line)][columns.clone()];

        match chroma.filter(|c| !c.same_line_as(&replacement)) {
            None => dest.copy_from_slice(&source_line[columns]),
            Some(chroma) => {
                let chroma_line = self.line_of(&item.sources, &chroma, parity);
                let luma = self.filter.apply(source_line);
                let (_, residual) = self.filter.split(chroma_line);
                for (x, out) in columns.zip(dest.iter_mut()) {
                    *out = clamp_sample(luma[x] + residual[x]);
                }
            }
        }

        debug!(
            frame = item.frame,
            line = region.line,
            start = region.start,
            end = region.end,
            source = replacement.source,
            from_line = replacement.line,
            same_field = replacement.same_field,
            distance = replacement.distance,
            "Replaced {} dropout",
            region.location.name()
        );
        stats.record(&replacement, item.primary().source);
    }

    /// Raw samples of the line a replacement points at
    fn line_of<'a>(
        &self,
        sources: &'a [SourceFrame],
        replacement: &Replacement,
        parity: FieldParity,
    ) -> &'a [Sample] {
        let source = sources
            .iter()
            .find(|s| s.source == replacement.source)
            .unwrap_or(&sources[0]);
        let field = source.field(replacement.parity(parity));
        &field.pixels[self.geometry.line_range(replacement.line)]
    }
}

fn clamp_sample(value: f64) -> Sample {
    value.round().clamp(0.0, Sample::MAX as f64) as Sample
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FieldData, Quality};
    use crate::geometry::VideoStandard;

    const WIDTH: usize = 64;
    const HEIGHT: usize = 40;

    fn geometry() -> FieldGeometry {
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

    /// Each line filled with a constant identifying source, field and line
    fn pixels(source: usize, parity: FieldParity) -> Vec<Sample> {
        (0..HEIGHT)
            .flat_map(|line| {
                let value = (source * 20000 + parity.offset() * 10000 + line * 10) as Sample;
                std::iter::repeat(value).take(WIDTH)
            })
            .collect()
    }

    fn source(index: usize, first: Vec<DropoutRegion>, second: Vec<DropoutRegion>) -> SourceFrame {
        SourceFrame {
            source: index,
            first: FieldData {
                sequence: 1,
                pixels: pixels(index, FieldParity::First),
                regions: first,
                quality: Quality(0.0),
            },
            second: FieldData {
                sequence: 2,
                pixels: pixels(index, FieldParity::Second),
                regions: second,
                quality: Quality(0.0),
            },
        }
    }

    fn region(line: usize, start: usize, end: usize, location: Location) -> DropoutRegion {
        DropoutRegion {
            start,
            end,
            line,
            location,
        }
    }

    fn sample(frame: &[Sample], line: usize, x: usize) -> Sample {
        frame[line * WIDTH + x]
    }

    #[test]
    fn test_no_dropouts_is_identity() {
        let item = FrameWorkItem {
            frame: 1,
            sources: vec![source(0, vec![], vec![])],
        };
        let output = FrameCorrector::new(geometry(), false).correct(&item);
        assert_eq!(output.first, item.sources[0].first.pixels);
        assert_eq!(output.second, item.sources[0].second.pixels);
        assert_eq!(output.stats, CorrectionStats::default());
    }

    #[test]
    fn test_colour_burst_copies_phase_matched_line() {
        let item = FrameWorkItem {
            frame: 1,
            sources: vec![source(0, vec![region(20, 4, 10, Location::ColourBurst)], vec![])],
        };
        let output = FrameCorrector::new(geometry(), false).correct(&item);

        // Same field, 4 lines up, never the other field
        assert_eq!(sample(&output.first, 20, 5), 160);
        assert_eq!(sample(&output.first, 20, 11), 200);
        assert_eq!(output.stats.same_source_concealments, 1);
        assert_eq!(output.stats.total_distance, 8);
    }

    #[test]
    fn test_visible_line_blends_luma_and_chroma() {
        let item = FrameWorkItem {
            frame: 1,
            sources: vec![source(0, vec![region(20, 20, 30, Location::VisibleLine)], vec![])],
        };
        let output = FrameCorrector::new(geometry(), false).correct(&item);

        // Whole-signal from second field line 19 (frame line 39); constant
        // lines carry no chroma so the blend keeps the luma value
        let value = sample(&output.first, 20, 25) as i32;
        assert!((value - 10190).abs() <= 1, "got {}", value);
        assert_eq!(sample(&output.first, 20, 19), 200);
        assert_eq!(output.stats.same_source_concealments, 1);
        assert_eq!(output.stats.total_distance, 1);
    }

    #[test]
    fn test_intra_field_only() {
        let item = FrameWorkItem {
            frame: 1,
            sources: vec![source(0, vec![region(20, 20, 30, Location::VisibleLine)], vec![])],
        };
        let output = FrameCorrector::new(geometry(), true).correct(&item);
        let value = sample(&output.first, 20, 25) as i32;
        assert!((value - 190).abs() <= 1, "got {}", value);
        assert_eq!(output.stats.total_distance, 2);
    }

    #[test]
    fn test_multi_source_correction() {
        let item = FrameWorkItem {
            frame: 1,
            sources: vec![
                source(0, vec![region(20, 20, 30, Location::VisibleLine)], vec![]),
                source(1, vec![], vec![]),
            ],
        };
        let output = FrameCorrector::new(geometry(), false).correct(&item);

        // Same line of source 1 for both bands: verbatim copy
        assert_eq!(sample(&output.first, 20, 25), 20200);
        assert_eq!(output.stats.multi_source_corrections, 1);
        assert_eq!(output.stats.total_distance, 0);
    }

    #[test]
    fn test_unreplaceable_dropout_is_left_alone() {
        let dropouts: Vec<_> = (0..HEIGHT)
            .map(|line| region(line, 20, 30, Location::VisibleLine))
            .collect();
        let item = FrameWorkItem {
            frame: 1,
            sources: vec![source(0, dropouts.clone(), dropouts)],
        };
        let output = FrameCorrector::new(geometry(), false).correct(&item);

        assert_eq!(output.first, item.sources[0].first.pixels);
        assert_eq!(output.second, item.sources[0].second.pixels);
        assert_eq!(output.stats.corrected(), 0);
        assert_eq!(output.stats.uncorrected, 2 * (36 - 4));
    }

    #[test]
    fn test_unknown_and_inactive_regions_are_skipped() {
        let item = FrameWorkItem {
            frame: 1,
            sources: vec![source(
                0,
                vec![
                    region(20, 60, 64, Location::Unknown),
                    region(2, 20, 30, Location::VisibleLine),
                ],
                vec![],
            )],
        };
        let output = FrameCorrector::new(geometry(), false).correct(&item);
        assert_eq!(output.first, item.sources[0].first.pixels);
        assert_eq!(output.stats, CorrectionStats::default());
    }

    #[test]
    fn test_sequence_numbers_are_carried() {
        let mut item = FrameWorkItem {
            frame: 7,
            sources: vec![source(0, vec![], vec![])],
        };
        item.sources[0].first.sequence = 14;
        item.sources[0].second.sequence = 13;
        let output = FrameCorrector::new(geometry(), false).correct(&item);
        assert_eq!(output.frame, 7);
        assert_eq!((output.first_sequence, output.second_sequence), (14, 13));
    }

    #[test]
    fn test_clamp_sample() {
        assert_eq!(clamp_sample(-3.2), 0);
        assert_eq!(clamp_sample(70000.0), u16::MAX);
        assert_eq!(clamp_sample(100.4), 100);
    }
}
