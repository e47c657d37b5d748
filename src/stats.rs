//! Correction statistics
//!
//! Every replaced dropout falls into one confidence tier:
//!
//! - **same-source concealment**: copied from another line of the primary
//!   capture
//! - **multi-source concealment**: copied from a different line of another
//!   capture
//! - **multi-source correction**: copied from the very same line of another
//!   capture (distance 0), i.e. a true restoration
//!
//! Dropouts for which no clean line exists are counted as uncorrected.

use std::ops::AddAssign;

use crate::dropout::Replacement;

/// Counters for one frame or a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionStats {
    pub same_source_concealments: u64,
    pub multi_source_concealments: u64,
    pub multi_source_corrections: u64,
    pub uncorrected: u64,
    /// Sum of replacement distances, in frame lines
    pub total_distance: u64,
}

impl CorrectionStats {
    /// Count a replacement chosen for a dropout of `primary`
    pub fn record(&mut self, replacement: &Replacement, primary: usize) {
        if replacement.source == primary {
            self.same_source_concealments += 1;
        } else if replacement.distance > 0 {
            self.multi_source_concealments += 1;
        } else {
            self.multi_source_corrections += 1;
        }
        self.total_distance += replacement.distance as u64;
    }

    /// Count a dropout left as it was
    pub fn record_uncorrected(&mut self) {
        self.uncorrected += 1;
    }

    /// Dropouts that received a replacement
    pub fn corrected(&self) -> u64 {
        self.same_source_concealments + self.multi_source_concealments + self.multi_source_corrections
    }

    /// Mean replacement distance in frame lines, 0 when nothing was replaced
    pub fn average_distance(&self) -> f64 {
        match self.corrected() {
            0 => 0.0,
            n => self.total_distance as f64 / n as f64,
        }
    }
}

impl AddAssign for CorrectionStats {
    fn add_assign(&mut self, rhs: Self) {
        self.same_source_concealments += rhs.same_source_concealments;
        self.multi_source_concealments += rhs.multi_source_concealments;
        self.multi_source_corrections += rhs.multi_source_corrections;
        self.uncorrected += rhs.uncorrected;
        self.total_distance += rhs.total_distance;
    }
}

/// Final report of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionReport {
    pub frames_written: usize,
    pub same_source_concealments: u64,
    pub multi_source_concealments: u64,
    pub multi_source_corrections: u64,
    pub uncorrected: u64,
    pub average_distance: f64,
}

impl CorrectionReport {
    pub fn new(frames_written: usize, stats: &CorrectionStats) -> Self {
        CorrectionReport {
            frames_written,
            same_source_concealments: stats.same_source_concealments,
            multi_source_concealments: stats.multi_source_concealments,
            multi_source_corrections: stats.multi_source_corrections,
            uncorrected: stats.uncorrected,
            average_distance: stats.average_distance(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Quality;

    fn replacement(source: usize, distance: usize) -> Replacement {
        Replacement {
            source,
            line: 30,
            same_field: true,
            quality: Quality(0.0),
            distance,
        }
    }

    #[test]
    fn test_tiers() {
        let mut stats = CorrectionStats::default();
        stats.record(&replacement(0, 2), 0);
        stats.record(&replacement(1, 4), 0);
        stats.record(&replacement(2, 0), 0);
        stats.record_uncorrected();

        assert_eq!(stats.same_source_concealments, 1);
        assert_eq!(stats.multi_source_concealments, 1);
        assert_eq!(stats.multi_source_corrections, 1);
        assert_eq!(stats.uncorrected, 1);
        assert_eq!(stats.corrected(), 3);
        assert!((stats.average_distance() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_of_nothing() {
        assert_eq!(CorrectionStats::default().average_distance(), 0.0);
    }

    #[test]
    fn test_add_assign() {
        let mut total = CorrectionStats::default();
        let mut frame = CorrectionStats::default();
        frame.record(&replacement(1, 3), 0);
        total += frame;
        total += frame;
        assert_eq!(total.multi_source_concealments, 2);
        assert_eq!(total.total_distance, 6);
    }
}
