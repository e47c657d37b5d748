//! Luma/chroma band separation
//!
//! A 9-tap symmetric low-pass FIR filter along one line. The low band is the
//! luma of the line; subtracting it from the raw samples leaves the chroma
//! residual. Cutoffs sit at roughly half the colour subcarrier:
//!
//! - PAL: 2.2 MHz at 17.734472 MHz sampling
//! - NTSC: 1.8 MHz at 14.31818 MHz sampling
//!
//! Coefficients are a Hamming-windowed sinc normalised to unity DC gain.
//! Samples outside the line are treated as zero.
//!
//! ## Usage
//!
//! ```rust
//! use dropfix_lib::filter::LumaFilter;
//! use dropfix_lib::geometry::VideoStandard;
//!
//! let filter = LumaFilter::new(VideoStandard::Pal);
//! let line = vec![1000u16; 64];
//! let luma = filter.apply(&line);
//! assert!((luma[32] - 1000.0).abs() < 0.01);
//! ```

use crate::geometry::VideoStandard;

/// Number of filter taps
pub const TAPS: usize = 9;

// firwin(9, 2.2e6, fs=17734472, window='hamming')
const PAL_LUMA_COEFFS: [f64; TAPS] = [
    0.00018046, 0.01951277, 0.10227551, 0.23039501, 0.29527248, 0.23039501, 0.10227551,
    0.01951277, 0.00018046,
];

// firwin(9, 1.8e6, fs=14318180, window='hamming')
const NTSC_LUMA_COEFFS: [f64; TAPS] = [
    -0.00013507, 0.0187824, 0.10157014, 0.23120458, 0.29715589, 0.23120458, 0.10157014,
    0.0187824, -0.00013507,
];

/// Low-pass filter separating luma from chroma on a single line
#[derive(Debug, Clone, Copy)]
pub struct LumaFilter {
    coeffs: &'static [f64; TAPS],
}

impl LumaFilter {
    /// Create the filter for a video standard
    pub fn new(standard: VideoStandard) -> Self {
        let coeffs = match standard {
            VideoStandard::Pal => &PAL_LUMA_COEFFS,
            VideoStandard::Ntsc => &NTSC_LUMA_COEFFS,
        };
        LumaFilter { coeffs }
    }

    /// Filter coefficients
    pub fn coeffs(&self) -> &'static [f64; TAPS] {
        self.coeffs
    }

    /// Low-pass filter a line, returning the luma band at full precision
    pub fn apply(&self, input: &[u16]) -> Vec<f64> {
        let len = input.len();
        let overlap = TAPS / 2;
        let mut output = vec![0.0; len];

        // Split the line so only the ends need bounds checks
        let left = overlap.min(len);
        let right = len.saturating_sub(overlap).max(left);

        for (i, out) in output.iter_mut().enumerate().take(left) {
            *out = self.tap_checked(input, i);
        }
        for i in left..right {
            let window = &input[i - overlap..i - overlap + TAPS];
            output[i] = self
                .coeffs
                .iter()
                .zip(window)
                .map(|(c, &s)| c * s as f64)
                .sum();
        }
        for i in right..len {
            output[i] = self.tap_checked(input, i);
        }

        output
    }

    /// Split a line into its luma band and chroma residual
    pub fn split(&self, input: &[u16]) -> (Vec<f64>, Vec<f64>) {
        let luma = self.apply(input);
        let chroma = input
            .iter()
            .zip(&luma)
            .map(|(&raw, &low)| raw as f64 - low)
            .collect();
        (luma, chroma)
    }

    fn tap_checked(&self, input: &[u16], i: usize) -> f64 {
        let overlap = TAPS / 2;
        self.coeffs
            .iter()
            .enumerate()
            .filter_map(|(j, c)| {
                let k = (i + j).checked_sub(overlap)?;
                input.get(k).map(|&s| c * s as f64)
            })
            .sum()
    }
}
