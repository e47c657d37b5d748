//! dropfix - multi-source dropout correction for TBC video fields
//!
//! dropfix repairs dropouts (short runs of corrupt samples left by media
//! damage) in time-base-corrected interlaced video. Each dropout is replaced
//! with samples from the nearest clean line that carries the same colour
//! subcarrier phase, taken from the same capture or from other captures of
//! the same disc. Luma and chroma are searched for independently and
//! recombined with a small low-pass filter.
//!
//! # Architecture
//!
//! - `geometry`: field layout and video standard constants
//! - `filter`: luma/chroma separation filter
//! - `dropout`: region classification, replacement search, per-frame correction
//! - `pool`: frame source and sink traits, the threaded corrector pool
//! - `stats`: correction counters and the run report
//! - `tbc`: TBC file + JSON sidecar source
//!
//! # Example
//!
//! ```no_run
//! use dropfix_lib::pool::{CorrectorConfig, CorrectorPool, FrameSource, TbcWriter};
//! use dropfix_lib::tbc::TbcSource;
//!
//! # fn main() -> dropfix_lib::Result<()> {
//! let sources: Vec<Box<dyn FrameSource>> = vec![
//!     Box::new(TbcSource::open("capture1.tbc")?),
//!     Box::new(TbcSource::open("capture2.tbc")?),
//! ];
//! let output = std::fs::File::create("corrected.tbc")?;
//! let pool = CorrectorPool::new(sources, TbcWriter::new(output), CorrectorConfig::default())?;
//! let report = pool.process()?;
//! println!("{} frames written", report.frames_written);
//! # Ok(())
//! # }
//! ```

pub mod dropout;
pub mod error;
pub mod filter;
pub mod frame;
pub mod geometry;
pub mod pool;
pub mod stats;
pub mod tbc;

pub use error::{Error, Result};

/// dropfix version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logging configuration for the library
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output
    pub debug: bool,
}

/// Install the log subscriber
///
/// Logs go to stderr so that stdout stays free for field data. `RUST_LOG`
/// overrides the level picked from `config`. Calling this again is harmless.
pub fn init(config: Config) -> Result<()> {
    let level = if config.debug {
        "debug"
    } else if config.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Already installed (tests, embedding applications)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    Ok(())
}
