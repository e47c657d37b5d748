//! Dropout classification, replacement search and per-frame correction

pub mod correct;
pub mod region;
pub mod search;

pub use correct::FrameCorrector;
pub use region::{classify, Dropout, DropoutRegion, Location, OVER_CORRECT_PADDING};
pub use search::{Replacement, ReplacementSearch, SearchRequest};
