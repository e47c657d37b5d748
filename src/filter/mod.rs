//! Line filters used when blending replacement video

pub mod lumachroma;

pub use lumachroma::LumaFilter;
