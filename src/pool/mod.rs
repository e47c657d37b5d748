//! Frame sources, output sinks and the threaded corrector pool

pub mod scheduler;
pub mod sink;
pub mod source;

pub use scheduler::{default_threads, CorrectorConfig, CorrectorPool};
pub use sink::{FieldSink, TbcWriter};
pub use source::{FrameSource, SourceField};
