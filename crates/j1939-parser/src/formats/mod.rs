mod common;
mod embedded;
mod raw_frames;
mod structured;

pub use embedded::EmbeddedCellsExtractor;
pub use raw_frames::RawFramesExtractor;
pub use structured::StructuredColumnsExtractor;
