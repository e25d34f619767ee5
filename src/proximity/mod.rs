//! Substation proximity: buffers, spatial index and station classification.
//!
//! Buffers are exact discs around each substation. Stations are looked up in
//! an R-tree over the disc envelopes and tested against every candidate.

mod buffer;
mod classifier;
mod index;

pub use buffer::{build_buffers, Buffer, BufferSet, DEFAULT_SEGMENTS};
pub(crate) use buffer::validate_radius;
pub use classifier::classify;
pub use index::BufferIndex;
