//! Run-length packed cell sets ordered along a space-filling curve.
#![forbid(unsafe_code)]

mod codec;
mod mask;
mod packed;

pub use codec::RegionCodec;
pub use mask::VisibilityMask;
pub use packed::{Intervals, PackedRegion, RunBuilder};
