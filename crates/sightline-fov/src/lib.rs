//! Shadow-cast field of view and per-origin multi-radius packing.
#![forbid(unsafe_code)]

mod packer;
mod shadowcast;

pub use packer::{FovEntry, MultiRadiusPacker};
pub use shadowcast::{LitCell, ShadowcastEngine};
