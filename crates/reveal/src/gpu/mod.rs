//! Headless wgpu rendering of the menu scene into still images.

mod context;
mod export;
mod pipeline;

pub use export::{render_still, StillRenderer};
