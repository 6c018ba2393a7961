//! Per-scene processing primitives: scene selection, index math, resampling,
//! polygon masks, statistics, colour ramps, the scene pipeline and savers.
pub mod colormap;
pub mod mask;
pub mod ops;
pub mod pipeline;
pub mod resize;
pub mod save;
pub mod select;
pub mod stats;
