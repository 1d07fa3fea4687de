//! Robust background estimation and background clipping.
//!
//! The estimator runs iterative sigma clipping per channel; the clipper then
//! invalidates everything below `mean + factor * stddev`, leaving only the
//! bright source for orientation recovery.

pub mod clip;
pub mod stats;

pub use clip::clip_background;
pub use stats::{estimate_background, sigma_clipped_stats, BackgroundStats, SigmaClip};
