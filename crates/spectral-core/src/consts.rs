/// Minimum pixel count (rows*cols) of a single plane to process channels with Rayon.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum number of stacks to use stack-level Rayon parallelism in batches.
pub const PARALLEL_STACK_THRESHOLD: usize = 2;

/// Default sigma threshold for background sigma clipping.
pub const DEFAULT_SIGMA: f64 = 3.0;

/// Default clipping factor: signal starts at mean + factor * stddev.
pub const DEFAULT_CLIPPING_FACTOR: f64 = 10.0;

/// Hard cap on sigma-clipping iterations.
pub const DEFAULT_MAX_CLIP_ITERATIONS: usize = 10;

/// Inter-channel angle spread (degrees) above which a warning is logged.
pub const DEFAULT_ANGLE_TOLERANCE_DEG: f64 = 5.0;

/// Stddev below which sigma clipping is considered converged.
pub const STDDEV_EPSILON: f64 = 1e-12;

/// Channel label used for single-plane (luminance) stacks.
pub const MONO_CHANNEL: char = 'L';
