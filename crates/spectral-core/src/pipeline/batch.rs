use rayon::prelude::*;
use tracing::warn;

use crate::consts::PARALLEL_STACK_THRESHOLD;
use crate::error::{Result, SpectralError};
use crate::stack::ColorPlaneStack;

use super::config::ExtractionConfig;
use super::extraction::{Extraction, ExtractionResult};

/// Run a full extraction on one stack.
pub fn extract(stack: ColorPlaneStack, config: &ExtractionConfig) -> Result<ExtractionResult> {
    Extraction::new(stack, config.clone())?.run()
}

/// Errors that a lower clipping factor can cure: too little signal left for
/// the orientation or the window.
fn is_retryable(err: &SpectralError) -> bool {
    matches!(
        err,
        SpectralError::UndefinedMoment(_) | SpectralError::EmptyWindow(_)
    )
}

/// Extract, halving the clipping factor after each recoverable failure.
///
/// Retries continue while the factor stays above the smallest sigma
/// threshold. The last error is returned when every attempt fails.
pub fn extract_with_retry(
    stack: &ColorPlaneStack,
    config: &ExtractionConfig,
) -> Result<ExtractionResult> {
    let floor = config.sigma.min_sigma();
    let mut attempt = config.clone();

    loop {
        match extract(stack.clone(), &attempt) {
            Ok(result) => return Ok(result),
            Err(err) if is_retryable(&err) && attempt.clipping_factor / 2.0 > floor => {
                warn!(
                    clipping_factor = attempt.clipping_factor,
                    error = %err,
                    "Extraction failed, retrying with a lower clipping factor"
                );
                attempt.clipping_factor /= 2.0;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Extract every stack independently, in parallel for larger batches.
///
/// Results keep the input order; one failure does not affect the others.
pub fn extract_batch(
    stacks: &[ColorPlaneStack],
    config: &ExtractionConfig,
) -> Vec<Result<ExtractionResult>> {
    if stacks.len() >= PARALLEL_STACK_THRESHOLD {
        stacks
            .par_iter()
            .map(|stack| extract_with_retry(stack, config))
            .collect()
    } else {
        stacks
            .iter()
            .map(|stack| extract_with_retry(stack, config))
            .collect()
    }
}
