pub mod config;
mod batch;
mod extraction;

pub use batch::{extract, extract_batch, extract_with_retry};
pub use config::{ChannelCombine, ExtractionConfig, WindowConfig};
pub use extraction::{Extraction, ExtractionResult};
