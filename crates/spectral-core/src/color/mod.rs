pub mod cfa;

pub use cfa::{demosaic, split_cells, CfaPattern};
