pub mod background;
pub mod color;
pub mod consts;
pub mod error;
pub mod histogram;
pub mod orientation;
pub mod pipeline;
pub mod profile;
pub mod rotate;
pub mod stack;
pub mod window;
