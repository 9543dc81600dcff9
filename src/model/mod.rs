mod edsr;
mod res_block;
mod upsample;

pub use edsr::*;
pub use res_block::*;
pub use upsample::*;
