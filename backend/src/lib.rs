pub mod encoder;
pub mod float;
pub mod slots;
pub mod stats;

pub use encoder::*;
pub use float::*;
pub use slots::*;
pub use stats::*;

pub use rug::{Complex, Float};
