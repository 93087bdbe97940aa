pub mod display;
pub mod fix;

pub use display::*;
pub use fix::*;
