pub mod position;
pub mod tick;

pub use position::*;
pub use tick::*;
