pub mod household;
pub mod target;
pub mod water;
