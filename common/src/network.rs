pub mod candidate;
pub mod range;
