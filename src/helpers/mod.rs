//! Small shared helpers: date handling and content hashing

mod date;
mod hash;

pub use date::*;
pub use hash::*;
