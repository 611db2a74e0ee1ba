pub mod picking;
pub mod registry;
pub mod spatial;

pub use registry::*;
