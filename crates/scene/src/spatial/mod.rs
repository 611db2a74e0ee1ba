pub mod overlaps;

pub use overlaps::intersecting_pairs;
