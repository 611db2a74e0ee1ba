pub mod labels;
pub mod layer;
pub mod overlap;
pub mod points;
pub mod symbology;

pub use layer::*;
pub use points::{LabelledPointsLayer, PointsConfig};
