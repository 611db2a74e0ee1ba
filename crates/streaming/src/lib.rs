pub mod record;
pub mod tile;

pub use record::{ID_FIELD, IMPORTANCE_FIELD, Record};
pub use tile::*;
