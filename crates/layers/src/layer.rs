use foundation::{PointId, TileId};
use scene::IngestReport;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

/// Tile lifecycle events a host delivers to a data layer.
pub trait Layer {
    fn id(&self) -> LayerId;

    /// A tile finished loading with `payload` as its data.
    fn load_tile(&mut self, tile: TileId, payload: &Value) -> IngestReport;

    /// A tile left the view. Returns the points removed with it.
    fn unload_tile(&mut self, tile: &TileId) -> Vec<PointId>;
}
