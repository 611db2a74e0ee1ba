use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a point record.
///
/// Ids are opaque strings: either carried by the record itself or generated
/// with [`PointId::generate`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(String);

impl PointId {
    pub fn new(id: impl Into<String>) -> Self {
        PointId(id.into())
    }

    /// Fresh globally-unique id.
    pub fn generate() -> Self {
        PointId(nice_slug())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PointId {
    fn from(s: &str) -> Self {
        PointId(s.to_string())
    }
}

impl From<String> for PointId {
    fn from(s: String) -> Self {
        PointId(s)
    }
}

/// Host-assigned identifier of a loaded tile.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(String);

impl TileId {
    pub fn new(id: impl Into<String>) -> Self {
        TileId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TileId {
    fn from(s: &str) -> Self {
        TileId(s.to_string())
    }
}

/// 22-character URL-safe slug from a random v4 UUID.
///
/// The top bit of the first byte is cleared so the slug never starts with `-`.
fn nice_slug() -> String {
    let mut bytes = Uuid::new_v4().into_bytes();
    bytes[0] &= 0x7f;
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::{PointId, TileId};
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_url_safe_slugs() {
        let id = PointId::generate();
        assert_eq!(id.as_str().len(), 22);
        assert!(!id.as_str().starts_with('-'));
        assert!(
            id.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn generated_ids_do_not_collide() {
        let ids: HashSet<PointId> = (0..1000).map(|_| PointId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn display_round_trips_inner_string() {
        assert_eq!(PointId::from("p1").to_string(), "p1");
        assert_eq!(TileId::new("0.1.2").to_string(), "0.1.2");
    }
}
