use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use foundation::{PointId, TileId};
use serde_json::Value;
use streaming::record::{self, ID_FIELD, Record};
use streaming::tile::decode_records;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct PointEntry {
    seq: u64,
    record: Record,
    owners: BTreeSet<TileId>,
}

#[derive(Debug, Default, Clone)]
struct TileEntry {
    /// Distinct ids of the tile's records, in payload order.
    ids: Vec<PointId>,
    /// Id generated for the record at each payload position, if any.
    generated: Vec<Option<PointId>>,
}

/// Outcome of ingesting one tile.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestReport {
    /// Ids of the tile's records, in payload order, without duplicates.
    pub ids: Vec<PointId>,
    /// Points that a re-ingested tile no longer contains and that no other
    /// loaded tile owns. They have been removed from the registry.
    pub orphaned: Vec<PointId>,
}

/// Live set of point records, keyed by id and scoped by owning tiles.
///
/// A point stays registered while at least one loaded tile contains it.
///
/// Ordering contract:
/// - `iter` and `ids` yield points in registration order (the first ingestion
///   of the id). Merging a point from a later tile keeps its position; a point
///   registered again after eviction moves to the end.
#[derive(Debug, Default)]
pub struct PointRegistry {
    next_seq: u64,
    points: HashMap<PointId, PointEntry>,
    order: BTreeMap<u64, PointId>,
    tiles: BTreeMap<TileId, TileEntry>,
}

impl PointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a raw tile payload.
    ///
    /// A payload that is not a list of records is logged and ignored; the
    /// tile's previous association, if any, is left untouched.
    pub fn ingest(&mut self, tile: TileId, payload: &Value) -> IngestReport {
        match decode_records(payload) {
            Ok(records) => self.ingest_records(tile, records),
            Err(err) => {
                warn!(tile = %tile, "ignoring malformed tile payload: {err}");
                IngestReport::default()
            }
        }
    }

    /// Upsert decoded records and associate them with `tile`.
    ///
    /// Records without an id get a generated one, written back into the stored
    /// record. Re-ingesting a loaded tile reuses the ids generated for it
    /// before, position by position.
    pub fn ingest_records(&mut self, tile: TileId, records: Vec<Record>) -> IngestReport {
        let previous = self.tiles.remove(&tile);
        let prev_generated = previous
            .as_ref()
            .map(|t| t.generated.as_slice())
            .unwrap_or_default();

        let mut ids: Vec<PointId> = Vec::with_capacity(records.len());
        let mut seen: HashSet<PointId> = HashSet::with_capacity(records.len());
        let mut generated: Vec<Option<PointId>> = Vec::with_capacity(records.len());

        for (pos, mut rec) in records.into_iter().enumerate() {
            let id = match record::record_id(&rec) {
                Some(id) => {
                    generated.push(None);
                    PointId::from(id)
                }
                None => {
                    let id = prev_generated
                        .get(pos)
                        .cloned()
                        .flatten()
                        .unwrap_or_else(PointId::generate);
                    rec.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
                    generated.push(Some(id.clone()));
                    id
                }
            };

            self.upsert(&tile, id.clone(), rec);
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }

        let mut orphaned = Vec::new();
        if let Some(prev) = previous {
            for id in prev.ids {
                if seen.contains(&id) {
                    continue;
                }
                if self.release(&id, &tile) {
                    orphaned.push(id);
                }
            }
        }

        debug!(
            tile = %tile,
            records = ids.len(),
            orphaned = orphaned.len(),
            live = self.points.len(),
            "ingested tile"
        );

        self.tiles.insert(
            tile,
            TileEntry {
                ids: ids.clone(),
                generated,
            },
        );

        IngestReport { ids, orphaned }
    }

    /// Unload `tile`, returning the ids that no longer have any owning tile.
    ///
    /// Removed ids are gone from the registry; the caller owns cascading the
    /// removal into any state it keys by id.
    pub fn evict(&mut self, tile: &TileId) -> Vec<PointId> {
        let Some(entry) = self.tiles.remove(tile) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        for id in entry.ids {
            if self.release(&id, tile) {
                removed.push(id);
            }
        }

        debug!(
            tile = %tile,
            removed = removed.len(),
            live = self.points.len(),
            "evicted tile"
        );
        removed
    }

    pub fn get(&self, id: &PointId) -> Option<&Record> {
        self.points.get(id).map(|e| &e.record)
    }

    pub fn contains(&self, id: &PointId) -> bool {
        self.points.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Live points in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&PointId, &Record)> + '_ {
        self.order
            .values()
            .filter_map(|id| self.points.get(id).map(|e| (id, &e.record)))
    }

    pub fn ids(&self) -> impl Iterator<Item = &PointId> + '_ {
        self.order.values()
    }

    fn upsert(&mut self, tile: &TileId, id: PointId, rec: Record) {
        if let Some(entry) = self.points.get_mut(&id) {
            entry.record = rec;
            entry.owners.insert(tile.clone());
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, id.clone());
        self.points.insert(
            id,
            PointEntry {
                seq,
                record: rec,
                owners: BTreeSet::from([tile.clone()]),
            },
        );
    }

    /// Drop `tile`'s ownership of `id`. Returns `true` if the point was removed.
    fn release(&mut self, id: &PointId, tile: &TileId) -> bool {
        let Some(entry) = self.points.get_mut(id) else {
            return false;
        };
        entry.owners.remove(tile);
        if !entry.owners.is_empty() {
            return false;
        }

        let seq = entry.seq;
        self.points.remove(id);
        self.order.remove(&seq);
        true
    }
}
