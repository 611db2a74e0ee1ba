use serde_json::Value;

use crate::record::Record;

/// Tile payload that cannot be enumerated as a list of point records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileError {
    NotAList { found: &'static str },
    NotARecord { index: usize, found: &'static str },
}

impl std::fmt::Display for TileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileError::NotAList { found } => {
                write!(f, "tile data is not a list of records (found {found})")
            }
            TileError::NotARecord { index, found } => {
                write!(f, "tile entry {index} is not a record (found {found})")
            }
        }
    }
}

impl std::error::Error for TileError {}

/// Decode a raw tile payload into point records.
///
/// The payload must be a JSON array of objects. A single bad entry rejects the
/// whole payload so that a tile is either ingested completely or not at all.
pub fn decode_records(payload: &Value) -> Result<Vec<Record>, TileError> {
    let Value::Array(entries) = payload else {
        return Err(TileError::NotAList {
            found: kind_name(payload),
        });
    };

    let mut out = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let Value::Object(record) = entry else {
            return Err(TileError::NotARecord {
                index,
                found: kind_name(entry),
            });
        };
        out.push(record.clone());
    }
    Ok(out)
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
