//! Wire records

use serde::{Deserialize, Serialize};

/// Index sent for anything not in a grid cell (equipped or never placed)
pub const UNPLACED_INDEX: i64 = -1;

/// Convert an optional cell index into its wire form
pub fn index_or_unplaced(index: Option<usize>) -> i64 {
    index.map(|i| i as i64).unwrap_or(UNPLACED_INDEX)
}

/// One item's placement change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistRecord {
    pub name: String,
    /// Present only when the change moved the item in or out of a slot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipped: Option<bool>,
    pub last_space_index: i64,
    pub current_space_index: i64,
}

impl PersistRecord {
    /// A move inside the grid
    pub fn moved(name: impl Into<String>, from: Option<usize>, to: Option<usize>) -> Self {
        Self {
            name: name.into(),
            equipped: None,
            last_space_index: index_or_unplaced(from),
            current_space_index: index_or_unplaced(to),
        }
    }

    /// A change of equipped state
    pub fn equip_change(
        name: impl Into<String>,
        equipped: bool,
        from: Option<usize>,
        to: Option<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            equipped: Some(equipped),
            last_space_index: index_or_unplaced(from),
            current_space_index: index_or_unplaced(to),
        }
    }
}

/// Records from one committed gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistBatch {
    /// Submission order; writes may still land out of order
    pub sequence: u64,
    pub records: Vec<PersistRecord>,
}

impl PersistBatch {
    pub fn new(sequence: u64, records: Vec<PersistRecord>) -> Self {
        Self { sequence, records }
    }

    /// Names of the items in the batch
    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Request body of the write endpoint
#[derive(Debug, Serialize)]
pub struct WriteBody<'a> {
    pub item_data: &'a [PersistRecord],
}
