//! Items and their placement

use gear_grid::Cell;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

use crate::equipment::SlotName;

/// Item type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Weapon,
    Armour,
    Shield,
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weapon" => Ok(Self::Weapon),
            "armour" | "armor" => Ok(Self::Armour),
            "shield" => Ok(Self::Shield),
            _ => Err(format!("Unknown item type: {}", s)),
        }
    }
}

/// Item rarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rarity {
    Common,
    Unusual,
    Rare,
    Epic,
}

impl Default for Rarity {
    fn default() -> Self {
        Self::Common
    }
}

impl Rarity {
    /// Border colour used when drawing the item
    pub fn colour(&self) -> &'static str {
        match self {
            Self::Common => "#0072b2",
            Self::Unusual => "#2e8b57",
            Self::Rare => "#8b008b",
            Self::Epic => "#ffd700",
        }
    }
}

impl FromStr for Rarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "common" => Ok(Self::Common),
            "unusual" => Ok(Self::Unusual),
            "rare" => Ok(Self::Rare),
            "epic" => Ok(Self::Epic),
            _ => Err(format!("Unknown rarity: {}", s)),
        }
    }
}

/// Width and height in cells
///
/// Placement only ever reasons about a single cell; the footprint is carried
/// so swaps can refuse to exchange items of different sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Default for Footprint {
    fn default() -> Self {
        Self { width: 1, height: 1 }
    }
}

/// Where an item is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// In a grid cell
    Cell(Cell),
    /// In an equipment slot
    Slot(SlotName),
    /// Nowhere yet (inventory was full)
    Unplaced,
}

impl Position {
    pub fn cell(&self) -> Option<Cell> {
        match self {
            Self::Cell(cell) => Some(*cell),
            _ => None,
        }
    }

    pub fn slot(&self) -> Option<SlotName> {
        match self {
            Self::Slot(slot) => Some(*slot),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(cell) => write!(f, "cell {}", cell),
            Self::Slot(slot) => write!(f, "slot {}", slot),
            Self::Unplaced => write!(f, "unplaced"),
        }
    }
}

/// A single owned item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntity {
    /// Unique name, the identity key
    pub name: String,
    pub footprint: Footprint,
    /// The only slot this item may be equipped in
    pub required_slot: Option<SlotName>,
    pub item_type: Option<ItemType>,
    pub rarity: Rarity,
    /// Image path for the view
    pub image: Option<String>,
    /// Position before the most recent committed move
    pub last_position: Position,
    pub current_position: Position,
    pub equipped: bool,
}

impl ItemEntity {
    /// Create an unplaced item from its load record
    pub fn from_record(record: &ItemRecord) -> Self {
        Self {
            name: record.name.clone(),
            footprint: Footprint {
                width: record.width,
                height: record.height,
            },
            required_slot: record.slot,
            item_type: record.item_type,
            rarity: record.rarity,
            image: record.image.clone(),
            last_position: Position::Unplaced,
            current_position: Position::Unplaced,
            equipped: false,
        }
    }

    /// Set both positions at once, used when restoring saved state
    pub fn place_at(&mut self, position: Position) {
        self.last_position = position;
        self.current_position = position;
        self.equipped = matches!(position, Position::Slot(_));
    }

    /// Commit a move, keeping the previous position for rollback
    pub fn move_to(&mut self, position: Position) {
        self.last_position = std::mem::replace(&mut self.current_position, position);
        self.equipped = matches!(position, Position::Slot(_));
    }

    /// Check if this item may go in a slot
    pub fn fits(&self, slot: SlotName) -> bool {
        self.required_slot == Some(slot)
    }
}

/// One item as supplied by the store at load time
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    #[serde(default = "one")]
    pub width: u32,
    #[serde(default = "one")]
    pub height: u32,
    #[serde(default, deserialize_with = "optional_named")]
    pub slot: Option<SlotName>,
    #[serde(default, deserialize_with = "optional_named")]
    pub item_type: Option<ItemType>,
    #[serde(default, deserialize_with = "rarity_or_common")]
    pub rarity: Rarity,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub equipped: bool,
    #[serde(default, rename = "lastSpaceIndex", deserialize_with = "space_index")]
    pub last_space_index: Option<usize>,
    #[serde(default, rename = "currentSpaceIndex", deserialize_with = "space_index")]
    pub current_space_index: Option<usize>,
}

impl ItemRecord {
    /// A 1×1 unplaced record
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            width: 1,
            height: 1,
            slot: None,
            item_type: None,
            rarity: Rarity::Common,
            image: None,
            equipped: false,
            last_space_index: None,
            current_space_index: None,
        }
    }

    pub fn with_slot(mut self, slot: SlotName) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    /// Saved in the grid at `index`
    pub fn at_index(mut self, index: usize) -> Self {
        self.last_space_index = Some(index);
        self.current_space_index = Some(index);
        self
    }

    /// Saved as equipped in its slot
    pub fn equipped(mut self) -> Self {
        self.equipped = true;
        self.current_space_index = None;
        self
    }

    /// Parse the store's item array
    pub fn parse_list(json: &str) -> serde_json::Result<Vec<ItemRecord>> {
        serde_json::from_str(json)
    }
}

fn one() -> u32 {
    1
}

/// Null and blank strings are `None`, anything else must parse.
fn optional_named<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = String>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn rarity_or_common<'de, D>(deserializer: D) -> Result<Rarity, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_named::<D, Rarity>(deserializer)?.unwrap_or_default())
}

/// Saved indices arrive as numbers or numeric strings. Negative values and
/// non-numeric strings (`"no"`) mean the item was never placed.
fn space_index<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Int(i)) => usize::try_from(i).ok(),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|i| usize::try_from(i).ok()),
    })
}
