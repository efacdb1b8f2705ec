//! Equipment slots

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::item::ItemEntity;

/// Equipment slot on the character
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    /// Helmets, hats
    Head,
    /// Chest armour
    Body,
    /// Main weapon
    MainHand,
    /// Shield or second weapon
    OffHand,
}

impl SlotName {
    /// Every slot, in display order
    pub const ALL: [SlotName; 4] = [Self::Head, Self::Body, Self::MainHand, Self::OffHand];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Body => "body",
            Self::MainHand => "main_hand",
            Self::OffHand => "off_hand",
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SlotName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "head" => Ok(Self::Head),
            "body" => Ok(Self::Body),
            "main_hand" | "mainhand" => Ok(Self::MainHand),
            "off_hand" | "offhand" => Ok(Self::OffHand),
            _ => Err(format!("Unknown slot: {}", s)),
        }
    }
}

/// Equipment errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EquipError {
    /// Item does not fit this slot
    #[error("{item} cannot be equipped in {slot}")]
    SlotTypeMismatch { item: String, slot: SlotName },

    /// Slot must be evicted before placing
    #[error("{slot} already holds {occupant}")]
    SlotOccupiedNoSwap { slot: SlotName, occupant: String },
}

/// The four single-capacity equipment slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSet {
    slots: BTreeMap<SlotName, Option<String>>,
}

impl SlotSet {
    /// Create with every slot empty
    pub fn new() -> Self {
        Self {
            slots: SlotName::ALL.iter().map(|slot| (*slot, None)).collect(),
        }
    }

    /// Name of the item in a slot
    pub fn get(&self, slot: SlotName) -> Option<&str> {
        self.slots.get(&slot).and_then(|o| o.as_deref())
    }

    /// Check if slot is occupied
    pub fn is_occupied(&self, slot: SlotName) -> bool {
        self.get(slot).is_some()
    }

    /// Put an item in its slot.
    ///
    /// The slot must match the item's required slot and must be empty;
    /// callers evict first when swapping.
    pub fn place(&mut self, slot: SlotName, item: &ItemEntity) -> Result<(), EquipError> {
        if item.required_slot != Some(slot) {
            return Err(EquipError::SlotTypeMismatch {
                item: item.name.clone(),
                slot,
            });
        }

        let entry = self.slots.entry(slot).or_default();
        if let Some(occupant) = entry {
            return Err(EquipError::SlotOccupiedNoSwap {
                slot,
                occupant: occupant.clone(),
            });
        }

        *entry = Some(item.name.clone());
        Ok(())
    }

    /// Empty a slot, returning what it held
    pub fn evict(&mut self, slot: SlotName) -> Option<String> {
        self.slots.get_mut(&slot).and_then(Option::take)
    }

    /// Find the slot holding an item
    pub fn slot_of(&self, item: &str) -> Option<SlotName> {
        self.slots
            .iter()
            .find(|(_, occupant)| occupant.as_deref() == Some(item))
            .map(|(slot, _)| *slot)
    }

    /// Iterate slots with their occupants
    pub fn iter(&self) -> impl Iterator<Item = (SlotName, Option<&str>)> {
        self.slots.iter().map(|(slot, o)| (*slot, o.as_deref()))
    }

    /// Get count of equipped items
    pub fn equipped_count(&self) -> usize {
        self.slots.values().filter(|o| o.is_some()).count()
    }
}

impl Default for SlotSet {
    fn default() -> Self {
        Self::new()
    }
}
