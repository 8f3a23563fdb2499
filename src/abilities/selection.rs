//! Selection context switcher
//!
//! Exactly one unit is active at a time. Its slot table is the one the player
//! sees and controls; every other unit's table is parked in a map until that
//! unit is selected again. Parked tables are not ticked, so their cooldowns
//! stay frozen.

use std::collections::HashMap;

use bevy::prelude::*;

use super::descriptor::AbilityRef;
use super::slots::{SlotTable, MAX_SLOTS};
use super::world::AbilityWorld;

#[derive(Debug, Default)]
pub struct SelectionContext {
    active: Option<Entity>,
    active_slots: SlotTable,
    stored: HashMap<Entity, SlotTable>,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<Entity> {
        self.active
    }

    pub fn active_slots(&self) -> &SlotTable {
        &self.active_slots
    }

    pub fn active_slots_mut(&mut self) -> &mut SlotTable {
        &mut self.active_slots
    }

    /// Park the current unit's table and load `new_active`'s.
    ///
    /// A unit seen for the first time gets its default loadout, all slots
    /// ready. A unit seen before gets its parked table back verbatim.
    pub fn switch_to(&mut self, new_active: Option<Entity>, world: &dyn AbilityWorld) {
        if let Some(previous) = self.active.take() {
            let snapshot = std::mem::take(&mut self.active_slots);
            self.stored.insert(previous, snapshot);
        }

        match new_active {
            Some(unit) => {
                self.active_slots = match self.stored.remove(&unit) {
                    Some(snapshot) => {
                        debug!("Restored slot table for {:?}", unit);
                        snapshot
                    }
                    None => {
                        debug!("Populating default loadout for {:?}", unit);
                        SlotTable::from_loadout(world.default_loadout(unit))
                    }
                };
                self.active = Some(unit);
            }
            None => {
                self.active_slots = SlotTable::new();
            }
        }
    }

    /// Equip a slot on the active unit.
    pub fn set_ability(&mut self, slot_index: usize, ability: Option<AbilityRef>) -> bool {
        if slot_index >= MAX_SLOTS {
            warn!("set_ability: slot index {} out of range; ignored", slot_index);
            return false;
        }
        if self.active.is_none() {
            warn!("set_ability: no active unit; ignored");
            return false;
        }
        self.active_slots.set_ability(slot_index, ability)
    }

    /// Equip a slot on any unit. Units that aren't active get their parked
    /// table updated (created empty if they have none yet).
    pub fn set_ability_for(
        &mut self,
        unit: Entity,
        slot_index: usize,
        ability: Option<AbilityRef>,
    ) -> bool {
        if slot_index >= MAX_SLOTS {
            warn!(
                "set_ability_for {:?}: slot index {} out of range; ignored",
                unit, slot_index
            );
            return false;
        }
        if self.active == Some(unit) {
            return self.active_slots.set_ability(slot_index, ability);
        }
        self.stored
            .entry(unit)
            .or_default()
            .set_ability(slot_index, ability)
    }

    /// The table belonging to `unit`, active or parked.
    pub fn slots_for(&self, unit: Entity) -> Option<&SlotTable> {
        if self.active == Some(unit) {
            Some(&self.active_slots)
        } else {
            self.stored.get(&unit)
        }
    }

    pub fn slots_for_mut(&mut self, unit: Entity) -> Option<&mut SlotTable> {
        if self.active == Some(unit) {
            Some(&mut self.active_slots)
        } else {
            self.stored.get_mut(&unit)
        }
    }

    /// Drop everything known about a destroyed unit.
    pub fn forget(&mut self, unit: Entity) -> bool {
        if self.active == Some(unit) {
            self.active = None;
            self.active_slots = SlotTable::new();
            return true;
        }
        self.stored.remove(&unit).is_some()
    }

    /// Number of parked tables
    pub fn stored_count(&self) -> usize {
        self.stored.len()
    }
}
