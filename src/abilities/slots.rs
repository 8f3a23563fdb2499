//! Ability slot table
//!
//! Every unit has [`MAX_SLOTS`] fixed slots. A slot holds a shared handle to an
//! ability plus its cooldown state.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::descriptor::{same_ability, AbilityRef};

/// Number of ability slots per unit.
pub const MAX_SLOTS: usize = 6;

/// Slot indices collected per tick; never more than the slot count.
pub type SlotIndices = SmallVec<[usize; MAX_SLOTS]>;

/// Readiness of a single slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SlotState {
    #[default]
    Ready,
    Casting,
    OnCooldown,
    /// The ability's `can_use` check currently fails
    Disabled,
}

impl SlotState {
    pub fn name(&self) -> &'static str {
        match self {
            SlotState::Ready => "Ready",
            SlotState::Casting => "Casting",
            SlotState::OnCooldown => "OnCooldown",
            SlotState::Disabled => "Disabled",
        }
    }
}

/// One slot: the equipped ability and its cooldown state.
///
/// An empty slot is always `Ready` with no cooldown. A positive
/// `remaining_cooldown` only ever appears together with `OnCooldown`.
#[derive(Clone, Debug, Default)]
pub struct AbilitySlotState {
    pub ability: Option<AbilityRef>,
    pub remaining_cooldown: f32,
    pub state: SlotState,
}

impl AbilitySlotState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_ability(ability: AbilityRef) -> Self {
        Self {
            ability: Some(ability),
            remaining_cooldown: 0.0,
            state: SlotState::Ready,
        }
    }

    /// Equip `ability` (or clear the slot) and make it ready.
    pub fn reset(&mut self, ability: Option<AbilityRef>) {
        self.ability = ability;
        self.remaining_cooldown = 0.0;
        self.state = SlotState::Ready;
    }

    pub fn is_empty(&self) -> bool {
        self.ability.is_none()
    }

    /// Whether this slot still holds exactly `ability`.
    pub fn holds(&self, ability: &AbilityRef) -> bool {
        self.ability
            .as_ref()
            .is_some_and(|equipped| same_ability(equipped, ability))
    }

    /// `(remaining_cooldown, state)` for UI queries
    pub fn cooldown_info(&self) -> (f32, SlotState) {
        (self.remaining_cooldown, self.state)
    }
}

/// The fixed set of slots owned by one unit.
#[derive(Clone, Debug, Default)]
pub struct SlotTable {
    slots: [AbilitySlotState; MAX_SLOTS],
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill slots in order from a loadout. Entries past the last slot are
    /// dropped.
    pub fn from_loadout(abilities: impl IntoIterator<Item = AbilityRef>) -> Self {
        let mut table = Self::new();
        for (index, ability) in abilities.into_iter().enumerate() {
            if index >= MAX_SLOTS {
                warn!(
                    "Loadout has more than {} abilities; ignoring '{}'",
                    MAX_SLOTS, ability.name
                );
                continue;
            }
            table.slots[index] = AbilitySlotState::with_ability(ability);
        }
        table
    }

    pub fn get(&self, index: usize) -> Option<&AbilitySlotState> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut AbilitySlotState> {
        self.slots.get_mut(index)
    }

    /// Equip or clear a slot. Out-of-range indices are logged and ignored.
    pub fn set_ability(&mut self, index: usize, ability: Option<AbilityRef>) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                slot.reset(ability);
                true
            }
            None => {
                warn!("Slot index {} out of range (0..{}); ignored", index, MAX_SLOTS);
                false
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AbilitySlotState> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AbilitySlotState> {
        self.slots.iter_mut()
    }

    /// Indices of slots currently casting, in slot order
    pub fn casting_slots(&self) -> SlotIndices {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state == SlotState::Casting)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(AbilitySlotState::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::descriptor::{AbilityBehavior, AbilityDescriptor, CastTarget, TargetKind};
    use crate::abilities::world::AbilityWorld;

    struct Inert;

    impl AbilityBehavior for Inert {
        fn execute(&self, _: &AbilityDescriptor, _: Entity, _: CastTarget, _: &mut dyn AbilityWorld) {}
    }

    fn ability(id: &str) -> AbilityRef {
        AbilityDescriptor::new(id, id, TargetKind::Caster, Inert).into_ref()
    }

    #[test]
    fn test_new_table_is_empty_and_ready() {
        let table = SlotTable::new();
        assert!(table.is_empty());
        assert!(table.iter().all(|slot| slot.state == SlotState::Ready && slot.remaining_cooldown == 0.0));
    }

    #[test]
    fn test_loadout_overflow_is_truncated() {
        let loadout: Vec<AbilityRef> = (0..8).map(|i| ability(&format!("a{i}"))).collect();
        let table = SlotTable::from_loadout(loadout.clone());

        for (index, slot) in table.iter().enumerate() {
            assert!(slot.holds(&loadout[index]));
        }
        assert_eq!(table.iter().count(), MAX_SLOTS);
    }

    #[test]
    fn test_set_ability_resets_slot() {
        let mut table = SlotTable::new();
        let first = ability("first");
        table.set_ability(1, Some(first.clone()));
        {
            let slot = table.get_mut(1).unwrap();
            slot.state = SlotState::OnCooldown;
            slot.remaining_cooldown = 4.0;
        }

        let second = ability("second");
        assert!(table.set_ability(1, Some(second.clone())));

        let slot = table.get(1).unwrap();
        assert!(slot.holds(&second));
        assert!(!slot.holds(&first));
        assert_eq!(slot.cooldown_info(), (0.0, SlotState::Ready));
    }

    #[test]
    fn test_set_ability_out_of_range_changes_nothing() {
        let mut table = SlotTable::new();
        assert!(!table.set_ability(MAX_SLOTS, Some(ability("x"))));
        assert!(table.is_empty());
    }

    #[test]
    fn test_casting_slots_in_order() {
        let mut table = SlotTable::from_loadout(vec![ability("a"), ability("b"), ability("c")]);
        table.get_mut(2).unwrap().state = SlotState::Casting;
        table.get_mut(0).unwrap().state = SlotState::Casting;

        assert_eq!(table.casting_slots().as_slice(), &[0, 2]);
    }
}
