//! Cooldown state machine
//!
//! `Ready -> Casting -> OnCooldown -> Ready`, with `Disabled` layered over
//! `Ready` while the ability's `can_use` check fails. Casting and cooldowns are
//! never interrupted by `Disabled`; it is only evaluated for ready slots.

use bevy::prelude::*;

use super::descriptor::AbilityDescriptor;
use super::slots::{AbilitySlotState, SlotState, SlotTable};
use super::world::AbilityWorld;

/// Remaining cooldown at or below this counts as finished.
const COOLDOWN_EPSILON: f32 = 1e-4;

/// Advance every slot of one unit by `dt`, in slot order.
pub fn tick_cooldowns(slots: &mut SlotTable, caster: Entity, dt: f32, world: &dyn AbilityWorld) {
    for slot in slots.iter_mut() {
        tick_slot(slot, caster, dt, world);
    }
}

/// Advance a single slot by `dt`.
pub fn tick_slot(slot: &mut AbilitySlotState, caster: Entity, dt: f32, world: &dyn AbilityWorld) {
    if slot.state == SlotState::OnCooldown {
        slot.remaining_cooldown = (slot.remaining_cooldown - dt).max(0.0);
        if slot.remaining_cooldown <= COOLDOWN_EPSILON {
            slot.remaining_cooldown = 0.0;
            slot.state = SlotState::Ready;
        }
    }

    let Some(ability) = slot.ability.as_ref() else {
        // Empty slots are always ready
        slot.state = SlotState::Ready;
        slot.remaining_cooldown = 0.0;
        return;
    };

    if slot.state == SlotState::Ready && !ability.can_use(caster, world) {
        slot.state = SlotState::Disabled;
    } else if slot.state == SlotState::Disabled && ability.can_use(caster, world) {
        slot.state = SlotState::Ready;
    }
}

/// Put a slot on cooldown after a completed cast. A zero cooldown leaves the
/// slot ready straight away.
pub fn start_cooldown(slot: &mut AbilitySlotState, ability: &AbilityDescriptor) {
    slot.remaining_cooldown = ability.cooldown_seconds;
    slot.state = if ability.cooldown_seconds > 0.0 {
        SlotState::OnCooldown
    } else {
        SlotState::Ready
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::test_support::{scripted, StubWorld};

    #[test]
    fn test_cooldown_counts_down_to_ready() {
        let mut world = StubWorld::default();
        let caster = world.spawn_unit();
        let (ability, _) = scripted("bolt", 0.0, 1.0);
        let mut slot = AbilitySlotState::with_ability(ability.clone());

        start_cooldown(&mut slot, &ability);
        assert_eq!(slot.cooldown_info(), (1.0, SlotState::OnCooldown));

        tick_slot(&mut slot, caster, 0.25, &world);
        assert_eq!(slot.cooldown_info(), (0.75, SlotState::OnCooldown));

        tick_slot(&mut slot, caster, 2.0, &world);
        assert_eq!(slot.cooldown_info(), (0.0, SlotState::Ready));
    }

    #[test]
    fn test_zero_cooldown_stays_ready() {
        let (ability, _) = scripted("free", 0.0, 0.0);
        let mut slot = AbilitySlotState::with_ability(ability.clone());

        start_cooldown(&mut slot, &ability);
        assert_eq!(slot.cooldown_info(), (0.0, SlotState::Ready));
    }

    #[test]
    fn test_disabled_overlay_toggles_with_can_use() {
        let mut world = StubWorld::default();
        let caster = world.spawn_unit();
        let (ability, counts) = scripted("bolt", 0.0, 1.0);
        let mut slot = AbilitySlotState::with_ability(ability);

        counts.set_blocked(true);
        tick_slot(&mut slot, caster, 0.1, &world);
        assert_eq!(slot.state, SlotState::Disabled);

        counts.set_blocked(false);
        tick_slot(&mut slot, caster, 0.1, &world);
        assert_eq!(slot.state, SlotState::Ready);
    }

    #[test]
    fn test_disabled_does_not_interrupt_cooldown_or_cast() {
        let mut world = StubWorld::default();
        let caster = world.spawn_unit();
        let (ability, counts) = scripted("bolt", 0.0, 2.0);
        counts.set_blocked(true);

        let mut cooling = AbilitySlotState::with_ability(ability.clone());
        start_cooldown(&mut cooling, &ability);
        tick_slot(&mut cooling, caster, 0.5, &world);
        assert_eq!(cooling.cooldown_info(), (1.5, SlotState::OnCooldown));

        let mut casting = AbilitySlotState::with_ability(ability);
        casting.state = SlotState::Casting;
        tick_slot(&mut casting, caster, 0.5, &world);
        assert_eq!(casting.state, SlotState::Casting);
    }

    #[test]
    fn test_tick_cooldowns_covers_every_slot() {
        let mut world = StubWorld::default();
        let caster = world.spawn_unit();
        let (a, _) = scripted("a", 0.0, 1.0);
        let (b, _) = scripted("b", 0.0, 3.0);
        let mut table = SlotTable::from_loadout(vec![a.clone(), b.clone()]);
        start_cooldown(table.get_mut(0).unwrap(), &a);
        start_cooldown(table.get_mut(1).unwrap(), &b);

        tick_cooldowns(&mut table, caster, 1.0, &world);

        assert_eq!(table.get(0).unwrap().state, SlotState::Ready);
        assert_eq!(table.get(1).unwrap().cooldown_info(), (2.0, SlotState::OnCooldown));
    }
}
