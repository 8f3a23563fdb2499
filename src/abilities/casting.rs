//! Cast scheduler
//!
//! Instant abilities execute on dispatch. Timed abilities put their slot into
//! `Casting` and are tracked here as a small polled state machine, advanced
//! once per unpaused tick until the cast time is reached.
//!
//! Casts are keyed by `(caster, slot)`, so several slots of one unit may cast at
//! the same time and a cast keeps running while its caster is deselected.

use std::collections::BTreeMap;

use bevy::prelude::*;

use super::cooldown;
use super::descriptor::{AbilityRef, CastTarget};
use super::notifications::{AbilityNotification, CastCancelReason};
use super::selection::SelectionContext;
use super::slots::{SlotState, SlotTable};
use super::world::AbilityWorld;

/// Elapsed cast time within this much of the cast time counts as complete.
const CAST_EPSILON: f32 = 1e-4;

type CastKey = (Entity, usize);

/// Progress of a timed cast.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum CastProgress {
    NotCasting,
    Casting { elapsed: f32, duration: f32 },
}

impl CastProgress {
    /// Completed fraction in `0.0..=1.0`
    pub fn fraction(&self) -> f32 {
        match self {
            CastProgress::NotCasting => 0.0,
            CastProgress::Casting { elapsed, duration } if *duration > 0.0 => {
                (elapsed / duration).clamp(0.0, 1.0)
            }
            CastProgress::Casting { .. } => 1.0,
        }
    }
}

/// A timed cast in flight.
#[derive(Clone, Debug)]
pub struct ActiveCast {
    pub ability: AbilityRef,
    pub target: CastTarget,
    pub elapsed: f32,
}

impl ActiveCast {
    pub fn progress(&self) -> CastProgress {
        CastProgress::Casting {
            elapsed: self.elapsed,
            duration: self.ability.cast_time_seconds,
        }
    }

    fn is_complete(&self) -> bool {
        self.elapsed + CAST_EPSILON >= self.ability.cast_time_seconds
    }
}

/// Result of handing a cast to the scheduler.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CastStart {
    /// Instant cast executed and cooldown started
    Completed,
    /// Timed cast started
    Casting,
    /// Bad slot index
    Rejected,
}

#[derive(Debug, Default)]
pub struct CastScheduler {
    casts: BTreeMap<CastKey, ActiveCast>,
}

impl CastScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a cast from `slot_index` of `caster`'s table.
    pub fn begin(
        &mut self,
        caster: Entity,
        slot_index: usize,
        ability: AbilityRef,
        target: CastTarget,
        slots: &mut SlotTable,
        world: &mut dyn AbilityWorld,
        notes: &mut Vec<AbilityNotification>,
    ) -> CastStart {
        let Some(slot) = slots.get_mut(slot_index) else {
            warn!("Cast rejected: slot index {} out of range", slot_index);
            return CastStart::Rejected;
        };

        // A slot that was reassigned mid-cast can be used again before the
        // next tick notices the old cast
        if let Some(stale) = self.casts.remove(&(caster, slot_index)) {
            debug!(
                "{:?}: {} in slot {} replaced before it finished",
                caster, stale.ability.name, slot_index
            );
            stale.ability.cancel(caster, world);
            notes.push(AbilityNotification::CastCancelled {
                caster,
                ability: stale.ability,
                slot_index,
                reason: CastCancelReason::Interrupted,
            });
        }

        if ability.is_instant() {
            ability.execute(caster, target, world);
            complete(caster, slot_index, &ability, target, slots, notes);
            return CastStart::Completed;
        }

        slot.state = SlotState::Casting;
        ability.start_cast(caster, target, world);
        debug!(
            "{:?} started casting {} ({:.2}s) from slot {}",
            caster, ability.name, ability.cast_time_seconds, slot_index
        );
        notes.push(AbilityNotification::CastStarted {
            caster,
            ability: ability.clone(),
            slot_index,
            cast_time: ability.cast_time_seconds,
        });
        self.casts.insert(
            (caster, slot_index),
            ActiveCast {
                ability,
                target,
                elapsed: 0.0,
            },
        );
        CastStart::Casting
    }

    /// Advance every cast by `dt`. Paused ticks change nothing.
    pub fn tick(
        &mut self,
        dt: f32,
        selection: &mut SelectionContext,
        world: &mut dyn AbilityWorld,
        notes: &mut Vec<AbilityNotification>,
    ) {
        if world.is_paused() {
            return;
        }

        let keys: Vec<CastKey> = self.casts.keys().copied().collect();
        for (caster, slot_index) in keys {
            let still_casting = selection
                .slots_for(caster)
                .and_then(|slots| slots.get(slot_index))
                .is_some_and(|slot| slot.state == SlotState::Casting);
            if !still_casting {
                self.abort(caster, slot_index, CastCancelReason::Interrupted, selection, world, notes);
                continue;
            }

            if !caster_available(caster, world) {
                self.abort(caster, slot_index, CastCancelReason::CasterLost, selection, world, notes);
                continue;
            }

            let target_unit = self
                .casts
                .get(&(caster, slot_index))
                .and_then(|cast| cast.target.entity);
            if let Some(target) = target_unit {
                if target != caster && !(world.exists(target) && world.is_alive(target)) {
                    self.abort(caster, slot_index, CastCancelReason::TargetLost, selection, world, notes);
                    continue;
                }
            }

            let Some(cast) = self.casts.get_mut(&(caster, slot_index)) else {
                continue;
            };
            cast.elapsed += dt;
            if !cast.is_complete() {
                continue;
            }

            let Some(cast) = self.casts.remove(&(caster, slot_index)) else {
                continue;
            };
            // The caster may have been destroyed by something this same tick
            if !caster_available(caster, world) {
                cast.ability.cancel(caster, world);
                reset_slot(selection, caster, slot_index);
                notes.push(AbilityNotification::CastCancelled {
                    caster,
                    ability: cast.ability,
                    slot_index,
                    reason: CastCancelReason::CasterLost,
                });
                continue;
            }

            cast.ability.execute(caster, cast.target, world);
            if let Some(slots) = selection.slots_for_mut(caster) {
                complete(caster, slot_index, &cast.ability, cast.target, slots, notes);
            }
        }
    }

    /// Stop a cast and make its slot ready again. Works on slots marked
    /// `Casting` even when no countdown is tracked for them.
    pub fn cancel(
        &mut self,
        caster: Entity,
        slot_index: usize,
        selection: &mut SelectionContext,
        world: &mut dyn AbilityWorld,
        notes: &mut Vec<AbilityNotification>,
    ) -> bool {
        let tracked = self.casts.remove(&(caster, slot_index));
        let slot_ability = selection
            .slots_for_mut(caster)
            .and_then(|slots| slots.get_mut(slot_index))
            .and_then(|slot| {
                if slot.state == SlotState::Casting {
                    slot.state = SlotState::Ready;
                    slot.remaining_cooldown = 0.0;
                    slot.ability.clone()
                } else {
                    None
                }
            });

        let Some(ability) = tracked.map(|cast| cast.ability).or(slot_ability) else {
            return false;
        };
        ability.cancel(caster, world);
        notes.push(AbilityNotification::CastCancelled {
            caster,
            ability,
            slot_index,
            reason: CastCancelReason::Cancelled,
        });
        true
    }

    /// End every cast of a caster that is being removed from the game.
    pub fn drop_caster(
        &mut self,
        caster: Entity,
        selection: &mut SelectionContext,
        world: &mut dyn AbilityWorld,
        notes: &mut Vec<AbilityNotification>,
    ) -> usize {
        let slots: Vec<usize> = self.casts_for(caster).map(|(slot_index, _)| slot_index).collect();
        for &slot_index in &slots {
            self.abort(caster, slot_index, CastCancelReason::CasterLost, selection, world, notes);
        }
        slots.len()
    }

    pub fn is_casting(&self, caster: Entity, slot_index: usize) -> bool {
        self.casts.contains_key(&(caster, slot_index))
    }

    pub fn progress(&self, caster: Entity, slot_index: usize) -> CastProgress {
        self.casts
            .get(&(caster, slot_index))
            .map_or(CastProgress::NotCasting, ActiveCast::progress)
    }

    /// Casts in flight for one unit, in slot order
    pub fn casts_for(&self, caster: Entity) -> impl Iterator<Item = (usize, &ActiveCast)> {
        self.casts
            .range((caster, 0)..=(caster, usize::MAX))
            .map(|((_, slot_index), cast)| (*slot_index, cast))
    }

    pub fn active_count(&self) -> usize {
        self.casts.len()
    }

    fn abort(
        &mut self,
        caster: Entity,
        slot_index: usize,
        reason: CastCancelReason,
        selection: &mut SelectionContext,
        world: &mut dyn AbilityWorld,
        notes: &mut Vec<AbilityNotification>,
    ) {
        let Some(cast) = self.casts.remove(&(caster, slot_index)) else {
            return;
        };
        debug!("{:?}'s {} cast ended early: {:?}", caster, cast.ability.name, reason);
        cast.ability.cancel(caster, world);
        if reason != CastCancelReason::Interrupted {
            reset_slot(selection, caster, slot_index);
        }
        notes.push(AbilityNotification::CastCancelled {
            caster,
            ability: cast.ability,
            slot_index,
            reason,
        });
    }
}

fn caster_available(caster: Entity, world: &dyn AbilityWorld) -> bool {
    world.exists(caster) && world.is_alive(caster)
}

fn reset_slot(selection: &mut SelectionContext, caster: Entity, slot_index: usize) {
    if let Some(slot) = selection
        .slots_for_mut(caster)
        .and_then(|slots| slots.get_mut(slot_index))
    {
        if slot.state == SlotState::Casting {
            slot.state = SlotState::Ready;
            slot.remaining_cooldown = 0.0;
        }
    }
}

/// Completion steps shared by instant and timed casts.
fn complete(
    caster: Entity,
    slot_index: usize,
    ability: &AbilityRef,
    target: CastTarget,
    slots: &mut SlotTable,
    notes: &mut Vec<AbilityNotification>,
) {
    if let Some(slot) = slots.get_mut(slot_index) {
        cooldown::start_cooldown(slot, ability);
    }
    info!("{:?} used {} (slot {})", caster, ability.name, slot_index);
    notes.push(AbilityNotification::AbilityUsed {
        caster,
        ability: ability.clone(),
        slot_index,
        target,
    });
    notes.push(AbilityNotification::CooldownStarted {
        caster,
        ability: ability.clone(),
        slot_index,
        duration: ability.cooldown_seconds,
    });
}
