//! Ability core
//!
//! [`AbilityCore`] owns every piece of ability state: the selection switcher,
//! the targeting resolver, the cast scheduler, deferred casts, the paused
//! command queue and the buffered notifications. It holds no reference to the
//! game; each call receives the collaborator context explicitly.
//!
//! Per tick, in order:
//! 1. poll the selection collaborator
//! 2. move the targeting preview
//! 3. stop here while paused
//! 4. replay commands queued during the pause
//! 5. cooldowns of the active unit, in slot order
//! 6. deferred casts that reached range
//! 7. timed casts, by caster then slot

use bevy::prelude::*;

use super::casting::{CastProgress, CastScheduler, CastStart};
use super::command_queue::{CommandPayload, PausedCommandQueue, QueuedCommand};
use super::cooldown;
use super::descriptor::{AbilityRef, CastTarget, TargetKind};
use super::notifications::{AbilityNotification, TargetingCancelReason};
use super::range::{DeferredCast, DeferredCasts};
use super::selection::SelectionContext;
use super::slots::{SlotIndices, SlotState, SlotTable, MAX_SLOTS};
use super::targeting::{TargetingOutcome, TargetingPreview, TargetingResolver, TargetingSession};
use super::world::{AbilityWorld, UnitOrder};

/// What happened to a command handed to [`AbilityCore::issue_command`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CommandDisposition {
    Executed,
    /// Paused; will run on resume
    Queued,
    /// Unit gone or the command no longer applies
    Rejected,
}

#[derive(Resource, Debug, Default)]
pub struct AbilityCore {
    selection: SelectionContext,
    targeting: TargetingResolver,
    scheduler: CastScheduler,
    deferred: DeferredCasts,
    queue: PausedCommandQueue,
    notifications: Vec<AbilityNotification>,
}

impl AbilityCore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Selection & slots
    // ========================================================================

    /// Follow the selection collaborator. Only acts when the single selected
    /// unit differs from the active one.
    pub fn sync_selection(&mut self, world: &mut dyn AbilityWorld) {
        let selected = world.selected_unit();
        if selected != self.selection.active() {
            self.on_selection_changed(selected, world);
        }
    }

    /// Make `new_active` the active unit. Any live targeting session is
    /// cancelled first.
    pub fn on_selection_changed(&mut self, new_active: Option<Entity>, world: &mut dyn AbilityWorld) {
        self.targeting
            .cancel(TargetingCancelReason::SelectionChanged, world, &mut self.notifications);
        debug!(
            "Active unit {:?} -> {:?}",
            self.selection.active(),
            new_active
        );
        self.selection.switch_to(new_active, world);
    }

    /// Equip a slot of the active unit. The slot becomes ready with no
    /// cooldown.
    pub fn set_ability(&mut self, slot_index: usize, ability: Option<AbilityRef>) -> bool {
        self.selection.set_ability(slot_index, ability)
    }

    /// Equip a slot of any unit, active or not.
    pub fn set_ability_for(
        &mut self,
        unit: Entity,
        slot_index: usize,
        ability: Option<AbilityRef>,
    ) -> bool {
        self.selection.set_ability_for(unit, slot_index, ability)
    }

    /// Drop everything held for a unit that left the game.
    pub fn forget_unit(&mut self, unit: Entity, world: &mut dyn AbilityWorld) -> bool {
        let notes = &mut self.notifications;
        if self.targeting.session().is_some_and(|session| session.caster == unit) {
            self.targeting
                .cancel(TargetingCancelReason::CasterLost, world, notes);
        }
        self.scheduler
            .drop_caster(unit, &mut self.selection, world, notes);
        let had_deferred = self.deferred.forget(unit);
        let dropped_commands = self.queue.clear_for(unit);
        let had_slots = self.selection.forget(unit);
        if had_slots || had_deferred || dropped_commands > 0 {
            debug!("Forgot {:?} ({} queued commands dropped)", unit, dropped_commands);
        }
        had_slots
    }

    // ========================================================================
    // Player actions
    // ========================================================================

    /// Use the ability in `slot_index` of the active unit.
    ///
    /// Self and untargeted abilities are dispatched straight away; every other
    /// kind opens a targeting session. Returns false on any validation
    /// failure, in which case nothing observable happened.
    pub fn try_use_ability(&mut self, slot_index: usize, world: &mut dyn AbilityWorld) -> bool {
        let Some(caster) = self.selection.active() else {
            debug!("try_use_ability({}): no active unit", slot_index);
            return false;
        };
        if slot_index >= MAX_SLOTS {
            warn!("try_use_ability: slot index {} out of range", slot_index);
            return false;
        }
        let Some(slot) = self.selection.active_slots().get(slot_index) else {
            return false;
        };
        let Some(ability) = slot.ability.clone() else {
            debug!("try_use_ability({}): slot is empty", slot_index);
            return false;
        };
        if slot.state != SlotState::Ready {
            debug!(
                "try_use_ability({}): {} is {}",
                slot_index,
                ability.name,
                slot.state.name()
            );
            return false;
        }
        if !ability.can_use(caster, world) {
            debug!("try_use_ability({}): {} can't be used now", slot_index, ability.name);
            return false;
        }

        self.deferred.supersede(caster, world, &mut self.notifications);

        match ability.target_kind {
            TargetKind::Caster | TargetKind::Untargeted => {
                let Some(position) = world.position(caster) else {
                    return false;
                };
                let target = if ability.target_kind == TargetKind::Caster {
                    CastTarget::unit(caster, position)
                } else {
                    CastTarget::at(position)
                };
                self.dispatch(caster, slot_index, ability, target, world)
            }
            _ => self.targeting.start_targeting(
                Some(caster),
                slot_index,
                ability,
                world,
                &mut self.notifications,
            ),
        }
    }

    /// Confirm the live targeting session. `pointer_pos` is the ground point
    /// to use for ground-targeted kinds (the collaborator's if `None`).
    ///
    /// Returns true when the cast was dispatched, queued, or deferred until
    /// the caster is in range.
    pub fn confirm_targeting(&mut self, pointer_pos: Option<Vec3>, world: &mut dyn AbilityWorld) -> bool {
        match self
            .targeting
            .confirm(pointer_pos, world, &mut self.notifications)
        {
            TargetingOutcome::Dispatch {
                caster,
                slot_index,
                ability,
                target,
            } => self.dispatch(caster, slot_index, ability, target, world),
            TargetingOutcome::OutOfRange {
                caster,
                slot_index,
                ability,
                target,
                distance,
            } => {
                if world.is_paused() {
                    self.enqueue(
                        QueuedCommand::new(
                            caster,
                            CommandPayload::CastAbility {
                                slot_index,
                                ability,
                                target,
                            },
                        ),
                    );
                } else {
                    self.deferred.defer(
                        caster,
                        slot_index,
                        ability,
                        target,
                        distance,
                        world,
                        &mut self.notifications,
                    );
                }
                true
            }
            TargetingOutcome::Cancelled(_) | TargetingOutcome::NoSession => false,
        }
    }

    pub fn cancel_targeting(&mut self, world: &mut dyn AbilityWorld) -> bool {
        self.targeting
            .cancel(TargetingCancelReason::Escaped, world, &mut self.notifications)
    }

    /// Cancel one casting slot of the active unit, or all of them. Returns
    /// how many casts were cancelled.
    pub fn cancel_casting(&mut self, slot_index: Option<usize>, world: &mut dyn AbilityWorld) -> usize {
        let Some(caster) = self.selection.active() else {
            return 0;
        };
        let slots: SlotIndices = match slot_index {
            Some(index) if index >= MAX_SLOTS => {
                warn!("cancel_casting: slot index {} out of range", index);
                return 0;
            }
            Some(index) => std::iter::once(index).collect(),
            None => self.selection.active_slots().casting_slots(),
        };

        slots
            .into_iter()
            .filter(|&index| {
                self.scheduler.cancel(
                    caster,
                    index,
                    &mut self.selection,
                    world,
                    &mut self.notifications,
                )
            })
            .count()
    }

    /// Run a unit command now, or queue it while paused.
    pub fn issue_command(&mut self, command: QueuedCommand, world: &mut dyn AbilityWorld) -> CommandDisposition {
        if !world.exists(command.unit) {
            debug!("Command {} for missing unit {:?} rejected", command.payload.name(), command.unit);
            return CommandDisposition::Rejected;
        }
        if world.is_paused() {
            self.enqueue(command);
            return CommandDisposition::Queued;
        }
        if self.execute_command(command, world) {
            CommandDisposition::Executed
        } else {
            CommandDisposition::Rejected
        }
    }

    // ========================================================================
    // Tick
    // ========================================================================

    pub fn tick(&mut self, dt: f32, world: &mut dyn AbilityWorld) {
        self.sync_selection(world);
        self.targeting.update_preview(world);

        if world.is_paused() {
            return;
        }

        if !self.queue.is_empty() {
            self.replay_queue(world);
        }

        if let Some(active) = self.selection.active() {
            cooldown::tick_cooldowns(self.selection.active_slots_mut(), active, dt, world);
        }

        let ready = self
            .deferred
            .tick(&self.selection, world, &mut self.notifications);
        for cast in ready {
            let DeferredCast {
                caster,
                slot_index,
                ability,
                target,
                ..
            } = cast;
            world.issue_order(caster, UnitOrder::Stop);
            self.begin_cast(caster, slot_index, ability, target, world);
        }

        self.scheduler
            .tick(dt, &mut self.selection, world, &mut self.notifications);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn active_unit(&self) -> Option<Entity> {
        self.selection.active()
    }

    /// Slot table of the active unit
    pub fn slots(&self) -> &SlotTable {
        self.selection.active_slots()
    }

    pub fn slots_for(&self, unit: Entity) -> Option<&SlotTable> {
        self.selection.slots_for(unit)
    }

    /// `(remaining_cooldown, state)` of an active-unit slot
    pub fn get_cooldown_info(&self, slot_index: usize) -> Option<(f32, SlotState)> {
        self.selection
            .active_slots()
            .get(slot_index)
            .map(|slot| slot.cooldown_info())
    }

    pub fn is_ready(&self, slot_index: usize) -> bool {
        self.selection
            .active_slots()
            .get(slot_index)
            .is_some_and(|slot| !slot.is_empty() && slot.state == SlotState::Ready)
    }

    pub fn is_casting(&self, slot_index: usize) -> bool {
        self.selection
            .active_slots()
            .get(slot_index)
            .is_some_and(|slot| slot.state == SlotState::Casting)
    }

    pub fn cast_progress(&self, slot_index: usize) -> CastProgress {
        match self.selection.active() {
            Some(caster) => self.scheduler.progress(caster, slot_index),
            None => CastProgress::NotCasting,
        }
    }

    /// Cast progress of any unit's slot, selected or not
    pub fn cast_progress_for(&self, unit: Entity, slot_index: usize) -> CastProgress {
        self.scheduler.progress(unit, slot_index)
    }

    pub fn targeting_session(&self) -> Option<&TargetingSession> {
        self.targeting.session()
    }

    pub fn targeting_preview(&self) -> Option<&TargetingPreview> {
        self.targeting
            .session()
            .and_then(|session| session.preview.as_ref())
    }

    pub fn pending_move_to_range(&self, unit: Entity) -> Option<&DeferredCast> {
        self.deferred.pending_for(unit)
    }

    pub fn queued_commands(&self) -> &PausedCommandQueue {
        &self.queue
    }

    pub fn has_queued_for(&self, unit: Entity) -> bool {
        self.queue.has_queued_for(unit)
    }

    /// Take everything buffered since the last drain, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<AbilityNotification> {
        std::mem::take(&mut self.notifications)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Hand a resolved cast to the scheduler, or queue it while paused.
    fn dispatch(
        &mut self,
        caster: Entity,
        slot_index: usize,
        ability: AbilityRef,
        target: CastTarget,
        world: &mut dyn AbilityWorld,
    ) -> bool {
        if world.is_paused() {
            self.enqueue(QueuedCommand::new(
                caster,
                CommandPayload::CastAbility {
                    slot_index,
                    ability,
                    target,
                },
            ));
            return true;
        }
        self.begin_cast(caster, slot_index, ability, target, world)
    }

    fn begin_cast(
        &mut self,
        caster: Entity,
        slot_index: usize,
        ability: AbilityRef,
        target: CastTarget,
        world: &mut dyn AbilityWorld,
    ) -> bool {
        let Some(slots) = self.selection.slots_for_mut(caster) else {
            debug!("{:?} has no slot table; {} not cast", caster, ability.name);
            return false;
        };
        // Targeting can outlive the slot's readiness, so check again here
        let slot_ready = slots
            .get(slot_index)
            .is_some_and(|slot| slot.holds(&ability) && slot.state == SlotState::Ready);
        if !slot_ready || !ability.can_use(caster, world) {
            debug!("{:?}: {} is no longer ready; not cast", caster, ability.name);
            ability.cancel(caster, world);
            return false;
        }
        let result = self.scheduler.begin(
            caster,
            slot_index,
            ability,
            target,
            slots,
            world,
            &mut self.notifications,
        );
        result != CastStart::Rejected
    }

    fn enqueue(&mut self, command: QueuedCommand) {
        self.notifications.push(AbilityNotification::CommandQueued {
            unit: command.unit,
            command: command.payload.name(),
        });
        self.queue.enqueue(command);
    }

    fn replay_queue(&mut self, world: &mut dyn AbilityWorld) {
        // Detached so execution can enqueue again without aliasing the drain
        let mut queue = std::mem::take(&mut self.queue);
        let replayed = queue.drain_and_execute(|command| {
            self.notifications.push(AbilityNotification::CommandReplayed {
                unit: command.unit,
                command: command.payload.name(),
            });
            if !self.execute_command(command, world) {
                debug!("Queued command no longer applies; skipped");
            }
        });
        info!("Resumed: replayed {} queued commands", replayed);
    }

    fn execute_command(&mut self, command: QueuedCommand, world: &mut dyn AbilityWorld) -> bool {
        let QueuedCommand { unit, payload } = command;
        if !(world.exists(unit) && world.is_alive(unit)) {
            return false;
        }

        match payload {
            CommandPayload::CastAbility {
                slot_index,
                ability,
                target,
            } => self.execute_cast(unit, slot_index, ability, target, world),
            order => {
                let order = QueuedCommand::new(unit, order).to_order();
                let Some(order) = order else {
                    return false;
                };
                self.deferred.supersede(unit, world, &mut self.notifications);
                world.issue_order(unit, order);
                true
            }
        }
    }

    /// Run a queued cast after re-checking that it still makes sense.
    fn execute_cast(
        &mut self,
        caster: Entity,
        slot_index: usize,
        ability: AbilityRef,
        mut target: CastTarget,
        world: &mut dyn AbilityWorld,
    ) -> bool {
        let slot_ready = self
            .selection
            .slots_for(caster)
            .and_then(|slots| slots.get(slot_index))
            .is_some_and(|slot| slot.holds(&ability) && slot.state == SlotState::Ready);
        if !slot_ready || !ability.can_use(caster, world) {
            debug!("{:?}: queued {} no longer usable", caster, ability.name);
            return false;
        }

        let Some(caster_position) = world.position(caster) else {
            return false;
        };
        match ability.target_kind {
            TargetKind::Caster | TargetKind::Untargeted => target.position = caster_position,
            _ => {
                if let Some(unit) = target.entity {
                    if !(world.exists(unit) && world.is_alive(unit)) {
                        debug!("{:?}: queued {} lost its target", caster, ability.name);
                        return false;
                    }
                    if let Some(position) = world.position(unit) {
                        target.position = position;
                    }
                }
            }
        }

        if ability.target_kind.needs_targeting() {
            let distance = caster_position.distance(target.position);
            if distance > ability.range {
                self.deferred.defer(
                    caster,
                    slot_index,
                    ability,
                    target,
                    distance,
                    world,
                    &mut self.notifications,
                );
                return true;
            }
        }

        self.begin_cast(caster, slot_index, ability, target, world)
    }
}
