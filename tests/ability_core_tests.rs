//! Integration tests for the ability core
//!
//! These tests drive `AbilityCore` through an in-memory world and verify that:
//! - Slot tables survive selection changes with their cooldowns frozen
//! - Instant and timed casts complete, cancel and cool down correctly
//! - Pausing freezes every countdown
//! - Out-of-range unit targets become move-to-range orders
//! - Commands issued while paused replay in FIFO order

use bevy::prelude::*;

use tactics_abilities::abilities::test_support::{count_used, scripted, scripted_kind, Journal, StubWorld};
use tactics_abilities::abilities::{
    AbilityCore, AbilityNotification, CastCancelReason, CastProgress, CommandDisposition, Faction,
    PreviewPlacement, QueuedCommand, SlotState, TargetKind, TargetingCancelReason, UnitOrder,
};

fn select(core: &mut AbilityCore, world: &mut StubWorld, unit: Entity) {
    world.selected = Some(unit);
    core.sync_selection(world);
}

fn slot_info(core: &AbilityCore, unit: Entity, slot: usize) -> (f32, SlotState) {
    core.slots_for(unit)
        .and_then(|slots| slots.get(slot))
        .map(|slot| slot.cooldown_info())
        .expect("unit should have a slot table")
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn test_slot_state_survives_selection_round_trip() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (filler, _) = scripted("filler", 0.0, 0.0);
    let (bolt, _) = scripted("bolt", 0.0, 5.0);
    let a = world.spawn_with(Faction::Player, Vec3::ZERO, vec![filler.clone(), filler.clone(), bolt]);
    let b = world.spawn_with(Faction::Player, Vec3::X * 3.0, vec![filler]);

    select(&mut core, &mut world, a);
    assert!(core.try_use_ability(2, &mut world));
    core.tick(2.0, &mut world);
    assert_eq!(core.get_cooldown_info(2), Some((3.0, SlotState::OnCooldown)));

    world.selected = Some(b);
    core.tick(4.0, &mut world);
    assert_eq!(core.active_unit(), Some(b));
    // Deselected units don't tick
    assert_eq!(slot_info(&core, a, 2), (3.0, SlotState::OnCooldown));

    select(&mut core, &mut world, a);
    assert_eq!(core.get_cooldown_info(2), Some((3.0, SlotState::OnCooldown)));

    core.tick(3.0, &mut world);
    assert!(core.is_ready(2));
}

#[test]
fn test_first_selection_loads_default_loadout() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (bolt, _) = scripted("bolt", 0.0, 5.0);
    let unit = world.spawn_with(Faction::Player, Vec3::ZERO, vec![bolt]);

    assert!(core.slots_for(unit).is_none());
    select(&mut core, &mut world, unit);

    assert!(core.is_ready(0));
    assert!(!core.is_ready(1));
    assert_eq!(core.get_cooldown_info(1), Some((0.0, SlotState::Ready)));
}

#[test]
fn test_set_ability_for_inactive_unit() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (bolt, _) = scripted("bolt", 0.0, 5.0);
    let a = world.spawn_at(Faction::Player, Vec3::ZERO);
    let b = world.spawn_at(Faction::Player, Vec3::X);

    select(&mut core, &mut world, a);
    assert!(core.set_ability_for(b, 3, Some(bolt)));
    assert!(!core.is_ready(3));

    select(&mut core, &mut world, b);
    assert!(core.is_ready(3));
}

// =============================================================================
// Casting
// =============================================================================

#[test]
fn test_instant_cast_starts_cooldown_immediately() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (ability, calls) = scripted("second_wind", 0.0, 5.0);
    let unit = world.spawn_with(Faction::Player, Vec3::ZERO, vec![ability]);
    select(&mut core, &mut world, unit);

    assert!(core.try_use_ability(0, &mut world));

    assert_eq!(calls.executes(), 1);
    assert_eq!(calls.starts(), 0);
    assert_eq!(core.get_cooldown_info(0), Some((5.0, SlotState::OnCooldown)));
    assert_eq!(count_used(&core.drain_notifications()), 1);

    // A second attempt is rejected without side effects
    assert!(!core.try_use_ability(0, &mut world));
    assert_eq!(calls.executes(), 1);
    assert!(core.drain_notifications().is_empty());
}

#[test]
fn test_timed_cast_completes_after_cast_time() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (ability, calls) = scripted("meditate", 2.0, 4.0);
    let unit = world.spawn_with(Faction::Player, Vec3::ZERO, vec![ability]);
    select(&mut core, &mut world, unit);

    assert!(core.try_use_ability(0, &mut world));
    assert!(core.is_casting(0));
    assert_eq!(calls.starts(), 1);

    core.tick(1.5, &mut world);
    assert_eq!(calls.executes(), 0);
    assert_eq!(
        core.cast_progress(0),
        CastProgress::Casting {
            elapsed: 1.5,
            duration: 2.0
        }
    );

    core.tick(0.5, &mut world);
    assert_eq!(calls.executes(), 1);
    assert_eq!(core.cast_progress(0), CastProgress::NotCasting);
    assert_eq!(core.get_cooldown_info(0), Some((4.0, SlotState::OnCooldown)));
}

#[test]
fn test_destroyed_caster_cancels_cast_without_cooldown() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (ability, calls) = scripted("meditate", 2.0, 4.0);
    let unit = world.spawn_with(Faction::Player, Vec3::ZERO, vec![ability]);
    select(&mut core, &mut world, unit);

    assert!(core.try_use_ability(0, &mut world));
    core.tick(1.0, &mut world);
    core.drain_notifications();

    world.despawn(unit);
    core.tick(0.5, &mut world);

    assert_eq!(calls.executes(), 0);
    assert_eq!(calls.cancels(), 1);
    assert_eq!(slot_info(&core, unit, 0), (0.0, SlotState::Ready));

    let notes = core.drain_notifications();
    assert!(notes.iter().any(|note| matches!(
        note,
        AbilityNotification::CastCancelled {
            reason: CastCancelReason::CasterLost,
            ..
        }
    )));
    assert!(!notes
        .iter()
        .any(|note| matches!(note, AbilityNotification::CooldownStarted { .. })));

    core.tick(5.0, &mut world);
    assert_eq!(calls.executes(), 0);

    assert!(core.forget_unit(unit, &mut world));
    assert!(core.slots_for(unit).is_none());
}

#[test]
fn test_forget_unit_mid_cast_calls_cancel() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (ability, calls) = scripted("meditate", 2.0, 4.0);
    let unit = world.spawn_with(Faction::Player, Vec3::ZERO, vec![ability]);
    select(&mut core, &mut world, unit);

    assert!(core.try_use_ability(0, &mut world));
    assert!(core.forget_unit(unit, &mut world));

    assert_eq!(calls.cancels(), 1);
    assert_eq!(core.cast_progress_for(unit, 0), CastProgress::NotCasting);
}

#[test]
fn test_cancel_casting_returns_slot_to_ready() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (first, first_calls) = scripted("meditate", 2.0, 4.0);
    let (second, second_calls) = scripted("focus", 3.0, 4.0);
    let unit = world.spawn_with(Faction::Player, Vec3::ZERO, vec![first, second]);
    select(&mut core, &mut world, unit);

    // Slots cast concurrently
    assert!(core.try_use_ability(0, &mut world));
    assert!(core.try_use_ability(1, &mut world));
    assert!(core.is_casting(0) && core.is_casting(1));

    assert_eq!(core.cancel_casting(Some(0), &mut world), 1);
    assert!(core.is_ready(0));
    assert!(core.is_casting(1));

    assert_eq!(core.cancel_casting(None, &mut world), 1);
    assert!(core.is_ready(1));
    assert_eq!(core.cancel_casting(None, &mut world), 0);

    assert_eq!(first_calls.cancels(), 1);
    assert_eq!(second_calls.cancels(), 1);
    core.tick(5.0, &mut world);
    assert_eq!(first_calls.executes() + second_calls.executes(), 0);
}

#[test]
fn test_cast_continues_for_deselected_caster() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (ability, calls) = scripted("meditate", 2.0, 4.0);
    let a = world.spawn_with(Faction::Player, Vec3::ZERO, vec![ability]);
    let b = world.spawn_at(Faction::Player, Vec3::X);

    select(&mut core, &mut world, a);
    assert!(core.try_use_ability(0, &mut world));

    world.selected = Some(b);
    core.tick(1.0, &mut world);
    core.tick(1.0, &mut world);

    assert_eq!(calls.executes(), 1);
    assert_eq!(slot_info(&core, a, 0), (4.0, SlotState::OnCooldown));
}

// =============================================================================
// Pause
// =============================================================================

#[test]
fn test_pause_freezes_cast_countdown() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (ability, calls) = scripted("meditate", 2.0, 4.0);
    let unit = world.spawn_with(Faction::Player, Vec3::ZERO, vec![ability]);
    select(&mut core, &mut world, unit);

    assert!(core.try_use_ability(0, &mut world));
    core.tick(1.0, &mut world);

    world.paused = true;
    for _ in 0..10 {
        core.tick(1.0, &mut world);
    }
    assert_eq!(calls.executes(), 0);
    assert_eq!(
        core.cast_progress(0),
        CastProgress::Casting {
            elapsed: 1.0,
            duration: 2.0
        }
    );

    world.paused = false;
    core.tick(0.5, &mut world);
    assert_eq!(calls.executes(), 0);
    core.tick(0.5, &mut world);
    assert_eq!(calls.executes(), 1);
}

#[test]
fn test_pause_freezes_cooldowns() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (ability, _) = scripted("second_wind", 0.0, 5.0);
    let unit = world.spawn_with(Faction::Player, Vec3::ZERO, vec![ability]);
    select(&mut core, &mut world, unit);

    assert!(core.try_use_ability(0, &mut world));
    world.paused = true;
    core.tick(30.0, &mut world);
    assert_eq!(core.get_cooldown_info(0), Some((5.0, SlotState::OnCooldown)));
}

#[test]
fn test_paused_commands_replay_in_fifo_order() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (ping, calls) = scripted("ping", 0.0, 1.0);
    let a = world.spawn_with(Faction::Player, Vec3::ZERO, vec![ping.clone()]);
    let b = world.spawn_with(Faction::Player, Vec3::X, vec![ping.clone()]);
    let c = world.spawn_with(Faction::Player, Vec3::Z, vec![ping]);
    let runner = world.spawn_at(Faction::Player, Vec3::NEG_X);

    world.paused = true;
    select(&mut core, &mut world, a);
    assert!(core.try_use_ability(0, &mut world));

    let destination = Vec3::new(5.0, 0.0, 5.0);
    let disposition = core.issue_command(QueuedCommand::order(runner, UnitOrder::Move { destination }), &mut world);
    assert_eq!(disposition, CommandDisposition::Queued);

    select(&mut core, &mut world, b);
    assert!(core.try_use_ability(0, &mut world));
    select(&mut core, &mut world, c);
    assert!(core.try_use_ability(0, &mut world));

    assert_eq!(core.queued_commands().len(), 4);
    core.tick(1.0, &mut world);
    assert!(world.journal.is_empty());
    assert_eq!(calls.executes(), 0);

    world.paused = false;
    core.tick(0.0, &mut world);

    assert!(core.queued_commands().is_empty());
    assert_eq!(calls.executes(), 3);
    let units: Vec<Entity> = world.journal.iter().map(Journal::unit).collect();
    assert_eq!(units, vec![a, runner, b, c]);
    let seqs: Vec<u64> = world.journal.iter().map(Journal::seq).collect();
    assert!(seqs.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(world.orders_for(runner), vec![UnitOrder::Move { destination }]);

    let replayed = core
        .drain_notifications()
        .into_iter()
        .filter(|note| matches!(note, AbilityNotification::CommandReplayed { .. }))
        .count();
    assert_eq!(replayed, 4);
}

#[test]
fn test_queued_command_for_removed_unit_is_skipped() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let unit = world.spawn_at(Faction::Player, Vec3::ZERO);

    world.paused = true;
    let command = QueuedCommand::order(unit, UnitOrder::Stop);
    assert_eq!(core.issue_command(command, &mut world), CommandDisposition::Queued);
    assert!(core.has_queued_for(unit));

    world.despawn(unit);
    world.paused = false;
    core.tick(0.1, &mut world);

    assert!(world.journal.is_empty());
    assert!(!core.has_queued_for(unit));
}

#[test]
fn test_command_for_missing_unit_is_rejected() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let ghost = Entity::from_raw(999);

    let command = QueuedCommand::order(ghost, UnitOrder::Stop);
    assert_eq!(core.issue_command(command, &mut world), CommandDisposition::Rejected);
    assert!(core.queued_commands().is_empty());
}

// =============================================================================
// Targeting
// =============================================================================

#[test]
fn test_out_of_range_enemy_moves_then_casts() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (bolt, calls) = scripted_kind("bolt", TargetKind::Enemy, 0.0, 3.0, 5.0);
    let caster = world.spawn_with(Faction::Player, Vec3::ZERO, vec![bolt]);
    let enemy = world.spawn_at(Faction::Hostile, Vec3::new(20.0, 0.0, 0.0));
    select(&mut core, &mut world, caster);

    assert!(core.try_use_ability(0, &mut world));
    world.hovered = Some(enemy);
    assert!(core.confirm_targeting(None, &mut world));

    let notes = core.drain_notifications();
    assert!(notes
        .iter()
        .any(|note| matches!(note, AbilityNotification::MoveToRange { .. })));
    assert!(!notes
        .iter()
        .any(|note| matches!(note, AbilityNotification::TargetingCancelled { .. })));
    assert_eq!(
        world.orders_for(caster),
        vec![UnitOrder::MoveToRange {
            destination: Vec3::new(20.0, 0.0, 0.0),
            range: 5.0
        }]
    );
    assert!(core.pending_move_to_range(caster).is_some());
    assert_eq!(calls.executes(), 0);
    assert_eq!(calls.cancels(), 0);

    // Still out of range: nothing happens
    core.tick(0.1, &mut world);
    assert_eq!(calls.executes(), 0);

    world.move_unit(caster, Vec3::new(16.0, 0.0, 0.0));
    core.tick(0.1, &mut world);

    assert_eq!(calls.executes(), 1);
    assert!(core.pending_move_to_range(caster).is_none());
    assert_eq!(world.orders_for(caster).last(), Some(&UnitOrder::Stop));
    assert_eq!(core.get_cooldown_info(0), Some((3.0, SlotState::OnCooldown)));
}

#[test]
fn test_new_order_supersedes_deferred_cast() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (bolt, calls) = scripted_kind("bolt", TargetKind::Enemy, 0.0, 3.0, 5.0);
    let caster = world.spawn_with(Faction::Player, Vec3::ZERO, vec![bolt]);
    let enemy = world.spawn_at(Faction::Hostile, Vec3::new(20.0, 0.0, 0.0));
    select(&mut core, &mut world, caster);

    assert!(core.try_use_ability(0, &mut world));
    world.hovered = Some(enemy);
    assert!(core.confirm_targeting(None, &mut world));

    let stop = QueuedCommand::order(caster, UnitOrder::Stop);
    assert_eq!(core.issue_command(stop, &mut world), CommandDisposition::Executed);

    assert!(core.pending_move_to_range(caster).is_none());
    assert_eq!(calls.cancels(), 1);
    world.move_unit(caster, Vec3::new(18.0, 0.0, 0.0));
    core.tick(0.1, &mut world);
    assert_eq!(calls.executes(), 0);
}

#[test]
fn test_ally_ability_rejects_hostile_target() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (mend, calls) = scripted_kind("mend", TargetKind::Ally, 0.0, 3.0, 10.0);
    let caster = world.spawn_with(Faction::Player, Vec3::ZERO, vec![mend]);
    let enemy = world.spawn_at(Faction::Hostile, Vec3::new(3.0, 0.0, 0.0));
    select(&mut core, &mut world, caster);

    assert!(core.try_use_ability(0, &mut world));
    world.hovered = Some(enemy);
    assert!(!core.confirm_targeting(None, &mut world));

    assert_eq!(calls.executes(), 0);
    assert_eq!(calls.cancels(), 1);
    assert!(core.targeting_session().is_none());
    assert!(core.is_ready(0));
    assert!(world.journal.is_empty());
    assert!(core.drain_notifications().iter().any(|note| matches!(
        note,
        AbilityNotification::TargetingCancelled {
            reason: TargetingCancelReason::InvalidTarget,
            ..
        }
    )));
}

#[test]
fn test_enemy_ability_rejects_neutral_target() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (bolt, calls) = scripted_kind("bolt", TargetKind::Enemy, 0.0, 3.0, 10.0);
    let caster = world.spawn_with(Faction::Player, Vec3::ZERO, vec![bolt]);
    let merchant = world.spawn_at(Faction::Neutral, Vec3::new(2.0, 0.0, 0.0));
    select(&mut core, &mut world, caster);

    assert!(core.try_use_ability(0, &mut world));
    world.hovered = Some(merchant);
    assert!(!core.confirm_targeting(None, &mut world));
    assert_eq!(calls.executes(), 0);
}

#[test]
fn test_area_preview_follows_pointer() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (rain, calls) = scripted_kind("rain", TargetKind::Area, 1.0, 6.0, 8.0);
    let caster = world.spawn_with(Faction::Player, Vec3::ZERO, vec![rain]);
    select(&mut core, &mut world, caster);

    assert!(core.try_use_ability(0, &mut world));
    let preview = core.targeting_preview().copied().expect("area abilities have a preview");
    assert_eq!(preview.placement, PreviewPlacement::Hidden);

    let point = Vec3::new(4.0, 0.0, 1.0);
    world.pointer = Some(point);
    core.tick(0.0, &mut world);
    assert_eq!(
        core.targeting_preview().map(|preview| preview.placement),
        Some(PreviewPlacement::At(point))
    );

    assert!(core.confirm_targeting(None, &mut world));
    assert!(core.targeting_session().is_none());
    assert!(core.is_casting(0));
    assert_eq!(calls.starts(), 1);
}

#[test]
fn test_escape_cancels_targeting() {
    let mut world = StubWorld::default();
    let mut core = AbilityCore::new();
    let (rain, calls) = scripted_kind("rain", TargetKind::Area, 1.0, 6.0, 8.0);
    let caster = world.spawn_with(Faction::Player, Vec3::ZERO, vec![rain]);
    select(&mut core, &mut world, caster);

    assert!(core.try_use_ability(0, &mut world));
    assert!(core.cancel_targeting(&mut world));
    assert!(!core.cancel_targeting(&mut world));
    assert_eq!(calls.cancels(), 1);
    assert!(core.is_ready(0));
}
