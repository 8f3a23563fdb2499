//! Targeting resolver
//!
//! `Idle -> Awaiting -> (Confirmed | Cancelled) -> Idle`. At most one session
//! exists at a time; starting a new one cancels the old one first. A session is
//! always torn down when it ends, whatever the outcome.

use bevy::prelude::*;

use super::descriptor::{AbilityRef, CastTarget, PreviewShape, TargetKind};
use super::notifications::{AbilityNotification, TargetingCancelReason};
use super::world::AbilityWorld;

/// Where the preview currently sits in the world.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub enum PreviewPlacement {
    /// No ground point under the pointer yet
    #[default]
    Hidden,
    At(Vec3),
    Segment { from: Vec3, to: Vec3 },
}

/// Data a renderer needs to draw a targeting preview.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TargetingPreview {
    pub shape: PreviewShape,
    pub color: Color,
    pub placement: PreviewPlacement,
}

#[derive(Clone, Debug)]
pub struct TargetingSession {
    pub ability: AbilityRef,
    pub caster: Entity,
    pub slot_index: usize,
    /// `None` for unit-targeted abilities without a custom shape
    pub preview: Option<TargetingPreview>,
}

/// How a confirm attempt ended.
#[derive(Clone, Debug)]
pub enum TargetingOutcome {
    /// Valid and in range; hand to the cast scheduler
    Dispatch {
        caster: Entity,
        slot_index: usize,
        ability: AbilityRef,
        target: CastTarget,
    },
    /// Valid but too far away; the caster has to walk first
    OutOfRange {
        caster: Entity,
        slot_index: usize,
        ability: AbilityRef,
        target: CastTarget,
        distance: f32,
    },
    Cancelled(TargetingCancelReason),
    /// Confirm without a live session
    NoSession,
}

#[derive(Debug, Default)]
pub struct TargetingResolver {
    session: Option<TargetingSession>,
}

impl TargetingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&TargetingSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Open a session for `ability` cast by `caster` from `slot_index`.
    pub fn start_targeting(
        &mut self,
        caster: Option<Entity>,
        slot_index: usize,
        ability: AbilityRef,
        world: &mut dyn AbilityWorld,
        notes: &mut Vec<AbilityNotification>,
    ) -> bool {
        let Some(caster) = caster else {
            debug!("start_targeting: no active unit");
            return false;
        };
        if !ability.target_kind.needs_targeting() {
            debug!(
                "start_targeting: {} has target kind {} and needs no targeting",
                ability.name,
                ability.target_kind.name()
            );
            return false;
        }
        if !world.exists(caster) {
            debug!("start_targeting: caster {:?} no longer exists", caster);
            return false;
        }

        self.cancel(TargetingCancelReason::Superseded, world, notes);

        let preview = ability.preview_shape().map(|shape| TargetingPreview {
            shape,
            color: ability.preview_color,
            placement: PreviewPlacement::Hidden,
        });
        debug!("{:?} targeting {} (slot {})", caster, ability.name, slot_index);
        notes.push(AbilityNotification::TargetingStarted {
            caster,
            ability: ability.clone(),
            slot_index,
        });
        self.session = Some(TargetingSession {
            ability,
            caster,
            slot_index,
            preview,
        });
        self.update_preview(world);
        true
    }

    /// Move the preview to the pointer.
    pub fn update_preview(&mut self, world: &dyn AbilityWorld) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(preview) = session.preview.as_mut() else {
            return;
        };

        let pointer = world.pointer_ground();
        preview.placement = match (session.ability.target_kind, pointer) {
            (_, None) => PreviewPlacement::Hidden,
            (TargetKind::Path, Some(to)) => match world.position(session.caster) {
                Some(from) => PreviewPlacement::Segment { from, to },
                None => PreviewPlacement::Hidden,
            },
            (_, Some(point)) => PreviewPlacement::At(point),
        };
    }

    /// Resolve the target under the pointer and end the session.
    ///
    /// `pointer_pos` overrides the collaborator's ground point for ground
    /// kinds. The unit under the pointer always comes from the collaborator.
    pub fn confirm(
        &mut self,
        pointer_pos: Option<Vec3>,
        world: &mut dyn AbilityWorld,
        notes: &mut Vec<AbilityNotification>,
    ) -> TargetingOutcome {
        let Some(session) = self.session.take() else {
            return TargetingOutcome::NoSession;
        };
        let TargetingSession {
            ability,
            caster,
            slot_index,
            ..
        } = session;

        let resolved = resolve_target(&ability, caster, pointer_pos, world);
        let target = match resolved {
            Ok(target) => target,
            Err(reason) => {
                debug!("{:?} targeting {} failed: {:?}", caster, ability.name, reason);
                ability.cancel(caster, world);
                notes.push(AbilityNotification::TargetingCancelled {
                    caster,
                    ability,
                    reason,
                });
                return TargetingOutcome::Cancelled(reason);
            }
        };

        let Some(caster_position) = world.position(caster) else {
            ability.cancel(caster, world);
            notes.push(AbilityNotification::TargetingCancelled {
                caster,
                ability,
                reason: TargetingCancelReason::CasterLost,
            });
            return TargetingOutcome::Cancelled(TargetingCancelReason::CasterLost);
        };

        let distance = caster_position.distance(target.position);
        if distance > ability.range {
            debug!(
                "{:?}: {} target is {:.1} away (range {:.1})",
                caster, ability.name, distance, ability.range
            );
            return TargetingOutcome::OutOfRange {
                caster,
                slot_index,
                ability,
                target,
                distance,
            };
        }

        TargetingOutcome::Dispatch {
            caster,
            slot_index,
            ability,
            target,
        }
    }

    /// Abandon the live session, if any.
    pub fn cancel(
        &mut self,
        reason: TargetingCancelReason,
        world: &mut dyn AbilityWorld,
        notes: &mut Vec<AbilityNotification>,
    ) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        debug!(
            "{:?} stopped targeting {}: {:?}",
            session.caster, session.ability.name, reason
        );
        session.ability.cancel(session.caster, world);
        notes.push(AbilityNotification::TargetingCancelled {
            caster: session.caster,
            ability: session.ability,
            reason,
        });
        true
    }
}

fn resolve_target(
    ability: &AbilityRef,
    caster: Entity,
    pointer_pos: Option<Vec3>,
    world: &dyn AbilityWorld,
) -> Result<CastTarget, TargetingCancelReason> {
    if !(world.exists(caster) && world.is_alive(caster)) {
        return Err(TargetingCancelReason::CasterLost);
    }

    if !ability.target_kind.targets_unit() {
        return pointer_pos
            .or_else(|| world.pointer_ground())
            .map(CastTarget::at)
            .ok_or(TargetingCancelReason::NoGroundPoint);
    }

    let target = world
        .entity_under_pointer()
        .ok_or(TargetingCancelReason::NoTarget)?;
    if !world.has_health(target) || !world.is_alive(target) {
        return Err(TargetingCancelReason::InvalidTarget);
    }

    let (Some(own), Some(theirs)) = (world.faction(caster), world.faction(target)) else {
        return Err(TargetingCancelReason::InvalidTarget);
    };
    let faction_ok = match ability.target_kind {
        TargetKind::Ally => own.is_allied_with(theirs),
        TargetKind::Enemy => own.is_hostile_to(theirs),
        _ => false,
    };
    if !faction_ok {
        return Err(TargetingCancelReason::InvalidTarget);
    }

    let position = world
        .position(target)
        .ok_or(TargetingCancelReason::InvalidTarget)?;
    Ok(CastTarget::unit(target, position))
}
