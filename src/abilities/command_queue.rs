//! Paused-command queue
//!
//! Anything that would change the simulation while it is paused (a move order,
//! an attack, an ability cast) is captured here instead and replayed in FIFO
//! order on resume. Commands capture intent only; whoever executes them
//! re-checks validity at that point.

use std::collections::VecDeque;

use bevy::prelude::*;

use super::descriptor::{AbilityRef, CastTarget};
use super::world::UnitOrder;

#[derive(Clone, Debug)]
pub enum CommandPayload {
    Move { destination: Vec3 },
    MoveToRange { destination: Vec3, range: f32 },
    Guard { position: Vec3 },
    Patrol { waypoints: Vec<Vec3> },
    AttackTarget { target: Entity },
    CastAbility {
        slot_index: usize,
        ability: AbilityRef,
        target: CastTarget,
    },
    Stop,
}

impl CommandPayload {
    pub fn name(&self) -> &'static str {
        match self {
            CommandPayload::Move { .. } => "Move",
            CommandPayload::MoveToRange { .. } => "MoveToRange",
            CommandPayload::Guard { .. } => "Guard",
            CommandPayload::Patrol { .. } => "Patrol",
            CommandPayload::AttackTarget { .. } => "AttackTarget",
            CommandPayload::CastAbility { .. } => "CastAbility",
            CommandPayload::Stop => "Stop",
        }
    }
}

impl From<UnitOrder> for CommandPayload {
    fn from(order: UnitOrder) -> Self {
        match order {
            UnitOrder::Move { destination } => CommandPayload::Move { destination },
            UnitOrder::MoveToRange { destination, range } => {
                CommandPayload::MoveToRange { destination, range }
            }
            UnitOrder::Guard { position } => CommandPayload::Guard { position },
            UnitOrder::Patrol { waypoints } => CommandPayload::Patrol { waypoints },
            UnitOrder::Attack { target } => CommandPayload::AttackTarget { target },
            UnitOrder::Stop => CommandPayload::Stop,
        }
    }
}

/// A command waiting for the simulation to resume.
#[derive(Clone, Debug)]
pub struct QueuedCommand {
    /// The unit the command is for
    pub unit: Entity,
    pub payload: CommandPayload,
}

impl QueuedCommand {
    pub fn new(unit: Entity, payload: impl Into<CommandPayload>) -> Self {
        Self {
            unit,
            payload: payload.into(),
        }
    }

    pub fn order(unit: Entity, order: UnitOrder) -> Self {
        Self::new(unit, order)
    }

    /// The unit order this command carries. Ability casts have none.
    pub fn to_order(&self) -> Option<UnitOrder> {
        match &self.payload {
            CommandPayload::Move { destination } => Some(UnitOrder::Move {
                destination: *destination,
            }),
            CommandPayload::MoveToRange { destination, range } => Some(UnitOrder::MoveToRange {
                destination: *destination,
                range: *range,
            }),
            CommandPayload::Guard { position } => Some(UnitOrder::Guard {
                position: *position,
            }),
            CommandPayload::Patrol { waypoints } => Some(UnitOrder::Patrol {
                waypoints: waypoints.clone(),
            }),
            CommandPayload::AttackTarget { target } => Some(UnitOrder::Attack { target: *target }),
            CommandPayload::Stop => Some(UnitOrder::Stop),
            CommandPayload::CastAbility { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct PausedCommandQueue {
    commands: VecDeque<QueuedCommand>,
}

impl PausedCommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, command: QueuedCommand) {
        debug!(
            "Queued {} for {:?} ({} waiting)",
            command.payload.name(),
            command.unit,
            self.commands.len() + 1
        );
        self.commands.push_back(command);
    }

    /// Whether anything is waiting for `unit`
    pub fn has_queued_for(&self, unit: Entity) -> bool {
        self.commands.iter().any(|command| command.unit == unit)
    }

    /// Execute every queued command in enqueue order and empty the queue.
    ///
    /// The queue is detached before the first command runs, so anything
    /// enqueued by `execute` waits for the next drain.
    pub fn drain_and_execute<F>(&mut self, mut execute: F) -> usize
    where
        F: FnMut(QueuedCommand),
    {
        let drained = std::mem::take(&mut self.commands);
        let count = drained.len();
        for command in drained {
            execute(command);
        }
        count
    }

    /// Discard everything queued for `unit`
    pub fn clear_for(&mut self, unit: Entity) -> usize {
        let before = self.commands.len();
        self.commands.retain(|command| command.unit != unit);
        before - self.commands.len()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedCommand> {
        self.commands.iter()
    }
}
