//! Ability log
//!
//! Records everything the ability core reports (plus effects, deaths and pause
//! changes) for display and post-run analysis.

use std::collections::HashMap;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::abilities::{AbilityNotification, CastTarget};

/// A single entry in the ability log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityLogEntry {
    /// Timestamp in simulation time (paused time excluded)
    pub timestamp: f32,
    /// The type of event
    pub event_type: AbilityLogEventType,
    /// Human-readable description of the event
    pub message: String,
    /// Who did it, if anyone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Catalog id of the ability involved, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<String>,
    /// Damage or healing amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f32>,
}

/// Types of log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityLogEventType {
    /// Cast completed
    AbilityUsed,
    /// Timed cast started or cancelled
    Casting,
    Cooldown,
    /// Targeting session started or cancelled
    Targeting,
    /// Move-to-range and deferred casts
    Movement,
    /// Commands queued during a pause and replayed on resume
    Command,
    Damage,
    Healing,
    Death,
    /// Pause, resume, speed changes
    Simulation,
}

/// Per-unit summary saved alongside the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitMetadata {
    pub name: String,
    pub faction: String,
    pub max_health: f32,
    pub final_health: f32,
    pub final_resource: f32,
    pub final_position: (f32, f32, f32),
}

/// Run summary saved alongside the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub scenario: String,
    pub duration: f32,
    pub units: Vec<UnitMetadata>,
}

#[derive(Serialize)]
struct SavedLog<'a> {
    metadata: &'a RunMetadata,
    entries: &'a [AbilityLogEntry],
}

/// The ability log resource storing all events
#[derive(Resource, Default, Debug, Clone)]
pub struct AbilityLog {
    /// All log entries in chronological order
    pub entries: Vec<AbilityLogEntry>,
    /// Current simulation time
    pub match_time: f32,
}

impl AbilityLog {
    /// Clear the log for a new run
    pub fn clear(&mut self) {
        self.entries.clear();
        self.match_time = 0.0;
    }

    /// Add a plain entry
    pub fn log(&mut self, event_type: AbilityLogEventType, message: String) {
        self.push(event_type, message, None, None, None);
    }

    fn push(
        &mut self,
        event_type: AbilityLogEventType,
        message: String,
        actor: Option<String>,
        ability: Option<String>,
        amount: Option<f32>,
    ) {
        self.entries.push(AbilityLogEntry {
            timestamp: self.match_time,
            event_type,
            message,
            actor,
            ability,
            amount,
        });
    }

    /// Record a core notification. `name_of` turns entities into display
    /// names.
    pub fn record_notification(&mut self, note: &AbilityNotification, name_of: impl Fn(Entity) -> String) {
        use AbilityLogEventType as T;

        let actor = name_of(note.unit());
        let (event_type, ability, message) = match note {
            AbilityNotification::AbilityUsed {
                caster,
                ability,
                target,
                ..
            } => {
                let target = describe_target(*caster, target, &name_of);
                (T::AbilityUsed, Some(ability), format!("{} uses {}{}", actor, ability.name, target))
            }
            AbilityNotification::CooldownStarted { ability, duration, .. } => (
                T::Cooldown,
                Some(ability),
                format!("{}'s {} is on cooldown for {:.1}s", actor, ability.name, duration),
            ),
            AbilityNotification::CastStarted {
                ability, cast_time, ..
            } => (
                T::Casting,
                Some(ability),
                format!("{} begins casting {} ({:.1}s)", actor, ability.name, cast_time),
            ),
            AbilityNotification::CastCancelled { ability, reason, .. } => (
                T::Casting,
                Some(ability),
                format!("{}'s {} cast was cancelled ({:?})", actor, ability.name, reason),
            ),
            AbilityNotification::TargetingStarted { ability, .. } => (
                T::Targeting,
                Some(ability),
                format!("{} is targeting {}", actor, ability.name),
            ),
            AbilityNotification::TargetingCancelled { ability, reason, .. } => (
                T::Targeting,
                Some(ability),
                format!("{} stopped targeting {} ({:?})", actor, ability.name, reason),
            ),
            AbilityNotification::MoveToRange {
                ability, distance, ..
            } => (
                T::Movement,
                Some(ability),
                format!(
                    "{} moves into range for {} ({:.1} away, range {:.1})",
                    actor, ability.name, distance, ability.range
                ),
            ),
            AbilityNotification::DeferredCastDropped { ability, .. } => (
                T::Movement,
                Some(ability),
                format!("{}'s deferred {} was dropped", actor, ability.name),
            ),
            AbilityNotification::CommandQueued { command, .. } => (
                T::Command,
                None,
                format!("{} for {} queued while paused", command, actor),
            ),
            AbilityNotification::CommandReplayed { command, .. } => {
                (T::Command, None, format!("{} for {} replayed", command, actor))
            }
        };

        self.push(event_type, message, Some(actor), ability.map(|a| a.id.clone()), None);
    }

    pub fn log_damage(&mut self, source: String, target: String, ability: String, amount: f32) {
        let message = format!("{}'s {} hits {} for {:.0} damage", source, ability, target, amount);
        self.push(AbilityLogEventType::Damage, message, Some(source), Some(ability), Some(amount));
    }

    pub fn log_healing(&mut self, source: String, target: String, ability: String, amount: f32) {
        let message = format!("{}'s {} heals {} for {:.0}", source, ability, target, amount);
        self.push(AbilityLogEventType::Healing, message, Some(source), Some(ability), Some(amount));
    }

    pub fn log_death(&mut self, victim: &str, killer: &str) {
        let message = format!("{} has been slain by {}", victim, killer);
        self.push(AbilityLogEventType::Death, message, Some(killer.to_string()), None, None);
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: AbilityLogEventType) -> Vec<&AbilityLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&AbilityLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    pub fn count(&self, event_type: AbilityLogEventType) -> usize {
        self.entries.iter().filter(|e| e.event_type == event_type).count()
    }

    /// How many times each ability completed, by catalog id
    pub fn uses_by_ability(&self) -> HashMap<String, usize> {
        let mut uses = HashMap::new();
        for entry in &self.entries {
            if entry.event_type != AbilityLogEventType::AbilityUsed {
                continue;
            }
            if let Some(ability) = &entry.ability {
                *uses.entry(ability.clone()).or_insert(0) += 1;
            }
        }
        uses
    }

    /// Completed casts of one ability
    pub fn uses_of(&self, ability_id: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.event_type == AbilityLogEventType::AbilityUsed && e.ability.as_deref() == Some(ability_id))
            .count()
    }

    /// Damage dealt by `source`, per ability
    pub fn damage_by_ability(&self, source: &str) -> HashMap<String, f32> {
        let mut damage = HashMap::new();
        for entry in self.filter_by_type(AbilityLogEventType::Damage) {
            if entry.actor.as_deref() != Some(source) {
                continue;
            }
            if let (Some(ability), Some(amount)) = (&entry.ability, entry.amount) {
                *damage.entry(ability.clone()).or_insert(0.0) += amount;
            }
        }
        damage
    }

    /// Write the log as JSON. Without an explicit path the file goes to
    /// `ability_logs/` with a timestamped name. Returns the path written.
    pub fn save_to_file(&self, metadata: &RunMetadata, path: Option<&str>) -> Result<String, String> {
        let filename = match path {
            Some(path) => path.to_string(),
            None => {
                let stamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                format!("ability_logs/run_{}.json", stamp)
            }
        };

        if let Some(parent) = Path::new(&filename).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
            }
        }

        let saved = SavedLog {
            metadata,
            entries: &self.entries,
        };
        let json = serde_json::to_string_pretty(&saved)
            .map_err(|e| format!("Failed to serialize ability log: {}", e))?;
        std::fs::write(&filename, json).map_err(|e| format!("Failed to write {}: {}", filename, e))?;

        Ok(filename)
    }
}

fn describe_target(caster: Entity, target: &CastTarget, name_of: &impl Fn(Entity) -> String) -> String {
    match target.entity {
        Some(entity) if entity == caster => String::new(),
        Some(entity) => format!(" on {}", name_of(entity)),
        None => format!(" at ({:.1}, {:.1})", target.position.x, target.position.z),
    }
}
