//! Data-driven ability catalog
//!
//! Abilities are defined in `assets/config/abilities.ron` rather than in code.
//! Each entry becomes one shared [`AbilityRef`]; units equip abilities by id.
//!
//! ## Usage
//! ```ignore
//! fn my_system(abilities: Res<AbilityDefinitions>) {
//!     let firebolt = abilities.get("firebolt").unwrap();
//!     println!("Firebolt cast time: {}", firebolt.cast_time_seconds);
//! }
//! ```

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::descriptor::{AbilityBehavior, AbilityDescriptor, AbilityRef, CastTarget, PreviewShape, TargetKind};
use super::world::{AbilityEffect, AbilityWorld};

/// Default catalog location, relative to the working directory
pub const ABILITIES_CONFIG_PATH: &str = "assets/config/abilities.ron";

fn default_preview_color() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// What an ability does when it executes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum EffectSpec {
    /// `radius` 0 hits only the unit target
    Damage {
        amount: f32,
        #[serde(default)]
        radius: f32,
    },
    Heal {
        amount: f32,
        #[serde(default)]
        radius: f32,
    },
    /// Teleport the caster to the target point, at most `range` away
    Blink,
    Reveal { radius: f32 },
}

/// One catalog entry as written in RON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbilityConfig {
    /// Display name of the ability
    pub name: String,
    pub target: TargetKind,

    // === Timing ===
    /// Cast time in seconds (0.0 = instant)
    #[serde(default)]
    pub cast_time: f32,
    /// Cooldown after cast in seconds
    #[serde(default)]
    pub cooldown: f32,

    // === Targeting ===
    /// Maximum range in units
    #[serde(default)]
    pub range: f32,
    /// RGB colour of the targeting preview (0.0-1.0)
    #[serde(default = "default_preview_color")]
    pub preview_color: [f32; 3],

    /// Resource spent on execution (mana, rage or stamina)
    #[serde(default)]
    pub resource_cost: f32,

    pub effect: EffectSpec,
}

impl AbilityConfig {
    /// Problems with this entry, if any.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("empty name".to_string());
        }
        for (field, value) in [
            ("cast_time", self.cast_time),
            ("cooldown", self.cooldown),
            ("range", self.range),
            ("resource_cost", self.resource_cost),
        ] {
            if !(value >= 0.0) {
                problems.push(format!("{} must be >= 0 (got {})", field, value));
            }
        }
        if self.target.needs_targeting() && self.range <= 0.0 {
            problems.push(format!("{} target needs a positive range", self.target.name()));
        }
        match self.effect {
            EffectSpec::Blink if !matches!(self.target, TargetKind::Path | TargetKind::Point) => {
                problems.push("Blink needs a Path or Point target".to_string());
            }
            EffectSpec::Damage { radius, .. } | EffectSpec::Heal { radius, .. } | EffectSpec::Reveal { radius }
                if !(radius >= 0.0) =>
            {
                problems.push(format!("radius must be >= 0 (got {})", radius));
            }
            _ => {}
        }
        problems
    }

    /// Build the shared descriptor for catalog key `id`.
    pub fn to_descriptor(&self, id: &str) -> AbilityDescriptor {
        let [r, g, b] = self.preview_color;
        AbilityDescriptor::new(id, self.name.clone(), self.target, EffectBehavior::new(self.effect))
            .with_cast_time(self.cast_time)
            .with_cooldown(self.cooldown)
            .with_range(self.range)
            .with_resource_cost(self.resource_cost)
            .with_preview_color(Color::srgb(r, g, b))
    }
}

/// Behaviour of catalog abilities: pay the resource cost, then emit the
/// configured effect.
#[derive(Clone, Copy, Debug)]
pub struct EffectBehavior {
    effect: EffectSpec,
}

impl EffectBehavior {
    pub fn new(effect: EffectSpec) -> Self {
        Self { effect }
    }
}

impl AbilityBehavior for EffectBehavior {
    fn can_use(&self, ability: &AbilityDescriptor, caster: Entity, world: &dyn AbilityWorld) -> bool {
        world.is_alive(caster) && world.resource(caster) >= ability.resource_cost
    }

    fn execute(&self, ability: &AbilityDescriptor, caster: Entity, target: CastTarget, world: &mut dyn AbilityWorld) {
        if ability.resource_cost > 0.0 && !world.spend_resource(caster, ability.resource_cost) {
            warn!("{:?} can no longer pay for {}; no effect", caster, ability.name);
            return;
        }

        let effect = match self.effect {
            EffectSpec::Damage { amount, radius } => AbilityEffect::Damage {
                source: caster,
                ability: ability.id.clone(),
                target,
                amount,
                radius,
            },
            EffectSpec::Heal { amount, radius } => AbilityEffect::Heal {
                source: caster,
                ability: ability.id.clone(),
                target,
                amount,
                radius,
            },
            EffectSpec::Blink => AbilityEffect::Blink {
                source: caster,
                ability: ability.id.clone(),
                destination: target.position,
                max_distance: ability.range,
            },
            EffectSpec::Reveal { radius } => AbilityEffect::Reveal {
                source: caster,
                ability: ability.id.clone(),
                position: target.position,
                radius,
            },
        };
        world.apply_effect(effect);
    }

    fn preview_shape(&self, ability: &AbilityDescriptor) -> Option<PreviewShape> {
        if !matches!(ability.target_kind, TargetKind::Area | TargetKind::Point) {
            return None;
        }
        match self.effect {
            EffectSpec::Damage { radius, .. } | EffectSpec::Heal { radius, .. } | EffectSpec::Reveal { radius }
                if radius > 0.0 =>
            {
                Some(PreviewShape::Circle { radius })
            }
            _ => None,
        }
    }
}

/// Root structure for the abilities.ron file
#[derive(Debug, Serialize, Deserialize)]
pub struct AbilitiesConfig {
    pub abilities: HashMap<String, AbilityConfig>,
}

/// Resource holding every catalog ability, keyed by id.
#[derive(Resource, Clone, Debug)]
pub struct AbilityDefinitions {
    definitions: HashMap<String, AbilityRef>,
}

impl AbilityDefinitions {
    /// Build descriptors from a validated config
    pub fn new(config: AbilitiesConfig) -> Self {
        let definitions = config
            .abilities
            .iter()
            .map(|(id, entry)| (id.clone(), entry.to_descriptor(id).into_ref()))
            .collect();
        Self { definitions }
    }

    pub fn empty() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// Add or replace one ability
    pub fn insert(&mut self, ability: AbilityRef) {
        self.definitions.insert(ability.id.clone(), ability);
    }

    pub fn get(&self, id: &str) -> Option<&AbilityRef> {
        self.definitions.get(id)
    }

    /// Abilities for a list of ids, in order. Unknown ids are skipped.
    pub fn resolve_loadout<S: AsRef<str>>(&self, ids: &[S]) -> Vec<AbilityRef> {
        ids.iter()
            .filter_map(|id| {
                let id = id.as_ref();
                let found = self.definitions.get(id).cloned();
                if found.is_none() {
                    warn!("Unknown ability '{}' in loadout; skipped", id);
                }
                found
            })
            .collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.definitions.keys()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Check every entry; the error lists each problem as `id: problem`.
pub fn validate(config: &AbilitiesConfig) -> Result<(), Vec<String>> {
    let mut problems: Vec<String> = config
        .abilities
        .iter()
        .flat_map(|(id, entry)| {
            entry
                .problems()
                .into_iter()
                .map(move |problem| format!("{}: {}", id, problem))
        })
        .collect();

    if config.abilities.is_empty() {
        problems.push("no abilities defined".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        problems.sort();
        Err(problems)
    }
}

/// Parse and validate catalog text. `source` names it in error messages.
pub fn parse_ability_definitions(contents: &str, source: &str) -> Result<AbilityDefinitions, String> {
    let config: AbilitiesConfig =
        ron::from_str(contents).map_err(|e| format!("Failed to parse {}: {}", source, e))?;

    validate(&config)
        .map_err(|problems| format!("Invalid ability definitions in {}: {}", source, problems.join("; ")))?;

    Ok(AbilityDefinitions::new(config))
}

/// Load ability definitions from a RON file
pub fn load_ability_definitions_from(path: &str) -> Result<AbilityDefinitions, String> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;

    let definitions = parse_ability_definitions(&contents, path)?;
    info!("Loaded {} ability definitions from {}", definitions.len(), path);
    Ok(definitions)
}

/// Load ability definitions from assets/config/abilities.ron
pub fn load_ability_definitions() -> Result<AbilityDefinitions, String> {
    load_ability_definitions_from(ABILITIES_CONFIG_PATH)
}

/// Inserts [`AbilityDefinitions`] unless the app already has them.
#[derive(Default)]
pub struct AbilityCatalogPlugin {
    /// Catalog file; the default path when `None`
    pub path: Option<String>,
}

impl Plugin for AbilityCatalogPlugin {
    fn build(&self, app: &mut App) {
        if app.world().contains_resource::<AbilityDefinitions>() {
            return;
        }
        let path = self.path.as_deref().unwrap_or(ABILITIES_CONFIG_PATH);
        match load_ability_definitions_from(path) {
            Ok(definitions) => {
                app.insert_resource(definitions);
            }
            Err(e) => {
                error!("{}; continuing with an empty ability catalog", e);
                app.insert_resource(AbilityDefinitions::empty());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::test_support::StubWorld;

    fn entry(target: TargetKind, effect: EffectSpec) -> AbilityConfig {
        AbilityConfig {
            name: "Test".to_string(),
            target,
            cast_time: 0.0,
            cooldown: 0.0,
            range: 10.0,
            preview_color: default_preview_color(),
            resource_cost: 0.0,
            effect,
        }
    }

    #[test]
    fn test_valid_entry_has_no_problems() {
        let bolt = entry(TargetKind::Enemy, EffectSpec::Damage { amount: 10.0, radius: 0.0 });
        assert!(bolt.problems().is_empty());
    }

    #[test]
    fn test_problems_are_reported() {
        let mut bad = entry(TargetKind::Caster, EffectSpec::Blink);
        bad.cooldown = -1.0;
        let problems = bad.problems();
        assert_eq!(problems.len(), 2);

        let mut no_range = entry(TargetKind::Area, EffectSpec::Reveal { radius: 2.0 });
        no_range.range = 0.0;
        assert_eq!(no_range.problems().len(), 1);
    }

    #[test]
    fn test_parse_minimal_catalog() {
        let text = r#"(
            abilities: {
                "zap": (
                    name: "Zap",
                    target: Enemy,
                    cast_time: 1.0,
                    range: 5.0,
                    effect: Damage(amount: 12.0),
                ),
            },
        )"#;
        let definitions = parse_ability_definitions(text, "inline").unwrap();
        let zap = definitions.get("zap").unwrap();
        assert_eq!(zap.name, "Zap");
        assert_eq!(zap.cast_time_seconds, 1.0);
        assert_eq!(zap.cooldown_seconds, 0.0);
    }

    #[test]
    fn test_parse_errors_name_the_source() {
        let err = parse_ability_definitions("(abilities: {})", "empty.ron").unwrap_err();
        assert!(err.contains("empty.ron"));
        assert!(err.contains("no abilities defined"));
    }

    #[test]
    fn test_effect_behavior_spends_then_applies() {
        let mut world = StubWorld::default();
        let caster = world.spawn_unit();
        let mut config = entry(TargetKind::Enemy, EffectSpec::Damage { amount: 30.0, radius: 0.0 });
        config.resource_cost = 60.0;
        let ability = config.to_descriptor("bolt").into_ref();

        assert!(ability.can_use(caster, &world));
        ability.execute(caster, CastTarget::at(Vec3::X), &mut world);
        assert_eq!(world.units[&caster].resource, 40.0);
        assert_eq!(world.effects().len(), 1);

        assert!(!ability.can_use(caster, &world));
        ability.execute(caster, CastTarget::at(Vec3::X), &mut world);
        assert_eq!(world.effects().len(), 1);
    }

    #[test]
    fn test_area_effect_previews_its_radius() {
        let ability = entry(TargetKind::Area, EffectSpec::Damage { amount: 5.0, radius: 3.0 })
            .to_descriptor("wave");
        assert_eq!(ability.preview_shape(), Some(PreviewShape::Circle { radius: 3.0 }));
    }
}
