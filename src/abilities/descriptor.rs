//! Ability descriptors
//!
//! An [`AbilityDescriptor`] is the immutable definition of an ability: its
//! timings, range, targeting kind and the behaviour that runs when it is used.
//! Descriptors are shared by every unit that equips them through [`AbilityRef`],
//! so a slot holds a handle to the definition and never a copy of it.

use std::fmt;
use std::sync::Arc;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::world::AbilityWorld;

/// Shared, read-only handle to an ability definition.
pub type AbilityRef = Arc<AbilityDescriptor>;

/// Length of the placeholder segment shown for path abilities before the
/// pointer has been resolved.
pub const DEFAULT_PATH_SEGMENT_LENGTH: f32 = 1.0;
/// Width of the default path preview.
pub const DEFAULT_PATH_WIDTH: f32 = 0.5;
/// Radius of the default point marker.
pub const DEFAULT_MARKER_RADIUS: f32 = 0.4;

/// How an ability chooses what it affects.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TargetKind {
    /// Affects the caster. Dispatched immediately, never enters targeting.
    #[serde(alias = "Self")]
    Caster,
    /// A living unit of the caster's own faction
    Ally,
    /// A living unit of the opposing faction
    Enemy,
    /// A circle on the ground
    Area,
    /// A line from the caster towards a ground point
    Path,
    /// A single ground point
    Point,
    /// No target at all. Dispatched immediately at the caster's position.
    #[serde(alias = "None")]
    Untargeted,
}

impl TargetKind {
    /// Whether using the ability opens an interactive targeting session.
    pub fn needs_targeting(&self) -> bool {
        matches!(
            self,
            TargetKind::Ally | TargetKind::Enemy | TargetKind::Area | TargetKind::Path | TargetKind::Point
        )
    }

    /// Whether the target is a unit picked under the pointer.
    pub fn targets_unit(&self) -> bool {
        matches!(self, TargetKind::Ally | TargetKind::Enemy)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TargetKind::Caster => "Self",
            TargetKind::Ally => "Ally",
            TargetKind::Enemy => "Enemy",
            TargetKind::Area => "Area",
            TargetKind::Path => "Path",
            TargetKind::Point => "Point",
            TargetKind::Untargeted => "None",
        }
    }
}

/// Geometry hint used to drive a targeting preview.
///
/// Only the data is produced here; drawing it is up to the renderer.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub enum PreviewShape {
    /// Ground circle centred on the pointer
    Circle { radius: f32 },
    /// Segment from the caster towards the pointer
    Segment { width: f32, length: f32 },
    /// Small marker on the pointer
    Marker { radius: f32 },
}

impl PreviewShape {
    /// Fallback shape for abilities that don't provide their own.
    ///
    /// Unit-targeted kinds have no ground preview.
    pub fn default_for(kind: TargetKind, range: f32) -> Option<Self> {
        match kind {
            TargetKind::Area => Some(PreviewShape::Circle { radius: range }),
            TargetKind::Path => Some(PreviewShape::Segment {
                width: DEFAULT_PATH_WIDTH,
                length: DEFAULT_PATH_SEGMENT_LENGTH,
            }),
            TargetKind::Point => Some(PreviewShape::Marker {
                radius: DEFAULT_MARKER_RADIUS,
            }),
            _ => None,
        }
    }
}

/// Where a cast lands: a world position and, for unit-targeted abilities,
/// the unit itself.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CastTarget {
    pub position: Vec3,
    pub entity: Option<Entity>,
}

impl CastTarget {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            entity: None,
        }
    }

    pub fn unit(entity: Entity, position: Vec3) -> Self {
        Self {
            position,
            entity: Some(entity),
        }
    }
}

/// Capability set of an ability.
///
/// Implementations are opaque to the core: they may consult or spend unit
/// resources and emit effects through the [`AbilityWorld`] they are handed.
/// `execute` is called exactly once per successful cast. `cancel` may be called
/// even if `start_cast` never ran.
pub trait AbilityBehavior: Send + Sync + 'static {
    /// Whether `caster` is currently able to use the ability
    fn can_use(&self, _ability: &AbilityDescriptor, caster: Entity, world: &dyn AbilityWorld) -> bool {
        world.is_alive(caster)
    }

    /// Called when a timed cast begins
    fn start_cast(
        &self,
        _ability: &AbilityDescriptor,
        _caster: Entity,
        _target: CastTarget,
        _world: &mut dyn AbilityWorld,
    ) {
    }

    /// Applies the ability
    fn execute(
        &self,
        ability: &AbilityDescriptor,
        caster: Entity,
        target: CastTarget,
        world: &mut dyn AbilityWorld,
    );

    /// Called when targeting or casting is abandoned
    fn cancel(&self, _ability: &AbilityDescriptor, _caster: Entity, _world: &mut dyn AbilityWorld) {}

    /// Custom preview geometry, if any
    fn preview_shape(&self, _ability: &AbilityDescriptor) -> Option<PreviewShape> {
        None
    }
}

/// Immutable ability definition.
pub struct AbilityDescriptor {
    /// Catalog key (e.g. `"firebolt"`)
    pub id: String,
    /// Display name
    pub name: String,
    /// Cooldown after a completed cast, in seconds
    pub cooldown_seconds: f32,
    /// Delay between activation and effect, in seconds (0 = instant)
    pub cast_time_seconds: f32,
    /// Maximum distance from caster to target
    pub range: f32,
    pub target_kind: TargetKind,
    /// Colour of the targeting preview
    pub preview_color: Color,
    /// Resource spent on execution
    pub resource_cost: f32,
    behavior: Box<dyn AbilityBehavior>,
}

impl AbilityDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        target_kind: TargetKind,
        behavior: impl AbilityBehavior,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cooldown_seconds: 0.0,
            cast_time_seconds: 0.0,
            range: 0.0,
            target_kind,
            preview_color: Color::WHITE,
            resource_cost: 0.0,
            behavior: Box::new(behavior),
        }
    }

    pub fn with_cooldown(mut self, seconds: f32) -> Self {
        self.cooldown_seconds = non_negative(&self.id, "cooldown", seconds);
        self
    }

    pub fn with_cast_time(mut self, seconds: f32) -> Self {
        self.cast_time_seconds = non_negative(&self.id, "cast_time", seconds);
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = non_negative(&self.id, "range", range);
        self
    }

    pub fn with_resource_cost(mut self, cost: f32) -> Self {
        self.resource_cost = non_negative(&self.id, "resource_cost", cost);
        self
    }

    pub fn with_preview_color(mut self, color: Color) -> Self {
        self.preview_color = color;
        self
    }

    pub fn into_ref(self) -> AbilityRef {
        Arc::new(self)
    }

    /// Instant abilities skip the cast scheduler's countdown.
    pub fn is_instant(&self) -> bool {
        self.cast_time_seconds <= 0.0
    }

    pub fn can_use(&self, caster: Entity, world: &dyn AbilityWorld) -> bool {
        self.behavior.can_use(self, caster, world)
    }

    pub fn start_cast(&self, caster: Entity, target: CastTarget, world: &mut dyn AbilityWorld) {
        self.behavior.start_cast(self, caster, target, world);
    }

    pub fn execute(&self, caster: Entity, target: CastTarget, world: &mut dyn AbilityWorld) {
        self.behavior.execute(self, caster, target, world);
    }

    pub fn cancel(&self, caster: Entity, world: &mut dyn AbilityWorld) {
        self.behavior.cancel(self, caster, world);
    }

    /// The ability's own preview shape, or the default for its target kind.
    pub fn preview_shape(&self) -> Option<PreviewShape> {
        self.behavior
            .preview_shape(self)
            .or_else(|| PreviewShape::default_for(self.target_kind, self.range))
    }
}

impl fmt::Debug for AbilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cooldown_seconds", &self.cooldown_seconds)
            .field("cast_time_seconds", &self.cast_time_seconds)
            .field("range", &self.range)
            .field("target_kind", &self.target_kind)
            .field("resource_cost", &self.resource_cost)
            .finish_non_exhaustive()
    }
}

/// Two handles refer to the same definition.
pub fn same_ability(a: &AbilityRef, b: &AbilityRef) -> bool {
    Arc::ptr_eq(a, b)
}

fn non_negative(id: &str, field: &str, value: f32) -> f32 {
    if value >= 0.0 {
        value
    } else {
        warn!("Ability '{}' has invalid {} {}; clamping to 0", id, field, value);
        0.0
    }
}
