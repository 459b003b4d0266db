use std::collections::BTreeMap;

use crate::{BlockPos, BodyId, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// World-assigned identity of any entity (agents, players, mobs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntityKind {
    Player,
    /// Another autonomous agent.
    Agent,
    Hostile,
    Passive,
}

impl EntityKind {
    /// Entities the non-combat policy shields from unprovoked attacks.
    pub fn is_protected(self) -> bool {
        matches!(self, EntityKind::Player | EntityKind::Agent)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityInfo {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub position: Vec3,
}

/// Read-only snapshot of a body, taken once per use.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BodySnapshot {
    pub entity: Option<EntityId>,
    pub position: Vec3,
    /// 0..=20
    pub health: f32,
    /// 0..=20
    pub food: f32,
    pub inventory: BTreeMap<String, u32>,
    pub attack_target: Option<EntityId>,
    /// Most recent entity that hurt this body, with the tick it happened.
    pub last_attacker: Option<(EntityId, u64)>,
}

/// Read access to the world collaborator.
pub trait WorldView {
    type Body: BodyId;

    fn body(&self, body: Self::Body) -> Option<BodySnapshot>;

    fn entity(&self, id: EntityId) -> Option<EntityInfo>;

    /// Entities within `radius` of `center`, nearest first.
    fn entities_near(&self, center: Vec3, radius: f64) -> Vec<EntityInfo>;

    fn is_night(&self) -> bool;

    /// `None` during the day.
    fn ticks_until_dawn(&self) -> Option<u64>;
}

/// Voxel terrain queries used by the safety predicate and shelter search.
pub trait TerrainView {
    fn is_solid(&self, pos: BlockPos) -> bool;

    fn is_fluid(&self, pos: BlockPos) -> bool;

    /// Y of the first free cell above the highest solid cell in the column.
    fn surface_y(&self, x: i32, z: i32) -> Option<i32>;
}

/// Capability: path-following movement.
pub trait CanNavigate<B> {
    /// Start navigating; returns `false` if the navigator rejected the target.
    fn navigate_to(&mut self, body: B, target: Vec3, speed: f64) -> bool;

    fn stop_navigation(&mut self, body: B);

    /// Drop the cached path so the next navigation step plans from scratch.
    fn recompute_path(&mut self, body: B);

    fn is_navigating(&self, body: B) -> bool;
}

/// Capability: raw velocity control.
pub trait CanSetVelocity<B> {
    fn set_velocity(&mut self, body: B, velocity: Vec3);
}

/// Side-effecting world access.
///
/// Movement capabilities are discovered per body: a body that cannot path
/// returns `None` from [`WorldMut::navigation`], and callers fall back to
/// [`WorldMut::steering`].
pub trait WorldMut: WorldView + TerrainView {
    fn navigation(&mut self, body: Self::Body) -> Option<&mut dyn CanNavigate<Self::Body>>;

    fn steering(&mut self, body: Self::Body) -> Option<&mut dyn CanSetVelocity<Self::Body>>;

    fn teleport(&mut self, body: Self::Body, position: Vec3);

    fn broadcast(&mut self, message: &str);

    fn clear_attack_target(&mut self, body: Self::Body);
}

/// Send `body` toward `target`, preferring path navigation over raw velocity.
///
/// Returns `false` when the body has neither capability or the navigator
/// refused the target.
pub fn move_body<W: WorldMut + ?Sized>(world: &mut W, body: W::Body, target: Vec3, speed: f64) -> bool {
    if let Some(nav) = world.navigation(body) {
        return nav.navigate_to(body, target, speed);
    }
    let Some(position) = world.body(body).map(|b| b.position) else {
        return false;
    };
    let Some(steer) = world.steering(body) else {
        return false;
    };
    let dir = (target - position).normalized();
    steer.set_velocity(body, dir * speed);
    true
}

/// Halt all movement: stop navigation and zero velocity where supported.
pub fn halt_body<W: WorldMut + ?Sized>(world: &mut W, body: W::Body) {
    if let Some(nav) = world.navigation(body) {
        nav.stop_navigation(body);
    }
    if let Some(steer) = world.steering(body) {
        steer.set_velocity(body, Vec3::ZERO);
    }
}
