//! A small in-memory voxel world.
//!
//! Terrain is a sparse set of solid and fluid cells. Bodies move in straight
//! lines toward their navigation target (or along a raw velocity) and stop
//! when the next cell is blocked, which is enough to exercise stuck
//! detection and recovery. Each body declares which movement capabilities
//! it exposes.

#![forbid(unsafe_code)]

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use npc_core::{
    BlockPos, BodySnapshot, CanNavigate, CanSetVelocity, EntityId, EntityInfo, EntityKind,
    TerrainView, Vec3, WorldMut, WorldView,
};

/// Blocks travelled per tick at speed 1.0.
pub const BLOCKS_PER_TICK: f64 = 0.25;

const MIN_Y: i32 = -16;
const MAX_Y: i32 = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle(pub u32);

/// Movement capabilities a body exposes to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub navigate: bool,
    pub steer: bool,
}

impl Capabilities {
    pub const FULL: Capabilities = Capabilities {
        navigate: true,
        steer: true,
    };
    pub const STEER_ONLY: Capabilities = Capabilities {
        navigate: false,
        steer: true,
    };
    pub const NONE: Capabilities = Capabilities {
        navigate: false,
        steer: false,
    };
}

#[derive(Debug, Clone)]
pub struct SandboxBody {
    pub entity: EntityId,
    pub name: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub health: f32,
    pub food: f32,
    pub inventory: BTreeMap<String, u32>,
    pub attack_target: Option<EntityId>,
    pub last_attacker: Option<(EntityId, u64)>,
    pub capabilities: Capabilities,
    pub nav_target: Option<(Vec3, f64)>,
    /// Pinned in place regardless of commands.
    pub frozen: bool,
    pub repaths: u32,
    pub teleports: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SandboxWorld {
    solids: BTreeSet<BlockPos>,
    fluids: BTreeSet<BlockPos>,
    bodies: BTreeMap<BodyHandle, SandboxBody>,
    entities: BTreeMap<EntityId, EntityInfo>,
    night: bool,
    dawn_tick: Option<u64>,
    tick: u64,
    chat: Vec<String>,
    next_entity: u64,
    next_body: u32,
    /// `entities_near` calls so far.
    spatial_queries: Cell<u64>,
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self {
            next_entity: 1,
            ..Self::default()
        }
    }

    /// Flat ground: a solid layer at `ground_y - 1` spanning `[-half, half]`
    /// on both horizontal axes, so bodies stand at `ground_y`.
    pub fn flat(half: i32, ground_y: i32) -> Self {
        let mut world = Self::new();
        world.fill(
            BlockPos::new(-half, ground_y - 1, -half),
            BlockPos::new(half, ground_y - 1, half),
        );
        world
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn set_solid(&mut self, pos: BlockPos, solid: bool) {
        if solid {
            self.solids.insert(pos);
        } else {
            self.solids.remove(&pos);
        }
    }

    pub fn set_fluid(&mut self, pos: BlockPos, fluid: bool) {
        if fluid {
            self.fluids.insert(pos);
        } else {
            self.fluids.remove(&pos);
        }
    }

    /// Fill the inclusive box between two corners with solid cells.
    pub fn fill(&mut self, a: BlockPos, b: BlockPos) {
        for x in a.x.min(b.x)..=a.x.max(b.x) {
            for y in a.y.min(b.y)..=a.y.max(b.y) {
                for z in a.z.min(b.z)..=a.z.max(b.z) {
                    self.solids.insert(BlockPos::new(x, y, z));
                }
            }
        }
    }

    /// Night with dawn `ticks_until_dawn` ticks from now, or day.
    pub fn set_night(&mut self, night: bool, ticks_until_dawn: Option<u64>) {
        self.night = night;
        self.dawn_tick = if night {
            ticks_until_dawn.map(|t| self.tick + t)
        } else {
            None
        };
    }

    fn allocate_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity.max(1));
        self.next_entity = id.0 + 1;
        id
    }

    pub fn spawn_body(&mut self, name: &str, position: Vec3, capabilities: Capabilities) -> BodyHandle {
        let entity = self.allocate_entity();
        let handle = BodyHandle(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            handle,
            SandboxBody {
                entity,
                name: name.to_string(),
                position,
                velocity: Vec3::ZERO,
                health: 20.0,
                food: 20.0,
                inventory: BTreeMap::new(),
                attack_target: None,
                last_attacker: None,
                capabilities,
                nav_target: None,
                frozen: false,
                repaths: 0,
                teleports: 0,
            },
        );
        handle
    }

    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<SandboxBody> {
        self.bodies.remove(&handle)
    }

    pub fn add_entity(&mut self, kind: EntityKind, name: &str, position: Vec3) -> EntityId {
        let id = self.allocate_entity();
        self.entities.insert(
            id,
            EntityInfo {
                id,
                kind,
                name: name.to_string(),
                position,
            },
        );
        id
    }

    pub fn move_entity(&mut self, id: EntityId, position: Vec3) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position = position;
        }
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<EntityInfo> {
        self.entities.remove(&id)
    }

    pub fn body_state(&self, handle: BodyHandle) -> Option<&SandboxBody> {
        self.bodies.get(&handle)
    }

    pub fn body_state_mut(&mut self, handle: BodyHandle) -> Option<&mut SandboxBody> {
        self.bodies.get_mut(&handle)
    }

    pub fn spatial_queries(&self) -> u64 {
        self.spatial_queries.get()
    }

    pub fn chat_log(&self) -> &[String] {
        &self.chat
    }

    pub fn handles(&self) -> Vec<BodyHandle> {
        self.bodies.keys().copied().collect()
    }

    fn blocked(&self, feet: BlockPos) -> bool {
        self.solids.contains(&feet) || self.solids.contains(&feet.above())
    }

    /// Advance one tick: move bodies and roll the clock toward dawn.
    pub fn step(&mut self) {
        self.tick += 1;
        if let Some(dawn) = self.dawn_tick {
            if self.tick >= dawn {
                self.night = false;
                self.dawn_tick = None;
                tracing::debug!(tick = self.tick, "dawn");
            }
        }

        let handles: Vec<BodyHandle> = self.bodies.keys().copied().collect();
        for handle in handles {
            let Some(body) = self.bodies.get(&handle) else {
                continue;
            };
            if body.frozen {
                continue;
            }
            let step = match body.nav_target {
                Some((target, speed)) => {
                    let delta = target - body.position;
                    let reach = speed * BLOCKS_PER_TICK;
                    let horizontal = Vec3::new(delta.x, 0.0, delta.z);
                    if horizontal.length() <= reach {
                        horizontal
                    } else {
                        horizontal.normalized() * reach
                    }
                }
                None => {
                    let v = body.velocity;
                    Vec3::new(v.x, 0.0, v.z) * BLOCKS_PER_TICK
                }
            };
            if step.length() <= f64::EPSILON {
                continue;
            }

            let mut next = body.position + step;
            let column = next.block();
            if let Some(y) = self.surface_y(column.x, column.z) {
                // Step up or down at most one block.
                if (f64::from(y) - body.position.y).abs() <= 1.0 {
                    next.y = f64::from(y);
                }
            }
            if self.blocked(next.block()) {
                continue;
            }
            if let Some(body) = self.bodies.get_mut(&handle) {
                body.position = next;
                if let Some((target, _)) = body.nav_target {
                    if Vec3::new(target.x - next.x, 0.0, target.z - next.z).length() < 0.05 {
                        body.nav_target = None;
                    }
                }
            }
        }
    }
}

impl WorldView for SandboxWorld {
    type Body = BodyHandle;

    fn body(&self, body: BodyHandle) -> Option<BodySnapshot> {
        let b = self.bodies.get(&body)?;
        Some(BodySnapshot {
            entity: Some(b.entity),
            position: b.position,
            health: b.health,
            food: b.food,
            inventory: b.inventory.clone(),
            attack_target: b.attack_target,
            last_attacker: b.last_attacker,
        })
    }

    fn entity(&self, id: EntityId) -> Option<EntityInfo> {
        if let Some(info) = self.entities.get(&id) {
            return Some(info.clone());
        }
        self.bodies
            .values()
            .find(|b| b.entity == id)
            .map(|b| EntityInfo {
                id: b.entity,
                kind: EntityKind::Agent,
                name: b.name.clone(),
                position: b.position,
            })
    }

    fn entities_near(&self, center: Vec3, radius: f64) -> Vec<EntityInfo> {
        self.spatial_queries.set(self.spatial_queries.get() + 1);
        let agents = self.bodies.values().map(|b| EntityInfo {
            id: b.entity,
            kind: EntityKind::Agent,
            name: b.name.clone(),
            position: b.position,
        });
        let mut found: Vec<(f64, EntityInfo)> = self
            .entities
            .values()
            .cloned()
            .chain(agents)
            .map(|e| (center.distance(e.position), e))
            .filter(|(d, _)| *d <= radius)
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));
        found.into_iter().map(|(_, e)| e).collect()
    }

    fn is_night(&self) -> bool {
        self.night
    }

    fn ticks_until_dawn(&self) -> Option<u64> {
        if !self.night {
            return None;
        }
        self.dawn_tick.map(|dawn| dawn.saturating_sub(self.tick))
    }
}

impl TerrainView for SandboxWorld {
    fn is_solid(&self, pos: BlockPos) -> bool {
        self.solids.contains(&pos)
    }

    fn is_fluid(&self, pos: BlockPos) -> bool {
        self.fluids.contains(&pos)
    }

    fn surface_y(&self, x: i32, z: i32) -> Option<i32> {
        (MIN_Y..=MAX_Y)
            .rev()
            .find(|y| self.solids.contains(&BlockPos::new(x, *y, z)))
            .map(|y| y + 1)
    }
}

impl CanNavigate<BodyHandle> for SandboxWorld {
    fn navigate_to(&mut self, body: BodyHandle, target: Vec3, speed: f64) -> bool {
        match self.bodies.get_mut(&body) {
            Some(b) if speed > 0.0 && target.x.is_finite() && target.z.is_finite() => {
                b.nav_target = Some((target, speed));
                true
            }
            _ => false,
        }
    }

    fn stop_navigation(&mut self, body: BodyHandle) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.nav_target = None;
        }
    }

    fn recompute_path(&mut self, body: BodyHandle) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.repaths += 1;
        }
    }

    fn is_navigating(&self, body: BodyHandle) -> bool {
        self.bodies
            .get(&body)
            .is_some_and(|b| b.nav_target.is_some())
    }
}

impl CanSetVelocity<BodyHandle> for SandboxWorld {
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.nav_target = None;
            b.velocity = velocity;
        }
    }
}

impl WorldMut for SandboxWorld {
    fn navigation(&mut self, body: BodyHandle) -> Option<&mut dyn CanNavigate<BodyHandle>> {
        if self.bodies.get(&body)?.capabilities.navigate {
            Some(self)
        } else {
            None
        }
    }

    fn steering(&mut self, body: BodyHandle) -> Option<&mut dyn CanSetVelocity<BodyHandle>> {
        if self.bodies.get(&body)?.capabilities.steer {
            Some(self)
        } else {
            None
        }
    }

    fn teleport(&mut self, body: BodyHandle, position: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.position = position;
            b.nav_target = None;
            b.velocity = Vec3::ZERO;
            b.teleports += 1;
        }
    }

    fn broadcast(&mut self, message: &str) {
        tracing::info!(tick = self.tick, "{message}");
        self.chat.push(message.to_string());
    }

    fn clear_attack_target(&mut self, body: BodyHandle) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.attack_target = None;
        }
    }
}
