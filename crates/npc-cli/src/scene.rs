//! Demo scene for headless runs: flat ground, a few roofed huts, one
//! wandering player, and a day/night cycle that brings a zombie at night.

use std::f64::consts::TAU;

use npc_core::{BlockPos, EntityId, EntityKind, Vec3};
use npc_sandbox::{BodyHandle, Capabilities, SandboxWorld};

pub const GROUND_Y: i32 = 64;
pub const DAY_TICKS: u64 = 2400;
pub const NIGHT_TICKS: u64 = 1200;

const HALF_EXTENT: i32 = 96;
const HUTS: &[(i32, i32)] = &[(12, 12), (-20, 8), (4, -24), (30, -10)];
const PLAYER_ORBIT: f64 = 14.0;
/// Ticks for one lap of the player's orbit.
const PLAYER_LAP_TICKS: u64 = 1600;
/// How often an agent pursuing a gathering goal actually gets something.
pub const WORK_INTERVAL_TICKS: u64 = 200;

pub struct Scene {
    pub world: SandboxWorld,
    pub player: EntityId,
    pub player_name: String,
    zombie: Option<EntityId>,
}

impl Scene {
    pub fn new(player_name: &str) -> Self {
        let mut world = SandboxWorld::flat(HALF_EXTENT, GROUND_Y);
        for &(x, z) in HUTS {
            // Roof two cells above head height over a 5x5 footprint.
            world.fill(
                BlockPos::new(x - 2, GROUND_Y + 3, z - 2),
                BlockPos::new(x + 2, GROUND_Y + 3, z + 2),
            );
        }
        let player = world.add_entity(EntityKind::Player, player_name, orbit(0));
        Self {
            world,
            player,
            player_name: player_name.to_string(),
            zombie: None,
        }
    }

    /// Bodies are lined up along the x axis, three blocks apart.
    pub fn spawn_agent(&mut self, name: &str) -> BodyHandle {
        let index = self.world.handles().len() as f64;
        let position = Vec3::new(index * 3.0 + 0.5, f64::from(GROUND_Y), 0.5);
        self.world.spawn_body(name, position, Capabilities::FULL)
    }

    /// Move the scripted actors for `tick`, then step the world.
    pub fn advance(&mut self, tick: u64) {
        self.world.move_entity(self.player, orbit(tick));

        let phase = tick % (DAY_TICKS + NIGHT_TICKS);
        if phase == DAY_TICKS {
            self.world.set_night(true, Some(NIGHT_TICKS));
            let zombie = self.world.add_entity(
                EntityKind::Hostile,
                "zombie",
                Vec3::new(-6.5, f64::from(GROUND_Y), -6.5),
            );
            self.zombie = Some(zombie);
            tracing::info!(tick, "nightfall");
        } else if phase == 0 && tick > 0 {
            if let Some(zombie) = self.zombie.take() {
                self.world.remove_entity(zombie);
            }
            tracing::info!(tick, "daybreak");
        }

        self.world.step();
    }

    /// Stand-in for block breaking and crafting: every
    /// [`WORK_INTERVAL_TICKS`] an agent working on `goal` receives items.
    /// Returns what was added so the caller can report it.
    pub fn work(
        &mut self,
        tick: u64,
        body: BodyHandle,
        goal: Option<&str>,
    ) -> Vec<(&'static str, u32)> {
        if tick % WORK_INTERVAL_TICKS != 0 {
            return Vec::new();
        }
        let yields: &[(&'static str, u32)] = match goal {
            Some("gather_wood") => &[("oak_log", 4)],
            Some("mine_stone") => &[("cobblestone", 4)],
            Some("gather_food") => &[("bread", 1)],
            Some("craft_tools") => &[("crafting_table", 1), ("wooden_pickaxe", 1)],
            _ => &[],
        };
        let Some(state) = self.world.body_state_mut(body) else {
            return Vec::new();
        };
        for (item, count) in yields {
            *state.inventory.entry((*item).to_string()).or_insert(0) += count;
        }
        yields.to_vec()
    }
}

fn orbit(tick: u64) -> Vec3 {
    let angle = (tick % PLAYER_LAP_TICKS) as f64 / PLAYER_LAP_TICKS as f64 * TAU;
    Vec3::new(
        angle.cos() * PLAYER_ORBIT,
        f64::from(GROUND_Y),
        angle.sin() * PLAYER_ORBIT,
    )
}

#[cfg(test)]
mod tests {
    use npc_core::{TerrainView, WorldView};

    use super::*;

    #[test]
    fn huts_have_roofs_and_open_doors() {
        let scene = Scene::new("Sam");
        let (x, z) = HUTS[0];
        assert!(scene.world.is_solid(BlockPos::new(x, GROUND_Y + 3, z)));
        assert!(!scene.world.is_solid(BlockPos::new(x, GROUND_Y, z)));
    }

    #[test]
    fn night_brings_a_zombie_and_day_removes_it() {
        let mut scene = Scene::new("Sam");
        for tick in 1..=DAY_TICKS {
            scene.advance(tick);
        }
        assert!(scene.world.is_night());
        let zombie = scene.zombie.expect("zombie");
        assert!(scene.world.entity(zombie).is_some());

        for tick in DAY_TICKS + 1..=DAY_TICKS + NIGHT_TICKS {
            scene.advance(tick);
        }
        assert!(!scene.world.is_night());
        assert!(scene.world.entity(zombie).is_none());
    }

    #[test]
    fn work_pays_out_on_the_interval() {
        let mut scene = Scene::new("Sam");
        let body = scene.spawn_agent("Alex");
        assert!(scene.work(WORK_INTERVAL_TICKS - 1, body, Some("gather_wood")).is_empty());
        assert_eq!(
            scene.work(WORK_INTERVAL_TICKS, body, Some("gather_wood")),
            vec![("oak_log", 4)]
        );
        assert!(scene.work(WORK_INTERVAL_TICKS, body, Some("explore")).is_empty());
        let logs = scene
            .world
            .body_state(body)
            .and_then(|b| b.inventory.get("oak_log").copied());
        assert_eq!(logs, Some(4));
    }

    #[test]
    fn agents_spawn_side_by_side() {
        let mut scene = Scene::new("Sam");
        let a = scene.spawn_agent("Alex");
        let b = scene.spawn_agent("Steve");
        let pa = scene.world.body(a).map(|s| s.position).unwrap_or(Vec3::ZERO);
        let pb = scene.world.body(b).map(|s| s.position).unwrap_or(Vec3::ZERO);
        assert_eq!(pb.x - pa.x, 3.0);
    }
}
