use std::sync::Arc;

use async_trait::async_trait;
use npc_brain::{
    CommandContext, ObeyDecision, Orchestrator, PlanContext, PlanningError, PlanningService,
    Priority, SimConfig,
};
use npc_core::{ActionPlan, BlockPos, EntityId, EntityKind, Vec3, WorldView};
use npc_nav::RecoveryStrategy;
use npc_sandbox::{BodyHandle, Capabilities, SandboxWorld};
use tokio::runtime::Runtime;

/// Never asks for anything; arbitration tests only exercise the tick loop.
struct QuietPlanner;

#[async_trait]
impl PlanningService for QuietPlanner {
    async fn plan(&self, _context: PlanContext) -> Result<ActionPlan, PlanningError> {
        Ok(ActionPlan::default())
    }

    async fn decide(&self, context: CommandContext) -> Result<ObeyDecision, PlanningError> {
        Ok(ObeyDecision::decline(&context.sender))
    }
}

struct Sim {
    _rt: Runtime,
    orch: Orchestrator<BodyHandle>,
    world: SandboxWorld,
    body: BodyHandle,
    tick: u64,
}

impl Sim {
    fn new(world: SandboxWorld) -> Self {
        Self::with_config(world, SimConfig::default())
    }

    fn with_config(mut world: SandboxWorld, config: SimConfig) -> Self {
        let rt = Runtime::new().expect("runtime");
        let mut orch = Orchestrator::new(config, rt.handle().clone(), Arc::new(QuietPlanner));
        let body = world.spawn_body("Alex", Vec3::new(0.5, 64.0, 0.5), Capabilities::FULL);
        orch.spawn_agent("Alex", body, 0, &world);
        Self {
            _rt: rt,
            orch,
            world,
            body,
            tick: 0,
        }
    }

    fn step(&mut self) {
        self.tick += 1;
        self.world.step();
        self.orch.tick(self.tick, &mut self.world);
    }

    fn state(&self) -> &npc_brain::BrainState {
        &self.orch.brain("alex").expect("brain").state
    }

    fn nav_speed(&self) -> Option<f64> {
        self.world
            .body_state(self.body)
            .and_then(|b| b.nav_target)
            .map(|(_, speed)| speed)
    }

    fn freeze(&mut self) {
        if let Some(body) = self.world.body_state_mut(self.body) {
            body.frozen = true;
        }
    }
}

/// Flat ground with a roofed cell block at x = 4..=6, z = -1..=1.
fn world_with_shelter() -> SandboxWorld {
    let mut world = SandboxWorld::flat(32, 64);
    world.fill(BlockPos::new(4, 67, -1), BlockPos::new(6, 67, 1));
    world
}

#[test]
fn night_preempts_an_existing_goal_lock() {
    let mut world = world_with_shelter();
    world.set_night(true, Some(5000));
    let mut sim = Sim::new(world);
    assert_eq!(sim.state().goal.as_deref(), Some("gather_wood"));

    sim.step();
    let state = sim.state();
    assert_eq!(state.goal.as_deref(), Some("seek_shelter"));
    assert_eq!(state.goal_until_tick, sim.tick + 2400);
    assert_eq!(
        sim.orch.status("alex").and_then(|s| s.arbitration),
        Some(Priority::Danger)
    );
    assert_eq!(
        sim.orch.runtime("alex").and_then(|rt| rt.shelter),
        Some(BlockPos::new(4, 64, 0))
    );

    for _ in 0..60 {
        sim.step();
    }
    let state = sim.state();
    assert_eq!(state.current_activity.as_deref(), Some("sheltering"));
    assert_eq!(state.goal_until_tick, sim.tick + 100);
    let feet = sim.world.body(sim.body).map(|b| b.position.block());
    assert_eq!(feet.map(|f| f.x), Some(4));
}

#[test]
fn blocked_agent_detours_then_still_reaches_shelter() {
    let mut world = world_with_shelter();
    // Two-high wall across the straight path to the shelter.
    world.fill(BlockPos::new(2, 64, -3), BlockPos::new(2, 65, 3));
    world.set_night(true, Some(5000));
    let mut sim = Sim::new(world);

    let mut detoured = false;
    for _ in 0..400 {
        sim.step();
        if sim.state().movement.detour().is_some() {
            detoured = true;
            break;
        }
    }
    assert!(detoured, "never escalated to a detour");
    assert_eq!(
        sim.state().movement.target(),
        Some(BlockPos::new(4, 64, 0).center())
    );

    // The way opens up while the detour is under way.
    for y in 64..=65 {
        for z in -3..=3 {
            sim.world.set_solid(BlockPos::new(2, y, z), false);
        }
    }
    for _ in 0..400 {
        sim.step();
        if sim.state().current_activity.as_deref() == Some("sheltering") {
            break;
        }
    }

    let state = sim.state();
    assert_eq!(state.current_activity.as_deref(), Some("sheltering"));
    assert_eq!(state.goal.as_deref(), Some("seek_shelter"));
    let feet = sim
        .world
        .body(sim.body)
        .map(|b| b.position.block())
        .expect("body");
    assert!((4..=6).contains(&feet.x) && (-1..=1).contains(&feet.z), "{feet:?}");
}

#[test]
fn shelter_lock_is_bounded_by_dawn() {
    let mut world = world_with_shelter();
    world.set_night(true, Some(300));
    let mut sim = Sim::new(world);
    sim.step();
    assert_eq!(sim.state().goal_until_tick, sim.tick + 299);
}

#[test]
fn nearby_hostile_triggers_danger_in_daylight() {
    let mut world = world_with_shelter();
    world.add_entity(EntityKind::Hostile, "zombie", Vec3::new(-6.0, 64.0, 0.0));
    let mut sim = Sim::new(world);
    sim.step();
    let state = sim.state();
    assert_eq!(state.goal.as_deref(), Some("seek_shelter"));
    assert_eq!(state.goal_until_tick, sim.tick + 2400);
}

#[test]
fn missing_shelter_is_reported() {
    let mut world = SandboxWorld::flat(32, 64);
    world.set_night(true, Some(5000));
    let mut sim = Sim::new(world);
    sim.step();
    let state = sim.state();
    assert_eq!(state.goal.as_deref(), Some("seek_shelter"));
    assert_eq!(state.last_error.as_deref(), Some("no shelter within range"));
    assert_eq!(state.goal_until_tick, sim.tick + 100);
}

#[test]
fn manual_follow_uses_speed_tiers_and_hysteresis() {
    let mut world = SandboxWorld::flat(64, 64);
    let player = world.add_entity(EntityKind::Player, "Sam", Vec3::new(8.5, 64.0, 0.5));
    let mut sim = Sim::new(world);
    sim.freeze();
    assert!(sim.orch.direct_follow("alex", Some(player)));

    sim.step();
    assert_eq!(sim.nav_speed(), Some(1.0));
    assert_eq!(
        sim.orch.status("alex").and_then(|s| s.arbitration),
        Some(Priority::Manual)
    );

    sim.world.move_entity(player, Vec3::new(20.5, 64.0, 0.5));
    sim.step();
    assert_eq!(sim.nav_speed(), Some(1.4));

    // Inside the sprint band but above the sprint-off radius: still sprinting.
    sim.world.move_entity(player, Vec3::new(8.5, 64.0, 0.5));
    sim.step();
    assert_eq!(sim.nav_speed(), Some(1.4));

    sim.world.move_entity(player, Vec3::new(5.5, 64.0, 0.5));
    sim.step();
    assert_eq!(sim.nav_speed(), Some(1.0));

    sim.world.move_entity(player, Vec3::new(2.5, 64.0, 0.5));
    sim.step();
    assert_eq!(sim.nav_speed(), None);

    // Between stop and resume radius: keep holding.
    sim.world.move_entity(player, Vec3::new(4.0, 64.0, 0.5));
    sim.step();
    assert_eq!(sim.nav_speed(), None);

    assert!(sim.orch.release_follow("alex"));
    assert!(!sim.state().manual_follow);
}

#[test]
fn per_tick_lookups_share_one_scan_per_window() {
    let mut world = SandboxWorld::flat(64, 64);
    world.add_entity(EntityKind::Player, "Sam", Vec3::new(5.5, 64.0, 0.5));
    let mut sim = Sim::new(world);
    sim.freeze();
    // Nearest-player follow plus the hostile check both run every tick.
    assert!(sim.orch.direct_follow("alex", None));

    let before = sim.world.spatial_queries();
    for _ in 0..40 {
        sim.step();
    }
    assert_eq!(sim.world.spatial_queries() - before, 1);
    assert_eq!(
        sim.orch.status("alex").and_then(|s| s.arbitration),
        Some(Priority::Manual)
    );
    assert_eq!(sim.nav_speed(), Some(1.0));

    sim.step();
    assert_eq!(sim.world.spatial_queries() - before, 2);
}

#[test]
fn follow_teleports_after_falling_far_behind() {
    let mut world = SandboxWorld::flat(64, 64);
    let player = world.add_entity(EntityKind::Player, "Sam", Vec3::new(40.5, 64.0, 0.5));
    let mut sim = Sim::new(world);
    sim.freeze();
    sim.orch.direct_follow("alex", Some(player));

    // Sprinting starts on the first tick; the far counter from the second.
    for _ in 0..100 {
        sim.step();
    }
    assert_eq!(sim.world.body_state(sim.body).map(|b| b.teleports), Some(0));
    sim.step();
    assert_eq!(sim.world.body_state(sim.body).map(|b| b.teleports), Some(1));
    let position = sim.world.body(sim.body).map(|b| b.position).unwrap_or(Vec3::ZERO);
    assert!(position.distance(Vec3::new(40.5, 64.0, 0.5)) < 4.0);
}

#[test]
fn unprovoked_attacks_on_players_are_called_off() {
    let mut world = SandboxWorld::flat(16, 64);
    let player = world.add_entity(EntityKind::Player, "Sam", Vec3::new(3.0, 64.0, 0.0));
    let zombie = world.add_entity(EntityKind::Hostile, "zombie", Vec3::new(30.0, 64.0, 0.0));
    let mut sim = Sim::new(world);

    let set_target = |sim: &mut Sim, target: EntityId, attacker: Option<(EntityId, u64)>| {
        if let Some(body) = sim.world.body_state_mut(sim.body) {
            body.attack_target = Some(target);
            body.last_attacker = attacker;
        }
    };
    let target = |sim: &Sim| sim.world.body_state(sim.body).and_then(|b| b.attack_target);

    set_target(&mut sim, player, None);
    sim.step();
    assert_eq!(target(&sim), None);

    // Provoked within the window: allowed to fight back.
    let now = sim.tick;
    set_target(&mut sim, player, Some((player, now)));
    sim.step();
    assert_eq!(target(&sim), Some(player));

    // Provocation too long ago.
    let long_ago = sim.tick.saturating_sub(500);
    set_target(&mut sim, player, Some((player, long_ago)));
    sim.tick += 500;
    sim.step();
    assert_eq!(target(&sim), None);

    set_target(&mut sim, zombie, None);
    sim.step();
    assert_eq!(target(&sim), Some(zombie));

    sim.orch.authorize_combat("alex", true);
    set_target(&mut sim, player, None);
    sim.step();
    assert_eq!(target(&sim), Some(player));
}

#[test]
fn stuck_agent_escalates_through_recovery_in_order() {
    let mut sim = Sim::new(SandboxWorld::flat(48, 64));
    sim.freeze();
    if let Some(brain) = sim.orch.brain_mut("alex") {
        brain.state.movement.set_target(Vec3::new(20.5, 64.0, 0.5));
    }

    let mut seen = Vec::new();
    let mut failures = 0;
    for _ in 0..1000 {
        sim.step();
        let movement = &sim.state().movement;
        if movement.failures() != failures && movement.failures() > 0 {
            seen.extend(movement.last_strategy());
        }
        failures = movement.failures();
        if sim.world.body_state(sim.body).map(|b| b.teleports) == Some(1) {
            break;
        }
    }

    assert_eq!(
        seen,
        vec![
            RecoveryStrategy::Repath,
            RecoveryStrategy::Repath,
            RecoveryStrategy::RandomOffset,
            RecoveryStrategy::Unembed,
        ]
    );
    let body = sim.world.body_state(sim.body).expect("body");
    assert_eq!(body.repaths, 2);
    assert_eq!(body.teleports, 1);
    // The emergency teleport ends the episode.
    assert_eq!(sim.state().movement.failures(), 0);
}
