use npc_brain::{BrainConfig, BrainState, ExecuteError, Executor, ExecutorConfig, Mode};
use npc_core::{Action, ActionPlan, SplitMix64, TickContext, Vec3, TICKS_PER_MINUTE};
use npc_nav::RecoveryConfig;
use npc_sandbox::{BodyHandle, Capabilities, SandboxWorld};

struct Fixture {
    brain: BrainConfig,
    executor: ExecutorConfig,
    state: BrainState,
    world: SandboxWorld,
    body: BodyHandle,
    rng: SplitMix64,
}

impl Fixture {
    fn new(world: SandboxWorld) -> Self {
        let brain = BrainConfig::default();
        let state = BrainState::new(&brain, RecoveryConfig::default());
        let mut world = world;
        let body = world.spawn_body("Alex", Vec3::new(0.5, 64.0, 0.5), Capabilities::FULL);
        Self {
            brain,
            executor: ExecutorConfig::default(),
            state,
            world,
            body,
            rng: SplitMix64::new(7),
        }
    }

    fn flat() -> Self {
        Self::new(SandboxWorld::flat(64, 64))
    }

    fn run(&mut self, tick: u64, action: Action) -> Result<(), ExecuteError> {
        let executor = Executor::new(&self.brain, &self.executor);
        executor.execute(
            &TickContext::new(tick, 1),
            "Alex",
            &mut self.state,
            &action,
            self.body,
            &mut self.world,
            &mut self.rng,
        )
    }

    fn apply(&mut self, tick: u64, plan: &ActionPlan) -> Result<(), ExecuteError> {
        let executor = Executor::new(&self.brain, &self.executor);
        executor.apply_plan(
            &TickContext::new(tick, 1),
            "Alex",
            &mut self.state,
            plan,
            self.body,
            &mut self.world,
            &mut self.rng,
        )
    }
}

#[test]
fn set_goal_clamps_minutes_to_window() {
    let mut f = Fixture::flat();

    f.run(100, Action::set_goal("gather wood", Some(20))).expect("set_goal");
    assert_eq!(f.state.goal.as_deref(), Some("gather_wood"));
    assert_eq!(f.state.goal_until_tick, 100 + 15 * TICKS_PER_MINUTE);
    assert_eq!(f.state.mode, Mode::Goal);

    f.run(200, Action::set_goal("mining", Some(0))).expect("set_goal");
    assert_eq!(f.state.goal.as_deref(), Some("mine_stone"));
    assert_eq!(f.state.goal_until_tick, 200 + TICKS_PER_MINUTE);

    f.run(300, Action::set_goal("explore", None)).expect("set_goal");
    assert_eq!(f.state.goal_until_tick, 300 + 5 * TICKS_PER_MINUTE);
}

#[test]
fn unrecognized_goal_labels_pass_through() {
    let mut f = Fixture::flat();
    f.run(0, Action::set_goal("Tame A Wolf", Some(3))).expect("set_goal");
    assert_eq!(f.state.goal.as_deref(), Some("tame_a_wolf"));
}

#[test]
fn move_to_offset_is_clamped_per_axis() {
    let mut f = Fixture::flat();
    f.run(0, Action::move_to(1000.0, 0.0)).expect("move_to");
    assert_eq!(f.state.movement.target(), Some(Vec3::new(24.5, 64.0, 0.5)));

    f.run(1, Action::move_to(-3.0, -1000.0)).expect("move_to");
    assert_eq!(f.state.movement.target(), Some(Vec3::new(-2.5, 64.0, -23.5)));
}

#[test]
fn move_to_without_coordinates_is_a_recoverable_error() {
    let mut f = Fixture::flat();
    let err = f
        .run(
            0,
            Action::MoveTo {
                x: Some(3.0),
                y: None,
                z: None,
                speed: None,
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        ExecuteError::MissingField {
            action: "move_to",
            field: "z"
        }
    );
    assert_eq!(f.state.movement.target(), None);
}

#[test]
fn movement_speed_is_clamped() {
    let mut f = Fixture::flat();
    f.run(
        0,
        Action::MoveTo {
            x: Some(5.0),
            y: None,
            z: Some(0.0),
            speed: Some(9.0),
        },
    )
    .expect("move_to");
    let speed = f
        .world
        .body_state(f.body)
        .and_then(|b| b.nav_target)
        .map(|(_, speed)| speed);
    assert_eq!(speed, Some(1.5));
}

#[test]
fn inverted_speed_bounds_are_reordered() {
    let mut f = Fixture::flat();
    f.executor.min_speed = 1.5;
    f.executor.max_speed = 0.3;
    assert_eq!(f.executor.clamp_speed(Some(9.0)), 1.5);
    assert_eq!(f.executor.clamp_speed(Some(0.1)), 0.3);

    f.executor.min_speed = f64::NAN;
    assert_eq!(f.executor.clamp_speed(Some(9.0)), 0.3);

    f.executor.max_speed = f64::NAN;
    assert_eq!(f.executor.clamp_speed(None), 1.0);
    assert_eq!(f.executor.clamp_speed(Some(9.0)), 1.5);

    f.run(
        0,
        Action::MoveTo {
            x: Some(5.0),
            y: None,
            z: Some(0.0),
            speed: Some(0.01),
        },
    )
    .expect("move_to");
    let speed = f
        .world
        .body_state(f.body)
        .and_then(|b| b.nav_target)
        .map(|(_, speed)| speed);
    assert_eq!(speed, Some(0.3));
}

#[test]
fn nan_offset_bound_falls_back_to_default() {
    let mut f = Fixture::flat();
    f.executor.move_max_offset = f64::NAN;
    f.run(0, Action::move_to(1000.0, -3.0)).expect("move_to");
    assert_eq!(f.state.movement.target(), Some(Vec3::new(24.5, 64.0, -2.5)));

    f.executor.move_max_offset = -4.0;
    f.run(1, Action::move_to(1000.0, 0.0)).expect("move_to");
    assert_eq!(f.state.movement.target(), Some(Vec3::new(4.5, 64.0, 0.5)));
}

#[test]
fn only_the_first_action_of_a_plan_runs() {
    let mut f = Fixture::flat();
    let plan = ActionPlan::new(vec![Action::say("hello"), Action::Idle, Action::Explore])
        .with_thought("greet first");
    f.apply(10, &plan).expect("plan");

    assert_eq!(f.state.mode, Mode::FollowNearest);
    assert_eq!(f.world.chat_log(), ["<Alex> hello".to_string()]);
    assert_eq!(f.state.last_thought.as_deref(), Some("greet first"));
    assert_eq!(f.state.recent_actions.len(), 1);
}

#[test]
fn empty_plans_and_unknown_actions_do_nothing() {
    let mut f = Fixture::flat();
    f.apply(0, &ActionPlan::default()).expect("empty plan");
    f.run(0, Action::Unknown).expect("unknown action");
    assert_eq!(f.state.mode, Mode::Roam);
    assert!(f.state.recent_actions.is_empty());
}

#[test]
fn say_clears_the_goal() {
    let mut f = Fixture::flat();
    f.run(0, Action::set_goal("wood", Some(5))).expect("set_goal");
    f.run(1, Action::say("brb")).expect("say");
    assert_eq!(f.state.goal, None);
    assert_eq!(f.state.goal_until_tick, 0);
    assert_eq!(f.state.mode, Mode::FollowNearest);
}

#[test]
fn idle_halts_and_clears_goal() {
    let mut f = Fixture::flat();
    f.run(0, Action::set_goal("wood", Some(5))).expect("set_goal");
    f.run(1, Action::move_to(10.0, 0.0)).expect("move_to");
    f.run(2, Action::Idle).expect("idle");

    assert_eq!(f.state.mode, Mode::Idle);
    assert_eq!(f.state.goal, None);
    assert_eq!(f.state.movement.target(), None);
    let body = f.world.body_state(f.body).expect("body");
    assert!(body.nav_target.is_none());
    assert_eq!(body.velocity, Vec3::ZERO);
}

#[test]
fn wander_stays_within_radius() {
    let mut f = Fixture::flat();
    f.run(0, Action::Wander { speed: None }).expect("wander");
    let target = f.state.movement.target().expect("target");
    assert!(target.horizontal_distance(Vec3::new(0.5, 64.0, 0.5)) <= 8.0 + 1e-9);
    assert_eq!(target.y, 64.0);
}

#[test]
fn explore_keeps_its_target_until_it_expires() {
    let mut f = Fixture::flat();
    f.run(0, Action::Explore).expect("explore");
    let first = f.state.explore_target.expect("explore target");
    let distance = first.position.center().horizontal_distance(Vec3::new(0.5, 64.0, 0.5));
    assert!((15.0..=33.5).contains(&distance), "distance {distance}");

    f.run(100, Action::Explore).expect("explore");
    assert_eq!(f.state.explore_target, Some(first));

    let expired = first.expires_tick;
    f.run(expired, Action::Explore).expect("explore");
    let renewed = f.state.explore_target.expect("explore target");
    assert_eq!(renewed.expires_tick, expired + f.executor.explore_ttl_ticks);
}

#[test]
fn explore_reports_failure_without_safe_ground() {
    let mut f = Fixture::new(SandboxWorld::new());
    let err = f.run(0, Action::Explore).unwrap_err();
    assert_eq!(
        err,
        ExecuteError::NoSafeTarget {
            purpose: "explore",
            attempts: 8
        }
    );
    assert!(f.state.explore_target.is_none());
}

#[test]
fn bodies_without_movement_capabilities_report_it() {
    let mut world = SandboxWorld::flat(16, 64);
    let body = world.spawn_body("Statue", Vec3::new(0.5, 64.0, 0.5), Capabilities::NONE);
    let mut f = Fixture::new(world);
    f.body = body;
    let err = f.run(0, Action::move_to(3.0, 3.0)).unwrap_err();
    assert_eq!(err, ExecuteError::CannotMove);
}
