//! Applies one action to one agent.
//!
//! Each call touches the agent's state plus at most the world side effects
//! the action type implies. Plans are never run past their first step.

use std::f64::consts::TAU;

use npc_core::world::{halt_body, move_body};
use npc_core::{
    minutes_to_ticks, Action, ActionPlan, BlockPos, DeterministicRng, TickContext, Vec3,
    WorldMut,
};
use npc_nav::is_safe_standing;

use crate::config::{BrainConfig, ExecutorConfig};
use crate::error::ExecuteError;
use crate::goals::canonical_goal;
use crate::state::{BrainState, ExploreTarget, Mode};

pub struct Executor<'a> {
    pub brain: &'a BrainConfig,
    pub config: &'a ExecutorConfig,
}

impl<'a> Executor<'a> {
    pub fn new(brain: &'a BrainConfig, config: &'a ExecutorConfig) -> Self {
        Self { brain, config }
    }

    /// Goal duration in minutes, clamped to the configured window.
    pub fn clamp_goal_minutes(&self, minutes: Option<i64>) -> u64 {
        let min = self.brain.min_goal_minutes.max(1);
        let max = self.brain.max_goal_minutes.max(min);
        match minutes {
            Some(m) if m <= 0 => min,
            Some(m) => (m as u64).clamp(min, max),
            None => self.brain.default_goal_minutes.clamp(min, max),
        }
    }

    /// Record the plan's thought and execute only its first action.
    pub fn apply_plan<W, R>(
        &self,
        ctx: &TickContext,
        name: &str,
        state: &mut BrainState,
        plan: &ActionPlan,
        body: W::Body,
        world: &mut W,
        rng: &mut R,
    ) -> Result<(), ExecuteError>
    where
        W: WorldMut + ?Sized,
        R: DeterministicRng,
    {
        if let Some(thought) = plan.thought.as_deref().filter(|t| !t.trim().is_empty()) {
            state.last_thought = Some(thought.to_string());
        }
        let Some(action) = plan.first() else {
            tracing::debug!(agent = %name, "empty plan, nothing to do");
            return Ok(());
        };
        if plan.len() > 1 {
            tracing::debug!(
                agent = %name,
                action = action.name(),
                dropped = plan.len() - 1,
                "executing first action only"
            );
        }
        self.execute(ctx, name, state, action, body, world, rng)
    }

    pub fn execute<W, R>(
        &self,
        ctx: &TickContext,
        name: &str,
        state: &mut BrainState,
        action: &Action,
        body: W::Body,
        world: &mut W,
        rng: &mut R,
    ) -> Result<(), ExecuteError>
    where
        W: WorldMut + ?Sized,
        R: DeterministicRng,
    {
        let tick = ctx.tick;
        match action {
            Action::SetGoal {
                goal,
                minutes,
                reason,
            } => self.set_goal(tick, name, state, goal, *minutes, reason.as_deref()),
            Action::Say { message } => {
                let message = message.trim();
                if message.is_empty() {
                    return Err(ExecuteError::MissingField {
                        action: "say",
                        field: "message",
                    });
                }
                world.broadcast(&format!("<{name}> {message}"));
                state.push_chat(tick, name, message);
                state.mode = Mode::FollowNearest;
                state.clear_goal();
                state.record_action(tick, format!("said \"{message}\""));
                Ok(())
            }
            Action::Idle => {
                halt_body(world, body);
                state.movement.clear_target();
                state.clear_goal();
                state.mode = Mode::Idle;
                state.update_activity(tick, "idle");
                state.record_action(tick, "stopped and waited");
                Ok(())
            }
            Action::FollowNearest => {
                state.clear_goal();
                state.mode = Mode::FollowNearest;
                state.update_activity(tick, "following");
                state.record_action(tick, "started following the nearest player");
                Ok(())
            }
            Action::Wander { speed } => {
                let position = world.body(body).ok_or(ExecuteError::NoBody)?.position;
                let angle = rng.next_f64_range(0.0, TAU);
                let radius = self.config.wander_radius.max(1.0);
                let distance = rng.next_f64_range(radius * 0.5, radius);
                let target = ground_at(
                    world,
                    position + Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance),
                );
                self.start_move(state, body, world, target, *speed)?;
                state.update_activity(tick, "wandering");
                state.record_action(tick, "wandered nearby");
                Ok(())
            }
            Action::MoveTo { x, y, z, speed } => {
                let dx = x.ok_or(ExecuteError::MissingField {
                    action: "move_to",
                    field: "x",
                })?;
                let dz = z.ok_or(ExecuteError::MissingField {
                    action: "move_to",
                    field: "z",
                })?;
                let offset = self.clamp_offset(Vec3::new(dx, y.unwrap_or(0.0), dz));
                let position = world.body(body).ok_or(ExecuteError::NoBody)?.position;
                let target = position + offset;
                self.start_move(state, body, world, target, *speed)?;
                state.update_activity(tick, "moving");
                state.record_action(
                    tick,
                    format!(
                        "moved toward offset ({:.0}, {:.0}, {:.0})",
                        offset.x, offset.y, offset.z
                    ),
                );
                Ok(())
            }
            Action::Explore => {
                self.explore(ctx, state, body, world, rng)?;
                state.update_activity(tick, "exploring");
                state.record_action(tick, "explored");
                Ok(())
            }
            Action::Unknown => {
                tracing::debug!(agent = %name, "ignoring unrecognized action type");
                Ok(())
            }
        }
    }

    /// Commit to a goal: canonical label, clamped duration, mode GOAL.
    pub fn set_goal(
        &self,
        tick: u64,
        name: &str,
        state: &mut BrainState,
        goal: &str,
        minutes: Option<i64>,
        reason: Option<&str>,
    ) -> Result<(), ExecuteError> {
        let label = canonical_goal(goal);
        if label.is_empty() {
            return Err(ExecuteError::MissingField {
                action: "set_goal",
                field: "goal",
            });
        }
        let minutes = self.clamp_goal_minutes(minutes);
        state.goal = Some(label.clone());
        state.goal_until_tick = tick + minutes_to_ticks(minutes);
        state.mode = Mode::Goal;
        state.explore_target = None;
        if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
            state.last_thought = Some(reason.to_string());
        }
        state.update_activity(tick, &label);
        state.record_action(tick, format!("set goal {label} for {minutes} min"));
        tracing::info!(agent = %name, goal = %label, minutes, "goal set");
        Ok(())
    }

    /// Per-axis clamp of a relative offset.
    pub fn clamp_offset(&self, offset: Vec3) -> Vec3 {
        let max = self.config.offset_bound();
        let clamp = |v: f64| if v.is_finite() { v.clamp(-max, max) } else { 0.0 };
        Vec3::new(clamp(offset.x), clamp(offset.y), clamp(offset.z))
    }

    /// Keep walking toward the persistent exploration target, picking a new
    /// one when it expired or became unsafe.
    pub fn explore<W, R>(
        &self,
        ctx: &TickContext,
        state: &mut BrainState,
        body: W::Body,
        world: &mut W,
        rng: &mut R,
    ) -> Result<(), ExecuteError>
    where
        W: WorldMut + ?Sized,
        R: DeterministicRng,
    {
        if state.mode != Mode::Goal {
            state.mode = Mode::Roam;
        }

        if let Some(current) = state.explore_target {
            if ctx.tick < current.expires_tick && is_safe_standing(&*world, current.position) {
                let target = current.position.center();
                if state.movement.target() != Some(target) {
                    self.start_move(state, body, world, target, None)?;
                }
                return Ok(());
            }
            state.explore_target = None;
        }

        let position = world.body(body).ok_or(ExecuteError::NoBody)?.position;
        let attempts = self.config.explore_attempts.max(1);
        for _ in 0..attempts {
            let angle = rng.next_f64_range(0.0, TAU);
            let distance =
                rng.next_f64_range(self.config.explore_min_radius, self.config.explore_max_radius);
            let x = (position.x + angle.cos() * distance).floor() as i32;
            let z = (position.z + angle.sin() * distance).floor() as i32;
            let Some(y) = world.surface_y(x, z) else {
                continue;
            };
            let candidate = BlockPos::new(x, y, z);
            if !is_safe_standing(&*world, candidate) {
                continue;
            }

            state.explore_target = Some(ExploreTarget {
                position: candidate,
                expires_tick: ctx.tick + self.config.explore_ttl_ticks,
            });
            return self.start_move(state, body, world, candidate.center(), None);
        }

        Err(ExecuteError::NoSafeTarget {
            purpose: "explore",
            attempts,
        })
    }

    fn start_move<W>(
        &self,
        state: &mut BrainState,
        body: W::Body,
        world: &mut W,
        target: Vec3,
        speed: Option<f64>,
    ) -> Result<(), ExecuteError>
    where
        W: WorldMut + ?Sized,
    {
        let speed = self.config.clamp_speed(speed);
        if !move_body(world, body, target, speed) {
            return Err(ExecuteError::CannotMove);
        }
        state.movement.set_target(target);
        if state.mode == Mode::Idle || state.mode == Mode::FollowNearest {
            state.mode = Mode::Roam;
        }
        Ok(())
    }
}

/// Snap a point onto the terrain surface when the column has one.
fn ground_at<W: WorldMut + ?Sized>(world: &W, point: Vec3) -> Vec3 {
    let x = point.x.floor() as i32;
    let z = point.z.floor() as i32;
    match world.surface_y(x, z) {
        Some(y) => Vec3::new(point.x, f64::from(y), point.z),
        None => point,
    }
}
