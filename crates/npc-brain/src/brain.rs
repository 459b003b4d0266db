//! The per-agent decision cycle and chat-command protocol.

use npc_core::{ActionPlan, AgentKey, TickContext, WorldMut};

use crate::config::SimConfig;
use crate::error::{ExecuteError, PlanningError};
use crate::executor::Executor;
use crate::goals;
use crate::nearby::{self, NearbyCache};
use crate::planning::{
    CommandContext, PlanContext, PlanningOutcome, PlanningResult, PlanningWorker,
};
use crate::state::{BrainState, Mode};
use crate::survival::{self, SurvivalNeeds};

/// Chat lines included in a planning or command context.
const CONTEXT_CHAT_LINES: usize = 8;

/// RNG stream for executor randomness (wander, explore).
const EXECUTOR_STREAM: u64 = 1;

/// What one call to [`Brain::cycle`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Dormant,
    CoolingDown,
    GoalLocked,
    AwaitingPlan,
    ManualFollow,
    Requested { ticket: u64 },
    NoBody,
}

/// A command decision handed back to the caller.
///
/// When `obey` is set the caller decides how to act on the command and then
/// calls [`Brain::interrupt_with_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandVerdict {
    pub sender: String,
    pub command: String,
    pub obey: bool,
}

pub struct Brain {
    name: String,
    key: AgentKey,
    pub state: BrainState,
    /// Spatial scans shared by planning, danger and follow lookups.
    pub nearby: NearbyCache,
    /// Result for the pending ticket, waiting for the next cycle.
    ready: Option<Result<ActionPlan, PlanningError>>,
}

/// One scan wide enough for every per-agent lookup.
fn scan_radius(config: &SimConfig) -> f64 {
    config
        .nearby
        .radius
        .max(config.danger.hostile_radius)
        .max(config.follow.search_radius)
}

impl Brain {
    pub fn new(name: &str, config: &SimConfig) -> Self {
        Self {
            name: name.trim().to_string(),
            key: AgentKey::new(name),
            state: BrainState::new(&config.brain, config.recovery),
            nearby: NearbyCache::new(config.nearby.ttl_ticks, scan_radius(config)),
            ready: None,
        }
    }

    /// Create the brain for a freshly spawned body and commit it to the goal
    /// its most urgent survival need calls for.
    pub fn spawn<W: WorldMut + ?Sized>(
        name: &str,
        config: &SimConfig,
        tick: u64,
        body: W::Body,
        world: &W,
    ) -> Self {
        let mut brain = Self::new(name, config);
        brain.state.autonomous = config.brain.autonomous_on_spawn;

        let needs = world
            .body(body)
            .map(|snapshot| survival::assess(&snapshot))
            .unwrap_or_default();
        let (goal, minutes) = needs.priority.initial_goal();
        brain.state.needs = needs;

        let executor = Executor::new(&config.brain, &config.executor);
        if let Err(err) = executor.set_goal(
            tick,
            &brain.name,
            &mut brain.state,
            goal,
            Some(minutes as i64),
            Some("initial survival priority"),
        ) {
            brain.state.last_error = Some(err.to_string());
        }
        brain
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &AgentKey {
        &self.key
    }

    pub fn needs(&self) -> &SurvivalNeeds {
        &self.state.needs
    }

    /// Route a finished planning request to this brain.
    ///
    /// Plan results are parked until the next cycle when the ticket is still
    /// the pending one; anything else is stale and dropped. Command decisions
    /// queue their reply and come back as a verdict.
    pub fn deliver(&mut self, result: PlanningResult) -> Option<CommandVerdict> {
        match result.outcome {
            PlanningOutcome::Plan(outcome) => {
                let current = self.state.pending_plan.as_ref().map(|p| p.id());
                if current == Some(result.ticket) {
                    self.ready = Some(outcome);
                } else {
                    tracing::debug!(
                        agent = %self.name,
                        ticket = result.ticket,
                        "discarding stale planning result"
                    );
                }
                None
            }
            PlanningOutcome::Command {
                sender,
                command,
                decision,
                error,
            } => {
                if let Some(err) = error {
                    tracing::warn!(agent = %self.name, error = %err, "command decision failed");
                    self.state.last_error = Some(format!("command decision failed: {err}"));
                }
                let response = decision.response.trim();
                if !response.is_empty() {
                    self.state.pending_outgoing_chat.push_back(response.to_string());
                }
                tracing::info!(
                    agent = %self.name,
                    sender = %sender,
                    obey = decision.obey,
                    "command decided"
                );
                Some(CommandVerdict {
                    sender,
                    command,
                    obey: decision.obey,
                })
            }
        }
    }

    /// One decision cycle. Never blocks and never fails; problems end up in
    /// `last_error`.
    pub fn cycle<W: WorldMut + ?Sized>(
        &mut self,
        ctx: &TickContext,
        config: &SimConfig,
        worker: &PlanningWorker,
        body: W::Body,
        world: &mut W,
    ) -> CycleOutcome {
        let tick = ctx.tick;
        let snapshot = world.body(body);
        if let Some(snapshot) = &snapshot {
            self.state.needs = survival::assess(snapshot);
        }

        if let Some(outcome) = self.ready.take() {
            self.state.pending_plan = None;
            self.apply_planning_outcome(ctx, config, outcome, body, world);
        }

        if self.state.mode == Mode::Goal && !self.state.is_goal_locked(tick) {
            tracing::debug!(agent = %self.name, goal = ?self.state.goal, "goal lock elapsed");
            self.state.clear_goal();
            self.state.mode = Mode::Roam;
        }

        if !self.state.autonomous {
            return CycleOutcome::Dormant;
        }
        if tick < self.state.next_think_tick {
            return CycleOutcome::CoolingDown;
        }
        if self.state.is_goal_locked(tick) {
            return CycleOutcome::GoalLocked;
        }
        if self.state.pending_plan.is_some() {
            return CycleOutcome::AwaitingPlan;
        }
        if self.state.manual_follow {
            self.state.next_think_tick = tick + config.brain.manual_follow_recheck_ticks;
            return CycleOutcome::ManualFollow;
        }

        let Some(snapshot) = snapshot else {
            self.state.last_error = Some(ExecuteError::NoBody.to_string());
            self.state.next_think_tick = tick + config.brain.think_cooldown_ticks;
            return CycleOutcome::NoBody;
        };

        let entities = self.nearby.get_or_query(
            tick,
            &*world,
            snapshot.position,
            config.nearby.radius,
            snapshot.entity,
        );
        let nearby = nearby::summarize(&entities, snapshot.position, config.nearby.max_listed);
        let context = PlanContext {
            agent: self.name.clone(),
            tick,
            position: snapshot.position,
            mode: self.state.mode,
            goal: self.state.goal.clone(),
            needs: self.state.needs.clone(),
            priority_need: self.state.needs.priority.label().to_string(),
            nearby,
            recent_chat: self.state.recent_chat(CONTEXT_CHAT_LINES),
            ledger: self.state.ledger_summary(),
            is_night: world.is_night(),
            goals: goals::CANONICAL_GOALS
                .iter()
                .map(|g| (*g).to_string())
                .collect(),
        };

        let ticket = worker.submit_plan(self.key.clone(), context);
        let id = ticket.id();
        self.state.pending_plan = Some(ticket);
        self.state.next_think_tick = tick + config.brain.think_cooldown_ticks;
        self.state.last_error = None;
        tracing::debug!(agent = %self.name, tick, ticket = id, "planning request issued");
        CycleOutcome::Requested { ticket: id }
    }

    fn apply_planning_outcome<W: WorldMut + ?Sized>(
        &mut self,
        ctx: &TickContext,
        config: &SimConfig,
        outcome: Result<ActionPlan, PlanningError>,
        body: W::Body,
        world: &mut W,
    ) {
        let plan = match outcome {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(agent = %self.name, error = %err, "planning failed");
                self.state.last_error = Some(err.to_string());
                return;
            }
        };

        let executor = Executor::new(&config.brain, &config.executor);
        let mut rng = ctx.rng_for_agent(&self.key, EXECUTOR_STREAM);
        if let Err(err) =
            executor.apply_plan(ctx, &self.name, &mut self.state, &plan, body, world, &mut rng)
        {
            tracing::warn!(agent = %self.name, error = %err, "action failed");
            self.state.last_error = Some(err.to_string());
        }
    }

    /// Non-directed chat heard by this agent.
    pub fn add_chat_message(&mut self, tick: u64, sender: &str, text: &str) {
        self.state.push_chat(tick, sender, text);
    }

    /// Record a directed command and ask the planning service whether to obey.
    /// Returns the request ticket.
    pub fn process_chat_command(
        &mut self,
        tick: u64,
        sender: &str,
        command: &str,
        worker: &PlanningWorker,
    ) -> u64 {
        self.state.push_chat(tick, sender, command);
        let status = format!(
            "mode {:?}, goal {}, {}",
            self.state.mode,
            self.state.goal.as_deref().unwrap_or("none"),
            self.state.needs.summary()
        );
        let context = CommandContext {
            agent: self.name.clone(),
            sender: sender.to_string(),
            command: command.to_string(),
            status,
            ledger: self.state.ledger_summary(),
            recent_chat: self.state.recent_chat(CONTEXT_CHAT_LINES),
        };
        worker.submit_command(self.key.clone(), context)
    }

    /// Drop whatever the agent was doing and re-think on this tick.
    pub fn interrupt_with_command(&mut self, tick: u64, sender: &str, command: &str) {
        self.state.goal_until_tick = 0;
        if self.state.mode == Mode::Goal {
            self.state.clear_goal();
            self.state.mode = Mode::Roam;
        }
        if let Some(pending) = self.state.pending_plan.take() {
            pending.cancel();
        }
        self.ready = None;
        self.state.next_think_tick = tick;
        self.state
            .record_action(tick, format!("agreed to {sender}'s request: {command}"));
        tracing::info!(agent = %self.name, sender = %sender, "interrupted by command");
    }

    /// Next queued outgoing line, paced by the configured chat interval.
    pub fn next_chat_message(&mut self, tick: u64, interval_ticks: u64) -> Option<String> {
        if let Some(last) = self.state.last_chat_tick {
            if tick.saturating_sub(last) < interval_ticks {
                return None;
            }
        }
        let line = self.state.pending_outgoing_chat.pop_front()?;
        self.state.last_chat_tick = Some(tick);
        Some(line)
    }

    /// Cancel any in-flight request. Called on despawn.
    pub fn shutdown(&mut self) {
        if let Some(pending) = self.state.pending_plan.take() {
            pending.cancel();
        }
        self.ready = None;
    }
}
