//! The tick orchestrator: one pass over every agent per simulation tick.
//!
//! Per agent, in order: planning results are delivered, the brain runs its
//! decision cycle, then priority arbitration picks exactly one behavior
//! (danger, then manual direction, then autonomous goal pursuit). Movement
//! recovery and the non-combat policy run afterwards regardless of which
//! behavior won.

pub mod combat;
pub mod danger;
pub mod follow;
pub mod recovery;

use std::collections::BTreeMap;
use std::sync::Arc;

use npc_core::world::move_body;
use npc_core::{AgentKey, BlockPos, BodyId, BodySnapshot, EntityId, TickContext, WorldMut};
use npc_nav::RecoveryStep;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::brain::{Brain, CycleOutcome};
use crate::config::SimConfig;
use crate::executor::Executor;
use crate::goals;
use crate::planning::{PlanningService, PlanningWorker};
use crate::registry::{command_channel, AgentRegistry, CommandSender, IncomingCommand};
use crate::state::Mode;

use self::danger::DangerStep;
use self::follow::{FollowState, FollowStep};

/// Goal pursuit (exploration upkeep) runs at this cadence, not every tick.
const GOAL_PURSUIT_INTERVAL_TICKS: u64 = 20;

const RECOVERY_STREAM: u64 = 2;
const PURSUIT_STREAM: u64 = 3;

/// Everything the orchestrator keeps per agent besides the body handle.
pub struct AgentRuntime {
    pub brain: Brain,
    pub follow: FollowState,
    /// Shelter cell the agent is currently heading to.
    pub shelter: Option<BlockPos>,
    pub last_cycle: Option<CycleOutcome>,
    pub last_priority: Option<Priority>,
}

/// Which behavior won arbitration on the last tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Danger,
    Manual,
    Autonomous,
}

/// Read-only view of one agent for command handlers and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStatus {
    pub name: String,
    pub autonomous: bool,
    pub mode: Mode,
    pub goal: Option<String>,
    pub goal_lock_remaining_ticks: u64,
    pub manual_follow: bool,
    pub combat_authorized: bool,
    pub planning: bool,
    pub arbitration: Option<Priority>,
    pub priority_need: String,
    pub activity: Option<String>,
    pub activity_ticks: u64,
    pub last_thought: Option<String>,
    pub last_error: Option<String>,
}

pub struct Orchestrator<B: BodyId> {
    config: SimConfig,
    registry: Arc<AgentRegistry<B>>,
    agents: BTreeMap<AgentKey, AgentRuntime>,
    worker: PlanningWorker,
    commands: CommandSender,
    commands_rx: UnboundedReceiver<IncomingCommand>,
    last_tick: u64,
}

impl<B: BodyId> Orchestrator<B> {
    pub fn new(config: SimConfig, runtime: Handle, service: Arc<dyn PlanningService>) -> Self {
        let (commands, commands_rx) = command_channel();
        Self {
            config,
            registry: Arc::new(AgentRegistry::new()),
            agents: BTreeMap::new(),
            worker: PlanningWorker::new(runtime, service),
            commands,
            commands_rx,
            last_tick: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Shared name → body map, safe to read from any thread.
    pub fn registry(&self) -> Arc<AgentRegistry<B>> {
        Arc::clone(&self.registry)
    }

    /// Handle for queuing commands from other threads.
    pub fn commands(&self) -> CommandSender {
        self.commands.clone()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.agents
            .values()
            .map(|rt| rt.brain.name().to_string())
            .collect()
    }

    pub fn brain(&self, name: &str) -> Option<&Brain> {
        self.agents.get(&AgentKey::new(name)).map(|rt| &rt.brain)
    }

    pub fn brain_mut(&mut self, name: &str) -> Option<&mut Brain> {
        self.agents
            .get_mut(&AgentKey::new(name))
            .map(|rt| &mut rt.brain)
    }

    pub fn runtime(&self, name: &str) -> Option<&AgentRuntime> {
        self.agents.get(&AgentKey::new(name))
    }

    /// Register `body` and create its brain. Respawning an existing name
    /// replaces the old brain and cancels its in-flight request.
    pub fn spawn_agent<W>(&mut self, name: &str, body: B, tick: u64, world: &W) -> AgentKey
    where
        W: WorldMut<Body = B> + ?Sized,
    {
        let key = AgentKey::new(name);
        if let Some(mut previous) = self.agents.remove(&key) {
            previous.brain.shutdown();
        }
        self.registry.register(name, body);
        let brain = Brain::spawn(name, &self.config, tick, body, world);
        tracing::info!(
            agent = %brain.name(),
            goal = ?brain.state.goal,
            priority = brain.needs().priority.label(),
            "agent spawned"
        );
        self.agents.insert(
            key.clone(),
            AgentRuntime {
                brain,
                follow: FollowState::default(),
                shelter: None,
                last_cycle: None,
                last_priority: None,
            },
        );
        key
    }

    /// Remove an agent and cancel its in-flight planning request.
    pub fn despawn(&mut self, name: &str) -> bool {
        let key = AgentKey::new(name);
        self.registry.remove(name);
        match self.agents.remove(&key) {
            Some(mut runtime) => {
                runtime.brain.shutdown();
                tracing::info!(agent = %key, "agent despawned");
                true
            }
            None => false,
        }
    }

    /// Manual direction: follow `target`, or the nearest player when `None`.
    pub fn direct_follow(&mut self, name: &str, target: Option<EntityId>) -> bool {
        let Some(runtime) = self.agents.get_mut(&AgentKey::new(name)) else {
            return false;
        };
        let state = &mut runtime.brain.state;
        state.manual_follow = true;
        state.follow_target = target;
        runtime.follow.reset();
        tracing::info!(agent = %name, ?target, "manual follow directed");
        true
    }

    pub fn release_follow(&mut self, name: &str) -> bool {
        let Some(runtime) = self.agents.get_mut(&AgentKey::new(name)) else {
            return false;
        };
        let state = &mut runtime.brain.state;
        state.manual_follow = false;
        state.follow_target = None;
        state.movement.clear_target();
        runtime.follow.reset();
        tracing::info!(agent = %name, "manual follow released");
        true
    }

    pub fn authorize_combat(&mut self, name: &str, allowed: bool) -> bool {
        match self.brain_mut(name) {
            Some(brain) => {
                brain.state.combat_authorized = allowed;
                true
            }
            None => false,
        }
    }

    pub fn set_autonomous(&mut self, name: &str, enabled: bool) -> bool {
        match self.brain_mut(name) {
            Some(brain) => {
                brain.state.autonomous = enabled;
                true
            }
            None => false,
        }
    }

    /// World-event hook: the body really picked up `amount` of `resource`.
    pub fn record_gathered(&mut self, name: &str, resource: &str, amount: u64) -> bool {
        let tick = self.last_tick;
        let Some(brain) = self.brain_mut(name) else {
            return false;
        };
        brain.state.record_resource_gathered(resource, amount);
        brain
            .state
            .record_action(tick, format!("gathered {amount} {resource}"));
        tracing::debug!(agent = %name, resource, amount, "resource gathered");
        true
    }

    /// Broadcast chat: every agent hears it.
    pub fn add_chat_message(&mut self, tick: u64, sender: &str, text: &str) {
        for runtime in self.agents.values_mut() {
            runtime.brain.add_chat_message(tick, sender, text);
        }
    }

    /// Ask `agent` whether it will obey. The decision arrives on a later tick.
    pub fn process_chat_command(
        &mut self,
        tick: u64,
        sender: &str,
        agent: &str,
        command: &str,
    ) -> Option<u64> {
        let runtime = self.agents.get_mut(&AgentKey::new(agent))?;
        Some(
            runtime
                .brain
                .process_chat_command(tick, sender, command, &self.worker),
        )
    }

    pub fn status(&self, name: &str) -> Option<AgentStatus> {
        self.runtime(name).map(|rt| self.status_of(rt))
    }

    pub fn statuses(&self) -> Vec<AgentStatus> {
        self.agents.values().map(|rt| self.status_of(rt)).collect()
    }

    fn status_of(&self, runtime: &AgentRuntime) -> AgentStatus {
        let brain = &runtime.brain;
        let state = &brain.state;
        AgentStatus {
            name: brain.name().to_string(),
            autonomous: state.autonomous,
            mode: state.mode,
            goal: state.goal.clone(),
            goal_lock_remaining_ticks: state.goal_lock_remaining(self.last_tick),
            manual_follow: state.manual_follow,
            combat_authorized: state.combat_authorized,
            planning: state.pending_plan.is_some(),
            arbitration: runtime.last_priority,
            priority_need: state.needs.priority.label().to_string(),
            activity: state.current_activity.clone(),
            activity_ticks: state.activity_duration_ticks,
            last_thought: state.last_thought.clone(),
            last_error: state.last_error.clone(),
        }
    }

    fn apply_command(&mut self, tick: u64, command: IncomingCommand) {
        let handled = match command {
            IncomingCommand::Chat { sender, text } => {
                self.add_chat_message(tick, &sender, &text);
                true
            }
            IncomingCommand::Directed {
                sender,
                agent,
                text,
            } => self
                .process_chat_command(tick, &sender, &agent, &text)
                .is_some(),
            IncomingCommand::Follow { agent, target } => self.direct_follow(&agent, target),
            IncomingCommand::ReleaseFollow { agent } => self.release_follow(&agent),
            IncomingCommand::AuthorizeCombat { agent, allowed } => {
                self.authorize_combat(&agent, allowed)
            }
            IncomingCommand::SetAutonomous { agent, enabled } => {
                self.set_autonomous(&agent, enabled)
            }
            IncomingCommand::Despawn { agent } => self.despawn(&agent),
        };
        if !handled {
            tracing::debug!(tick, "command addressed to an unknown agent");
        }
    }

    /// Run one simulation tick. Never blocks on the planning service.
    pub fn tick<W>(&mut self, tick: u64, world: &mut W)
    where
        W: WorldMut<Body = B> + ?Sized,
    {
        self.last_tick = tick;
        let ctx = TickContext::new(tick, self.config.seed);

        while let Ok(command) = self.commands_rx.try_recv() {
            self.apply_command(tick, command);
        }

        for result in self.worker.drain() {
            let Some(runtime) = self.agents.get_mut(&result.agent) else {
                tracing::debug!(agent = %result.agent, "result for a despawned agent");
                continue;
            };
            if let Some(verdict) = runtime.brain.deliver(result) {
                if verdict.obey {
                    runtime
                        .brain
                        .interrupt_with_command(tick, &verdict.sender, &verdict.command);
                }
            }
        }

        let mut gone = Vec::new();
        for (key, runtime) in self.agents.iter_mut() {
            let Some(body) = self.registry.body(key.as_str()) else {
                gone.push(key.clone());
                continue;
            };
            Self::tick_agent(&ctx, &self.config, &self.worker, runtime, body, world);
        }
        for key in gone {
            if let Some(mut runtime) = self.agents.remove(&key) {
                runtime.brain.shutdown();
                tracing::info!(agent = %key, "body deregistered, dropping brain");
            }
        }
    }

    fn tick_agent<W>(
        ctx: &TickContext,
        config: &SimConfig,
        worker: &PlanningWorker,
        runtime: &mut AgentRuntime,
        body: B,
        world: &mut W,
    ) where
        W: WorldMut<Body = B> + ?Sized,
    {
        let tick = ctx.tick;
        runtime.last_cycle = Some(runtime.brain.cycle(ctx, config, worker, body, world));

        let Some(snapshot) = world.body(body) else {
            return;
        };
        let name = runtime.brain.name().to_string();

        let priority = Self::arbitrate(ctx, config, runtime, &name, &snapshot, body, world);
        tracing::trace!(agent = %name, tick, ?priority, "arbitration");
        runtime.last_priority = Some(priority);

        // Position may have changed (teleports) during arbitration.
        let position = world.body(body).map_or(snapshot.position, |b| b.position);
        match runtime.brain.state.movement.observe(tick, position) {
            RecoveryStep::Recover(strategy) => {
                let mut rng = ctx.rng_for_agent(runtime.brain.key(), RECOVERY_STREAM);
                let state = &mut runtime.brain.state;
                recovery::apply(
                    tick,
                    &name,
                    strategy,
                    config.executor.default_speed,
                    state,
                    position,
                    body,
                    world,
                    &mut rng,
                );
            }
            RecoveryStep::Resume(target) => {
                tracing::debug!(agent = %name, "detour reached, resuming");
                move_body(world, body, target, config.executor.default_speed);
            }
            _ => {}
        }

        combat::enforce(
            tick,
            &name,
            &config.combat,
            &mut runtime.brain.state,
            &snapshot,
            body,
            world,
        );

        if let Some(line) = runtime
            .brain
            .next_chat_message(tick, config.brain.chat_interval_ticks)
        {
            world.broadcast(&format!("<{name}> {line}"));
            runtime.brain.state.push_chat(tick, &name, &line);
        }
    }

    /// Danger > manual direction > autonomous goal pursuit.
    fn arbitrate<W>(
        ctx: &TickContext,
        config: &SimConfig,
        runtime: &mut AgentRuntime,
        name: &str,
        snapshot: &BodySnapshot,
        body: B,
        world: &mut W,
    ) -> Priority
    where
        W: WorldMut<Body = B> + ?Sized,
    {
        let tick = ctx.tick;
        let step = danger::respond(
            tick,
            name,
            &config.danger,
            &mut runtime.brain.state,
            &mut runtime.brain.nearby,
            &mut runtime.shelter,
            snapshot,
            body,
            world,
        );
        if step.preempts() {
            if step != DangerStep::Locked {
                runtime.follow.reset();
            }
            return Priority::Danger;
        }

        let state = &mut runtime.brain.state;
        let nearby = &mut runtime.brain.nearby;
        if state.manual_follow {
            let target = state.follow_target;
            let step = follow::steer(
                tick,
                &config.follow,
                &mut runtime.follow,
                state,
                nearby,
                target,
                body,
                world,
            );
            if step == FollowStep::NoTarget {
                state.update_activity(tick, "waiting to follow");
            } else {
                state.update_activity(tick, "following");
            }
            return Priority::Manual;
        }

        match state.mode {
            Mode::FollowNearest => {
                follow::steer(
                    tick,
                    &config.follow,
                    &mut runtime.follow,
                    state,
                    nearby,
                    None,
                    body,
                    world,
                );
            }
            Mode::Goal
                if state.goal.as_deref() == Some(goals::EXPLORE)
                    && tick % GOAL_PURSUIT_INTERVAL_TICKS == 0 =>
            {
                let executor = Executor::new(&config.brain, &config.executor);
                let mut rng = ctx.rng_for_agent(runtime.brain.key(), PURSUIT_STREAM);
                let state = &mut runtime.brain.state;
                if let Err(err) = executor.explore(ctx, state, body, world, &mut rng) {
                    state.last_error = Some(err.to_string());
                }
            }
            _ => {}
        }
        Priority::Autonomous
    }
}
