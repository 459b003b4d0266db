//! Agent control loop: per-agent brains, the asynchronous planning lifecycle,
//! and the tick orchestrator that arbitrates between danger response, manual
//! direction and autonomous goal pursuit.
//!
//! All agent state is owned and mutated by the simulation thread. Planning
//! requests run on a tokio worker pool and report back through a single
//! inbox drained once per tick.

pub mod brain;
pub mod config;
pub mod error;
pub mod executor;
pub mod goals;
pub mod nearby;
pub mod orchestrator;
pub mod planning;
pub mod registry;
pub mod state;
pub mod survival;

pub use brain::{Brain, CommandVerdict, CycleOutcome};
pub use config::{
    BrainConfig, CombatConfig, DangerConfig, ExecutorConfig, FollowConfig, NearbyConfig,
    PlannerConfig, SimConfig,
};
pub use error::{ExecuteError, PlanningError};
pub use executor::Executor;
pub use orchestrator::{AgentRuntime, AgentStatus, Orchestrator, Priority};
pub use planning::{
    parse_json_block, CommandContext, ObeyDecision, PlanContext, PlanTicket, PlanningOutcome,
    PlanningResult, PlanningService, PlanningWorker,
};
pub use registry::{command_channel, AgentRegistry, CommandSender, IncomingCommand};
pub use state::{BrainState, Mode};
pub use survival::{assess, PriorityNeed, SurvivalNeeds};
