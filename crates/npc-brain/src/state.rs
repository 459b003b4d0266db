//! Per-agent mutable memory.

use std::collections::{BTreeMap, VecDeque};

use npc_core::{BlockPos, BoundedRing, EntityId};
use npc_nav::{MovementRecovery, RecoveryConfig};
use serde::Serialize;

use crate::config::BrainConfig;
use crate::planning::PlanTicket;
use crate::survival::SurvivalNeeds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Idle,
    #[default]
    Roam,
    FollowNearest,
    Goal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatLine {
    pub tick: u64,
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    pub tick: u64,
    pub description: String,
}

/// Persistent exploration waypoint, kept across cycles until it expires or
/// stops being safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExploreTarget {
    pub position: BlockPos,
    pub expires_tick: u64,
}

pub struct BrainState {
    pub autonomous: bool,
    pub mode: Mode,
    pub goal: Option<String>,
    pub follow_target: Option<EntityId>,
    /// Set by a directed "follow" command; the orchestrator does the steering.
    pub manual_follow: bool,
    pub combat_authorized: bool,

    pub next_think_tick: u64,
    pub goal_until_tick: u64,

    /// At most one in-flight planning request.
    pub pending_plan: Option<PlanTicket>,
    pub needs: SurvivalNeeds,
    pub movement: MovementRecovery,
    pub explore_target: Option<ExploreTarget>,

    pub chat_history: BoundedRing<ChatLine>,
    pub pending_outgoing_chat: VecDeque<String>,
    pub last_chat_tick: Option<u64>,

    pub recent_actions: BoundedRing<ActionRecord>,
    pub resources_gathered: BTreeMap<String, u64>,
    pub current_activity: Option<String>,
    pub activity_started_tick: u64,
    pub activity_duration_ticks: u64,

    pub last_thought: Option<String>,
    pub last_error: Option<String>,
}

impl BrainState {
    pub fn new(config: &BrainConfig, recovery: RecoveryConfig) -> Self {
        Self {
            autonomous: false,
            mode: Mode::Roam,
            goal: None,
            follow_target: None,
            manual_follow: false,
            combat_authorized: false,
            next_think_tick: 0,
            goal_until_tick: 0,
            pending_plan: None,
            needs: SurvivalNeeds::default(),
            movement: MovementRecovery::new(recovery),
            explore_target: None,
            chat_history: BoundedRing::new(config.chat_history_cap),
            pending_outgoing_chat: VecDeque::new(),
            last_chat_tick: None,
            recent_actions: BoundedRing::new(config.recent_actions_cap),
            resources_gathered: BTreeMap::new(),
            current_activity: None,
            activity_started_tick: 0,
            activity_duration_ticks: 0,
            last_thought: None,
            last_error: None,
        }
    }

    pub fn is_goal_locked(&self, tick: u64) -> bool {
        tick < self.goal_until_tick
    }

    /// Remaining goal-lock ticks, zero when unlocked.
    pub fn goal_lock_remaining(&self, tick: u64) -> u64 {
        self.goal_until_tick.saturating_sub(tick)
    }

    pub fn clear_goal(&mut self) {
        self.goal = None;
        self.goal_until_tick = 0;
        self.explore_target = None;
    }

    pub fn record_action(&mut self, tick: u64, description: impl Into<String>) {
        self.recent_actions.push(ActionRecord {
            tick,
            description: description.into(),
        });
    }

    pub fn record_resource_gathered(&mut self, resource: &str, amount: u64) {
        *self
            .resources_gathered
            .entry(resource.to_string())
            .or_insert(0) += amount;
    }

    /// Continuing the same activity accumulates duration; a new one restarts it.
    pub fn update_activity(&mut self, tick: u64, activity: &str) {
        match &self.current_activity {
            Some(current) if current == activity => {
                self.activity_duration_ticks = tick.saturating_sub(self.activity_started_tick);
            }
            _ => {
                self.current_activity = Some(activity.to_string());
                self.activity_started_tick = tick;
                self.activity_duration_ticks = 0;
            }
        }
    }

    pub fn push_chat(&mut self, tick: u64, sender: &str, text: &str) {
        self.chat_history.push(ChatLine {
            tick,
            sender: sender.to_string(),
            text: text.to_string(),
        });
    }

    pub fn recent_chat(&self, n: usize) -> Vec<String> {
        self.chat_history
            .last_n(n)
            .map(|line| format!("{}: {}", line.sender, line.text))
            .collect()
    }

    /// Ground-truth account of what the agent actually did, for any
    /// natural-language exchange.
    pub fn ledger_summary(&self) -> String {
        let mut lines = Vec::new();
        match &self.current_activity {
            Some(activity) => lines.push(format!(
                "Current activity: {} (for {} ticks)",
                activity, self.activity_duration_ticks
            )),
            None => lines.push("Current activity: none".to_string()),
        }

        if self.recent_actions.is_empty() {
            lines.push("Recent actions: none".to_string());
        } else {
            let actions = self
                .recent_actions
                .iter()
                .map(|a| a.description.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            lines.push(format!("Recent actions: {actions}"));
        }

        if self.resources_gathered.is_empty() {
            lines.push("Gathered: nothing yet".to_string());
        } else {
            let gathered = self
                .resources_gathered
                .iter()
                .map(|(name, count)| format!("{count} {name}"))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("Gathered: {gathered}"));
        }

        lines.join("\n")
    }
}
