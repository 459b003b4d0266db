//! Built-in planning service: picks the next step from the most urgent need.
//!
//! Stands in for a language-model planner so the loop can run headless. It
//! honors the same contract (fallible, slow, first action wins) and can be
//! made flaky through [`PlannerConfig`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use npc_brain::{
    CommandContext, ObeyDecision, PlanContext, PlannerConfig, PlanningError, PlanningService,
    PriorityNeed,
};
use npc_core::rng::mix64;
use npc_core::{Action, ActionPlan};

/// Words that make a directed command sound like something an agent can do.
const ACTIONABLE: &[&str] = &[
    "follow", "come", "stop", "wait", "stay", "explore", "wood", "stone", "mine", "food", "hunt",
    "craft", "shelter", "build", "go", "help",
];

pub struct HeuristicPlanner {
    config: PlannerConfig,
    seed: u64,
    requests: AtomicU64,
}

impl HeuristicPlanner {
    pub fn new(config: PlannerConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            requests: AtomicU64::new(0),
        }
    }

    /// Simulated latency, then a deterministic failure draw.
    async fn round_trip(&self) -> Result<(), PlanningError> {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }
        let n = self.requests.fetch_add(1, Ordering::Relaxed);
        let roll = (mix64(self.seed ^ n) >> 11) as f64 / (1u64 << 53) as f64;
        if roll < self.config.failure_rate {
            return Err(PlanningError::Unavailable(format!(
                "simulated outage on request {n}"
            )));
        }
        Ok(())
    }
}

/// Step for the current context. Pure so it can be tested without a runtime.
pub fn choose_plan(context: &PlanContext) -> ActionPlan {
    if let Some(line) = unanswered_mention(context) {
        return ActionPlan::single(Action::say(format!("{line}? I'll see what I can do.")))
            .with_thought("someone is talking to me");
    }

    let need = context.needs.priority;
    let plan = match need {
        PriorityNeed::Recover => ActionPlan::single(Action::Idle),
        PriorityNeed::Explore if context.goal.as_deref() == Some("explore") => {
            ActionPlan::single(Action::Explore)
        }
        PriorityNeed::Explore => ActionPlan::new(vec![
            Action::set_goal("explore", Some(10)),
            Action::Explore,
        ]),
        _ => {
            let (goal, minutes) = need.initial_goal();
            if context.goal.as_deref() == Some(goal) {
                ActionPlan::single(Action::Wander { speed: None })
            } else {
                ActionPlan::single(Action::SetGoal {
                    goal: goal.to_string(),
                    minutes: Some(minutes as i64),
                    reason: Some(format!("need to {}", need.label())),
                })
            }
        }
    };
    plan.with_thought(format!("most urgent: {}", need.label()))
}

/// Most recent chat line that names this agent and came from someone else.
fn unanswered_mention(context: &PlanContext) -> Option<String> {
    let me = context.agent.to_lowercase();
    let last = context.recent_chat.last()?;
    let (sender, text) = last.split_once(": ")?;
    if sender.eq_ignore_ascii_case(&context.agent) || !text.to_lowercase().contains(&me) {
        return None;
    }
    Some(format!("{sender}, you said \"{}\"", text.trim()))
}

pub fn choose_decision(context: &CommandContext) -> ObeyDecision {
    let command = context.command.to_lowercase();
    let actionable = command
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| ACTIONABLE.contains(&word));
    if actionable {
        ObeyDecision {
            obey: true,
            response: format!("On it, {}!", context.sender),
        }
    } else {
        ObeyDecision {
            obey: false,
            response: format!("Not sure how to do that, {}.", context.sender),
        }
    }
}

#[async_trait]
impl PlanningService for HeuristicPlanner {
    async fn plan(&self, context: PlanContext) -> Result<ActionPlan, PlanningError> {
        self.round_trip().await?;
        Ok(choose_plan(&context))
    }

    async fn decide(&self, context: CommandContext) -> Result<ObeyDecision, PlanningError> {
        self.round_trip().await?;
        Ok(choose_decision(&context))
    }
}
