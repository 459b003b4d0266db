//! Asynchronous planning-service lifecycle.
//!
//! Requests run on the tokio worker pool. Each finished request produces an
//! immutable [`PlanningResult`] that is pushed into a single-consumer inbox;
//! only the simulation thread drains it, so no worker ever touches agent
//! state.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use npc_core::{ActionPlan, AgentKey, Vec3};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::error::PlanningError;
use crate::state::Mode;
use crate::survival::SurvivalNeeds;

/// Everything the planner gets to see about one agent.
#[derive(Debug, Clone, Serialize)]
pub struct PlanContext {
    pub agent: String,
    pub tick: u64,
    pub position: Vec3,
    pub mode: Mode,
    pub goal: Option<String>,
    pub needs: SurvivalNeeds,
    pub priority_need: String,
    pub nearby: String,
    pub recent_chat: Vec<String>,
    pub ledger: String,
    pub is_night: bool,
    /// Goal labels the executor understands
    pub goals: Vec<String>,
}

impl PlanContext {
    /// Free-form status text for text-based planners.
    pub fn status_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("You are {}.\n", self.agent));
        out.push_str(&format!(
            "Position: {:.1}, {:.1}, {:.1}\n",
            self.position.x, self.position.y, self.position.z
        ));
        out.push_str(&format!(
            "Time: {}\n",
            if self.is_night { "night" } else { "day" }
        ));
        out.push_str(&format!("Status: {}\n", self.needs.summary()));
        out.push_str(&format!("Most urgent need: {}\n", self.priority_need));
        match &self.goal {
            Some(goal) => out.push_str(&format!("Current goal: {goal}\n")),
            None => out.push_str("Current goal: none\n"),
        }
        out.push_str(&format!("Nearby: {}\n", self.nearby));
        out.push_str(&self.ledger);
        out.push('\n');
        if !self.recent_chat.is_empty() {
            out.push_str("Recent chat:\n");
            for line in &self.recent_chat {
                out.push_str(&format!("  {line}\n"));
            }
        }
        out.push_str(&format!("Known goals: {}\n", self.goals.join(", ")));
        out
    }
}

/// A directed command awaiting a yes/no decision.
#[derive(Debug, Clone, Serialize)]
pub struct CommandContext {
    pub agent: String,
    pub sender: String,
    pub command: String,
    pub status: String,
    pub ledger: String,
    pub recent_chat: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObeyDecision {
    pub obey: bool,
    #[serde(default)]
    pub response: String,
}

impl ObeyDecision {
    /// The fallback when the service can't be reached or makes no sense.
    pub fn decline(sender: &str) -> Self {
        Self {
            obey: false,
            response: format!("Sorry {sender}, I can't do that right now."),
        }
    }
}

/// Pull the first JSON object out of free text and decode it.
pub fn parse_json_block<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, PlanningError> {
    let start = text
        .find('{')
        .ok_or_else(|| PlanningError::Malformed("no JSON object in response".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| PlanningError::Malformed("unterminated JSON object".to_string()))?;
    Ok(serde_json::from_str(&text[start..=end])?)
}

/// The external planning service.
#[async_trait]
pub trait PlanningService: Send + Sync + 'static {
    async fn plan(&self, context: PlanContext) -> Result<ActionPlan, PlanningError>;

    async fn decide(&self, context: CommandContext) -> Result<ObeyDecision, PlanningError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanningOutcome {
    Plan(Result<ActionPlan, PlanningError>),
    /// Failures are already folded into a declining decision; `error` keeps
    /// the reason for diagnostics.
    Command {
        sender: String,
        command: String,
        decision: ObeyDecision,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanningResult {
    pub ticket: u64,
    pub agent: AgentKey,
    pub outcome: PlanningOutcome,
}

/// Handle for one in-flight plan request.
#[derive(Debug)]
pub struct PlanTicket {
    id: u64,
    handle: JoinHandle<()>,
}

impl PlanTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Abort the request. A result that already reached the inbox is
    /// discarded on delivery because its ticket no longer matches.
    pub fn cancel(self) {
        self.handle.abort();
    }
}

pub struct PlanningWorker {
    runtime: Handle,
    service: Arc<dyn PlanningService>,
    inbox_tx: UnboundedSender<PlanningResult>,
    inbox_rx: UnboundedReceiver<PlanningResult>,
    next_ticket: AtomicU64,
}

impl PlanningWorker {
    pub fn new(runtime: Handle, service: Arc<dyn PlanningService>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            service,
            inbox_tx,
            inbox_rx,
            next_ticket: AtomicU64::new(1),
        }
    }

    fn ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::Relaxed)
    }

    pub fn submit_plan(&self, agent: AgentKey, context: PlanContext) -> PlanTicket {
        let id = self.ticket();
        let service = Arc::clone(&self.service);
        let inbox = self.inbox_tx.clone();

        let handle = self.runtime.spawn(async move {
            let outcome = match AssertUnwindSafe(service.plan(context)).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(PlanningError::Unavailable(
                    "planning service panicked".to_string(),
                )),
            };
            let _ = inbox.send(PlanningResult {
                ticket: id,
                agent,
                outcome: PlanningOutcome::Plan(outcome),
            });
        });

        PlanTicket { id, handle }
    }

    pub fn submit_command(&self, agent: AgentKey, context: CommandContext) -> u64 {
        let id = self.ticket();
        let service = Arc::clone(&self.service);
        let inbox = self.inbox_tx.clone();

        self.runtime.spawn(async move {
            let sender = context.sender.clone();
            let command = context.command.clone();
            let (decision, error) =
                match AssertUnwindSafe(service.decide(context)).catch_unwind().await {
                    Ok(Ok(decision)) => (decision, None),
                    Ok(Err(err)) => (ObeyDecision::decline(&sender), Some(err.to_string())),
                    Err(_) => (
                        ObeyDecision::decline(&sender),
                        Some("planning service panicked".to_string()),
                    ),
                };
            let _ = inbox.send(PlanningResult {
                ticket: id,
                agent,
                outcome: PlanningOutcome::Command {
                    sender,
                    command,
                    decision,
                    error,
                },
            });
        });

        id
    }

    /// Everything that finished since the last drain. Never blocks.
    pub fn drain(&mut self) -> Vec<PlanningResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.inbox_rx.try_recv() {
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_block_tolerates_surrounding_text() {
        let decision: ObeyDecision =
            parse_json_block("Sure thing!\n{\"obey\": true, \"response\": \"On it\"} ok")
                .expect("decodes");
        assert!(decision.obey);
        assert_eq!(decision.response, "On it");
    }

    #[test]
    fn parse_json_block_rejects_plain_text() {
        let err = parse_json_block::<ObeyDecision>("no idea").unwrap_err();
        assert!(matches!(err, PlanningError::Malformed(_)));
    }
}
