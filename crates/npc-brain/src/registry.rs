//! Agent registry and cross-thread command intake.
//!
//! The registry maps normalized agent names to world bodies in a concurrent
//! `DashMap` so chat handlers can resolve names while the tick loop runs.
//! Anything that would mutate a brain goes through [`CommandSender`] instead
//! and is applied on the simulation thread.

use dashmap::DashMap;
use npc_core::{AgentKey, BodyId, EntityId};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Thread-safe name → body mapping. Values keep the display name.
pub struct AgentRegistry<B: BodyId> {
    bodies: DashMap<AgentKey, (String, B)>,
}

impl<B: BodyId> AgentRegistry<B> {
    pub fn new() -> Self {
        Self {
            bodies: DashMap::new(),
        }
    }

    /// Register a body under `name`. Returns the body previously registered
    /// under the same normalized name.
    pub fn register(&self, name: &str, body: B) -> Option<B> {
        let key = AgentKey::new(name);
        tracing::info!(agent = %key, ?body, "agent registered");
        self.bodies
            .insert(key, (name.trim().to_string(), body))
            .map(|(_, previous)| previous)
    }

    pub fn remove(&self, name: &str) -> Option<B> {
        let key = AgentKey::new(name);
        let removed = self.bodies.remove(&key).map(|(_, (_, body))| body);
        if removed.is_some() {
            tracing::info!(agent = %key, "agent deregistered");
        }
        removed
    }

    pub fn body(&self, name: &str) -> Option<B> {
        self.bodies
            .get(&AgentKey::new(name))
            .map(|entry| entry.value().1)
    }

    /// The name as it was first registered (original casing).
    pub fn display_name(&self, name: &str) -> Option<String> {
        self.bodies
            .get(&AgentKey::new(name))
            .map(|entry| entry.value().0.clone())
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl<B: BodyId> Default for AgentRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Work submitted from outside the simulation thread.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingCommand {
    /// Broadcast chat every agent hears.
    Chat { sender: String, text: String },
    /// A command addressed to one agent; it decides whether to obey.
    Directed {
        sender: String,
        agent: String,
        text: String,
    },
    Follow {
        agent: String,
        target: Option<EntityId>,
    },
    ReleaseFollow { agent: String },
    AuthorizeCombat { agent: String, allowed: bool },
    SetAutonomous { agent: String, enabled: bool },
    Despawn { agent: String },
}

/// Cloneable handle for queuing [`IncomingCommand`]s.
///
/// Every method returns `false` once the orchestrator is gone.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: UnboundedSender<IncomingCommand>,
}

pub fn command_channel() -> (CommandSender, UnboundedReceiver<IncomingCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, rx)
}

impl CommandSender {
    pub fn send(&self, command: IncomingCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn chat(&self, sender: &str, text: &str) -> bool {
        self.send(IncomingCommand::Chat {
            sender: sender.to_string(),
            text: text.to_string(),
        })
    }

    pub fn directed(&self, sender: &str, agent: &str, text: &str) -> bool {
        self.send(IncomingCommand::Directed {
            sender: sender.to_string(),
            agent: agent.to_string(),
            text: text.to_string(),
        })
    }

    pub fn follow(&self, agent: &str, target: Option<EntityId>) -> bool {
        self.send(IncomingCommand::Follow {
            agent: agent.to_string(),
            target,
        })
    }

    pub fn release_follow(&self, agent: &str) -> bool {
        self.send(IncomingCommand::ReleaseFollow {
            agent: agent.to_string(),
        })
    }

    pub fn authorize_combat(&self, agent: &str, allowed: bool) -> bool {
        self.send(IncomingCommand::AuthorizeCombat {
            agent: agent.to_string(),
            allowed,
        })
    }

    pub fn set_autonomous(&self, agent: &str, enabled: bool) -> bool {
        self.send(IncomingCommand::SetAutonomous {
            agent: agent.to_string(),
            enabled,
        })
    }

    pub fn despawn(&self, agent: &str) -> bool {
        self.send(IncomingCommand::Despawn {
            agent: agent.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_and_whitespace_insensitive() {
        let registry = AgentRegistry::<u32>::new();
        assert!(registry.register("  Alex ", 7).is_none());
        assert_eq!(registry.body("alex"), Some(7));
        assert_eq!(registry.body("ALEX"), Some(7));
        assert_eq!(registry.display_name("alex").as_deref(), Some("Alex"));

        assert_eq!(registry.register("alex", 9), Some(7));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_forgets_the_body() {
        let registry = AgentRegistry::<u32>::new();
        registry.register("Steve", 1);
        assert_eq!(registry.remove("steve"), Some(1));
        assert!(registry.is_empty());
        assert_eq!(registry.remove("steve"), None);
    }

    #[test]
    fn sender_reports_closed_channel() {
        let (sender, rx) = command_channel();
        assert!(sender.chat("Player", "hi"));
        drop(rx);
        assert!(!sender.chat("Player", "hi"));
    }
}
