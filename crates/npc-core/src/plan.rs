use crate::Action;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An already-parsed plan: an ordered list of candidate actions plus the
/// planner's optional one-line rationale.
///
/// Only [`ActionPlan::first`] is ever executed. Single-step commitment per
/// decision cycle keeps every applied step observable before the next one is
/// chosen; the remaining steps are dropped on purpose.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActionPlan {
    #[cfg_attr(feature = "serde", serde(default))]
    pub thought: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub actions: Vec<Action>,
}

impl ActionPlan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            thought: None,
            actions,
        }
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    pub fn single(action: Action) -> Self {
        Self::new(vec![action])
    }

    pub fn first(&self) -> Option<&Action> {
        self.actions.first()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
