#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One step of a plan returned by the planning service.
///
/// The set of action types is closed; goal labels stay open strings because
/// planners invent new ones over time. Anything with an unknown `type` decodes
/// to [`Action::Unknown`] and is ignored by the executor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Action {
    SetGoal {
        goal: String,
        #[cfg_attr(feature = "serde", serde(default))]
        minutes: Option<i64>,
        #[cfg_attr(feature = "serde", serde(default))]
        reason: Option<String>,
    },
    Say {
        message: String,
    },
    #[cfg_attr(feature = "serde", serde(alias = "stop"))]
    Idle,
    FollowNearest,
    Wander {
        #[cfg_attr(feature = "serde", serde(default))]
        speed: Option<f64>,
    },
    /// Relative offset from the agent's current position.
    MoveTo {
        #[cfg_attr(feature = "serde", serde(default))]
        x: Option<f64>,
        #[cfg_attr(feature = "serde", serde(default))]
        y: Option<f64>,
        #[cfg_attr(feature = "serde", serde(default))]
        z: Option<f64>,
        #[cfg_attr(feature = "serde", serde(default))]
        speed: Option<f64>,
    },
    Explore,
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetGoal { .. } => "set_goal",
            Action::Say { .. } => "say",
            Action::Idle => "idle",
            Action::FollowNearest => "follow_nearest",
            Action::Wander { .. } => "wander",
            Action::MoveTo { .. } => "move_to",
            Action::Explore => "explore",
            Action::Unknown => "unknown",
        }
    }

    pub fn set_goal(goal: impl Into<String>, minutes: Option<i64>) -> Self {
        Action::SetGoal {
            goal: goal.into(),
            minutes,
            reason: None,
        }
    }

    pub fn say(message: impl Into<String>) -> Self {
        Action::Say {
            message: message.into(),
        }
    }

    pub fn move_to(x: f64, z: f64) -> Self {
        Action::MoveTo {
            x: Some(x),
            y: None,
            z: Some(z),
            speed: None,
        }
    }
}
