use core::fmt;
use core::fmt::Debug;
use core::hash::Hash;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle to an agent's body inside the world collaborator.
///
/// The world owns the body; agents only keep this copyable handle and look
/// the body up again every tick.
pub trait BodyId: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> BodyId for T where T: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

/// Normalized agent name used as the registry key.
///
/// Lookups are case- and whitespace-insensitive: `" Steve  Bot"` and
/// `"steve bot"` resolve to the same agent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgentKey(String);

impl AgentKey {
    pub fn new(name: &str) -> Self {
        let normalized = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stable numeric id derived from the key, used to seed per-agent RNG streams.
    pub fn stable_id(&self) -> u64 {
        // FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in self.0.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(AgentKey::new("  Steve\tBot "), AgentKey::new("steve bot"));
        assert_eq!(AgentKey::new("ALEX").as_str(), "alex");
    }

    #[test]
    fn stable_id_depends_only_on_normalized_name() {
        assert_eq!(
            AgentKey::new("Alex").stable_id(),
            AgentKey::new(" alex ").stable_id()
        );
        assert_ne!(
            AgentKey::new("alex").stable_id(),
            AgentKey::new("steve").stable_id()
        );
    }
}
