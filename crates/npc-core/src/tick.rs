use crate::{rng, AgentKey, SplitMix64};

pub const TICKS_PER_SECOND: u64 = 20;
pub const TICKS_PER_MINUTE: u64 = TICKS_PER_SECOND * 60;

/// Per-tick context handed to every agent update.
///
/// `tick` is the world's monotonic tick counter; all deadlines in agent state
/// are expressed against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub tick: u64,
    pub seed: u64,
}

impl TickContext {
    pub fn new(tick: u64, seed: u64) -> Self {
        Self { tick, seed }
    }

    pub fn rng_for_agent(&self, agent: &AgentKey, stream: u64) -> SplitMix64 {
        let seed = rng::derive_seed(self.seed ^ self.tick, agent.stable_id(), stream);
        SplitMix64::new(seed)
    }
}

pub fn minutes_to_ticks(minutes: u64) -> u64 {
    minutes.saturating_mul(TICKS_PER_MINUTE)
}
