//! Simulation configuration loading and management.

use std::path::Path;

use anyhow::{Context, Result};
use npc_nav::{RecoveryConfig, ShelterSearch};
use serde::{Deserialize, Serialize};

/// Top-level configuration, usually loaded from `npcsim.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulation rate
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Seed for every deterministic RNG stream
    pub seed: u64,

    /// Agents spawned at startup
    pub agents: Vec<String>,

    pub brain: BrainConfig,
    pub executor: ExecutorConfig,
    pub recovery: RecoveryConfig,
    pub danger: DangerConfig,
    pub follow: FollowConfig,
    pub combat: CombatConfig,
    pub nearby: NearbyConfig,
    pub planner: PlannerConfig,
}

fn default_tick_hz() -> u32 {
    20
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            seed: 0x5EED,
            agents: vec!["Alex".to_string(), "Steve".to_string()],
            brain: BrainConfig::default(),
            executor: ExecutorConfig::default(),
            recovery: RecoveryConfig::default(),
            danger: DangerConfig::default(),
            follow: FollowConfig::default(),
            combat: CombatConfig::default(),
            nearby: NearbyConfig::default(),
            planner: PlannerConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load if the file exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

/// Decision-cycle timing and bookkeeping caps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Cooldown applied right after a planning request is issued
    pub think_cooldown_ticks: u64,
    /// Re-check delay while a manual follow directive is active
    pub manual_follow_recheck_ticks: u64,
    pub default_goal_minutes: u64,
    pub min_goal_minutes: u64,
    pub max_goal_minutes: u64,
    pub chat_history_cap: usize,
    pub recent_actions_cap: usize,
    /// Minimum spacing between outgoing chat lines
    pub chat_interval_ticks: u64,
    /// Agents start autonomous when spawned
    pub autonomous_on_spawn: bool,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            think_cooldown_ticks: 100,
            manual_follow_recheck_ticks: 20,
            default_goal_minutes: 5,
            min_goal_minutes: 1,
            max_goal_minutes: 15,
            chat_history_cap: 20,
            recent_actions_cap: 10,
            chat_interval_ticks: 40,
            autonomous_on_spawn: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub wander_radius: f64,
    /// Per-axis clamp for relative `move_to` offsets
    pub move_max_offset: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub default_speed: f64,
    pub explore_min_radius: f64,
    pub explore_max_radius: f64,
    pub explore_attempts: u32,
    pub explore_ttl_ticks: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            wander_radius: 8.0,
            move_max_offset: 24.0,
            min_speed: 0.3,
            max_speed: 1.5,
            default_speed: 1.0,
            explore_min_radius: 16.0,
            explore_max_radius: 32.0,
            explore_attempts: 8,
            explore_ttl_ticks: 1200,
        }
    }
}

impl ExecutorConfig {
    pub fn clamp_speed(&self, speed: Option<f64>) -> f64 {
        let speed = speed
            .filter(|s| s.is_finite())
            .unwrap_or(self.default_speed);
        let (lo, hi) = self.speed_bounds();
        speed.clamp(lo, hi)
    }

    /// Ordered speed bounds. A NaN on one side collapses to the other; NaN
    /// on both falls back to the defaults.
    fn speed_bounds(&self) -> (f64, f64) {
        let lo = self.min_speed.min(self.max_speed);
        let hi = self.max_speed.max(self.min_speed);
        if lo.is_nan() {
            let defaults = Self::default();
            return (defaults.min_speed, defaults.max_speed);
        }
        (lo, hi)
    }

    /// Magnitude of the per-axis offset clamp, never NaN.
    pub fn offset_bound(&self) -> f64 {
        let max = self.move_max_offset.abs();
        if max.is_nan() {
            Self::default().move_max_offset
        } else {
            max
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DangerConfig {
    pub hostile_radius: f64,
    pub shelter: ShelterSearch,
    /// Lock held while already sheltered
    pub sheltered_hold_ticks: u64,
    /// Upper bound for the shelter-seeking lock ("until dawn" is clamped to this)
    pub max_shelter_lock_ticks: u64,
    pub shelter_speed: f64,
}

impl Default for DangerConfig {
    fn default() -> Self {
        Self {
            hostile_radius: 12.0,
            shelter: ShelterSearch::default(),
            sheltered_hold_ticks: 100,
            max_shelter_lock_ticks: 2400,
            shelter_speed: 1.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    pub stop_radius: f64,
    /// Start walking again once farther than this (hysteresis above `stop_radius`)
    pub resume_radius: f64,
    pub sprint_on_radius: f64,
    pub sprint_off_radius: f64,
    pub teleport_radius: f64,
    /// Consecutive far-while-sprinting ticks tolerated before teleporting
    pub teleport_after_ticks: u32,
    pub walk_speed: f64,
    pub sprint_speed: f64,
    /// Search radius for "nearest player" when no target is designated
    pub search_radius: f64,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            stop_radius: 3.0,
            resume_radius: 4.0,
            sprint_on_radius: 10.0,
            sprint_off_radius: 7.0,
            teleport_radius: 32.0,
            teleport_after_ticks: 100,
            walk_speed: 1.0,
            sprint_speed: 1.4,
            search_radius: 64.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// How long an attack by a protected entity justifies fighting back
    pub provoke_window_ticks: u64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            provoke_window_ticks: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearbyConfig {
    pub ttl_ticks: u64,
    pub radius: f64,
    /// Entities listed in the planning context summary
    pub max_listed: usize,
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            ttl_ticks: 40,
            radius: 24.0,
            max_listed: 6,
        }
    }
}

/// Built-in heuristic planner used by the headless driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Artificial latency per request
    pub latency_ms: u64,
    /// Fraction of requests that fail, 0.0..=1.0
    pub failure_rate: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            latency_ms: 150,
            failure_rate: 0.0,
        }
    }
}
