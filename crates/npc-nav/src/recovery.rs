//! Movement-stuck detection with a strictly escalating recovery ladder.
//!
//! Position is sampled every `sample_interval_ticks` rather than every tick.
//! When displacement between samples stays under `progress_threshold` for
//! `stall_threshold_ticks`, one rung of the ladder is consumed:
//!
//! 1. [`RecoveryStrategy::Repath`], repeated `repath_attempts` times
//! 2. [`RecoveryStrategy::RandomOffset`], once
//! 3. [`RecoveryStrategy::Unembed`] until the emergency threshold
//! 4. [`RecoveryStrategy::EmergencyTeleport`] after `emergency_after_failures`
//!
//! A stuck episode never steps back down the ladder. It ends on real progress,
//! on a successful intervention, or right after the emergency teleport.
//!
//! The random-offset detour is tracked apart from the destination: reaching
//! the detour yields [`RecoveryStep::Resume`] so the caller heads back.

use npc_core::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RecoveryConfig {
    pub sample_interval_ticks: u64,
    /// Minimum displacement (blocks) between samples that counts as progress.
    pub progress_threshold: f64,
    pub stall_threshold_ticks: u64,
    pub repath_attempts: u32,
    pub random_offset_radius: i32,
    pub unembed_radius: u32,
    pub emergency_radius: u32,
    pub emergency_after_failures: u32,
    /// Within this distance of the target the move counts as finished.
    pub arrival_distance: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            sample_interval_ticks: 20,
            progress_threshold: 0.5,
            stall_threshold_ticks: 60,
            repath_attempts: 2,
            random_offset_radius: 6,
            unembed_radius: 4,
            emergency_radius: 16,
            emergency_after_failures: 5,
            arrival_distance: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RecoveryStrategy {
    /// Stop and force the navigator to plan a fresh path.
    Repath,
    /// Walk to a random point near the current position.
    RandomOffset,
    /// Teleport to the nearest safe cell if the body is inside solid geometry.
    Unembed,
    /// Teleport to any safe cell within the wide emergency radius.
    EmergencyTeleport,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryStep {
    /// No movement target, or between samples.
    Idle,
    Arrived,
    /// The detour was reached; walk to the destination again.
    Resume(Vec3),
    Progressing,
    Stalled { stall_ticks: u64 },
    Recover(RecoveryStrategy),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementRecovery {
    config: RecoveryConfig,
    target: Option<Vec3>,
    detour: Option<Vec3>,
    last_sample: Option<(u64, Vec3)>,
    stall_ticks: u64,
    failures: u32,
    last_strategy: Option<RecoveryStrategy>,
}

impl Default for MovementRecovery {
    fn default() -> Self {
        Self::new(RecoveryConfig::default())
    }
}

impl MovementRecovery {
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            config,
            target: None,
            detour: None,
            last_sample: None,
            stall_ticks: 0,
            failures: 0,
            last_strategy: None,
        }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// The destination, unaffected by any detour in progress.
    pub fn target(&self) -> Option<Vec3> {
        self.target
    }

    pub fn detour(&self) -> Option<Vec3> {
        self.detour
    }

    /// Where the body should be walking right now.
    pub fn heading(&self) -> Option<Vec3> {
        self.detour.or(self.target)
    }

    /// Begin tracking progress toward a new movement target.
    pub fn set_target(&mut self, target: Vec3) {
        self.target = Some(target);
        self.reset();
    }

    /// Move the destination mid-episode (a moving follow target), keeping
    /// the counters and any detour.
    pub fn redirect(&mut self, target: Vec3) {
        self.target = Some(target);
    }

    /// Walk to `point` first; the destination is kept for afterwards.
    pub fn begin_detour(&mut self, point: Vec3) {
        if self.target.is_some() {
            self.detour = Some(point);
        }
    }

    pub fn clear_target(&mut self) {
        self.target = None;
        self.reset();
    }

    /// Consecutive escalations in the current stuck episode.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn stall_ticks(&self) -> u64 {
        self.stall_ticks
    }

    pub fn last_strategy(&self) -> Option<RecoveryStrategy> {
        self.last_strategy
    }

    pub fn is_stuck(&self) -> bool {
        self.failures > 0 || self.stall_ticks > 0
    }

    /// Back to `progressing`: counters cleared, sampling restarts.
    pub fn reset(&mut self) {
        self.detour = None;
        self.last_sample = None;
        self.stall_ticks = 0;
        self.failures = 0;
        self.last_strategy = None;
    }

    pub fn observe(&mut self, tick: u64, position: Vec3) -> RecoveryStep {
        let Some(target) = self.target else {
            self.reset();
            return RecoveryStep::Idle;
        };

        if position.distance(target) <= self.config.arrival_distance {
            self.clear_target();
            return RecoveryStep::Arrived;
        }
        if let Some(detour) = self.detour {
            if position.distance(detour) <= self.config.arrival_distance {
                self.detour = None;
                self.last_sample = None;
                return RecoveryStep::Resume(target);
            }
        }

        let Some((sample_tick, sample_pos)) = self.last_sample else {
            self.last_sample = Some((tick, position));
            return RecoveryStep::Progressing;
        };

        let elapsed = tick.saturating_sub(sample_tick);
        if elapsed < self.config.sample_interval_ticks.max(1) {
            return RecoveryStep::Idle;
        }
        self.last_sample = Some((tick, position));

        if sample_pos.distance(position) >= self.config.progress_threshold {
            self.stall_ticks = 0;
            self.failures = 0;
            self.last_strategy = None;
            return RecoveryStep::Progressing;
        }

        self.stall_ticks = self.stall_ticks.saturating_add(elapsed);
        if self.stall_ticks < self.config.stall_threshold_ticks {
            return RecoveryStep::Stalled {
                stall_ticks: self.stall_ticks,
            };
        }

        self.stall_ticks = 0;
        self.failures = self.failures.saturating_add(1);
        let strategy = self.ladder_rung();
        self.last_strategy = Some(strategy);
        tracing::debug!(
            failures = self.failures,
            ?strategy,
            "movement stalled, escalating recovery"
        );
        RecoveryStep::Recover(strategy)
    }

    /// Report how an issued strategy went.
    ///
    /// A successful intervention or the emergency teleport ends the episode.
    pub fn resolve(&mut self, strategy: RecoveryStrategy, succeeded: bool) {
        if succeeded || strategy == RecoveryStrategy::EmergencyTeleport {
            self.reset();
        }
    }

    fn ladder_rung(&self) -> RecoveryStrategy {
        let c = &self.config;
        let repath = c.repath_attempts.max(1);
        let rung = if self.failures >= c.emergency_after_failures {
            RecoveryStrategy::EmergencyTeleport
        } else if self.failures <= repath {
            RecoveryStrategy::Repath
        } else if self.failures == repath + 1 {
            RecoveryStrategy::RandomOffset
        } else {
            RecoveryStrategy::Unembed
        };

        match self.last_strategy {
            Some(previous) if previous > rung => previous,
            _ => rung,
        }
    }
}
