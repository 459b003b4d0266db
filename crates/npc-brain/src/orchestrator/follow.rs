//! Smooth follow steering with hysteresis bands.

use npc_core::world::{halt_body, move_body};
use npc_core::{EntityId, EntityInfo, EntityKind, Vec3, WorldMut};
use npc_nav::find_nearest_safe;

use crate::config::FollowConfig;
use crate::nearby::NearbyCache;
use crate::state::BrainState;

/// Search box (blocks) around the target when teleporting next to it.
const TELEPORT_LANDING_RADIUS: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowState {
    pub moving: bool,
    pub sprinting: bool,
    /// Consecutive ticks spent beyond the teleport band while sprinting.
    pub far_ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FollowStep {
    NoTarget,
    Holding { distance: f64 },
    Walking { distance: f64 },
    Sprinting { distance: f64 },
    Teleported,
}

impl FollowState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Designated entity, or the nearest player when none is designated.
///
/// The nearest player is picked from the cached scan; its position is then
/// read fresh.
fn resolve_target<W: WorldMut + ?Sized>(
    tick: u64,
    world: &W,
    config: &FollowConfig,
    nearby: &mut NearbyCache,
    designated: Option<EntityId>,
    position: Vec3,
    this: Option<EntityId>,
) -> Option<EntityInfo> {
    match designated {
        Some(id) => world.entity(id),
        None => {
            let nearest = nearby
                .get_or_query(tick, world, position, config.search_radius, this)
                .into_iter()
                .find(|e| e.kind == EntityKind::Player)?;
            world.entity(nearest.id)
        }
    }
}

/// One tick of follow steering.
pub fn steer<W: WorldMut + ?Sized>(
    tick: u64,
    config: &FollowConfig,
    follow: &mut FollowState,
    state: &mut BrainState,
    nearby: &mut NearbyCache,
    designated: Option<EntityId>,
    body: W::Body,
    world: &mut W,
) -> FollowStep {
    let Some(snapshot) = world.body(body) else {
        return FollowStep::NoTarget;
    };
    let position = snapshot.position;
    let Some(target) = resolve_target(
        tick,
        &*world,
        config,
        nearby,
        designated,
        position,
        snapshot.entity,
    ) else {
        if follow.moving {
            halt_body(world, body);
            state.movement.clear_target();
        }
        follow.reset();
        return FollowStep::NoTarget;
    };

    let distance = position.distance(target.position);

    if follow.sprinting && distance > config.teleport_radius {
        follow.far_ticks = follow.far_ticks.saturating_add(1);
    } else {
        follow.far_ticks = 0;
    }
    if follow.far_ticks >= config.teleport_after_ticks {
        let landing = find_nearest_safe(
            &*world,
            target.position.block(),
            TELEPORT_LANDING_RADIUS,
            TELEPORT_LANDING_RADIUS,
        )
        .map(|pos| pos.center())
        .unwrap_or(target.position);
        world.teleport(body, landing);
        halt_body(world, body);
        state.movement.clear_target();
        state.record_action(tick, format!("caught up with {}", target.name));
        tracing::info!(target = %target.name, distance, "follow teleport");
        follow.reset();
        return FollowStep::Teleported;
    }

    if follow.moving {
        if distance <= config.stop_radius {
            follow.moving = false;
        }
    } else if distance > config.resume_radius {
        follow.moving = true;
    }

    if follow.sprinting {
        if distance < config.sprint_off_radius {
            follow.sprinting = false;
        }
    } else if distance > config.sprint_on_radius {
        follow.sprinting = true;
    }

    if !follow.moving {
        follow.sprinting = false;
        halt_body(world, body);
        state.movement.clear_target();
        return FollowStep::Holding { distance };
    }

    let speed = if follow.sprinting {
        config.sprint_speed
    } else {
        config.walk_speed
    };
    if state.movement.detour().is_some() {
        // Let the recovery detour finish; it resumes toward the new spot.
        state.movement.redirect(target.position);
    } else if move_body(world, body, target.position, speed) {
        if state.movement.target().is_some() {
            state.movement.redirect(target.position);
        } else {
            state.movement.set_target(target.position);
        }
    }

    if follow.sprinting {
        FollowStep::Sprinting { distance }
    } else {
        FollowStep::Walking { distance }
    }
}
