//! Night and hostile-threat response: hold if sheltered, else go find a roof.

use npc_core::world::{halt_body, move_body};
use npc_core::{BlockPos, BodySnapshot, EntityKind, WorldMut};
use npc_nav::{find_shelter, is_safe_standing, is_sheltered};

use crate::config::DangerConfig;
use crate::goals::SEEK_SHELTER;
use crate::nearby::NearbyCache;
use crate::state::{BrainState, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DangerStep {
    Clear,
    /// Lock from an earlier threat is still running.
    Locked,
    Holding,
    Seeking { shelter: BlockPos },
    NoShelter,
}

impl DangerStep {
    /// Lower priorities are skipped for every step except `Clear`.
    pub fn preempts(self) -> bool {
        self != DangerStep::Clear
    }
}

pub fn is_threatened<W: WorldMut + ?Sized>(
    tick: u64,
    config: &DangerConfig,
    nearby: &mut NearbyCache,
    snapshot: &BodySnapshot,
    world: &W,
) -> bool {
    world.is_night()
        || nearby
            .get_or_query(
                tick,
                world,
                snapshot.position,
                config.hostile_radius,
                snapshot.entity,
            )
            .iter()
            .any(|e| e.kind == EntityKind::Hostile)
}

fn lock(state: &mut BrainState, tick: u64, ticks: u64) {
    state.goal = Some(SEEK_SHELTER.to_string());
    state.goal_until_tick = tick + ticks;
    state.mode = Mode::Goal;
    state.explore_target = None;
}

/// Per-tick danger handling. `shelter` caches the cell the agent is heading to.
pub fn respond<W: WorldMut + ?Sized>(
    tick: u64,
    name: &str,
    config: &DangerConfig,
    state: &mut BrainState,
    nearby: &mut NearbyCache,
    shelter: &mut Option<BlockPos>,
    snapshot: &BodySnapshot,
    body: W::Body,
    world: &mut W,
) -> DangerStep {
    let shelter_locked =
        state.goal.as_deref() == Some(SEEK_SHELTER) && state.is_goal_locked(tick);

    if !is_threatened(tick, config, nearby, snapshot, &*world) {
        if shelter_locked {
            return DangerStep::Locked;
        }
        *shelter = None;
        return DangerStep::Clear;
    }

    let feet = snapshot.position.block();
    if is_sheltered(&*world, feet, config.shelter.roof_scan) {
        if shelter.is_some() || state.movement.target().is_some() {
            halt_body(world, body);
            state.movement.clear_target();
        }
        *shelter = None;
        lock(state, tick, config.sheltered_hold_ticks);
        state.update_activity(tick, "sheltering");
        return DangerStep::Holding;
    }

    if shelter_locked {
        match *shelter {
            Some(target) if is_safe_standing(&*world, target) => {
                // Keep heading there even after the movement target was lost.
                let center = target.center();
                if state.movement.target() != Some(center)
                    && move_body(world, body, center, config.shelter_speed)
                {
                    state.movement.set_target(center);
                    tracing::debug!(agent = %name, "danger: resuming walk to shelter");
                }
                return DangerStep::Seeking { shelter: target };
            }
            // Search already failed; wait out the short lock before retrying.
            None => return DangerStep::NoShelter,
            Some(_) => {}
        }
    }

    let lock_ticks = world
        .ticks_until_dawn()
        .unwrap_or(config.max_shelter_lock_ticks)
        .min(config.max_shelter_lock_ticks);

    match find_shelter(&*world, feet, config.shelter) {
        Some(target) if move_body(world, body, target.center(), config.shelter_speed) => {
            state.movement.set_target(target.center());
            *shelter = Some(target);
            lock(state, tick, lock_ticks.max(1));
            state.update_activity(tick, "seeking shelter");
            state.record_action(
                tick,
                format!("headed for shelter at {} {} {}", target.x, target.y, target.z),
            );
            tracing::info!(
                agent = %name,
                x = target.x,
                y = target.y,
                z = target.z,
                lock_ticks,
                "danger: seeking shelter"
            );
            DangerStep::Seeking { shelter: target }
        }
        _ => {
            halt_body(world, body);
            state.movement.clear_target();
            *shelter = None;
            lock(state, tick, config.sheltered_hold_ticks);
            state.last_error = Some("no shelter within range".to_string());
            tracing::debug!(agent = %name, "danger: no shelter within range");
            DangerStep::NoShelter
        }
    }
}
