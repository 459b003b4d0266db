//! Carries out the recovery strategy picked by the stuck detector.

use std::f64::consts::TAU;

use npc_core::world::move_body;
use npc_core::{DeterministicRng, Vec3, WorldMut};
use npc_nav::{find_nearest_safe, is_embedded, RecoveryStrategy};

use crate::state::BrainState;

/// Run one recovery strategy. Returns whether it resolved the stall.
pub fn apply<W, R>(
    tick: u64,
    name: &str,
    strategy: RecoveryStrategy,
    speed: f64,
    state: &mut BrainState,
    position: Vec3,
    body: W::Body,
    world: &mut W,
    rng: &mut R,
) -> bool
where
    W: WorldMut + ?Sized,
    R: DeterministicRng,
{
    let config = *state.movement.config();
    let feet = position.block();
    tracing::info!(agent = %name, ?strategy, failures = state.movement.failures(), "movement recovery");

    let succeeded = match strategy {
        RecoveryStrategy::Repath => {
            let target = state.movement.heading();
            if let Some(nav) = world.navigation(body) {
                nav.stop_navigation(body);
                nav.recompute_path(body);
                if let Some(target) = target {
                    nav.navigate_to(body, target, speed);
                }
            } else if let Some(target) = target {
                move_body(world, body, target, speed);
            }
            false
        }
        RecoveryStrategy::RandomOffset => {
            let angle = rng.next_f64_range(0.0, TAU);
            let radius = f64::from(config.random_offset_radius.max(1));
            let distance = rng.next_f64_range(radius * 0.5, radius);
            let mut detour =
                position + Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance);
            detour.y = position.y;
            // Only follow the surface for a one-block step, never onto a roof.
            if let Some(y) = world
                .surface_y(detour.x.floor() as i32, detour.z.floor() as i32)
                .filter(|y| (f64::from(*y) - position.y).abs() <= 1.0)
            {
                detour.y = f64::from(y);
            }
            if move_body(world, body, detour, speed) {
                state.movement.begin_detour(detour);
            }
            false
        }
        RecoveryStrategy::Unembed => {
            if !is_embedded(&*world, feet) {
                false
            } else {
                match find_nearest_safe(&*world, feet, config.unembed_radius, config.unembed_radius)
                {
                    Some(safe) => {
                        world.teleport(body, safe.center());
                        state.record_action(tick, "climbed out of solid ground");
                        true
                    }
                    None => false,
                }
            }
        }
        RecoveryStrategy::EmergencyTeleport => {
            match find_nearest_safe(
                &*world,
                feet,
                config.emergency_radius,
                config.emergency_radius,
            ) {
                Some(safe) => {
                    world.teleport(body, safe.center());
                    state.record_action(tick, "teleported out of a stuck spot");
                    true
                }
                None => {
                    state.last_error = Some("stuck with no safe position nearby".to_string());
                    false
                }
            }
        }
    };

    state.movement.resolve(strategy, succeeded);
    // Teleports drop the body's path; pick the destination back up.
    if succeeded {
        if let Some(target) = state.movement.target() {
            move_body(world, body, target, speed);
        }
    }
    succeeded
}
