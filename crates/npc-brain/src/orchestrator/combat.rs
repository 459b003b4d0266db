//! Non-combat policy: agents never start fights with players or other agents.

use npc_core::{BodySnapshot, WorldMut};

use crate::config::CombatConfig;
use crate::state::BrainState;

/// Clear an attack target that is protected, unauthorized and unprovoked.
/// Returns `true` when a target was dropped.
pub fn enforce<W: WorldMut + ?Sized>(
    tick: u64,
    name: &str,
    config: &CombatConfig,
    state: &mut BrainState,
    snapshot: &BodySnapshot,
    body: W::Body,
    world: &mut W,
) -> bool {
    let Some(target) = snapshot.attack_target else {
        return false;
    };
    if state.combat_authorized {
        return false;
    }
    let Some(info) = world.entity(target) else {
        return false;
    };
    if !info.kind.is_protected() {
        return false;
    }
    let provoked = matches!(
        snapshot.last_attacker,
        Some((attacker, at)) if attacker == target
            && tick.saturating_sub(at) <= config.provoke_window_ticks
    );
    if provoked {
        return false;
    }

    world.clear_attack_target(body);
    state.record_action(tick, format!("stood down from attacking {}", info.name));
    tracing::info!(agent = %name, target = %info.name, "cleared unprovoked attack target");
    true
}
