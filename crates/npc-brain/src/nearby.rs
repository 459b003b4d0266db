//! Short-lived per-agent cache of spatial query results.
//!
//! Only bounds the cost of repeated entity scans inside one think window;
//! dropping it at any time is harmless.

use npc_core::{EntityId, EntityInfo, EntityKind, Vec3, WorldView};

/// Extra blocks queried beyond the requested radius so the entry stays
/// usable while the agent walks.
const DRIFT_SLACK: f64 = 8.0;

#[derive(Debug, Clone)]
struct Entry {
    tick: u64,
    center: Vec3,
    radius: f64,
    entities: Vec<EntityInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct NearbyCache {
    ttl_ticks: u64,
    min_radius: f64,
    entry: Option<Entry>,
}

impl NearbyCache {
    /// Every query covers at least `min_radius` blocks.
    pub fn new(ttl_ticks: u64, min_radius: f64) -> Self {
        Self {
            ttl_ticks,
            min_radius,
            entry: None,
        }
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_fresh(&self, tick: u64) -> bool {
        matches!(&self.entry, Some(e) if tick.saturating_sub(e.tick) < self.ttl_ticks)
    }

    /// Entities within `radius` of `center`, nearest first, excluding `this`
    /// (the agent itself). Served from the cached scan while it is fresh and
    /// still covers the requested disc.
    pub fn get_or_query<W: WorldView + ?Sized>(
        &mut self,
        tick: u64,
        world: &W,
        center: Vec3,
        radius: f64,
        this: Option<EntityId>,
    ) -> Vec<EntityInfo> {
        let covered = self.is_fresh(tick)
            && matches!(&self.entry, Some(e) if center.distance(e.center) + radius <= e.radius);
        if !covered {
            let scan = radius.max(self.min_radius) + DRIFT_SLACK;
            self.entry = Some(Entry {
                tick,
                center,
                radius: scan,
                entities: world.entities_near(center, scan),
            });
        }

        let mut found: Vec<(f64, &EntityInfo)> = self
            .entry
            .iter()
            .flat_map(|e| e.entities.iter())
            .filter(|e| Some(e.id) != this)
            .map(|e| (center.distance(e.position), e))
            .filter(|(d, _)| *d <= radius)
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        found.into_iter().map(|(_, e)| e.clone()).collect()
    }
}

/// One-line description of the surroundings for the planning context.
pub fn summarize(entities: &[EntityInfo], center: Vec3, max_listed: usize) -> String {
    if entities.is_empty() {
        return "nobody around".to_string();
    }

    let hostiles = entities
        .iter()
        .filter(|e| e.kind == EntityKind::Hostile)
        .count();
    let mut parts = Vec::new();
    if hostiles > 0 {
        parts.push(format!("{hostiles} hostile"));
    }
    for entity in entities.iter().take(max_listed) {
        let kind = match entity.kind {
            EntityKind::Player => "player",
            EntityKind::Agent => "agent",
            EntityKind::Hostile => "hostile",
            EntityKind::Passive => "animal",
        };
        parts.push(format!(
            "{} {} ({:.0}m)",
            kind,
            entity.name,
            center.distance(entity.position)
        ));
    }
    if entities.len() > max_listed {
        parts.push(format!("+{} more", entities.len() - max_listed));
    }
    parts.join(", ")
}
