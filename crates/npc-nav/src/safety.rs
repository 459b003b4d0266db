use npc_core::{BlockPos, TerrainView};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A body can stand at `feet` when the cell below is solid footing and the two
/// cells it occupies are clear of solids and fluid.
pub fn is_safe_standing<T: TerrainView + ?Sized>(terrain: &T, feet: BlockPos) -> bool {
    let ground = feet.below();
    let head = feet.above();
    terrain.is_solid(ground)
        && !terrain.is_fluid(ground)
        && !terrain.is_solid(feet)
        && !terrain.is_solid(head)
        && !terrain.is_fluid(feet)
        && !terrain.is_fluid(head)
}

/// Solid geometry at both the feet and head cells.
pub fn is_embedded<T: TerrainView + ?Sized>(terrain: &T, feet: BlockPos) -> bool {
    terrain.is_solid(feet) && terrain.is_solid(feet.above())
}

/// A roof exists within `roof_scan` cells above the head.
pub fn is_sheltered<T: TerrainView + ?Sized>(terrain: &T, feet: BlockPos, roof_scan: u32) -> bool {
    let head = feet.above();
    (1..=roof_scan as i32).any(|dy| terrain.is_solid(head.offset(0, dy, 0)))
}

/// Nearest safe standing cell within a box around `origin`.
///
/// Ties on distance are broken by coordinate order so the same terrain always
/// yields the same answer.
pub fn find_nearest_safe<T: TerrainView + ?Sized>(
    terrain: &T,
    origin: BlockPos,
    horizontal: u32,
    vertical: u32,
) -> Option<BlockPos> {
    nearest_matching(terrain, origin, horizontal, vertical, |t, pos| {
        is_safe_standing(t, pos)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ShelterSearch {
    pub horizontal: u32,
    pub vertical: u32,
    pub roof_scan: u32,
}

impl Default for ShelterSearch {
    fn default() -> Self {
        Self {
            horizontal: 16,
            vertical: 4,
            roof_scan: 6,
        }
    }
}

/// Nearest safe cell that also has a roof overhead.
pub fn find_shelter<T: TerrainView + ?Sized>(
    terrain: &T,
    origin: BlockPos,
    search: ShelterSearch,
) -> Option<BlockPos> {
    nearest_matching(terrain, origin, search.horizontal, search.vertical, |t, pos| {
        is_safe_standing(t, pos) && is_sheltered(t, pos, search.roof_scan)
    })
}

fn nearest_matching<T, F>(
    terrain: &T,
    origin: BlockPos,
    horizontal: u32,
    vertical: u32,
    accept: F,
) -> Option<BlockPos>
where
    T: TerrainView + ?Sized,
    F: Fn(&T, BlockPos) -> bool,
{
    let h = horizontal as i32;
    let v = vertical as i32;
    let mut candidates = Vec::with_capacity(((2 * h + 1) * (2 * h + 1) * (2 * v + 1)) as usize);
    for dx in -h..=h {
        for dy in -v..=v {
            for dz in -h..=h {
                candidates.push(origin.offset(dx, dy, dz));
            }
        }
    }
    candidates.sort_by_key(|pos| (origin.distance_sq(*pos), *pos));
    candidates.into_iter().find(|pos| accept(terrain, *pos))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    struct Slab {
        solid: BTreeSet<BlockPos>,
    }

    impl TerrainView for Slab {
        fn is_solid(&self, pos: BlockPos) -> bool {
            self.solid.contains(&pos)
        }

        fn is_fluid(&self, _pos: BlockPos) -> bool {
            false
        }

        fn surface_y(&self, _x: i32, _z: i32) -> Option<i32> {
            None
        }
    }

    #[test]
    fn nearest_prefers_lexicographic_order_on_ties() {
        let mut solid = BTreeSet::new();
        solid.insert(BlockPos::new(1, -1, 0));
        solid.insert(BlockPos::new(-1, -1, 0));
        let slab = Slab { solid };

        let found = find_nearest_safe(&slab, BlockPos::new(0, 0, 0), 2, 0);
        assert_eq!(found, Some(BlockPos::new(-1, 0, 0)));
    }
}
