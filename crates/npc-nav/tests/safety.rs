use std::collections::BTreeSet;

use npc_core::{BlockPos, TerrainView};
use npc_nav::{find_nearest_safe, find_shelter, is_embedded, is_safe_standing, ShelterSearch};

#[derive(Default)]
struct TestTerrain {
    solid: BTreeSet<BlockPos>,
    fluid: BTreeSet<BlockPos>,
}

impl TestTerrain {
    fn floor(size: i32, y: i32) -> Self {
        let mut terrain = Self::default();
        for x in -size..=size {
            for z in -size..=size {
                terrain.solid.insert(BlockPos::new(x, y, z));
            }
        }
        terrain
    }
}

impl TerrainView for TestTerrain {
    fn is_solid(&self, pos: BlockPos) -> bool {
        self.solid.contains(&pos)
    }

    fn is_fluid(&self, pos: BlockPos) -> bool {
        self.fluid.contains(&pos)
    }

    fn surface_y(&self, x: i32, z: i32) -> Option<i32> {
        self.solid
            .iter()
            .filter(|p| p.x == x && p.z == z)
            .map(|p| p.y + 1)
            .max()
    }
}

#[test]
fn safe_standing_requires_footing_and_two_clear_cells() {
    let mut terrain = TestTerrain::floor(4, 63);
    let feet = BlockPos::new(0, 64, 0);
    assert!(is_safe_standing(&terrain, feet));

    terrain.solid.insert(feet.above());
    assert!(!is_safe_standing(&terrain, feet));
    terrain.solid.remove(&feet.above());

    terrain.fluid.insert(feet);
    assert!(!is_safe_standing(&terrain, feet));
    terrain.fluid.clear();

    assert!(!is_safe_standing(&terrain, BlockPos::new(0, 65, 0)));
}

#[test]
fn embedded_body_finds_nearest_safe_cell() {
    let mut terrain = TestTerrain::floor(6, 63);
    let feet = BlockPos::new(0, 64, 0);
    // Bury the body in a 3x3 pillar two cells tall.
    for x in -1..=1 {
        for z in -1..=1 {
            terrain.solid.insert(BlockPos::new(x, 64, z));
            terrain.solid.insert(BlockPos::new(x, 65, z));
        }
    }
    assert!(is_embedded(&terrain, feet));

    let safe = find_nearest_safe(&terrain, feet, 4, 2).expect("safe cell nearby");
    assert!(is_safe_standing(&terrain, safe));
    assert_eq!(safe.distance_sq(feet), 4);
}

#[test]
fn shelter_search_requires_a_roof() {
    let mut terrain = TestTerrain::floor(10, 63);
    let origin = BlockPos::new(0, 64, 0);
    assert_eq!(find_shelter(&terrain, origin, ShelterSearch::default()), None);

    let roofed = BlockPos::new(5, 64, 2);
    terrain.solid.insert(roofed.offset(0, 4, 0));
    let found = find_shelter(&terrain, origin, ShelterSearch::default());
    assert_eq!(found, Some(roofed));
}
