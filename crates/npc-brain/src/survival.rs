//! Survival assessment: body snapshot in, structured needs out.

use npc_core::BodySnapshot;
use serde::Serialize;

use crate::goals;

pub const CRITICAL_HEALTH: f32 = 6.0;
pub const HUNGRY_FOOD: f32 = 6.0;
pub const STONE_TARGET: u32 = 16;

const FOOD_ITEMS: &[&str] = &[
    "apple",
    "bread",
    "beef",
    "cooked_beef",
    "porkchop",
    "cooked_porkchop",
    "chicken",
    "cooked_chicken",
    "mutton",
    "cooked_mutton",
    "cod",
    "cooked_cod",
    "salmon",
    "cooked_salmon",
    "carrot",
    "potato",
    "baked_potato",
    "sweet_berries",
];

/// Single most urgent need, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityNeed {
    Recover,
    Food,
    Wood,
    Tools,
    Stone,
    Explore,
}

impl PriorityNeed {
    pub fn label(self) -> &'static str {
        match self {
            PriorityNeed::Recover => "recover health",
            PriorityNeed::Food => "find food",
            PriorityNeed::Wood => "gather wood",
            PriorityNeed::Tools => "craft tools",
            PriorityNeed::Stone => "mine stone",
            PriorityNeed::Explore => "explore",
        }
    }

    /// Goal and duration (minutes) assigned when an agent spawns with this need.
    pub fn initial_goal(self) -> (&'static str, u64) {
        match self {
            PriorityNeed::Recover => (goals::IDLE, 2),
            PriorityNeed::Food => (goals::GATHER_FOOD, 3),
            PriorityNeed::Wood => (goals::GATHER_WOOD, 3),
            PriorityNeed::Tools => (goals::CRAFT_TOOLS, 3),
            PriorityNeed::Stone => (goals::MINE_STONE, 3),
            PriorityNeed::Explore => (goals::EXPLORE, 5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurvivalNeeds {
    pub health: f32,
    pub food: f32,
    pub wood: u32,
    pub stone: u32,
    pub food_items: u32,
    pub has_crafting_table: bool,
    pub has_wooden_pickaxe: bool,
    pub has_stone_pickaxe: bool,
    pub priority: PriorityNeed,
}

impl Default for SurvivalNeeds {
    fn default() -> Self {
        assess(&BodySnapshot {
            health: 20.0,
            food: 20.0,
            ..BodySnapshot::default()
        })
    }
}

impl SurvivalNeeds {
    pub fn summary(&self) -> String {
        format!(
            "health {:.0}/20, food {:.0}/20, wood {}, stone {}, food items {}, crafting table: {}, pickaxe: {}",
            self.health,
            self.food,
            self.wood,
            self.stone,
            self.food_items,
            yes_no(self.has_crafting_table),
            if self.has_stone_pickaxe {
                "stone"
            } else if self.has_wooden_pickaxe {
                "wooden"
            } else {
                "none"
            },
        )
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn assess(body: &BodySnapshot) -> SurvivalNeeds {
    let mut wood = 0;
    let mut stone = 0;
    let mut food_items = 0;
    for (item, count) in &body.inventory {
        let item = item.as_str();
        if item.contains("log") || item.contains("planks") {
            wood += count;
        } else if item == "stone" || item.ends_with("cobblestone") {
            stone += count;
        } else if FOOD_ITEMS.contains(&item) {
            food_items += count;
        }
    }

    let has = |name: &str| body.inventory.get(name).copied().unwrap_or(0) > 0;
    let has_crafting_table = has("crafting_table");
    let has_stone_pickaxe = has("stone_pickaxe") || has("iron_pickaxe") || has("diamond_pickaxe");
    let has_wooden_pickaxe = has_stone_pickaxe || has("wooden_pickaxe");

    let priority = if body.health <= CRITICAL_HEALTH {
        PriorityNeed::Recover
    } else if body.food <= HUNGRY_FOOD && food_items == 0 {
        PriorityNeed::Food
    } else if wood == 0 {
        PriorityNeed::Wood
    } else if !has_crafting_table || !has_wooden_pickaxe {
        PriorityNeed::Tools
    } else if stone < STONE_TARGET {
        PriorityNeed::Stone
    } else {
        PriorityNeed::Explore
    };

    SurvivalNeeds {
        health: body.health,
        food: body.food,
        wood,
        stone,
        food_items,
        has_crafting_table,
        has_wooden_pickaxe,
        has_stone_pickaxe,
        priority,
    }
}
