//! Goal labels understood by the planning contract.
//!
//! Planners speak in free-form phrases; executed goals are normalized to a
//! canonical task label. Unrecognized labels pass through (normalized only in
//! spacing and case) so new goals work without a code change here.

pub const GATHER_WOOD: &str = "gather_wood";
pub const MINE_STONE: &str = "mine_stone";
pub const GATHER_FOOD: &str = "gather_food";
pub const CRAFT_TOOLS: &str = "craft_tools";
pub const BUILD_SHELTER: &str = "build_shelter";
pub const SEEK_SHELTER: &str = "seek_shelter";
pub const EXPLORE: &str = "explore";
pub const IDLE: &str = "idle";
pub const FOLLOW_PLAYER: &str = "follow_player";

/// The enumerated goal set advertised to planners.
pub const CANONICAL_GOALS: &[&str] = &[
    GATHER_WOOD,
    MINE_STONE,
    GATHER_FOOD,
    CRAFT_TOOLS,
    BUILD_SHELTER,
    EXPLORE,
    IDLE,
    FOLLOW_PLAYER,
];

const SYNONYMS: &[(&str, &str)] = &[
    ("wood", GATHER_WOOD),
    ("get_wood", GATHER_WOOD),
    ("collect_wood", GATHER_WOOD),
    ("chop_wood", GATHER_WOOD),
    ("chop_trees", GATHER_WOOD),
    ("cut_trees", GATHER_WOOD),
    ("gather_logs", GATHER_WOOD),
    ("lumber", GATHER_WOOD),
    ("stone", MINE_STONE),
    ("mine", MINE_STONE),
    ("mining", MINE_STONE),
    ("get_stone", MINE_STONE),
    ("collect_stone", MINE_STONE),
    ("mine_cobblestone", MINE_STONE),
    ("food", GATHER_FOOD),
    ("hunt", GATHER_FOOD),
    ("hunting", GATHER_FOOD),
    ("find_food", GATHER_FOOD),
    ("get_food", GATHER_FOOD),
    ("eat", GATHER_FOOD),
    ("craft", CRAFT_TOOLS),
    ("crafting", CRAFT_TOOLS),
    ("make_tools", CRAFT_TOOLS),
    ("craft_pickaxe", CRAFT_TOOLS),
    ("shelter", BUILD_SHELTER),
    ("build", BUILD_SHELTER),
    ("build_house", BUILD_SHELTER),
    ("make_shelter", BUILD_SHELTER),
    ("hide", SEEK_SHELTER),
    ("find_shelter", SEEK_SHELTER),
    ("explore_area", EXPLORE),
    ("scout", EXPLORE),
    ("roam", EXPLORE),
    ("wander", EXPLORE),
    ("rest", IDLE),
    ("recover", IDLE),
    ("wait", IDLE),
    ("stay", IDLE),
    ("follow", FOLLOW_PLAYER),
    ("follow_me", FOLLOW_PLAYER),
];

/// Lowercase, trim, and join words with underscores.
pub fn normalize_label(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Map a goal phrase to its canonical task label.
pub fn canonical_goal(raw: &str) -> String {
    let normalized = normalize_label(raw);
    if CANONICAL_GOALS.contains(&normalized.as_str()) || normalized == SEEK_SHELTER {
        return normalized;
    }
    SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_map_many_to_one() {
        assert_eq!(canonical_goal("Chop Trees"), GATHER_WOOD);
        assert_eq!(canonical_goal("  wood "), GATHER_WOOD);
        assert_eq!(canonical_goal("gather-wood"), GATHER_WOOD);
        assert_eq!(canonical_goal("hunt"), GATHER_FOOD);
    }

    #[test]
    fn unknown_labels_pass_through() {
        assert_eq!(canonical_goal("Tame A Wolf"), "tame_a_wolf");
    }
}
