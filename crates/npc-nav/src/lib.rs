//! Terrain safety queries and movement-stuck recovery.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod recovery;
pub mod safety;

pub use recovery::{MovementRecovery, RecoveryConfig, RecoveryStep, RecoveryStrategy};
pub use safety::{
    find_nearest_safe, find_shelter, is_embedded, is_safe_standing, is_sheltered, ShelterSearch,
};
