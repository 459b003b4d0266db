//! Engine-agnostic primitives for tick-driven autonomous agents.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod agent;
pub mod math;
pub mod plan;
pub mod ring;
pub mod rng;
pub mod tick;
pub mod world;

pub use action::Action;
pub use agent::{AgentKey, BodyId};
pub use math::{BlockPos, Vec3};
pub use plan::ActionPlan;
pub use ring::BoundedRing;
pub use rng::{DeterministicRng, SplitMix64};
pub use tick::{minutes_to_ticks, TickContext, TICKS_PER_MINUTE, TICKS_PER_SECOND};
pub use world::{
    BodySnapshot, CanNavigate, CanSetVelocity, EntityId, EntityInfo, EntityKind, TerrainView,
    WorldMut, WorldView,
};
