//! The authoritative game-state engine: entity/component registry, the fixed
//! per-tick systems pipeline, and the data-only component definitions they
//! share. Exactly one `Registry` backs one room and is driven by that room's
//! game loop.

pub mod components;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod systems;

pub use error::EcsError;
pub use pipeline::{step, PipelineConfig, TickReport};
pub use registry::{mask_of, Registry, Signature, MAX_COMPONENTS};
