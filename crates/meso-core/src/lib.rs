//! `meso-core` — foundational types for the `meso_flow` traffic engine.
//!
//! This crate is a dependency of every other `meso-*` crate.  It intentionally
//! has no `meso-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                                 |
//! |--------------|----------------------------------------------------------|
//! | [`ids`]      | `VehicleId`, `EdgeId`, `LaneId`, `LinkId`, `SegmentId`, `DetectorId` |
//! | [`time`]     | `Tick` — integer simulation time plus second conversions |
//! | [`rng`]      | `SimRng` — the shared, seeded simulation RNG             |
//! | [`config`]   | `MesoConfig`, `MesoFlags`, `SimulationContext`           |
//! | [`error`]    | `CoreError`, `CoreResult`                                |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                      |
//! |---------|-------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids and `Tick`.           |

pub mod config;
pub mod error;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{MesoConfig, MesoFlags, SimulationContext};
pub use error::{CoreError, CoreResult};
pub use ids::{DetectorId, EdgeId, LaneId, LinkId, SegmentId, VehicleId};
pub use rng::SimRng;
pub use time::{Tick, TICKS_PER_SECOND};
