//! `meso-sim` — the discrete event loop driving the segment engine.
//!
//! The simulation is single-threaded and event-ordered: a priority structure
//! keyed by leader event times decides which segment fires next.  Every
//! segment operation completes synchronously; requests a segment makes
//! *about* other segments (vaporization, arrival removal) are queued on the
//! [`LeaderQueue`] and drained by the loop between dispatches.
//!
//! # Crate layout
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | [`leaders`] | `LeaderQueue` — event queue + pending action buffer   |
//! | [`sim`]     | `MesoLoop` — departs, hops, teleports, vaporization   |
//! | [`error`]   | `SimError`, `SimResult`                               |

pub mod error;
pub mod leaders;
pub mod sim;

#[cfg(test)]
mod tests;

pub use error::{SimError, SimResult};
pub use leaders::LeaderQueue;
pub use sim::{MesoLoop, SimStats};
