//! `meso-net` — read-only road topology for the mesoscopic engine.
//!
//! The engine never edits the network; it only asks three kinds of question:
//!
//! 1. geometry — edge length, speed limit, lane count;
//! 2. routing structure — which edges follow an edge, and which lanes are
//!    allowed to continue onto a given successor;
//! 3. junction plumbing — the links leaving a lane, whether a link has
//!    priority, and whether its controller currently lets a vehicle pass.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`network`] | `RoadNetwork`, `Edge`, `Lane`, `RoadNetworkBuilder`       |
//! | [`link`]    | `Link`, `Passage`, the `OpenRule` controller predicate    |
//! | [`error`]   | `NetError`, `NetResult`                                   |

pub mod error;
pub mod link;
pub mod network;

#[cfg(test)]
mod tests;

pub use error::{NetError, NetResult};
pub use link::{Link, OpenRule, Passage};
pub use network::{Edge, Lane, RoadNetwork, RoadNetworkBuilder};
