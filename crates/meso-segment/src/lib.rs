//! `meso-segment` — the mesoscopic traffic cell and its queue dynamics.
//!
//! A road edge is partitioned into fixed-length [`Segment`]s.  Each segment
//! holds one or more FIFO vehicle queues; a vehicle traverses the segment in
//! a travel time that depends on occupancy and on the state of the segment
//! downstream.  The queue front ("leader") is the only vehicle the event
//! scheduler ever looks at per queue: when its event time fires, the vehicle
//! either hops to the next segment or is postponed, and the next vehicle in
//! line is promoted.
//!
//! # Queue orientation
//!
//! Queues are `Vec<VehicleId>` with the **leader at the back** and the most
//! recent arrival at index 0.  New arrivals are inserted at index 0 (or at
//! index 1 when they overtake their immediate predecessor).  Event times are
//! weakly decreasing from index 0 towards the back, with one deliberate
//! exception: an overtaking vehicle may sit at index 1 with an earlier event
//! time than the vehicle at index 0 — the scheduler, not queue order, is the
//! source of truth for who fires next.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`segment`]  | `Segment`: construction, admission, headways, speeds    |
//! | [`transfer`] | vehicle entry, exit, speed updates, vaporization        |
//! | [`junction`] | link lookup and the open/limited-control predicates     |
//! | [`detect`]   | detector attachment and pre-write projection            |
//! | [`persist`]  | queue state save/load                                   |
//! | [`chain`]    | `SegmentStore`: the per-edge segment chains             |
//! | [`sched`]    | the `Scheduler` contract the event loop implements      |
//! | [`error`]    | `SegmentError`, `SegmentResult`                         |

pub mod chain;
pub mod detect;
pub mod error;
pub mod junction;
pub mod persist;
pub mod sched;
pub mod segment;
pub mod transfer;


pub use chain::SegmentStore;
pub use error::{SegmentError, SegmentResult};
pub use sched::{Destination, Scheduler};
pub use segment::{Segment, SegmentParams, DO_NOT_PATCH_JAM_THRESHOLD};
