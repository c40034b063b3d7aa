//! The outward contract between segments and the event scheduler.
//!
//! Segments never own the event queue; they tell the scheduler which vehicle
//! currently governs each of their queues (the "leader") and the scheduler
//! dispatches segments in order of leader event times.  Leader registration
//! must stay paired: whenever a queue front changes, the segment removes the
//! old leader and adds the new one.
//!
//! `change_segment` and `schedule_removal` may be called from inside segment
//! operations; implementations must queue them for later execution rather
//! than recursing into the segment store (every segment call completes
//! synchronously, see the single-threaded event model).

use meso_core::{LinkId, SegmentId, Tick, VehicleId};

/// Where a vehicle goes when it leaves a segment.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Destination {
    /// The route ends here; the vehicle leaves the simulation.
    Arrived,
    /// Removal via the vaporization sentinel.
    Vaporized,
    /// Emergency relocation of a stuck vehicle.
    Teleported,
    /// A regular hop to another segment.
    Next(SegmentId),
}

impl Destination {
    /// `true` for targets that are real segments.
    #[inline]
    pub fn is_segment(self) -> bool {
        matches!(self, Destination::Next(_))
    }
}

/// Callback interface implemented by the event loop.
pub trait Scheduler {
    /// Register `veh` as the leader of its queue, firing at `event_time`.
    /// `link` is the junction link the vehicle will cross, if any.
    fn add_leader(&mut self, veh: VehicleId, link: Option<LinkId>, event_time: Tick);

    /// Unregister a leader (its queue front changed or it is being removed).
    fn remove_leader(&mut self, veh: VehicleId);

    /// Ask the loop to move `veh` to `target` at `t`.  Queued, not executed
    /// inline.
    fn change_segment(&mut self, veh: VehicleId, t: Tick, target: Destination);

    /// Hand `veh` to vehicle removal (arrival bookkeeping).  Queued.
    fn schedule_removal(&mut self, veh: VehicleId, t: Tick);
}
