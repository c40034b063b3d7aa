//! Queue state save and load.
//!
//! The segment emits one `<segment>` element with one `<vehicles>` child per
//! queue; parsing the surrounding document is the caller's concern, so
//! loading takes the already-decoded values.  Vehicles must be restored into
//! the store (with their timing fields) before their queues are loaded.

use std::fmt::Write as _;

use meso_core::{Tick, VehicleId};
use meso_net::RoadNetwork;
use meso_vehicle::VehicleStore;

use crate::sched::Scheduler;
use crate::segment::Segment;

impl Segment {
    /// Append this segment's queue state to `out`.
    ///
    /// Format, one line per queue:
    ///
    /// ```xml
    /// <segment id="4">
    ///     <vehicles queue="0" time="2260">7 3 1</vehicles>
    /// </segment>
    /// ```
    ///
    /// Vehicle ids are listed in queue order (most recent arrival first, the
    /// leader last).
    pub fn save_state(&self, out: &mut String) {
        let _ = writeln!(out, "<segment id=\"{}\">", self.id().0);
        for (q, cars) in self.queues.iter().enumerate() {
            let _ = write!(
                out,
                "    <vehicles queue=\"{}\" time=\"{}\">",
                q, self.block_times[q].0
            );
            for (i, vid) in cars.iter().enumerate() {
                if i > 0 {
                    let _ = write!(out, " ");
                }
                let _ = write!(out, "{}", vid.0);
            }
            let _ = writeln!(out, "</vehicles>");
        }
        let _ = writeln!(out, "</segment>");
    }

    /// Refill queue `queue_idx` from saved state.
    ///
    /// Vehicles are appended in listed order, so the last id becomes the
    /// queue front and is promoted to leader.  Occupancy is recomputed from
    /// vehicle geometry and capped at capacity; the stored block time is
    /// restored verbatim.
    pub fn load_state(
        &mut self,
        queue_idx: usize,
        veh_ids: &[VehicleId],
        block_time: Tick,
        vehs: &mut VehicleStore,
        net: &RoadNetwork,
        sched: &mut dyn Scheduler,
    ) {
        for &vid in veh_ids {
            {
                let v = vehs.v_mut(vid);
                v.set_segment(self.id(), self.index(), self.length());
                v.set_queue_index(queue_idx);
            }
            self.queues[queue_idx].push(vid);
            self.occupancy += vehs.v(vid).vtype.length_with_gap();
        }
        if let Some(&leader) = self.queues[queue_idx].last() {
            let link = self.link_for(vehs.v(leader), net);
            sched.add_leader(leader, link, vehs.v(leader).event_time());
        }
        self.block_times[queue_idx] = block_time;
        self.occupancy = self.occupancy.min(self.capacity());
    }
}
