//! Junction control: link lookup and the open/limited-control predicates.

use meso_core::{LinkId, SegmentId, SimulationContext, VehicleId};
use meso_net::{Link, Passage, RoadNetwork};
use meso_vehicle::{MesoVehicle, VehicleStore};

use crate::chain::SegmentStore;
use crate::segment::Segment;

impl Segment {
    /// The link `veh` will cross when it leaves this segment, if junction
    /// control applies.
    ///
    /// The lane co-indexed with the vehicle's queue is searched first; the
    /// remaining lanes of the edge serve the single-queue case where the
    /// queue index carries no lane information.
    pub fn link_for(&self, veh: &MesoVehicle, net: &RoadNetwork) -> Option<LinkId> {
        if !self.junction_control {
            return None;
        }
        let next_edge = veh.succ_edge(1)?;
        let lanes = &net.edge(self.edge()).lanes;
        let best_lane = lanes[veh.queue_index()];
        for &link in &net.lane(best_lane).links {
            if net.link(link).dest_edge == next_edge {
                return Some(link);
            }
        }
        for &lane in lanes {
            if lane == best_lane {
                continue;
            }
            for &link in &net.lane(lane).links {
                if net.link(link).dest_edge == next_edge {
                    return Some(link);
                }
            }
        }
        None
    }
}

impl SegmentStore {
    /// Whether `veh` may cross from `seg` onto its next edge right now.
    ///
    /// Open when no link governs the crossing, when the link has priority,
    /// when the limited-control override applies, or when the link's
    /// controller accepts the passage.
    pub fn is_open(
        &self,
        seg: SegmentId,
        veh: VehicleId,
        vehs: &VehicleStore,
        net: &RoadNetwork,
        ctx: &SimulationContext,
    ) -> bool {
        let v = vehs.v(veh);
        match self.get(seg).link_for(v, net) {
            None => true,
            Some(link_id) => {
                let link = net.link(link_id);
                link.priority
                    || self.limited_control_override(link, ctx)
                    || link.opened(&passage_of(v))
            }
        }
    }

    /// With limited junction control, a link whose target segment has ample
    /// room (occupancy under half the jam threshold) behaves as if
    /// uncontrolled.
    pub(crate) fn limited_control_override(&self, link: &Link, ctx: &SimulationContext) -> bool {
        if !ctx.flags.limited_junction_control {
            return false;
        }
        match self.segment_for_edge(link.dest_edge) {
            Some(target) => {
                let target = self.get(target);
                target.occupancy() * 2.0 < target.jam_threshold()
            }
            None => false,
        }
    }
}

/// The crossing request a junction controller gets to inspect.
fn passage_of(v: &MesoVehicle) -> Passage {
    let speed = v.speed();
    Passage {
        arrival_time:    v.event_time(),
        arrival_speed:   speed,
        leave_speed:     speed,
        length_with_gap: v.vtype.length_with_gap(),
        impatience:      v.impatience(),
        max_decel:       v.vtype.max_decel,
        waiting_time:    v.waiting_time(),
    }
}
