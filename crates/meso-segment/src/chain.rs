//! The `SegmentStore`: every segment in the network, organised as one chain
//! per edge.
//!
//! Edges are partitioned into `max(1, round(edge_len / target_len))` equal
//! cells at build time.  The store owns the segments and provides the
//! operations that touch more than one of them — sending a vehicle
//! downstream (the headway it pays depends on the *next* segment's regime)
//! and the junction predicates that peek at a link's target segment.

use std::collections::HashMap;

use meso_core::{EdgeId, MesoConfig, SegmentId, SimulationContext, Tick, VehicleId};
use meso_detect::DetectorBus;
use meso_net::{NetResult, RoadNetwork};
use meso_vehicle::{MesoVehicle, VehicleStore};

use crate::sched::{Destination, Scheduler};
use crate::segment::{Segment, SegmentParams};

#[derive(Default)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    /// First (upstream) segment of each built edge.
    edge_heads: HashMap<EdgeId, SegmentId>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ──────────────────────────────────────────────────────

    /// Partition `edge` into segments and return the first one.
    ///
    /// Only the last segment of an edge carries junction control — that is
    /// where the crossing onto the next edge happens; interior hops are
    /// never link-controlled.
    pub fn build_edge(
        &mut self,
        net: &RoadNetwork,
        edge_id: EdgeId,
        cfg: &MesoConfig,
        ctx: &SimulationContext,
    ) -> NetResult<SegmentId> {
        let edge = net.edge(edge_id);
        let count = ((edge.length / cfg.segment_length + 0.5).floor() as usize).max(1);
        let seg_length = edge.length / count as f64;
        let base = self.segments.len();

        for i in 0..count {
            let last = i + 1 == count;
            let params = SegmentParams {
                edge: edge_id,
                index: i,
                next: (!last).then(|| SegmentId((base + i + 1) as u32)),
                length: seg_length,
                max_speed: edge.speed_limit,
                tau_ff: Tick::from_secs_f64(cfg.tau_ff_secs),
                tau_fj: Tick::from_secs_f64(cfg.tau_fj_secs),
                tau_jf: Tick::from_secs_f64(cfg.tau_jf_secs),
                tau_jj: Tick::from_secs_f64(cfg.tau_jj_secs),
                jam_threshold: cfg.jam_threshold,
                junction_control: ctx.flags.junction_control && last,
                length_geometry_factor: edge.length_geometry_factor,
            };
            let seg = Segment::new(SegmentId((base + i) as u32), params, net, ctx)?;
            self.segments.push(seg);
        }

        let head = SegmentId(base as u32);
        self.edge_heads.insert(edge_id, head);
        Ok(head)
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    /// The first segment of `edge`, if the edge was built.
    pub fn segment_for_edge(&self, edge: EdgeId) -> Option<SegmentId> {
        self.edge_heads.get(&edge).copied()
    }

    #[inline]
    pub fn get(&self, id: SegmentId) -> &Segment {
        &self.segments[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segments[id.index()]
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Where `veh` goes when it leaves `seg`: the next segment of the edge,
    /// else the first segment of its next route edge, else nowhere (route
    /// end).
    pub fn next_segment(&self, seg: SegmentId, veh: &MesoVehicle) -> Option<SegmentId> {
        self.get(seg)
            .next_segment()
            .or_else(|| veh.succ_edge(1).and_then(|e| self.segment_for_edge(e)))
    }

    // ── Departure ─────────────────────────────────────────────────────────

    /// Move `veh` out of `seg` towards `next` at `t`.
    ///
    /// Deregisters the vehicle from its junction link, removes it from its
    /// queue, stamps the queue block time (plus the next segment's headway
    /// for real hops, judged on this segment's regime before the removal),
    /// and promotes the vehicle now at the queue front, if any.
    #[allow(clippy::too_many_arguments)]
    pub fn send(
        &mut self,
        seg: SegmentId,
        veh_id: VehicleId,
        next: Destination,
        t: Tick,
        vehs: &mut VehicleStore,
        bus: &mut DetectorBus,
        net: &mut RoadNetwork,
        sched: &mut dyn Scheduler,
    ) {
        let q = vehs.v(veh_id).queue_index();
        debug_assert!(
            !next.is_segment() || t >= self.segments[seg.index()].block_times[q],
            "send fired before the queue block time"
        );

        if let Some(link) = self.segments[seg.index()].link_for(vehs.v(veh_id), net) {
            net.link_mut(link).deregister_approach(veh_id);
        }

        let free_before = self.segments[seg.index()].free();
        let new_front = self.segments[seg.index()].remove_car(veh_id, t, next, vehs, bus);

        let mut block = t;
        if let Destination::Next(next_id) = next {
            block = block + self.segments[next_id.index()].time_headway(free_before);
        }
        self.segments[seg.index()].block_times[q] = block;

        if let Some(leader) = new_front {
            let event = std::cmp::max(vehs.v(leader).event_time(), block);
            vehs.v_mut(leader).set_event_time(event, true);
            let link = self.segments[seg.index()].link_for(vehs.v(leader), net);
            sched.add_leader(leader, link, event);
        }
    }

    // ── Edge-level operations ─────────────────────────────────────────────

    /// Segments of `edge` from upstream to downstream.
    pub fn edge_segments(&self, edge: EdgeId) -> Vec<SegmentId> {
        let mut ids = Vec::new();
        let mut cursor = self.segment_for_edge(edge);
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.get(id).next_segment();
        }
        ids
    }

    /// Apply a new speed limit to every segment of `edge`.
    #[allow(clippy::too_many_arguments)]
    pub fn set_edge_speed(
        &mut self,
        edge: EdgeId,
        new_speed: f64,
        now: Tick,
        jam_thresh: f64,
        vehs: &mut VehicleStore,
        bus: &mut DetectorBus,
        net: &RoadNetwork,
        sched: &mut dyn Scheduler,
        ctx: &SimulationContext,
    ) {
        for id in self.edge_segments(edge) {
            self.segments[id.index()]
                .set_speed(new_speed, now, jam_thresh, vehs, bus, net, sched, ctx);
        }
    }

    /// Vaporize one vehicle somewhere on `edge`.  Returns whether a victim
    /// was found.
    pub fn vaporize_any_car(
        &mut self,
        edge: EdgeId,
        now: Tick,
        sched: &mut dyn Scheduler,
    ) -> bool {
        for id in self.edge_segments(edge) {
            if self.segments[id.index()].vaporize_any_car(now, sched) {
                return true;
            }
        }
        false
    }

    /// Append the queue state of every segment to `out`.
    pub fn save_state(&self, out: &mut String) {
        for seg in &self.segments {
            seg.save_state(out);
        }
    }
}
