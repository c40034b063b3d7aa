//! The `Segment` type: construction, admission, headways and speed queries.
//!
//! # Regimes
//!
//! A segment is **free** while its occupancy is at or below the jam
//! threshold, **jammed** above it.  The flag is recomputed from current
//! occupancy on every read — it is never cached, so a single removal can
//! flip the regime back immediately.  The four headway constants
//! `tau_ff/fj/jf/jj` (each already divided by the lane count at
//! construction) govern the minimum tick gap between successive exits for
//! the four regime combinations of a segment and its predecessor.

use std::collections::HashMap;

use meso_core::{DetectorId, EdgeId, SegmentId, SimulationContext, Tick, VehicleId};
use meso_net::{NetError, NetResult, RoadNetwork};
use meso_vehicle::{MesoVehicle, VehicleStore};

/// Jam-threshold argument meaning "keep the current threshold".
pub const DO_NOT_PATCH_JAM_THRESHOLD: f64 = f64::MAX;

/// Default spacing (length + gap) divisor for the headway capacity: one
/// vehicle per 7.5 m of lane.
const HEADWAY_SPACING: f64 = 7.5;

/// Lower clamp for any speed used as a divisor.
pub(crate) const MIN_SPEED: f64 = 0.05;

// ── SegmentParams ─────────────────────────────────────────────────────────────

/// Constructor inputs for one segment.
///
/// The headways are raw per-edge values; the constructor divides them by the
/// lane count.
#[derive(Clone, Debug)]
pub struct SegmentParams {
    pub edge: EdgeId,
    /// Position of this segment on its edge (0 = upstream end).
    pub index: usize,
    /// The following segment on the same edge, if any.
    pub next: Option<SegmentId>,
    /// Segment length in metres.
    pub length: f64,
    /// Maximum free speed in m/s.
    pub max_speed: f64,
    pub tau_ff: Tick,
    pub tau_fj: Tick,
    pub tau_jf: Tick,
    pub tau_jj: Tick,
    /// Negative: derive from speed.  In [0, 1]: fraction of capacity.
    /// [`DO_NOT_PATCH_JAM_THRESHOLD`]: keep as is.
    pub jam_threshold: f64,
    pub junction_control: bool,
    pub length_geometry_factor: f64,
}

// ── Segment ───────────────────────────────────────────────────────────────────

/// One fixed-length cell of a road edge.
pub struct Segment {
    id: SegmentId,
    edge: EdgeId,
    index: usize,
    next: Option<SegmentId>,

    length: f64,
    length_geometry_factor: f64,
    max_speed: f64,
    lane_count: usize,

    /// Per-lane-aware headways in ticks.
    pub(crate) tau_ff: Tick,
    pub(crate) tau_fj: Tick,
    pub(crate) tau_jf: Tick,
    pub(crate) tau_jj: Tick,

    /// How many default vehicles fit at headway spacing, times lane count.
    headway_capacity: f64,
    /// Length units (metres of vehicle-plus-gap) this segment can hold.
    capacity: f64,
    /// Occupied length units.
    pub(crate) occupancy: f64,
    pub(crate) jam_threshold: f64,

    pub(crate) junction_control: bool,
    /// Earliest tick at which the next regular upstream vehicle may enter.
    pub(crate) entry_block_time: Tick,

    /// Vehicle queues; the element at the back of each `Vec` is the queue
    /// front (leader), index 0 the most recent arrival.
    pub(crate) queues: Vec<Vec<VehicleId>>,
    /// Earliest next exit per queue, co-indexed with `queues`.
    pub(crate) block_times: Vec<Tick>,
    /// Successor edge → queue indices allowed to serve it.
    pub(crate) follower_map: HashMap<EdgeId, Vec<usize>>,

    /// Detectors subscribed to this segment.
    pub(crate) detectors: Vec<DetectorId>,

    mean_speed: f64,
    last_mean_speed_update: Tick,
}

impl Segment {
    /// Build a segment from `params`, deriving queue layout and lane-aware
    /// headways from the parent edge.
    ///
    /// With multi-queue enabled, a multi-lane edge with more than one
    /// successor gets one queue per lane and a follower map from the
    /// topology's lane permissions.  A successor without allowed lanes
    /// violates the topology contract.
    pub fn new(
        id: SegmentId,
        params: SegmentParams,
        net: &RoadNetwork,
        ctx: &SimulationContext,
    ) -> NetResult<Segment> {
        let edge = net.edge(params.edge);
        let lane_count = edge.lane_count();
        let lanes_i64 = lane_count as i64;

        let mut seg = Segment {
            id,
            edge: params.edge,
            index: params.index,
            next: params.next,
            length: params.length,
            length_geometry_factor: params.length_geometry_factor,
            max_speed: params.max_speed,
            lane_count,
            tau_ff: Tick(params.tau_ff.0 / lanes_i64),
            tau_fj: Tick(params.tau_fj.0 / lanes_i64),
            tau_jf: Tick(params.tau_jf.0 / lanes_i64),
            tau_jj: Tick(params.tau_jj.0 / lanes_i64),
            headway_capacity: params.length / HEADWAY_SPACING * lane_count as f64,
            capacity: params.length * lane_count as f64,
            occupancy: 0.0,
            jam_threshold: 0.0,
            junction_control: params.junction_control,
            entry_block_time: Tick::MIN,
            queues: vec![Vec::new()],
            block_times: vec![Tick(-1)],
            follower_map: HashMap::new(),
            detectors: Vec::new(),
            mean_speed: params.max_speed,
            last_mean_speed_update: Tick::MIN,
        };

        if ctx.flags.multi_queue && lane_count > 1 && edge.successors.len() > 1 {
            while seg.queues.len() < lane_count {
                seg.queues.push(Vec::new());
                seg.block_times.push(Tick(-1));
            }
            for &succ in &edge.successors {
                let allowed = net
                    .allowed_lanes(params.edge, succ)
                    .filter(|l| !l.is_empty())
                    .ok_or(NetError::NoAllowedLanes { edge: params.edge, to: succ })?;
                let indices = allowed
                    .iter()
                    .filter_map(|&lane| edge.lane_index(lane))
                    .collect();
                seg.follower_map.insert(succ, indices);
            }
        }

        seg.recompute_jam_threshold(params.jam_threshold, ctx);
        Ok(seg)
    }

    // ── Jam threshold ─────────────────────────────────────────────────────

    pub(crate) fn recompute_jam_threshold(&mut self, jam_thresh: f64, ctx: &SimulationContext) {
        if jam_thresh == DO_NOT_PATCH_JAM_THRESHOLD {
            return;
        }
        if jam_thresh < 0.0 {
            self.jam_threshold = self.jam_threshold_for_speed(self.max_speed, ctx);
        } else {
            self.jam_threshold = jam_thresh * self.capacity;
        }
    }

    /// Occupancy below which vehicles driving at `speed` do not jam: how
    /// many default-sized vehicles could enter at free-flow spacing before
    /// the first one leaves.
    pub fn jam_threshold_for_speed(&self, speed: f64, ctx: &SimulationContext) -> f64 {
        let traversal = self.length / (speed.max(MIN_SPEED) * self.tau_ff.as_secs_f64());
        traversal.ceil() * ctx.default_length_with_gap()
    }

    /// Free regime: occupancy at or below the jam threshold.  Recomputed on
    /// every call.
    #[inline]
    pub fn free(&self) -> bool {
        self.occupancy <= self.jam_threshold
    }

    // ── Admission ─────────────────────────────────────────────────────────

    /// Whether `veh` may enter at `entry_time`.
    ///
    /// `init` marks initial placement (a depart mid-edge): it must not add
    /// jam at the current mean speed.  Regular entries instead respect the
    /// entry block time.  An empty segment accepts unconditionally.
    pub fn has_space_for(
        &mut self,
        veh: &MesoVehicle,
        entry_time: Tick,
        init: bool,
        vehs: &VehicleStore,
        now: Tick,
        ctx: &SimulationContext,
    ) -> bool {
        if self.occupancy == 0.0 {
            // space for at least one vehicle, always
            return true;
        }
        let new_occupancy = self.occupancy + veh.vtype.length_with_gap();
        if new_occupancy > self.capacity {
            return false;
        }
        if init {
            let v = self.mean_speed(vehs, now, false);
            return new_occupancy <= self.jam_threshold_for_speed(v, ctx);
        }
        entry_time >= self.entry_block_time
    }

    // ── Headways ──────────────────────────────────────────────────────────

    /// Minimum tick gap before the next vehicle may enter this segment,
    /// given the regime of the segment it comes from.
    ///
    /// With both segments jammed the gap scales with the queue length: the
    /// hole left by an exit has to travel from the segment entry to its end
    /// before the next vehicle can follow, which is what lets jams clear
    /// and move upstream.
    pub fn time_headway(&self, predecessor_free: bool) -> Tick {
        if predecessor_free {
            if self.free() { self.tau_ff } else { self.tau_fj }
        } else if self.free() {
            self.tau_jf
        } else {
            let b = Tick((self.headway_capacity * (self.tau_jf - self.tau_jj).0 as f64) as i64);
            self.tau_jj * self.car_count() as i64 + b
        }
    }

    /// Earliest tick a vehicle arriving at `earliest_entry` could actually
    /// enter.  Conservative across queues because the caller cannot know
    /// which queue will serve the vehicle.
    pub fn next_insertion_time(&self, earliest_entry: Tick) -> Tick {
        let mut earliest_leave = earliest_entry;
        for &block in &self.block_times {
            earliest_leave = std::cmp::max(earliest_leave, block);
        }
        let traversal = Tick::from_secs_f64(self.length / self.max_speed.max(MIN_SPEED));
        std::cmp::max(
            earliest_entry,
            std::cmp::max(earliest_leave - traversal, self.entry_block_time),
        )
    }

    // ── Speed queries ─────────────────────────────────────────────────────

    /// Mean speed over all queued vehicles, `max_speed` when empty.
    ///
    /// Walks each queue from front to back threading a conservative exit
    /// time through [`MesoVehicle::conservative_speed`] (which pushes it
    /// forward), adding the regime headway per vehicle.  The result is
    /// cached per tick; pass `use_cache = false` to force a recomputation.
    pub fn mean_speed(&mut self, vehs: &VehicleStore, now: Tick, use_cache: bool) -> f64 {
        if now == self.last_mean_speed_update && use_cache {
            return self.mean_speed;
        }
        self.last_mean_speed_update = now;
        let tau = if self.free() { self.tau_ff } else { self.tau_jf };
        let mut total = 0.0;
        let mut count = 0usize;
        for cars in &self.queues {
            let mut earliest_exit = now;
            count += cars.len();
            for &vid in cars.iter().rev() {
                total += vehs.v(vid).conservative_speed(&mut earliest_exit);
                earliest_exit += tau;
            }
        }
        self.mean_speed = if count == 0 { self.max_speed } else { total / count as f64 };
        self.mean_speed
    }

    /// Traffic flow in vehicles per hour.
    pub fn flow(&mut self, vehs: &VehicleStore, now: Tick) -> f64 {
        3600.0 * self.car_count() as f64 * self.mean_speed(vehs, now, true) / self.length
    }

    // ── Event time ────────────────────────────────────────────────────────

    /// Earliest leader event time over all non-empty queues; `None` when the
    /// segment is empty.
    pub fn event_time(&self, vehs: &VehicleStore) -> Option<Tick> {
        self.queues
            .iter()
            .filter_map(|cars| cars.last())
            .map(|&vid| vehs.v(vid).event_time())
            .min()
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    #[inline]
    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    /// Position on the parent edge (0 = upstream end).
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The following segment on the same edge.
    #[inline]
    pub fn next_segment(&self) -> Option<SegmentId> {
        self.next
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Visual length, scaled for curved lanes.
    #[inline]
    pub fn geometry_length(&self) -> f64 {
        self.length * self.length_geometry_factor
    }

    #[inline]
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub(crate) fn set_max_speed(&mut self, speed: f64) {
        self.max_speed = speed;
    }

    #[inline]
    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    #[inline]
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    #[inline]
    pub fn occupancy(&self) -> f64 {
        self.occupancy
    }

    #[inline]
    pub fn jam_threshold(&self) -> f64 {
        self.jam_threshold
    }

    #[inline]
    pub fn entry_block_time(&self) -> Tick {
        self.entry_block_time
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Vehicles in queue `q`, index 0 = most recent arrival, back = leader.
    pub fn queue(&self, q: usize) -> &[VehicleId] {
        &self.queues[q]
    }

    pub fn block_time(&self, q: usize) -> Tick {
        self.block_times[q]
    }

    /// Total number of queued vehicles.
    pub fn car_count(&self) -> usize {
        self.queues.iter().map(Vec::len).sum()
    }

    /// All queued vehicles, queue by queue.
    pub fn vehicles(&self) -> Vec<VehicleId> {
        self.queues.iter().flatten().copied().collect()
    }
}
