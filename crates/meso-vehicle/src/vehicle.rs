//! Per-vehicle simulation state.
//!
//! # Timing fields
//!
//! Three ticks describe a vehicle's life on its current segment:
//!
//! - `last_entry_time` — when it entered the segment;
//! - `event_time` — when it wants to leave (the scheduler sorts by this);
//! - `block_time` — `Tick::MAX` while unhindered, otherwise the tick at
//!   which the vehicle was first refused its hop.  Waiting time and driver
//!   impatience derive from the distance between event and block time.
//!
//! The vehicle also caches the length of its current segment so speed
//! queries need no back-reference into the segment store.

use std::collections::HashMap;

use meso_core::{DetectorId, EdgeId, SegmentId, Tick, VehicleId};
use meso_detect::{DetectorBus, Notification};
use meso_net::RoadNetwork;

use crate::vtype::VehicleType;

/// Waiting time after which impatience saturates at 1.
const TIME_TO_MAX_IMPATIENCE_SECS: f64 = 300.0;

/// One vehicle at the queue-of-cells abstraction level.
pub struct MesoVehicle {
    /// Store slot, set on insertion.
    pub(crate) id: VehicleId,

    /// Type geometry and bounds.
    pub vtype: VehicleType,

    /// Driver-specific scaling of edge speed limits.
    pub speed_factor: f64,

    /// Edges to traverse, in order.
    route: Vec<EdgeId>,
    /// Index of the edge currently being traversed.
    route_pos: usize,
    /// On the final edge, the segment index at which the trip ends.
    /// `usize::MAX` means "end of the edge" (the common case).
    arrival_seg_index: usize,

    // ── Current-segment state ─────────────────────────────────────────────
    segment: SegmentId,
    /// Position index of `segment` on its edge.
    seg_index: usize,
    /// Length of `segment`, cached for speed queries.
    seg_length: f64,
    /// Queue the vehicle was appended to.
    queue_index: usize,

    event_time: Tick,
    last_entry_time: Tick,
    block_time: Tick,
    /// Whether the last event time was later than free-flow traversal.
    slowed_down: bool,

    /// Planned dwell per segment (bus stops, deliveries).
    stops: HashMap<SegmentId, Tick>,

    /// Detectors this vehicle currently reports to.
    reminders: Vec<DetectorId>,
}

impl MesoVehicle {
    /// A vehicle of `vtype` that will follow `route`.
    pub fn new(vtype: VehicleType, route: Vec<EdgeId>, speed_factor: f64) -> Self {
        Self {
            id: VehicleId::INVALID,
            vtype,
            speed_factor,
            route,
            route_pos: 0,
            arrival_seg_index: usize::MAX,
            segment: SegmentId::INVALID,
            seg_index: 0,
            seg_length: 0.0,
            queue_index: 0,
            event_time: Tick::ZERO,
            last_entry_time: Tick::ZERO,
            block_time: Tick::MAX,
            slowed_down: false,
            stops: HashMap::new(),
            reminders: Vec::new(),
        }
    }

    /// Plan a dwell of `duration` on `segment`.
    pub fn add_stop(&mut self, segment: SegmentId, duration: Tick) {
        *self.stops.entry(segment).or_insert(Tick::ZERO) += duration;
    }

    /// End the trip at segment `index` of the final route edge instead of at
    /// the edge end.
    pub fn set_arrival_segment(&mut self, index: usize) {
        self.arrival_seg_index = index;
    }

    #[inline]
    pub fn id(&self) -> VehicleId {
        self.id
    }

    // ── Route queries ─────────────────────────────────────────────────────

    /// The edge currently being traversed.
    pub fn current_edge(&self) -> Option<EdgeId> {
        self.route.get(self.route_pos).copied()
    }

    /// The `k`-th edge ahead on the route (`k = 1` is the next edge).
    pub fn succ_edge(&self, k: usize) -> Option<EdgeId> {
        self.route.get(self.route_pos + k).copied()
    }

    /// Advance the route pointer onto the edge just entered.
    ///
    /// Returns `true` if the pointer was already on the final edge (possible
    /// after a teleport) or if advancing crossed the arrival point.
    pub fn move_route_pointer(&mut self) -> bool {
        if self.route_pos + 1 >= self.route.len() {
            return true;
        }
        self.route_pos += 1;
        self.has_arrived()
    }

    /// `true` once the vehicle is on its final edge at or past the arrival
    /// segment.
    pub fn has_arrived(&self) -> bool {
        self.route_pos + 1 == self.route.len() && self.seg_index >= self.arrival_seg_index
    }

    /// Whether every consecutive pair of route edges is connected in `net`.
    pub fn has_valid_route(&self, net: &RoadNetwork) -> bool {
        self.route[self.route_pos..]
            .windows(2)
            .all(|w| net.connected(w[0], w[1]))
    }

    // ── Segment binding ───────────────────────────────────────────────────

    /// Bind the vehicle to a segment (its id, on-edge index and length).
    pub fn set_segment(&mut self, segment: SegmentId, seg_index: usize, seg_length: f64) {
        self.segment = segment;
        self.seg_index = seg_index;
        self.seg_length = seg_length;
    }

    #[inline]
    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    #[inline]
    pub fn queue_index(&self) -> usize {
        self.queue_index
    }

    pub fn set_queue_index(&mut self, q: usize) {
        self.queue_index = q;
    }

    /// Dwell planned on `segment`, zero when none.
    pub fn stop_time(&self, segment: SegmentId) -> Tick {
        self.stops.get(&segment).copied().unwrap_or(Tick::ZERO)
    }

    // ── Timing ────────────────────────────────────────────────────────────

    #[inline]
    pub fn event_time(&self) -> Tick {
        self.event_time
    }

    /// Set the event time; `delayed` records that the vehicle is slower than
    /// free flow on this segment.
    pub fn set_event_time(&mut self, t: Tick, delayed: bool) {
        self.event_time = t;
        self.slowed_down = delayed;
    }

    #[inline]
    pub fn slowed_down(&self) -> bool {
        self.slowed_down
    }

    #[inline]
    pub fn last_entry_time(&self) -> Tick {
        self.last_entry_time
    }

    pub fn set_last_entry_time(&mut self, t: Tick) {
        self.last_entry_time = t;
    }

    #[inline]
    pub fn block_time(&self) -> Tick {
        self.block_time
    }

    /// Record when the vehicle was (first) refused its hop.
    pub fn set_block_time(&mut self, t: Tick) {
        self.block_time = t;
    }

    /// How long the vehicle has been held past its first refusal.
    pub fn waiting_time(&self) -> Tick {
        if self.block_time == Tick::MAX {
            Tick::ZERO
        } else {
            std::cmp::max(Tick::ZERO, self.event_time - self.block_time)
        }
    }

    /// Driver impatience in [0, 1], growing linearly with waiting time.
    pub fn impatience(&self) -> f64 {
        (self.waiting_time().as_secs_f64() / TIME_TO_MAX_IMPATIENCE_SECS).clamp(0.0, 1.0)
    }

    // ── Speeds ────────────────────────────────────────────────────────────

    /// Average speed over the current segment implied by the event time.
    pub fn average_speed(&self) -> f64 {
        let travel = (self.event_time - self.last_entry_time).as_secs_f64();
        if travel <= 0.0 {
            return 0.0;
        }
        self.seg_length / travel
    }

    /// Speed for reporting: zero while waiting, else the average speed.
    pub fn speed(&self) -> f64 {
        if self.waiting_time() > Tick::ZERO {
            0.0
        } else {
            self.average_speed()
        }
    }

    /// Speed under the constraint that the vehicle cannot exit before
    /// `earliest_exit`.  Pushes `earliest_exit` to at least this vehicle's
    /// event time — callers thread the value through a whole queue.
    pub fn conservative_speed(&self, earliest_exit: &mut Tick) -> f64 {
        *earliest_exit = std::cmp::max(*earliest_exit, self.event_time);
        let travel = std::cmp::max(Tick(1), *earliest_exit - self.last_entry_time);
        self.seg_length / travel.as_secs_f64()
    }

    // ── Detector plumbing ─────────────────────────────────────────────────

    /// Start reporting to `d`.  Idempotent.
    pub fn add_reminder(&mut self, d: DetectorId) {
        if !self.reminders.contains(&d) {
            self.reminders.push(d);
        }
    }

    pub fn remove_reminder(&mut self, d: DetectorId) {
        self.reminders.retain(|&r| r != d);
    }

    pub fn reminders(&self) -> &[DetectorId] {
        &self.reminders
    }

    /// Fire enter notifications on every subscribed detector.
    pub fn activate_reminders(&self, bus: &mut DetectorBus, t: Tick, reason: Notification) {
        for &d in &self.reminders {
            if let Some(det) = bus.get_mut(d) {
                det.vehicle_entered(self.id, t, reason);
            }
        }
    }

    /// Fire enter or leave notifications, as the engine's state transitions
    /// demand.
    pub fn update_detectors(
        &self,
        bus: &mut DetectorBus,
        t: Tick,
        leaving: bool,
        reason: Notification,
    ) {
        for &d in &self.reminders {
            if let Some(det) = bus.get_mut(d) {
                if leaving {
                    det.vehicle_left(self.id, t, reason);
                } else {
                    det.vehicle_entered(self.id, t, reason);
                }
            }
        }
    }

    /// Fire the state-change hook (speed limit changed under the vehicle).
    pub fn notify_state_changed(&self, bus: &mut DetectorBus, t: Tick) {
        for &d in &self.reminders {
            if let Some(det) = bus.get_mut(d) {
                det.vehicle_state_changed(self.id, t);
            }
        }
    }

    /// Feed one detector the projected exit time for an output snapshot.
    pub fn update_detector_for_writing(
        &self,
        bus: &mut DetectorBus,
        d: DetectorId,
        now: Tick,
        exit_time: Tick,
    ) {
        if let Some(det) = bus.get_mut(d) {
            det.record_exit(self.id, now, exit_time);
        }
    }
}
