//! Vehicle entry and exit: `receive`, `initialise`, queue removal,
//! vaporization and speed-limit updates.
//!
//! The ordering of side effects in [`Segment::receive`] is contractual —
//! detectors, the scheduler and the vehicle itself observe intermediate
//! states, so the sequence must not be rearranged.

use std::cmp::max;

use meso_core::{SimulationContext, Tick, VehicleId};
use meso_detect::{DetectorBus, Notification};
use meso_net::RoadNetwork;
use meso_vehicle::{MesoVehicle, VehicleStore};

use crate::error::{SegmentError, SegmentResult};
use crate::sched::{Destination, Scheduler};
use crate::segment::{Segment, MIN_SPEED};

impl Segment {
    // ── Entry ─────────────────────────────────────────────────────────────

    /// Accept `veh` onto this segment at `t`.
    ///
    /// Departs (`is_depart`) skip the arrival fast-path and do not tighten
    /// the entry block time — a depart can happen anywhere on the edge and
    /// must not block regular flow.  `after_teleport` makes this entry
    /// behave like crossing onto a new edge (the route pointer advances).
    #[allow(clippy::too_many_arguments)]
    pub fn receive(
        &mut self,
        veh_id: VehicleId,
        t: Tick,
        is_depart: bool,
        after_teleport: bool,
        vehs: &mut VehicleStore,
        bus: &mut DetectorBus,
        net: &RoadNetwork,
        sched: &mut dyn Scheduler,
        ctx: &mut SimulationContext,
    ) {
        // Speed on the previous segment, captured before rebinding.
        let prev_speed = if is_depart { -1.0 } else { vehs.v(veh_id).speed() };
        {
            let v = vehs.v_mut(veh_id);
            v.set_segment(self.id(), self.index(), self.length());
            v.set_last_entry_time(t);
            v.set_block_time(Tick::MAX);
        }

        if !is_depart {
            let route_done = {
                let v = vehs.v_mut(veh_id);
                // Entering a new edge advances the route pointer; entering a
                // new segment may cross a mid-edge arrival position.
                ((self.index() == 0 || after_teleport) && v.move_route_pointer())
                    || v.has_arrived()
            };
            if route_done {
                // Event time still gets set so the terminal speed reports
                // correctly.
                let travel = Tick::from_secs_f64(self.length() / prev_speed.max(MIN_SPEED));
                vehs.v_mut(veh_id).set_event_time(t + travel, true);
                self.add_reminders(veh_id, vehs);
                vehs.v(veh_id).activate_reminders(bus, t, Notification::Junction);
                self.update_detectors_on_leave(veh_id, t, Destination::Arrived, vehs, bus);
                sched.schedule_removal(veh_id, t);
                return;
            }
        }

        // Route continues.
        let (uspeed, max_on_edge) = {
            let v = vehs.v(veh_id);
            let max_on_edge = v.speed_factor * self.max_speed();
            (max_on_edge.min(v.vtype.max_speed).max(MIN_SPEED), max_on_edge)
        };

        let q = self.choose_queue(vehs.v(veh_id));

        let stop = vehs.v(veh_id).stop_time(self.id());
        let mut tleave = max(
            t + Tick::from_secs_f64(self.length() / uspeed) + stop,
            self.block_times[q],
        );

        let mut new_leader = None;
        if self.queues[q].is_empty() {
            self.queues[q].push(veh_id);
            new_leader = Some(veh_id);
        } else {
            // Index 0 holds the vehicle this arrival would follow.
            let pred_out = vehs.v(self.queues[q][0]).event_time();
            if !is_depart && pred_out > tleave && self.overtake(ctx) {
                if self.queues[q].len() == 1 {
                    sched.remove_leader(self.queues[q][0]);
                    new_leader = Some(veh_id);
                }
                self.queues[q].insert(1, veh_id);
            } else {
                tleave = max(pred_out + self.tau_ff, tleave);
                self.queues[q].insert(0, veh_id);
            }
        }

        if !is_depart {
            // The -1 interleaves inflow from multiple sources at equal ticks.
            self.entry_block_time = t + self.tau_ff - Tick(1);
        }

        // saturating: a degenerate speed factor would overflow the sum
        let slow = tleave > t.saturating_add(Tick::from_secs_f64(self.length() / max_on_edge));
        {
            let v = vehs.v_mut(veh_id);
            v.set_event_time(tleave, slow);
            v.set_queue_index(q);
        }
        self.occupancy =
            self.capacity().min(self.occupancy + vehs.v(veh_id).vtype.length_with_gap());

        self.add_reminders(veh_id, vehs);
        let reason = if is_depart {
            Notification::Departed
        } else if self.index() == 0 || after_teleport {
            Notification::Junction
        } else {
            Notification::Segment
        };
        vehs.v(veh_id).activate_reminders(bus, t, reason);

        if let Some(leader) = new_leader {
            let link = self.link_for(vehs.v(leader), net);
            sched.add_leader(leader, link, vehs.v(leader).event_time());
        }
    }

    /// Place a departing vehicle.  Returns `Ok(false)` when the segment has
    /// no space — that is not an error, the caller retries later.
    ///
    /// With route checking enabled, a depart whose route the network does
    /// not connect is rejected after insertion (devices may have rerouted it
    /// during entry, so the check cannot happen earlier).
    #[allow(clippy::too_many_arguments)]
    pub fn initialise(
        &mut self,
        veh_id: VehicleId,
        t: Tick,
        vehs: &mut VehicleStore,
        bus: &mut DetectorBus,
        net: &RoadNetwork,
        sched: &mut dyn Scheduler,
        ctx: &mut SimulationContext,
    ) -> SegmentResult<bool> {
        let has_space = self.has_space_for(vehs.v(veh_id), t, true, vehs, t, ctx);
        if !has_space {
            return Ok(false);
        }
        self.receive(veh_id, t, true, false, vehs, bus, net, sched, ctx);
        if ctx.flags.check_routes && !vehs.v(veh_id).has_valid_route(net) {
            return Err(SegmentError::InvalidRoute(veh_id));
        }
        Ok(true)
    }

    /// Pick the queue for a vehicle: the shortest one among those allowed to
    /// reach its next route edge (first listed wins ties), queue 0 otherwise.
    fn choose_queue(&self, veh: &MesoVehicle) -> usize {
        if self.queues.len() <= 1 {
            return 0;
        }
        // succ may be absent when called for a vehicle with an exhausted route
        let Some(succ) = veh.succ_edge(1) else { return 0 };
        let Some(indices) = self.follower_map.get(&succ) else { return 0 };
        let mut best = indices[0];
        for &i in &indices[1..] {
            if self.queues[i].len() < self.queues[best].len() {
                best = i;
            }
        }
        best
    }

    /// Stochastic overtake decision: possible only on multi-lane segments,
    /// and less likely the fuller the segment is.
    fn overtake(&self, ctx: &mut SimulationContext) -> bool {
        ctx.flags.overtaking
            && self.capacity() > self.length()
            && ctx.rng.random::<f64>() > self.occupancy / self.capacity()
    }

    // ── Exit ──────────────────────────────────────────────────────────────

    /// Unlink `veh` from its queue and update occupancy and detectors.
    /// Returns the vehicle now at the queue front, if the front changed.
    pub(crate) fn remove_car(
        &mut self,
        veh_id: VehicleId,
        t: Tick,
        next: Destination,
        vehs: &VehicleStore,
        bus: &mut DetectorBus,
    ) -> Option<VehicleId> {
        self.occupancy = (self.occupancy - vehs.v(veh_id).vtype.length_with_gap()).max(0.0);
        self.update_detectors_on_leave(veh_id, t, next, vehs, bus);

        let q = vehs.v(veh_id).queue_index();
        let cars = &mut self.queues[q];
        debug_assert!(cars.contains(&veh_id), "removing a vehicle that is not queued");
        if cars.last() == Some(&veh_id) {
            cars.pop();
            return cars.last().copied();
        }
        cars.retain(|&v| v != veh_id);
        None
    }

    /// Detector reason for a vehicle leaving towards `next`.
    pub(crate) fn leave_reason(&self, next: Destination) -> Notification {
        match next {
            Destination::Arrived => Notification::Arrived,
            Destination::Vaporized => Notification::Vaporized,
            Destination::Teleported => Notification::Teleport,
            Destination::Next(_) => {
                if self.next_segment().is_none() {
                    Notification::Junction
                } else {
                    Notification::Segment
                }
            }
        }
    }

    /// Remove one vehicle from the segment via the vaporization sentinel.
    ///
    /// The victim is the most recent arrival of the first non-empty queue;
    /// if it is also that queue's leader it is deregistered first.  Returns
    /// whether anything was removed.
    pub fn vaporize_any_car(&mut self, now: Tick, sched: &mut dyn Scheduler) -> bool {
        for cars in &self.queues {
            if let Some(&victim) = cars.first() {
                if cars.len() == 1 {
                    sched.remove_leader(victim);
                }
                sched.change_segment(victim, now, Destination::Vaporized);
                return true;
            }
        }
        false
    }

    // ── Speed-limit updates ───────────────────────────────────────────────

    /// Change the free speed, recompute the jam threshold and reschedule
    /// every queued vehicle.
    ///
    /// Leaders whose event time changes are re-registered with the scheduler
    /// so the event queue reorders; followers only get new event times.
    #[allow(clippy::too_many_arguments)]
    pub fn set_speed(
        &mut self,
        new_speed: f64,
        now: Tick,
        jam_thresh: f64,
        vehs: &mut VehicleStore,
        bus: &mut DetectorBus,
        net: &RoadNetwork,
        sched: &mut dyn Scheduler,
        ctx: &SimulationContext,
    ) {
        if self.max_speed() == new_speed {
            return;
        }
        self.set_max_speed(new_speed);
        self.recompute_jam_threshold(jam_thresh, ctx);
        for q in 0..self.queues.len() {
            if !self.queues[q].is_empty() {
                self.set_speed_for_queue(new_speed, now, q, vehs, bus, net, sched);
            }
        }
    }

    fn set_speed_for_queue(
        &self,
        new_speed: f64,
        now: Tick,
        q: usize,
        vehs: &mut VehicleStore,
        bus: &mut DetectorBus,
        net: &RoadNetwork,
        sched: &mut dyn Scheduler,
    ) {
        let cars = &self.queues[q];
        let leader = *cars.last().expect("set_speed_for_queue on empty queue");

        vehs.v(leader).notify_state_changed(bus, now);
        let mut new_event = max(self.new_arrival(vehs.v(leader), new_speed, now), self.block_times[q]);
        if vehs.v(leader).event_time() != new_event {
            sched.remove_leader(leader);
            vehs.v_mut(leader).set_event_time(new_event, true);
            let link = self.link_for(vehs.v(leader), net);
            sched.add_leader(leader, link, new_event);
        }

        for &vid in cars.iter().rev().skip(1) {
            vehs.v(vid).notify_state_changed(bus, now);
            new_event = max(self.new_arrival(vehs.v(vid), new_speed, now), new_event + self.tau_ff);
            vehs.v_mut(vid).set_event_time(new_event, true);
        }
    }

    /// Projected arrival at the segment end under `new_speed`, from the
    /// position implied by the time driven so far.  Travel time never
    /// rounds to zero.
    fn new_arrival(&self, veh: &MesoVehicle, new_speed: f64, now: Tick) -> Tick {
        // speed is an upper bound, so pos may be optimistic
        let pos = self
            .length()
            .min((now - veh.last_entry_time()).as_secs_f64() * veh.speed());
        let travel = Tick::from_secs_f64((self.length() - pos) / new_speed.max(MIN_SPEED));
        now + max(travel, Tick(1))
    }
}
