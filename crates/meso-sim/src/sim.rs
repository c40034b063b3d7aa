//! The `MesoLoop`: departs, hop dispatch, teleports and vaporization.
//!
//! # Dispatch cycle
//!
//! 1. Find the next tick with work: a pending depart or a leader event.
//! 2. Insert departs due at that tick (`initialise`, retried a second later
//!    when the depart segment refuses).
//! 3. Drain the leaders registered for the tick, in registration order.  A
//!    leader either hops to its target segment (`send` + `receive`), is
//!    postponed (target closed or full), or leaves the simulation (route
//!    end).  A postponed vehicle records its first refusal tick; once its
//!    waiting time exceeds the configured maximum it is teleported to the
//!    next edge of its route.
//! 4. Apply the pending actions segments queued along the way
//!    (vaporizations, arrival removals).

use std::cmp::max;
use std::collections::BTreeMap;

use log::{debug, warn};

use meso_core::{EdgeId, MesoConfig, SegmentId, SimulationContext, Tick, VehicleId};
use meso_detect::DetectorBus;
use meso_net::RoadNetwork;
use meso_segment::{Destination, Scheduler, SegmentStore};
use meso_vehicle::{MesoVehicle, VehicleStore};

use crate::error::{SimError, SimResult};
use crate::leaders::{LeaderQueue, Pending};

/// How long after a refused depart the insertion is retried.
const DEPART_RETRY: Tick = Tick(1_000);

/// Counters accumulated over a run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    pub departed: usize,
    pub arrived: usize,
    pub teleported: usize,
    pub vaporized: usize,
}

pub struct MesoLoop {
    pub net: RoadNetwork,
    pub segments: SegmentStore,
    pub vehicles: VehicleStore,
    pub detectors: DetectorBus,
    pub ctx: SimulationContext,
    pub stats: SimStats,

    leaders: LeaderQueue,
    /// Vehicles waiting to depart, keyed by insertion tick.
    departs: BTreeMap<Tick, Vec<VehicleId>>,
    now: Tick,
    max_waiting: Tick,
}

impl MesoLoop {
    /// Validate `cfg`, build segment chains for every edge of `net` and
    /// return an idle loop at tick zero.
    pub fn new(net: RoadNetwork, cfg: MesoConfig) -> SimResult<Self> {
        cfg.validate()?;
        let ctx = cfg.context();
        let mut segments = SegmentStore::new();
        for i in 0..net.edge_count() {
            segments.build_edge(&net, EdgeId(i as u32), &cfg, &ctx)?;
        }
        Ok(Self {
            net,
            segments,
            vehicles: VehicleStore::new(),
            detectors: DetectorBus::new(),
            ctx,
            stats: SimStats::default(),
            leaders: LeaderQueue::new(),
            departs: BTreeMap::new(),
            now: Tick::ZERO,
            max_waiting: Tick::from_secs_f64(cfg.max_waiting_secs),
        })
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Leaders currently registered in the event queue.
    pub fn scheduled_leaders(&self) -> usize {
        self.leaders.len()
    }

    /// Hand `veh` to the loop, to depart no earlier than `t`.
    pub fn schedule_depart(&mut self, veh: MesoVehicle, t: Tick) -> VehicleId {
        let id = self.vehicles.insert(veh);
        self.departs.entry(max(t, self.now)).or_default().push(id);
        id
    }

    /// Process events up to and including `end`.
    pub fn run_until(&mut self, end: Tick) -> SimResult<()> {
        loop {
            let next_depart = self.departs.keys().next().copied();
            let next_event = self.leaders.next_tick();
            let Some(t) = [next_depart, next_event].into_iter().flatten().min() else {
                break;
            };
            if t > end {
                break;
            }
            self.now = t;
            self.process_departs(t)?;
            // Dispatches may register new leaders for the same tick; keep
            // draining until the tick is exhausted.
            while let Some(batch) = self.leaders.drain_at(t) {
                for (veh, _link) in batch {
                    self.check_vehicle(veh, t);
                    self.apply_pending();
                }
            }
            self.apply_pending();
        }
        self.now = end;
        Ok(())
    }

    /// Remove one vehicle from `edge` via the vaporization sentinel.
    pub fn vaporize_any_car(&mut self, edge: EdgeId) -> bool {
        let found = self.segments.vaporize_any_car(edge, self.now, &mut self.leaders);
        self.apply_pending();
        found
    }

    /// Queue state of every segment, for checkpointing.
    pub fn save_state(&self) -> String {
        let mut out = String::new();
        self.segments.save_state(&mut out);
        out
    }

    // ── Departs ───────────────────────────────────────────────────────────

    fn process_departs(&mut self, now: Tick) -> SimResult<()> {
        while let Some((&t, _)) = self.departs.first_key_value() {
            if t > now {
                break;
            }
            let batch = self.departs.remove(&t).expect("key just observed");
            for veh in batch {
                let Some(edge) = self.vehicles.v(veh).current_edge() else {
                    debug!("dropping vehicle {veh} with an empty route");
                    self.vehicles.remove(veh);
                    continue;
                };
                let Some(head) = self.segments.segment_for_edge(edge) else {
                    return Err(SimError::UnknownDepartEdge(edge, veh));
                };
                let placed = self.segments.get_mut(head).initialise(
                    veh,
                    now,
                    &mut self.vehicles,
                    &mut self.detectors,
                    &self.net,
                    &mut self.leaders,
                    &mut self.ctx,
                )?;
                if placed {
                    self.stats.departed += 1;
                } else {
                    debug!("depart of {veh} on {edge} refused, retrying");
                    self.departs.entry(now + DEPART_RETRY).or_default().push(veh);
                }
            }
        }
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    fn check_vehicle(&mut self, veh: VehicleId, now: Tick) {
        let leave = self.vehicles.v(veh).event_time();
        let seg_id = self.vehicles.v(veh).segment();

        let Some(next_id) = self.segments.next_segment(seg_id, self.vehicles.v(veh)) else {
            // Route ends at the downstream end of this edge.
            self.segments.send(
                seg_id,
                veh,
                Destination::Arrived,
                leave,
                &mut self.vehicles,
                &mut self.detectors,
                &mut self.net,
                &mut self.leaders,
            );
            self.vehicles.remove(veh);
            self.stats.arrived += 1;
            return;
        };

        let open = self.segments.is_open(seg_id, veh, &self.vehicles, &self.net, &self.ctx);
        let has_space = self.segments.get_mut(next_id).has_space_for(
            self.vehicles.v(veh),
            leave,
            false,
            &self.vehicles,
            now,
            &self.ctx,
        );

        if open && has_space {
            self.segments.send(
                seg_id,
                veh,
                Destination::Next(next_id),
                leave,
                &mut self.vehicles,
                &mut self.detectors,
                &mut self.net,
                &mut self.leaders,
            );
            self.segments.get_mut(next_id).receive(
                veh,
                leave,
                false,
                false,
                &mut self.vehicles,
                &mut self.detectors,
                &self.net,
                &mut self.leaders,
                &mut self.ctx,
            );
        } else {
            self.postpone(veh, seg_id, next_id, now);
        }
    }

    /// Re-register a refused leader with a later event time, or teleport it
    /// once it has waited too long.
    fn postpone(&mut self, veh: VehicleId, seg_id: SegmentId, next_id: SegmentId, now: Tick) {
        if self.vehicles.v(veh).block_time() == Tick::MAX {
            self.vehicles.v_mut(veh).set_block_time(now);
        }
        let earliest = self.segments.get(next_id).next_insertion_time(now);
        let new_event = max(earliest, now + Tick(1));
        self.vehicles.v_mut(veh).set_event_time(new_event, true);

        if self.vehicles.v(veh).waiting_time() > self.max_waiting {
            self.teleport(veh, seg_id, now);
            return;
        }

        let link = self.segments.get(seg_id).link_for(self.vehicles.v(veh), &self.net);
        if let Some(link) = link {
            self.net.link_mut(link).register_approach(veh);
        }
        self.leaders.add_leader(veh, link, new_event);
    }

    /// Emergency relocation of a stuck vehicle onto the next edge of its
    /// route (or out of the simulation when there is none).
    fn teleport(&mut self, veh: VehicleId, seg_id: SegmentId, now: Tick) {
        warn!("teleporting vehicle {veh} stuck on segment {seg_id}");
        self.segments.send(
            seg_id,
            veh,
            Destination::Teleported,
            now,
            &mut self.vehicles,
            &mut self.detectors,
            &mut self.net,
            &mut self.leaders,
        );
        self.stats.teleported += 1;

        let target = self
            .vehicles
            .v(veh)
            .succ_edge(1)
            .and_then(|e| self.segments.segment_for_edge(e));
        match target {
            Some(target) => {
                self.segments.get_mut(target).receive(
                    veh,
                    now,
                    false,
                    true,
                    &mut self.vehicles,
                    &mut self.detectors,
                    &self.net,
                    &mut self.leaders,
                    &mut self.ctx,
                );
            }
            None => {
                self.vehicles.remove(veh);
            }
        }
    }

    // ── Pending actions ───────────────────────────────────────────────────

    fn apply_pending(&mut self) {
        loop {
            let pending = self.leaders.take_pending();
            if pending.is_empty() {
                return;
            }
            for action in pending {
                match action {
                    Pending::Removal { veh, .. } => {
                        self.vehicles.remove(veh);
                        self.stats.arrived += 1;
                    }
                    Pending::Hop { veh, t, target } => self.apply_hop(veh, t, target),
                }
            }
        }
    }

    fn apply_hop(&mut self, veh: VehicleId, t: Tick, target: Destination) {
        let seg_id = self.vehicles.v(veh).segment();
        self.segments.send(
            seg_id,
            veh,
            target,
            t,
            &mut self.vehicles,
            &mut self.detectors,
            &mut self.net,
            &mut self.leaders,
        );
        match target {
            Destination::Next(next_id) => {
                self.segments.get_mut(next_id).receive(
                    veh,
                    t,
                    false,
                    false,
                    &mut self.vehicles,
                    &mut self.detectors,
                    &self.net,
                    &mut self.leaders,
                    &mut self.ctx,
                );
            }
            Destination::Vaporized => {
                self.vehicles.remove(veh);
                self.stats.vaporized += 1;
            }
            Destination::Arrived | Destination::Teleported => {
                self.vehicles.remove(veh);
            }
        }
    }
}
