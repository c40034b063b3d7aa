//! Detector attachment and the pre-write projection.
//!
//! A detector subscribes to a segment; the segment wires it onto every
//! vehicle it currently holds and onto every vehicle it receives later.
//! Attach/detach is O(detectors × queue length) but both are small and the
//! operations are rare.

use std::cmp::max;

use meso_core::{DetectorId, Tick, VehicleId};
use meso_detect::DetectorBus;
use meso_vehicle::VehicleStore;

use crate::sched::Destination;
use crate::segment::Segment;

impl Segment {
    /// Subscribe `d` and retroactively attach it to every queued vehicle.
    pub fn add_detector(&mut self, d: DetectorId, vehs: &mut VehicleStore) {
        self.detectors.push(d);
        for cars in &self.queues {
            for &vid in cars.iter().rev() {
                vehs.v_mut(vid).add_reminder(d);
            }
        }
    }

    /// Unsubscribe `d` and detach it from every queued vehicle.
    pub fn remove_detector(&mut self, d: DetectorId, vehs: &mut VehicleStore) {
        self.detectors.retain(|&x| x != d);
        for cars in &self.queues {
            for &vid in cars.iter().rev() {
                vehs.v_mut(vid).remove_reminder(d);
            }
        }
    }

    /// Detectors currently subscribed to this segment.
    pub fn detectors(&self) -> &[DetectorId] {
        &self.detectors
    }

    /// Attach every subscribed detector to a vehicle entering the segment.
    pub(crate) fn add_reminders(&self, veh: VehicleId, vehs: &mut VehicleStore) {
        for &d in &self.detectors {
            vehs.v_mut(veh).add_reminder(d);
        }
    }

    /// Fire leave notifications for `veh` with the reason implied by `next`.
    pub(crate) fn update_detectors_on_leave(
        &self,
        veh: VehicleId,
        t: Tick,
        next: Destination,
        vehs: &VehicleStore,
        bus: &mut DetectorBus,
    ) {
        let reason = self.leave_reason(next);
        vehs.v(veh).update_detectors(bus, t, true, reason);
    }

    /// Feed `d` the exit times vehicles would see if traffic drained in
    /// queue order starting at `now` — one conservative pass per queue,
    /// spaced by the free-flow headway.
    pub fn prepare_detector_for_writing(
        &self,
        d: DetectorId,
        vehs: &VehicleStore,
        bus: &mut DetectorBus,
        now: Tick,
    ) {
        for cars in &self.queues {
            let mut earliest_exit = now;
            for &vid in cars.iter().rev() {
                let exit = max(earliest_exit, vehs.v(vid).event_time());
                vehs.v(vid).update_detector_for_writing(bus, d, now, exit);
                earliest_exit = exit + self.tau_ff;
            }
        }
    }
}
