//! `meso-detect` — detector fan-out for the mesoscopic engine.
//!
//! Loop detectors, travel-time instruments and similar probes subscribe to a
//! segment; the segment wires them onto every vehicle it holds.  Vehicles
//! then report enter/leave transitions through the [`DetectorBus`].  All
//! callbacks are infallible by contract: a detector that cannot record a
//! sample has to cope on its own, the engine never unwinds through it.
//!
//! The design follows the observer style of the surrounding workspace: a
//! trait with default no-op methods, so implementors only override what they
//! care about.

use meso_core::{DetectorId, Tick, VehicleId};


// ── Notification ──────────────────────────────────────────────────────────────

/// Why a vehicle entered or left the place a detector watches.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Notification {
    /// The vehicle departed into the network here.
    Departed,
    /// The vehicle crossed a junction onto a new edge.
    Junction,
    /// The vehicle moved to the next segment of the same edge.
    Segment,
    /// The vehicle reached its destination.
    Arrived,
    /// The vehicle was removed via the vaporization sentinel.
    Vaporized,
    /// The vehicle was teleported away after being stuck.
    Teleport,
}

// ── Detector ──────────────────────────────────────────────────────────────────

/// A probe attached to a segment.
///
/// All methods default to no-ops.
pub trait Detector {
    /// `veh` entered the watched segment at `t`.
    fn vehicle_entered(&mut self, _veh: VehicleId, _t: Tick, _reason: Notification) {}

    /// `veh` left the watched segment at `t`.
    fn vehicle_left(&mut self, _veh: VehicleId, _t: Tick, _reason: Notification) {}

    /// The segment speed changed; `veh` got a new event time at `t`.
    fn vehicle_state_changed(&mut self, _veh: VehicleId, _t: Tick) {}

    /// Pre-write hook: `veh` would exit at `exit_time` if traffic drained in
    /// queue order starting now.
    fn record_exit(&mut self, _veh: VehicleId, _now: Tick, _exit_time: Tick) {}
}

// ── DetectorBus ───────────────────────────────────────────────────────────────

/// Owns every detector in the simulation, keyed by [`DetectorId`].
///
/// Slots are reused after removal, so a `DetectorId` is only valid until its
/// detector is removed.  Segments and vehicles store ids, never boxes — that
/// keeps attach/detach a plain list edit on their side.
#[derive(Default)]
pub struct DetectorBus {
    slots: Vec<Option<Box<dyn Detector>>>,
    free: Vec<DetectorId>,
}

impl DetectorBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a detector and return its id.
    pub fn insert(&mut self, det: Box<dyn Detector>) -> DetectorId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(det);
                id
            }
            None => {
                let id = DetectorId(self.slots.len() as u32);
                self.slots.push(Some(det));
                id
            }
        }
    }

    /// Unregister and return a detector.  `None` if the slot is already free.
    pub fn remove(&mut self, id: DetectorId) -> Option<Box<dyn Detector>> {
        let det = self.slots.get_mut(id.index())?.take();
        if det.is_some() {
            self.free.push(id);
        }
        det
    }

    /// Borrow one detector mutably.  `None` for freed slots.
    #[inline]
    pub fn get_mut(&mut self, id: DetectorId) -> Option<&mut dyn Detector> {
        self.slots
            .get_mut(id.index())?
            .as_mut()
            .map(|b| b.as_mut() as &mut dyn Detector)
    }

    /// Number of live detectors.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
