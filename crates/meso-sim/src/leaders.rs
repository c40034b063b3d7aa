//! `LeaderQueue` — the event-time-ordered queue of leader vehicles.
//!
//! # Why a `BTreeMap` of `Vec`s
//!
//! Only queue fronts ("leaders") ever appear here, so the queue holds at
//! most one entry per segment queue.  A `BTreeMap<Tick, Vec<_>>` gives the
//! earliest tick in O(log W) and — crucially — keeps equal-tick entries in
//! insertion order, which is the documented tie-breaking rule of the event
//! model.
//!
//! The queue doubles as the [`Scheduler`] endpoint for segments.  The two
//! "global" requests (`change_segment`, `schedule_removal`) cannot run while
//! a segment call is on the stack, so they land in a pending buffer that
//! [`MesoLoop`][crate::MesoLoop] drains between dispatches.

use std::collections::{BTreeMap, HashMap};

use meso_core::{LinkId, Tick, VehicleId};
use meso_segment::{Destination, Scheduler};

/// A deferred request issued from inside a segment operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pending {
    /// Move a vehicle to `target` (vaporization sentinel or a real segment).
    Hop { veh: VehicleId, t: Tick, target: Destination },
    /// Final removal of an arrived vehicle.
    Removal { veh: VehicleId, t: Tick },
}

#[derive(Default)]
pub struct LeaderQueue {
    queue: BTreeMap<Tick, Vec<(VehicleId, Option<LinkId>)>>,
    /// Registered event time per leader, for O(log W) deregistration.
    index: HashMap<VehicleId, Tick>,
    pending: Vec<Pending>,
}

impl LeaderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The earliest tick with at least one registered leader.
    pub fn next_tick(&self) -> Option<Tick> {
        self.queue.keys().next().copied()
    }

    /// Remove and return every leader registered for exactly `tick`, in
    /// registration order.
    pub(crate) fn drain_at(&mut self, tick: Tick) -> Option<Vec<(VehicleId, Option<LinkId>)>> {
        let batch = self.queue.remove(&tick)?;
        for (veh, _) in &batch {
            self.index.remove(veh);
        }
        Some(batch)
    }

    /// Number of registered leaders.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub(crate) fn take_pending(&mut self) -> Vec<Pending> {
        std::mem::take(&mut self.pending)
    }
}

impl Scheduler for LeaderQueue {
    fn add_leader(&mut self, veh: VehicleId, link: Option<LinkId>, event_time: Tick) {
        debug_assert!(
            !self.index.contains_key(&veh),
            "leader registered twice without removal"
        );
        self.index.insert(veh, event_time);
        self.queue.entry(event_time).or_default().push((veh, link));
    }

    fn remove_leader(&mut self, veh: VehicleId) {
        // Tolerate vehicles that were already drained this tick.
        let Some(tick) = self.index.remove(&veh) else { return };
        if let Some(batch) = self.queue.get_mut(&tick) {
            batch.retain(|&(v, _)| v != veh);
            if batch.is_empty() {
                self.queue.remove(&tick);
            }
        }
    }

    fn change_segment(&mut self, veh: VehicleId, t: Tick, target: Destination) {
        self.pending.push(Pending::Hop { veh, t, target });
    }

    fn schedule_removal(&mut self, veh: VehicleId, t: Tick) {
        self.pending.push(Pending::Removal { veh, t });
    }
}
