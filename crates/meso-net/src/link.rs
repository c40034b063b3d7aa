//! Junction links and their "open?" predicate.
//!
//! A link connects one lane to a lane of a successor edge.  Whether a vehicle
//! may cross is decided outside the engine (traffic lights, gap acceptance on
//! minor roads); the engine only sees the [`OpenRule`] callback plus the
//! static `priority` flag.  Links also track which leader vehicles are
//! currently registered as approaching, so controllers can reason about
//! demand.

use meso_core::{EdgeId, LaneId, Tick, VehicleId};

// ── Passage ───────────────────────────────────────────────────────────────────

/// Everything a junction controller may inspect about one crossing request.
#[derive(Copy, Clone, Debug)]
pub struct Passage {
    /// When the vehicle will reach the junction (its event time).
    pub arrival_time: Tick,
    /// Speed at the junction.
    pub arrival_speed: f64,
    /// Speed after the junction.  Equal to `arrival_speed` at this
    /// abstraction level.
    pub leave_speed: f64,
    /// Vehicle length plus minimum gap, in metres.
    pub length_with_gap: f64,
    /// Driver impatience in [0, 1].
    pub impatience: f64,
    /// Maximum comfortable deceleration, m/s².
    pub max_decel: f64,
    /// How long the vehicle has already been held back.
    pub waiting_time: Tick,
}

/// Controller predicate for non-priority links.
///
/// Implemented by traffic-light programs and gap-acceptance models outside
/// this crate.  A link without a rule is treated as permanently open.
pub trait OpenRule: Send + Sync {
    fn opened(&self, p: &Passage) -> bool;
}

// ── Link ──────────────────────────────────────────────────────────────────────

/// A lane-to-lane junction connection.
pub struct Link {
    /// Lane this link leaves from.
    pub from_lane: LaneId,
    /// Edge the link leads to.
    pub dest_edge: EdgeId,
    /// Lane on `dest_edge` the link leads to.
    pub dest_lane: LaneId,
    /// Major-road flag: a priority link never consults its rule.
    pub priority: bool,

    rule: Option<Box<dyn OpenRule>>,
    approaching: Vec<VehicleId>,
}

impl Link {
    pub(crate) fn new(
        from_lane: LaneId,
        dest_edge: EdgeId,
        dest_lane: LaneId,
        priority: bool,
    ) -> Self {
        Self {
            from_lane,
            dest_edge,
            dest_lane,
            priority,
            rule: None,
            approaching: Vec::new(),
        }
    }

    pub(crate) fn set_rule(&mut self, rule: Box<dyn OpenRule>) {
        self.rule = Some(rule);
    }

    /// Ask the controller whether this crossing may happen now.
    ///
    /// A link without a rule is always open; the `priority` short-circuit is
    /// the caller's job (it applies before the rule is consulted).
    pub fn opened(&self, p: &Passage) -> bool {
        match &self.rule {
            None => true,
            Some(rule) => rule.opened(p),
        }
    }

    // ── Approach registration ─────────────────────────────────────────────

    /// Record `veh` as an approaching leader.  Idempotent.
    pub fn register_approach(&mut self, veh: VehicleId) {
        if !self.approaching.contains(&veh) {
            self.approaching.push(veh);
        }
    }

    /// Drop `veh` from the approaching set.  A no-op if it is not registered.
    pub fn deregister_approach(&mut self, veh: VehicleId) {
        self.approaching.retain(|&v| v != veh);
    }

    /// Leaders currently registered as approaching this link.
    pub fn approaching(&self) -> &[VehicleId] {
        &self.approaching
    }
}
