//! Engine configuration and the injected simulation context.
//!
//! # Design
//!
//! Nothing here is process-global.  Everything mutable or stochastic is
//! bundled into [`SimulationContext`] and passed by `&mut` reference, so
//! tests can fabricate deterministic contexts and two engines can coexist
//! in one process.

use crate::error::{CoreError, CoreResult};
use crate::rng::SimRng;

// ── MesoFlags ─────────────────────────────────────────────────────────────────

/// Global behaviour switches, fixed for the lifetime of a run.
#[derive(Copy, Clone, Debug)]
pub struct MesoFlags {
    /// Give segments one queue per lane when the parent edge has more than
    /// one lane and more than one successor edge.
    pub multi_queue: bool,

    /// Consult junction links before letting a vehicle cross to the next edge.
    pub junction_control: bool,

    /// Ignore junction control whenever the target segment has ample room
    /// (occupancy below half its jam threshold).
    pub limited_junction_control: bool,

    /// Allow vehicles to stochastically pass the queue leader on entry.
    pub overtaking: bool,

    /// Reject departing vehicles whose route is not connected in the network.
    pub check_routes: bool,
}

impl Default for MesoFlags {
    fn default() -> Self {
        Self {
            multi_queue:              true,
            junction_control:         true,
            limited_junction_control: false,
            overtaking:               false,
            check_routes:             true,
        }
    }
}

// ── MesoConfig ────────────────────────────────────────────────────────────────

/// Top-level engine configuration.
///
/// Typically filled from a TOML/JSON file by the application crate; the
/// defaults reproduce the classic mesoscopic calibration.
#[derive(Clone, Debug)]
pub struct MesoConfig {
    /// Target segment length in metres.  Edges are split into
    /// `max(1, round(edge_len / segment_length))` equal cells.
    pub segment_length: f64,

    /// Net time headway between successive exits, free → free, in seconds.
    pub tau_ff_secs: f64,
    /// Headway free → jammed, in seconds.
    pub tau_fj_secs: f64,
    /// Headway jammed → free, in seconds.
    pub tau_jf_secs: f64,
    /// Headway jammed → jammed, in seconds.
    pub tau_jj_secs: f64,

    /// Jam threshold parameter: a negative value derives the threshold from
    /// the free-flow speed, a value in [0, 1] is a fraction of capacity.
    pub jam_threshold: f64,

    /// Length of the default vehicle type in metres.
    pub default_veh_length: f64,
    /// Minimum standing gap of the default vehicle type in metres.
    pub default_min_gap: f64,

    /// How long a vehicle may be blocked before the event loop teleports it,
    /// in seconds.
    pub max_waiting_secs: f64,

    /// Behaviour switches.
    pub flags: MesoFlags,

    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,
}

impl Default for MesoConfig {
    fn default() -> Self {
        Self {
            segment_length:     98.0,
            tau_ff_secs:        1.13,
            tau_fj_secs:        1.13,
            tau_jf_secs:        1.73,
            tau_jj_secs:        1.4,
            jam_threshold:      -1.0,
            default_veh_length: 5.0,
            default_min_gap:    2.5,
            max_waiting_secs:   300.0,
            flags:              MesoFlags::default(),
            seed:               42,
        }
    }
}

impl MesoConfig {
    /// Check the numeric parameters for values the engine cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.segment_length <= 0.0 {
            return Err(CoreError::Config("segment_length must be positive".into()));
        }
        for (name, tau) in [
            ("tau_ff", self.tau_ff_secs),
            ("tau_fj", self.tau_fj_secs),
            ("tau_jf", self.tau_jf_secs),
            ("tau_jj", self.tau_jj_secs),
        ] {
            if tau <= 0.0 {
                return Err(CoreError::Config(format!("{name} must be positive")));
            }
        }
        if self.default_veh_length <= 0.0 || self.default_min_gap < 0.0 {
            return Err(CoreError::Config(
                "default vehicle length/gap out of range".into(),
            ));
        }
        if self.jam_threshold > 1.0 {
            return Err(CoreError::Config(
                "jam_threshold is a capacity fraction and must be <= 1".into(),
            ));
        }
        Ok(())
    }

    /// Build the mutable per-run context from this configuration.
    pub fn context(&self) -> SimulationContext {
        SimulationContext {
            flags:              self.flags,
            rng:                SimRng::new(self.seed),
            default_veh_length: self.default_veh_length,
            default_min_gap:    self.default_min_gap,
        }
    }
}

// ── SimulationContext ─────────────────────────────────────────────────────────

/// The injected per-run state the engine needs beyond its own data: behaviour
/// flags, the shared RNG, and the default vehicle spacing used by jam
/// threshold formulas.
pub struct SimulationContext {
    pub flags: MesoFlags,
    pub rng: SimRng,
    pub default_veh_length: f64,
    pub default_min_gap: f64,
}

impl SimulationContext {
    /// Space one default vehicle occupies in a standing queue.
    #[inline]
    pub fn default_length_with_gap(&self) -> f64 {
        self.default_veh_length + self.default_min_gap
    }
}
