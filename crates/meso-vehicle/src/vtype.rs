//! Vehicle type geometry and dynamics bounds.

/// The slice of a vehicle type the queue model needs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VehicleType {
    /// Body length in metres.
    pub length: f64,
    /// Minimum standing gap to the predecessor in metres.
    pub min_gap: f64,
    /// Technical maximum speed in m/s.
    pub max_speed: f64,
    /// Maximum comfortable deceleration in m/s², consulted by junction
    /// controllers when judging whether a crossing is safe.
    pub max_decel: f64,
}

impl VehicleType {
    /// Space this type occupies in a standing queue.
    #[inline]
    pub fn length_with_gap(&self) -> f64 {
        self.length + self.min_gap
    }
}

impl Default for VehicleType {
    /// A generic passenger car.
    fn default() -> Self {
        Self {
            length:    5.0,
            min_gap:   2.5,
            max_speed: 55.56,
            max_decel: 4.5,
        }
    }
}
