//! `meso-vehicle` — vehicle state and the capability set the segment engine
//! relies on.
//!
//! The engine treats vehicles as borrowed: it reads route position, type
//! geometry and timing fields, and writes event/entry/block times and queue
//! assignment.  Everything else about a vehicle (devices, person plans,
//! emissions) is out of scope and simply absent here.
//!
//! # Crate layout
//!
//! | Module      | Contents                                            |
//! |-------------|-----------------------------------------------------|
//! | [`vtype`]   | `VehicleType` — length, gap, max speed, max decel   |
//! | [`vehicle`] | `MesoVehicle` — per-vehicle simulation state        |
//! | [`store`]   | `VehicleStore` — slot map issuing `VehicleId`s      |

pub mod store;
pub mod vehicle;
pub mod vtype;

#[cfg(test)]
mod tests;

pub use store::VehicleStore;
pub use vehicle::MesoVehicle;
pub use vtype::VehicleType;
