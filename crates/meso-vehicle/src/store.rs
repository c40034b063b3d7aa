//! The `VehicleStore` — slot map owning every vehicle in the simulation.
//!
//! Segments and the event loop pass `VehicleId`s around and borrow the
//! actual state from here.  Slots are recycled once a vehicle arrives or is
//! vaporized, so an id is only valid while its vehicle is alive.

use meso_core::VehicleId;

use crate::vehicle::MesoVehicle;

#[derive(Default)]
pub struct VehicleStore {
    slots: Vec<Option<MesoVehicle>>,
    free: Vec<VehicleId>,
    live: usize,
}

impl VehicleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `veh`, assign it a slot and return the id.
    pub fn insert(&mut self, mut veh: MesoVehicle) -> VehicleId {
        match self.free.pop() {
            Some(id) => {
                veh.id = id;
                self.slots[id.index()] = Some(veh);
                self.live += 1;
                id
            }
            None => {
                let id = VehicleId(self.slots.len() as u32);
                veh.id = id;
                self.slots.push(Some(veh));
                self.live += 1;
                id
            }
        }
    }

    /// Remove a vehicle from the simulation, returning its final state.
    pub fn remove(&mut self, id: VehicleId) -> Option<MesoVehicle> {
        let veh = self.slots.get_mut(id.index())?.take();
        if veh.is_some() {
            self.free.push(id);
            self.live -= 1;
        }
        veh
    }

    /// Borrow a vehicle.
    ///
    /// # Panics
    /// Panics if `id` is stale.  The engine only holds ids of live vehicles;
    /// a stale id here is a bookkeeping bug upstream.
    #[inline]
    pub fn v(&self, id: VehicleId) -> &MesoVehicle {
        self.slots[id.index()].as_ref().expect("stale VehicleId")
    }

    /// Borrow a vehicle mutably.  Panics on stale ids, as [`v`](Self::v).
    #[inline]
    pub fn v_mut(&mut self, id: VehicleId) -> &mut MesoVehicle {
        self.slots[id.index()].as_mut().expect("stale VehicleId")
    }

    /// Non-panicking lookup.
    pub fn get(&self, id: VehicleId) -> Option<&MesoVehicle> {
        self.slots.get(id.index())?.as_ref()
    }

    /// Number of live vehicles.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterator over the ids of all live vehicles, ascending.
    pub fn ids(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| VehicleId(i as u32))
    }
}
