//! Unit tests for meso-net.

use meso_core::{Tick, VehicleId};

use crate::{NetError, Passage, RoadNetworkBuilder};

fn passage() -> Passage {
    Passage {
        arrival_time:    Tick(1_000),
        arrival_speed:   13.9,
        leave_speed:     13.9,
        length_with_gap: 7.5,
        impatience:      0.0,
        max_decel:       4.5,
        waiting_time:    Tick::ZERO,
    }
}

#[cfg(test)]
mod builder {
    use super::*;

    #[test]
    fn edges_get_lanes() {
        let mut b = RoadNetworkBuilder::new();
        let e = b.add_edge(100.0, 13.9, 3);
        let net = b.build().unwrap();
        assert_eq!(net.edge(e).lane_count(), 3);
        let first = net.edge(e).lanes[0];
        assert_eq!(net.lane(first).edge, e);
    }

    #[test]
    fn zero_lane_request_still_builds_one() {
        let mut b = RoadNetworkBuilder::new();
        let e = b.add_edge(100.0, 13.9, 0);
        let net = b.build().unwrap();
        assert_eq!(net.edge(e).lane_count(), 1);
    }

    #[test]
    fn connect_is_idempotent() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_edge(100.0, 13.9, 1);
        let c = b.add_edge(100.0, 13.9, 1);
        b.connect(a, c);
        b.connect(a, c);
        let net = b.build().unwrap();
        assert_eq!(net.edge(a).successors, vec![c]);
    }

    #[test]
    fn add_link_registers_successor() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_edge(100.0, 13.9, 1);
        let c = b.add_edge(100.0, 13.9, 1);
        let from = meso_core::LaneId(0); // sole lane of a
        let dest = meso_core::LaneId(1); // sole lane of c
        b.add_link(from, dest, true).unwrap();
        let net = b.build().unwrap();
        assert!(net.connected(a, c));
        let link = net.link(meso_core::LinkId(0));
        assert!(link.priority);
        assert_eq!(link.dest_edge, c);
    }
}

#[cfg(test)]
mod allowed_lanes {
    use super::*;

    #[test]
    fn defaults_to_all_lanes() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_edge(100.0, 13.9, 2);
        let c = b.add_edge(100.0, 13.9, 1);
        b.connect(a, c);
        let net = b.build().unwrap();
        assert_eq!(net.allowed_lanes(a, c).unwrap().len(), 2);
    }

    #[test]
    fn derived_from_links() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_edge(100.0, 13.9, 2);
        let c = b.add_edge(100.0, 13.9, 1);
        // Only the left lane (index 1) carries a link to c.
        let left = meso_core::LaneId(1);
        let dest = meso_core::LaneId(2);
        b.add_link(left, dest, false).unwrap();
        let net = b.build().unwrap();
        assert_eq!(net.allowed_lanes(a, c).unwrap(), &[left]);
    }

    #[test]
    fn explicit_override_wins() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_edge(100.0, 13.9, 2);
        let c = b.add_edge(100.0, 13.9, 1);
        b.connect(a, c);
        let right = meso_core::LaneId(0);
        b.allow_lanes(a, c, vec![right]);
        let net = b.build().unwrap();
        assert_eq!(net.allowed_lanes(a, c).unwrap(), &[right]);
    }

    #[test]
    fn explicit_empty_set_fails_build() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_edge(100.0, 13.9, 2);
        let c = b.add_edge(100.0, 13.9, 1);
        b.connect(a, c);
        b.allow_lanes(a, c, vec![]);
        match b.build() {
            Err(NetError::NoAllowedLanes { edge, to }) => {
                assert_eq!(edge, a);
                assert_eq!(to, c);
            }
            other => panic!("expected NoAllowedLanes, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn non_successor_is_none() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_edge(100.0, 13.9, 1);
        let c = b.add_edge(100.0, 13.9, 1);
        let net = b.build().unwrap();
        assert!(net.allowed_lanes(a, c).is_none());
    }
}

#[cfg(test)]
mod links {
    use super::*;
    use crate::OpenRule;

    struct Closed;
    impl OpenRule for Closed {
        fn opened(&self, _: &Passage) -> bool {
            false
        }
    }

    #[test]
    fn ruleless_link_is_open() {
        let mut b = RoadNetworkBuilder::new();
        let _a = b.add_edge(100.0, 13.9, 1);
        let _c = b.add_edge(100.0, 13.9, 1);
        let id = b.add_link(meso_core::LaneId(0), meso_core::LaneId(1), false).unwrap();
        let net = b.build().unwrap();
        assert!(net.link(id).opened(&passage()));
    }

    #[test]
    fn rule_decides_for_controlled_link() {
        let mut b = RoadNetworkBuilder::new();
        let _a = b.add_edge(100.0, 13.9, 1);
        let _c = b.add_edge(100.0, 13.9, 1);
        let id = b.add_link(meso_core::LaneId(0), meso_core::LaneId(1), false).unwrap();
        b.set_open_rule(id, Box::new(Closed)).unwrap();
        let net = b.build().unwrap();
        assert!(!net.link(id).opened(&passage()));
    }

    #[test]
    fn approach_registration_roundtrip() {
        let mut b = RoadNetworkBuilder::new();
        let _a = b.add_edge(100.0, 13.9, 1);
        let _c = b.add_edge(100.0, 13.9, 1);
        let id = b.add_link(meso_core::LaneId(0), meso_core::LaneId(1), true).unwrap();
        let mut net = b.build().unwrap();

        let v = VehicleId(3);
        net.link_mut(id).register_approach(v);
        net.link_mut(id).register_approach(v); // idempotent
        assert_eq!(net.link(id).approaching(), &[v]);
        net.link_mut(id).deregister_approach(v);
        assert!(net.link(id).approaching().is_empty());
    }
}
