//! End-to-end tests driving the full event loop.

use meso_core::{EdgeId, MesoConfig, Tick};
use meso_net::{OpenRule, Passage, RoadNetwork, RoadNetworkBuilder};
use meso_segment::SegmentError;
use meso_vehicle::{MesoVehicle, VehicleType};

use crate::{MesoLoop, SimError};

fn cfg() -> MesoConfig {
    MesoConfig {
        segment_length: 100.0,
        tau_ff_secs: 1.0,
        tau_fj_secs: 1.0,
        tau_jf_secs: 2.0,
        tau_jj_secs: 3.0,
        ..MesoConfig::default()
    }
}

fn car(route: Vec<EdgeId>) -> MesoVehicle {
    MesoVehicle::new(VehicleType::default(), route, 1.0)
}

/// 300 m edge feeding a 100 m edge, both 25 m/s, one lane.
fn corridor() -> (RoadNetwork, EdgeId, EdgeId) {
    let mut b = RoadNetworkBuilder::new();
    let a = b.add_edge(300.0, 25.0, 1);
    let c = b.add_edge(100.0, 25.0, 1);
    b.connect(a, c);
    (b.build().unwrap(), a, c)
}

#[cfg(test)]
mod flow {
    use super::*;

    #[test]
    fn vehicle_crosses_the_corridor() {
        let (net, a, c) = corridor();
        let mut sim = MesoLoop::new(net, cfg()).unwrap();
        assert_eq!(sim.segments.edge_segments(a).len(), 3);

        sim.schedule_depart(car(vec![a, c]), Tick::ZERO);
        sim.run_until(Tick::from_secs_f64(60.0)).unwrap();

        assert_eq!(sim.stats.departed, 1);
        assert_eq!(sim.stats.arrived, 1);
        assert_eq!(sim.stats.teleported, 0);
        assert!(sim.vehicles.is_empty());
        assert_eq!(sim.scheduled_leaders(), 0);
        // 3 × 4 s on the first edge plus 4 s on the second
        assert_eq!(sim.now(), Tick::from_secs_f64(60.0));
    }

    #[test]
    fn two_vehicles_share_the_corridor() {
        let (net, a, c) = corridor();
        let mut sim = MesoLoop::new(net, cfg()).unwrap();

        sim.schedule_depart(car(vec![a, c]), Tick::ZERO);
        sim.schedule_depart(car(vec![a, c]), Tick::from_secs_f64(2.0));
        sim.run_until(Tick::from_secs_f64(120.0)).unwrap();

        assert_eq!(sim.stats.departed, 2);
        assert_eq!(sim.stats.arrived, 2);
        assert!(sim.vehicles.is_empty());
    }

    #[test]
    fn single_edge_route_arrives() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_edge(100.0, 25.0, 1);
        let net = b.build().unwrap();
        let mut sim = MesoLoop::new(net, cfg()).unwrap();

        sim.schedule_depart(car(vec![a]), Tick::ZERO);
        sim.run_until(Tick::from_secs_f64(10.0)).unwrap();
        assert_eq!(sim.stats.arrived, 1);
    }

    #[test]
    fn empty_route_vehicle_is_dropped() {
        let (net, _a, _c) = corridor();
        let mut sim = MesoLoop::new(net, cfg()).unwrap();
        sim.schedule_depart(car(vec![]), Tick::ZERO);
        sim.run_until(Tick::from_secs_f64(1.0)).unwrap();
        assert_eq!(sim.stats.departed, 0);
        assert!(sim.vehicles.is_empty());
    }
}

#[cfg(test)]
mod backpressure {
    use super::*;

    #[test]
    fn full_downstream_segment_postpones_the_hop() {
        // 100 m feeder into a 10 m pocket that fits one car.
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_edge(100.0, 25.0, 1);
        let c = b.add_edge(10.0, 5.0, 1);
        b.connect(a, c);
        let net = b.build().unwrap();
        let mut sim = MesoLoop::new(net, cfg()).unwrap();

        let v1 = sim.schedule_depart(car(vec![a, c]), Tick::ZERO);
        let v2 = sim.schedule_depart(car(vec![a, c]), Tick::from_secs_f64(0.2));
        let _ = v1;

        // By t = 5 s the first car sits in the pocket and the second is
        // refused (10 m capacity, 7.5 already used).
        sim.run_until(Tick::from_secs_f64(5.5)).unwrap();
        assert_eq!(sim.stats.arrived, 0);
        let a_head = sim.segments.segment_for_edge(a).unwrap();
        assert_eq!(sim.vehicles.v(v2).segment(), a_head);
        assert!(sim.vehicles.v(v2).waiting_time() > Tick::ZERO);

        // Once the pocket drains both cars make it through.
        sim.run_until(Tick::from_secs_f64(60.0)).unwrap();
        assert_eq!(sim.stats.arrived, 2);
        assert_eq!(sim.stats.teleported, 0);
        assert!(sim.vehicles.is_empty());
    }

    #[test]
    fn block_times_propagate_headway() {
        let (net, a, c) = corridor();
        let mut sim = MesoLoop::new(net, cfg()).unwrap();

        sim.schedule_depart(car(vec![a, c]), Tick::ZERO);
        // run exactly past the first hop at t = 4 s
        sim.run_until(Tick::from_secs_f64(4.5)).unwrap();
        let segs = sim.segments.edge_segments(a);
        // the vacated queue is blocked until 4 s + tau_ff of the (free)
        // second segment
        assert_eq!(sim.segments.get(segs[0]).block_time(0), Tick(5_000));
    }
}

#[cfg(test)]
mod junction {
    use super::*;

    struct Shut;
    impl OpenRule for Shut {
        fn opened(&self, _: &Passage) -> bool {
            false
        }
    }

    /// Two edges joined by a single non-priority link with a permanently red
    /// controller.
    fn red_light_net() -> (RoadNetwork, EdgeId, EdgeId) {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_edge(100.0, 25.0, 1);
        let c = b.add_edge(100.0, 25.0, 1);
        let link = b.add_link(meso_core::LaneId(0), meso_core::LaneId(1), false).unwrap();
        b.set_open_rule(link, Box::new(Shut)).unwrap();
        (b.build().unwrap(), a, c)
    }

    #[test]
    fn closed_link_holds_the_vehicle() {
        let (net, a, c) = red_light_net();
        let mut sim = MesoLoop::new(net, cfg()).unwrap();

        let v = sim.schedule_depart(car(vec![a, c]), Tick::ZERO);
        sim.run_until(Tick::from_secs_f64(30.0)).unwrap();

        assert_eq!(sim.stats.arrived, 0);
        let a_head = sim.segments.segment_for_edge(a).unwrap();
        assert_eq!(sim.vehicles.v(v).segment(), a_head);
        // the stuck leader is registered as approaching its link
        assert_eq!(sim.net.link(meso_core::LinkId(0)).approaching(), &[v]);
    }

    #[test]
    fn stuck_vehicle_teleports_to_route_continuation() {
        let (net, a, c) = red_light_net();
        let mut config = cfg();
        config.max_waiting_secs = 10.0;
        let mut sim = MesoLoop::new(net, config).unwrap();

        sim.schedule_depart(car(vec![a, c]), Tick::ZERO);
        sim.run_until(Tick::from_secs_f64(60.0)).unwrap();

        assert_eq!(sim.stats.teleported, 1);
        // after the teleport it continues on edge c and finishes the trip
        assert_eq!(sim.stats.arrived, 1);
        assert!(sim.vehicles.is_empty());
        assert!(sim.net.link(meso_core::LinkId(0)).approaching().is_empty());
    }

    #[test]
    fn limited_control_opens_clear_junctions() {
        let (net, a, c) = red_light_net();
        let mut config = cfg();
        config.flags.limited_junction_control = true;
        let mut sim = MesoLoop::new(net, config).unwrap();

        sim.schedule_depart(car(vec![a, c]), Tick::ZERO);
        sim.run_until(Tick::from_secs_f64(30.0)).unwrap();

        // target edge stays nearly empty, so the red light is overridden
        assert_eq!(sim.stats.arrived, 1);
        assert_eq!(sim.stats.teleported, 0);
    }
}

#[cfg(test)]
mod removal {
    use super::*;

    #[test]
    fn vaporize_through_the_loop() {
        let (net, a, c) = corridor();
        let mut sim = MesoLoop::new(net, cfg()).unwrap();

        sim.schedule_depart(car(vec![a, c]), Tick::ZERO);
        sim.run_until(Tick::from_secs_f64(1.0)).unwrap();
        assert_eq!(sim.stats.departed, 1);

        assert!(sim.vaporize_any_car(a));
        assert_eq!(sim.stats.vaporized, 1);
        assert!(sim.vehicles.is_empty());
        assert_eq!(sim.scheduled_leaders(), 0);
        // nothing left to vaporize
        assert!(!sim.vaporize_any_car(a));
    }

    #[test]
    fn invalid_route_is_surfaced() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_edge(100.0, 25.0, 1);
        let c = b.add_edge(100.0, 25.0, 1);
        let net = b.build().unwrap(); // not connected
        let mut config = cfg();
        config.flags.check_routes = true;
        let mut sim = MesoLoop::new(net, config).unwrap();

        sim.schedule_depart(car(vec![a, c]), Tick::ZERO);
        let err = sim.run_until(Tick::from_secs_f64(1.0)).unwrap_err();
        assert!(matches!(err, SimError::Segment(SegmentError::InvalidRoute(_))));
    }
}

#[cfg(test)]
mod determinism {
    use super::*;

    /// Same seed, same schedule → identical trajectories, including the
    /// stochastic overtake draws.
    #[test]
    fn runs_replay_with_equal_seeds() {
        let run = |seed: u64| {
            let mut b = RoadNetworkBuilder::new();
            let a = b.add_edge(200.0, 25.0, 2);
            let c = b.add_edge(100.0, 25.0, 1);
            b.connect(a, c);
            let net = b.build().unwrap();

            let mut config = cfg();
            config.flags.overtaking = true;
            config.seed = seed;
            let mut sim = MesoLoop::new(net, config).unwrap();
            for i in 0..6 {
                let speed = if i % 2 == 0 { 10.0 } else { 25.0 };
                let veh = MesoVehicle::new(
                    VehicleType { max_speed: speed, ..VehicleType::default() },
                    vec![a, c],
                    1.0,
                );
                sim.schedule_depart(veh, Tick::from_secs_f64(i as f64 * 0.4));
            }
            sim.run_until(Tick::from_secs_f64(30.0)).unwrap();
            (sim.stats, sim.save_state())
        };

        let (stats1, state1) = run(7);
        let (stats2, state2) = run(7);
        assert_eq!(stats1, stats2);
        assert_eq!(state1, state2);

        assert_eq!(stats1.departed, 6);
        assert_eq!(stats1.arrived + remaining(&state1), 6);
    }

    /// Count vehicle ids still listed in a saved state document.
    fn remaining(state: &str) -> usize {
        state
            .lines()
            .filter(|l| l.trim_start().starts_with("<vehicles"))
            .map(|l| {
                let ids = l
                    .split('>')
                    .nth(1)
                    .and_then(|rest| rest.split('<').next())
                    .unwrap_or("");
                if ids.is_empty() { 0 } else { ids.split(' ').count() }
            })
            .sum()
    }
}
