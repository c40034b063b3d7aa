//! Unit tests for meso-core primitives.

#[cfg(test)]
mod ids {
    use crate::{EdgeId, SegmentId, VehicleId};

    #[test]
    fn index_roundtrip() {
        let id = VehicleId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(VehicleId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn ordering() {
        assert!(VehicleId(0) < VehicleId(1));
        assert!(SegmentId(100) > SegmentId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(VehicleId::INVALID.0, u32::MAX);
        assert_eq!(EdgeId::INVALID.0, u32::MAX);
        assert_eq!(EdgeId::default(), EdgeId::INVALID);
    }

    #[test]
    fn display() {
        assert_eq!(VehicleId(7).to_string(), "VehicleId(7)");
    }
}

#[cfg(test)]
mod time {
    use crate::Tick;

    #[test]
    fn second_conversions() {
        assert_eq!(Tick::from_secs_f64(4.0), Tick(4_000));
        assert_eq!(Tick::from_secs_f64(1.13), Tick(1_130));
        assert!((Tick(2_500).as_secs_f64() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn arithmetic() {
        assert_eq!(Tick(10) + Tick(5), Tick(15));
        assert_eq!(Tick(15) - Tick(10), Tick(5));
        assert_eq!(Tick(1_400) * 10, Tick(14_000));
        let mut t = Tick(3);
        t += Tick(4);
        assert_eq!(t, Tick(7));
    }

    #[test]
    fn saturating_block_time() {
        // An unblocked vehicle carries Tick::MAX; offsetting it must not wrap.
        assert_eq!(Tick::MAX.saturating_add(Tick(1_130)), Tick::MAX);
        assert_eq!(Tick(5).saturating_add(Tick(3)), Tick(8));
    }

    #[test]
    fn sentinels_order() {
        assert!(Tick::MIN < Tick(-1));
        assert!(Tick(-1) < Tick::ZERO);
        assert!(Tick::ZERO < Tick::MAX);
    }
}

#[cfg(test)]
mod rng {
    use crate::SimRng;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SimRng::new(7);
        let mut b = SimRng::new(7);
        for _ in 0..16 {
            assert_eq!(a.random::<u64>(), b.random::<u64>());
        }
    }

    #[test]
    fn unit_interval_draws() {
        let mut rng = SimRng::new(1);
        for _ in 0..256 {
            let x: f64 = rng.random();
            assert!((0.0..1.0).contains(&x));
        }
    }
}

#[cfg(test)]
mod config {
    use crate::MesoConfig;

    #[test]
    fn default_is_valid() {
        assert!(MesoConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_tau() {
        let cfg = MesoConfig { tau_jf_secs: 0.0, ..MesoConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_jam_threshold_above_one() {
        let cfg = MesoConfig { jam_threshold: 1.5, ..MesoConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn context_carries_default_spacing() {
        let ctx = MesoConfig::default().context();
        assert!((ctx.default_length_with_gap() - 7.5).abs() < 1e-12);
    }
}
