use coldchain::domain::{order_status, Severity};
use proptest::prelude::*;

#[test]
fn grading_thresholds_are_exact() {
    // critical: T >= 40 or H >= 90
    assert_eq!(Severity::from_reading(40.0, 0.0), Severity::Critical);
    assert_eq!(Severity::from_reading(0.0, 90.0), Severity::Critical);
    assert_eq!(Severity::from_reading(45.0, 95.0), Severity::Critical);

    // major: T >= 30 or H >= 80
    assert_eq!(Severity::from_reading(30.0, 0.0), Severity::Major);
    assert_eq!(Severity::from_reading(39.9, 79.9), Severity::Major);
    assert_eq!(Severity::from_reading(0.0, 80.0), Severity::Major);

    // everything else is minor
    assert_eq!(Severity::from_reading(9.23, 58.0), Severity::Minor);
    assert_eq!(Severity::from_reading(-20.0, 0.0), Severity::Minor);
}

#[test]
fn order_status_per_severity_is_fixed() {
    assert_eq!(order_status::for_severity(Severity::Minor), "damage_detected_minor");
    assert_eq!(order_status::for_severity(Severity::Major), "damage_detected_major");
    assert_eq!(order_status::for_severity(Severity::Critical), "cancelled_damage");
}

proptest! {
    /// Severity is a pure function of (temperature, humidity): the same
    /// inputs grade identically no matter how often or in what order
    /// they are evaluated.
    #[test]
    fn severity_is_pure(t in -60.0f64..80.0, h in 0.0f64..100.0) {
        let first = Severity::from_reading(t, h);
        let second = Severity::from_reading(t, h);
        prop_assert_eq!(first, second);
    }

    /// The derivation never produces the unknown grade.
    #[test]
    fn derivation_stays_in_the_closed_set(t in -60.0f64..80.0, h in 0.0f64..100.0) {
        prop_assert_ne!(Severity::from_reading(t, h), Severity::Unknown);
    }

    /// Raising temperature at fixed humidity never lowers the grade.
    #[test]
    fn severity_is_monotone_in_temperature(t in -60.0f64..80.0, h in 0.0f64..100.0, bump in 0.0f64..50.0) {
        fn rank(s: Severity) -> u8 {
            match s {
                Severity::Minor => 0,
                Severity::Major => 1,
                Severity::Critical => 2,
                Severity::Unknown => unreachable!("derivation never yields unknown"),
            }
        }
        let base = rank(Severity::from_reading(t, h));
        let bumped = rank(Severity::from_reading(t + bump, h));
        prop_assert!(bumped >= base);
    }
}
