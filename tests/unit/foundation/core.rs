use super::*;

#[test]
fn finite_guards_reject_nan_and_infinity() {
    assert!(is_finite_point(Point::new(1.0, -2.0)));
    assert!(!is_finite_point(Point::new(f64::NAN, 0.0)));
    assert!(!is_finite_point(Point::new(0.0, f64::INFINITY)));
    assert!(!is_finite_vec(Vec2::new(f64::NEG_INFINITY, 0.0)));
    assert_eq!(finite_or(f64::NAN, 3.0), 3.0);
    assert_eq!(finite_or(2.5, 3.0), 2.5);
}

#[test]
fn manual_clock_advances_and_sets() {
    let clock = ManualClock::new(1_000);
    assert_eq!(clock.now(), Timestamp(1_000));
    clock.advance(250);
    assert_eq!(clock.now().as_millis(), 1_250);
    clock.set(10);
    assert_eq!(clock.now(), Timestamp(10));
}

#[test]
fn timestamp_arithmetic_saturates() {
    let a = Timestamp(5_000);
    assert_eq!(a.plus_millis(2_000), Timestamp(7_000));
    assert_eq!(Timestamp(7_000).millis_since(a), 2_000);
    assert_eq!(a.millis_since(Timestamp(7_000)), 0);
}

#[test]
fn system_clock_is_after_2020() {
    assert!(SystemClock.now().as_millis() > 1_577_836_800_000);
}
