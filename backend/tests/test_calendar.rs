//! Calendar and transition period tests
//!
//! Year stepping is a plain counter over `initial_year + 1 ..= end_year`;
//! the drinking-transition period is a function of years since the snapshot.

use aud_simulator_core_rs::{SimulationCalendar, SimulationError, TransitionPeriod};

#[test]
fn test_calendar_starts_at_snapshot_year() {
    let calendar = SimulationCalendar::new(2000, 2010);

    assert_eq!(calendar.current_year(), 2000);
    assert_eq!(calendar.next_year(), 2001);
    assert_eq!(calendar.years_since_start(), 0);
    assert_eq!(calendar.remaining_years(), 10);
    assert!(!calendar.is_finished());
}

#[test]
fn test_calendar_advances_to_end_year() {
    let mut calendar = SimulationCalendar::new(2000, 2003);
    let mut simulated = Vec::new();

    while !calendar.is_finished() {
        simulated.push(calendar.next_year());
        calendar.advance_year();
    }

    assert_eq!(simulated, vec![2001, 2002, 2003]);
    assert_eq!(calendar.current_year(), 2003);
    assert_eq!(calendar.years_since_start(), 3);
    assert_eq!(calendar.remaining_years(), 0);
}

#[test]
fn test_calendar_with_equal_years_is_finished() {
    let calendar = SimulationCalendar::new(2015, 2015);
    assert!(calendar.is_finished());
    assert_eq!(calendar.remaining_years(), 0);
    assert_eq!(calendar.initial_year(), 2015);
    assert_eq!(calendar.end_year(), 2015);
}

#[test]
#[should_panic(expected = "end_year must not precede initial_year")]
fn test_calendar_rejects_reversed_years() {
    SimulationCalendar::new(2010, 2000);
}

#[test]
fn test_period_boundaries() {
    let expected = [
        (1, TransitionPeriod::Early),
        (3, TransitionPeriod::Early),
        (4, TransitionPeriod::Mid),
        (8, TransitionPeriod::Mid),
        (9, TransitionPeriod::Late),
        (40, TransitionPeriod::Late),
    ];
    for (elapsed, period) in expected {
        assert_eq!(
            TransitionPeriod::for_year(2000 + elapsed, 2000).unwrap(),
            period,
            "{} years since start",
            elapsed
        );
    }
}

#[test]
fn test_period_before_start_is_config_error() {
    let err = TransitionPeriod::for_year(1999, 2000).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidConfig(_)));
}

#[test]
fn test_period_labels_round_trip_through_serde() {
    for period in TransitionPeriod::ALL {
        let json = serde_json::to_string(&period).unwrap();
        assert_eq!(json, format!("\"{}\"", period.label()));
        let back: TransitionPeriod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, period);
    }
    let mid: TransitionPeriod = serde_json::from_str("\"mid\"").unwrap();
    assert_eq!(mid, TransitionPeriod::Mid);
}
