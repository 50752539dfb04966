//! Tests for TimeManager

use care_allocation_core_rs::TimeManager;

#[test]
fn test_time_manager_new() {
    let time = TimeManager::new(100);
    assert_eq!(time.current_tick(), 0);
    assert_eq!(time.num_ticks(), 100);
    assert_eq!(time.remaining_ticks(), 100);
    assert!(!time.is_finished());
}

#[test]
fn test_advance_tick() {
    let mut time = TimeManager::new(100);

    time.advance_tick();
    assert_eq!(time.current_tick(), 1);

    time.advance_tick();
    assert_eq!(time.current_tick(), 2);
    assert_eq!(time.remaining_ticks(), 98);
}

#[test]
fn test_last_tick_and_horizon() {
    let mut time = TimeManager::new(3);

    time.advance_tick();
    assert!(!time.is_last_tick());
    time.advance_tick();
    assert!(time.is_last_tick());
    assert!(!time.is_finished());

    time.advance_tick();
    assert!(time.is_finished());
    assert_eq!(time.remaining_ticks(), 0);
}

#[test]
fn test_advance_saturates_at_horizon() {
    let mut time = TimeManager::new(2);
    for _ in 0..10 {
        time.advance_tick();
    }
    assert_eq!(time.current_tick(), 2);
}

#[test]
#[should_panic(expected = "num_ticks must be positive")]
fn test_zero_horizon_panics() {
    TimeManager::new(0);
}
