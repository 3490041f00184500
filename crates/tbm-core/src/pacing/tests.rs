//! Tests for delay state transitions and controller notification.

use std::time::Duration;

use tokio::sync::mpsc;

use super::{DelayController, DelayState, DelayTuning, Zone};

fn assert_invariants(s: &DelayState) {
    assert!(
        s.floor_ms <= s.average_ms && s.average_ms <= s.peak_ms,
        "floor <= average <= peak violated: {:?}",
        s
    );
    assert!(s.current_ms >= s.floor_ms, "current below floor: {:?}", s);
}

#[test]
fn new_seeds_canonical_defaults() {
    let s = DelayState::new(DelayTuning::default());
    assert_eq!(s.floor_ms, 200);
    assert_eq!(s.current_ms, 1000);
    assert_eq!(s.peak_ms, 3000);
    assert_eq!(s.average_ms, 1600);
    assert_eq!(s.sustainable_ms, 200);
    assert_invariants(&s);
}

#[test]
fn new_normalizes_degenerate_tuning() {
    let s = DelayState::new(DelayTuning {
        floor_ms: 0,
        start_ms: 0,
        peak_ms: 0,
    });
    assert_eq!(s.floor_ms, 1);
    assert_eq!(s.current_ms, 1);
    assert_eq!(s.peak_ms, 1);
    assert_eq!(s.average_ms, 1);

    let s = DelayState::new(DelayTuning {
        floor_ms: 500,
        start_ms: 100,
        peak_ms: 300,
    });
    assert_eq!(s.floor_ms, 500);
    assert_eq!(s.current_ms, 500);
    assert_eq!(s.peak_ms, 500);
    assert_eq!(s.average_ms, 500);
}

#[test]
fn zone_boundaries() {
    let mut s = DelayState::new(DelayTuning::default());
    s.sustainable_ms = 400;

    s.current_ms = 1600;
    assert_eq!(s.zone(), Zone::Red);
    s.current_ms = 1599;
    assert_eq!(s.zone(), Zone::Yellow);
    s.current_ms = 400;
    assert_eq!(s.zone(), Zone::Yellow);
    s.current_ms = 399;
    assert_eq!(s.zone(), Zone::Green);
}

#[test]
fn success_from_canonical_start_drops_to_floor() {
    // current 1000 sits in yellow (sustainable 200 <= 1000 < average 1600),
    // so the 1000 ms step lands at 0 and clamps to the floor.
    let mut s = DelayState::new(DelayTuning::default());
    assert_eq!(s.zone(), Zone::Yellow);
    s.record_success();
    assert_eq!(s.current_ms, 200);
    assert_eq!(s.average_ms, 1600);
    assert_invariants(&s);
}

#[test]
fn success_in_red_cuts_twenty_percent() {
    let mut s = DelayState::new(DelayTuning::default());
    s.current_ms = 2001;
    assert_eq!(s.zone(), Zone::Red);
    s.record_success();
    // round(2001 * 0.8) = round(1600.8) = 1601
    assert_eq!(s.current_ms, 1601);
    assert_invariants(&s);
}

#[test]
fn success_in_green_creeps_one_ms() {
    let mut s = DelayState::new(DelayTuning::default());
    s.sustainable_ms = 400;
    s.current_ms = 300;
    assert_eq!(s.zone(), Zone::Green);
    s.record_success();
    assert_eq!(s.current_ms, 299);
    assert_invariants(&s);
}

#[test]
fn success_at_floor_holds() {
    let mut s = DelayState::new(DelayTuning::default());
    s.current_ms = 200;
    s.record_success();
    assert_eq!(s.current_ms, 200);
    assert_invariants(&s);
}

#[test]
fn success_raises_peak_before_stepping() {
    let mut s = DelayState::new(DelayTuning::default());
    s.current_ms = 3500;
    s.record_success();
    assert_eq!(s.peak_ms, 3500);
    // red cut happens after the raise: round(3500 * 0.8) = 2800
    assert_eq!(s.current_ms, 2800);
    // average recomputed from the new peak: round((3500 + 200) / 2) = 1850
    assert_eq!(s.average_ms, 1850);
    assert_invariants(&s);
}

#[test]
fn rate_limit_transition_arithmetic() {
    let mut s = DelayState::new(DelayTuning::default());
    s.record_rate_limit();
    assert_eq!(s.floor_ms, 201);
    // round((3000 + 201) / 2) = round(1600.5) = 1601, half rounds up
    assert_eq!(s.average_ms, 1601);
    assert_eq!(s.sustainable_ms, 210);
    assert_eq!(s.current_ms, 1500);
    assert_invariants(&s);
}

#[test]
fn three_rate_limit_hits_shift_floor_and_sustainable() {
    let mut s = DelayState::new(DelayTuning::default());
    for _ in 0..3 {
        s.record_rate_limit();
        assert_invariants(&s);
    }
    assert_eq!(s.floor_ms, 203);
    assert_eq!(s.sustainable_ms, 230);
    // 1000 -> 1500 -> 2250 -> 3375
    assert_eq!(s.current_ms, 3375);
}

#[test]
fn rate_limit_floor_capped_by_average() {
    let mut s = DelayState::new(DelayTuning {
        floor_ms: 100,
        start_ms: 100,
        peak_ms: 100,
    });
    assert_eq!(s.average_ms, 100);
    s.record_rate_limit();
    assert_eq!(s.floor_ms, 100);
    assert_eq!(s.sustainable_ms, 110);
    assert_eq!(s.current_ms, 150);
    assert_invariants(&s);
}

#[test]
fn invariants_hold_under_mixed_traffic() {
    let mut s = DelayState::new(DelayTuning::default());
    let pattern = [false, false, true, true, true, false, true, true, true, true, true, true];
    for &ok in pattern.iter().cycle().take(120) {
        if ok {
            s.record_success();
        } else {
            s.record_rate_limit();
        }
        assert_invariants(&s);
    }
}

#[test]
fn controller_notifies_on_each_transition() {
    let (delay_tx, mut delay_rx) = mpsc::channel(16);
    let (thr_tx, mut thr_rx) = mpsc::channel(16);
    let mut ctl =
        DelayController::with_observers(DelayTuning::default(), Some(delay_tx), Some(thr_tx));

    ctl.on_rate_limit();
    assert_eq!(delay_rx.try_recv().unwrap(), Duration::from_millis(1500));
    let thr = thr_rx.try_recv().unwrap().unwrap();
    assert_eq!(thr.floor_ms, 201);
    assert_eq!(thr.average_ms, 1601);
    assert_eq!(thr.sustainable_ms, 210);
    assert_eq!(thr.peak_ms, 3000);

    // 1500 is yellow against average 1601, so success steps down 1000 ms.
    ctl.on_success();
    assert_eq!(delay_rx.try_recv().unwrap(), Duration::from_millis(500));
}

#[test]
fn controller_announce_reports_initial_state() {
    let (delay_tx, mut delay_rx) = mpsc::channel(4);
    let (thr_tx, mut thr_rx) = mpsc::channel(4);
    let ctl = DelayController::with_observers(DelayTuning::default(), Some(delay_tx), Some(thr_tx));

    ctl.announce();
    assert_eq!(delay_rx.try_recv().unwrap(), Duration::from_millis(1000));
    let thr = thr_rx.try_recv().unwrap().unwrap();
    assert_eq!(thr.floor_ms, 200);
    assert_eq!(thr.peak_ms, 3000);
}

#[test]
fn controller_tolerates_full_channel() {
    let (delay_tx, mut delay_rx) = mpsc::channel(1);
    let mut ctl = DelayController::with_observers(DelayTuning::default(), Some(delay_tx), None);

    ctl.on_success();
    ctl.on_success();
    // First value buffered, second dropped, no panic either way.
    assert!(delay_rx.try_recv().is_ok());
    assert!(delay_rx.try_recv().is_err());
}

#[test]
fn controller_without_observers_runs() {
    let mut ctl = DelayController::new(DelayTuning::default());
    ctl.on_rate_limit();
    ctl.on_success();
    assert_eq!(ctl.state().floor_ms, 201);
}
