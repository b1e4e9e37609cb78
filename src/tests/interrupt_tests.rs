use crate::interrupt::sleep_while_running;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

#[test]
fn sleep_completes_while_running() {
    let running = AtomicBool::new(true);
    let start = Instant::now();

    assert!(sleep_while_running(&running, Duration::from_millis(20)));
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn sleep_returns_early_when_stopped() {
    let running = AtomicBool::new(false);
    let start = Instant::now();

    assert!(!sleep_while_running(&running, Duration::from_secs(5)));
    assert!(start.elapsed() < Duration::from_secs(1));
}
