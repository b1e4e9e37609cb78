use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Installs a Ctrl-C / SIGTERM handler. The returned flag turns false once a signal arrives.
pub fn install_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        info!("Interrupt received, stopping");
        flag.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// Sleeps for `duration` unless interrupted first. Returns whether the program should keep running.
pub fn sleep_while_running(running: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return true;
        }

        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }

    false
}
