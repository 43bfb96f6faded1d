//! The two first-order controllers that keep a client pool's refill sweep
//! tuned to how busy it actually is.
//!
//! Both run once per client refill sweep and are independent of each other:
//! the interval controller reacts to *consumption pressure* (how drained the
//! ready queue was before this sweep's fill phase), the capacity controller
//! reacts to *dialing productivity* (how many of this sweep's dial attempts
//! actually made it into the queue). Expressing them as free functions over
//! plain numbers keeps them testable without spinning up a pool at all.

use std::time::Duration;

const INTERVAL_STEP_MS: u64 = 100;

/// Compute the next `interval` given the ready-queue length observed before
/// the fill phase (`idle`) and the capacity target in effect for this sweep.
pub fn next_interval(
    idle: usize,
    capacity: usize,
    interval: Duration,
    min_ivl: Duration,
    max_ivl: Duration,
) -> Duration {
    let capacity = capacity.max(1) as f64;
    let idle = idle as f64;
    let step = Duration::from_millis(INTERVAL_STEP_MS);

    if idle < capacity * 0.2 && interval > min_ivl {
        interval.saturating_sub(step).max(min_ivl)
    } else if idle > capacity * 0.8 && interval < max_ivl {
        (interval + step).min(max_ivl)
    } else {
        interval
    }
}

/// Compute the next `capacity` given how many connections this sweep's fill
/// phase actually published (`created`) against the capacity target that was
/// in effect while dialing.
pub fn next_capacity(created: usize, capacity: usize, min_cap: usize, max_cap: usize) -> usize {
    if capacity == 0 {
        return capacity.clamp(min_cap, max_cap);
    }
    let ratio = created as f64 / capacity as f64;

    if ratio < 0.2 && capacity > min_cap {
        capacity - 1
    } else if ratio > 0.8 && capacity < max_cap {
        capacity + 1
    } else {
        capacity
    }
}
