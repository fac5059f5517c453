use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::Notify;

use taskdag::{action, Action};

/// Shared log of action invocations, in invocation order.
pub type InvocationLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> InvocationLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn log_contents(log: &InvocationLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Action that records its name and completes immediately.
pub fn recording(name: &str, log: &InvocationLog) -> Action {
    let name = name.to_string();
    let log = Arc::clone(log);
    action(move |_| {
        let name = name.clone();
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(name);
            Ok(())
        }
    })
}

/// Action that records its name, then fails with `msg`.
pub fn failing(name: &str, log: &InvocationLog, msg: &str) -> Action {
    let name = name.to_string();
    let msg = msg.to_string();
    let log = Arc::clone(log);
    action(move |_| {
        let name = name.clone();
        let msg = msg.clone();
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(name);
            Err(anyhow!("{msg}"))
        }
    })
}

/// Action that records its name, then waits for the gate before
/// completing. `Notify` stores a permit, so signalling before the action
/// starts is safe.
pub fn gated(name: &str, log: &InvocationLog, gate: &Arc<Notify>) -> Action {
    let name = name.to_string();
    let log = Arc::clone(log);
    let gate = Arc::clone(gate);
    action(move |_| {
        let name = name.clone();
        let log = Arc::clone(&log);
        let gate = Arc::clone(&gate);
        async move {
            log.lock().unwrap().push(name);
            gate.notified().await;
            Ok(())
        }
    })
}

/// Action that sleeps for `dur`, aborting early with an error when the
/// run is cancelled; `observed` is set iff the token fired first.
pub fn cancellable_sleep(dur: Duration, observed: &Arc<AtomicBool>) -> Action {
    let observed = Arc::clone(observed);
    action(move |cancel| {
        let observed = Arc::clone(&observed);
        async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    observed.store(true, Ordering::SeqCst);
                    Err(anyhow!("cancelled mid-flight"))
                }
                _ = tokio::time::sleep(dur) => Ok(()),
            }
        }
    })
}

/// Tracks how many probed actions run concurrently and the high-water
/// mark, for asserting pool caps.
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    current: AtomicI32,
    max: AtomicI32,
}

impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn max_seen(&self) -> i32 {
        self.max.load(Ordering::SeqCst)
    }

    /// Action that holds a probe slot for `dur` then completes.
    pub fn probed(self: &Arc<Self>, dur: Duration) -> Action {
        let probe = Arc::clone(self);
        action(move |_| {
            let probe = Arc::clone(&probe);
            async move {
                let now = probe.current.fetch_add(1, Ordering::SeqCst) + 1;
                probe.max.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(dur).await;
                probe.current.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }
}
