//! Termination signals (SIGINT, SIGTERM, SIGHUP, SIGQUIT).
//!
//! Two tools, both built on process-wide handlers that only store the signal
//! number in an atomic, so a signal delivered to any thread is caught:
//!
//! - [`InterruptGuard`] defers signals across a critical section. A signal
//!   that arrives meanwhile is raised again, with the previous handlers back
//!   in place, when the last guard ends.
//! - [`InterruptWatcher`] turns signals into a flag that long-running work
//!   polls, so it can stop at a safe point and let its own cleanup run.
//!
//! All handler changes go through one lock. A watcher installed or removed
//! while a guard is alive takes effect when the last guard ends.

use std::sync::atomic::{AtomicI32, Ordering};

use thiserror::Error;

#[cfg(unix)]
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
#[cfg(unix)]
use std::sync::{Mutex, MutexGuard};

#[cfg(unix)]
const TERMINATING: [Signal; 4] = [
    Signal::SIGINT,
    Signal::SIGTERM,
    Signal::SIGHUP,
    Signal::SIGQUIT,
];

/// First signal that arrived while a guard was alive (0 if none).
static DEFERRED: AtomicI32 = AtomicI32::new(0);

/// Last signal seen by the watcher (0 if none).
static INTERRUPTED: AtomicI32 = AtomicI32::new(0);

#[cfg(unix)]
static HANDLERS: Mutex<Handlers> = Mutex::new(Handlers {
    depth: 0,
    saved: Vec::new(),
});

#[cfg(unix)]
struct Handlers {
    /// Number of live guards
    depth: usize,

    /// Actions to reinstall when the last guard ends
    saved: Vec<(Signal, SigAction)>,
}

#[cfg(unix)]
fn handlers() -> MutexGuard<'static, Handlers> {
    HANDLERS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Handlers only touch atomics: no allocation, no locks, no I/O.

#[cfg(unix)]
extern "C" fn record_deferred(sig: nix::libc::c_int) {
    let _ = DEFERRED.compare_exchange(0, sig, Ordering::SeqCst, Ordering::SeqCst);
}

#[cfg(unix)]
extern "C" fn record_interrupt(sig: nix::libc::c_int) {
    INTERRUPTED.store(sig, Ordering::SeqCst);
}

#[cfg(unix)]
fn recording(handler: extern "C" fn(nix::libc::c_int)) -> SigAction {
    SigAction::new(
        SigHandler::Handler(handler),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    )
}

/// Install `action` for every terminating signal and return what it replaced.
#[cfg(unix)]
fn install_all(action: &SigAction) -> Vec<(Signal, SigAction)> {
    TERMINATING
        .iter()
        .filter_map(|&sig| {
            // SAFETY: the installed handlers are async-signal-safe.
            match unsafe { signal::sigaction(sig, action) } {
                Ok(old) => Some((sig, old)),
                Err(e) => {
                    tracing::debug!("could not install {} handler: {}", sig.as_str(), e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(unix)]
fn restore_all(saved: &[(Signal, SigAction)]) {
    for (sig, old) in saved {
        // SAFETY: reinstalls an action that was in place before.
        if let Err(e) = unsafe { signal::sigaction(*sig, old) } {
            tracing::debug!("could not restore {} handler: {}", sig.as_str(), e);
        }
    }
}

/// Raise a recorded signal so its current disposition applies.
#[cfg(unix)]
fn redeliver(sig: i32) {
    if sig == 0 {
        return;
    }
    if let Ok(sig) = Signal::try_from(sig) {
        tracing::debug!("delivering {}", sig.as_str());
        if let Err(e) = signal::raise(sig) {
            tracing::debug!("could not raise {}: {}", sig.as_str(), e);
        }
    }
}

/// Defers termination signals until dropped.
#[must_use = "signals are only deferred while the guard is alive"]
pub struct InterruptGuard {
    active: bool,
}

impl InterruptGuard {
    /// Start deferring termination signals for the whole process.
    #[cfg(unix)]
    pub fn defer() -> Self {
        let mut state = handlers();
        if state.depth == 0 {
            state.saved = install_all(&recording(record_deferred));
        }
        state.depth += 1;
        InterruptGuard { active: true }
    }

    #[cfg(not(unix))]
    pub fn defer() -> Self {
        InterruptGuard { active: false }
    }

    /// True if signals are actually being held back.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if self.active {
            let mut state = handlers();
            state.depth -= 1;
            if state.depth > 0 {
                return;
            }
            let saved = std::mem::take(&mut state.saved);
            restore_all(&saved);
            drop(state);

            redeliver(DEFERRED.swap(0, Ordering::SeqCst));
        }
    }
}

/// Run `f` with termination signals deferred.
pub fn ignore_interrupts<T>(f: impl FnOnce() -> T) -> T {
    let _guard = InterruptGuard::defer();
    f()
}

/// A termination signal stopped the work in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interrupted by signal {signal}")]
pub struct Interrupted {
    pub signal: i32,
}

/// Records termination signals instead of letting them end the process.
///
/// Dropping the watcher puts the previous handlers back. [`resume`] does the
/// same and then delivers a recorded signal, so the process still ends the
/// way it would have, just later.
///
/// [`resume`]: InterruptWatcher::resume
#[must_use = "signals are only recorded while the watcher is alive"]
pub struct InterruptWatcher {
    #[cfg(unix)]
    previous: Option<Vec<(Signal, SigAction)>>,
}

impl InterruptWatcher {
    /// Start recording termination signals for the whole process.
    #[cfg(unix)]
    pub fn install() -> Self {
        INTERRUPTED.store(0, Ordering::SeqCst);

        let mut state = handlers();
        let previous = if state.depth > 0 {
            // A guard owns the live handlers; it installs ours when it ends
            state
                .saved
                .iter_mut()
                .map(|(sig, old)| (*sig, std::mem::replace(old, recording(record_interrupt))))
                .collect()
        } else {
            install_all(&recording(record_interrupt))
        };

        InterruptWatcher {
            previous: Some(previous),
        }
    }

    #[cfg(not(unix))]
    pub fn install() -> Self {
        INTERRUPTED.store(0, Ordering::SeqCst);
        InterruptWatcher {}
    }

    /// The signal recorded so far, if any.
    pub fn signal(&self) -> Option<i32> {
        match INTERRUPTED.load(Ordering::SeqCst) {
            0 => None,
            sig => Some(sig),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.signal().is_some()
    }

    /// Fail with [`Interrupted`] once a signal has been recorded.
    pub fn check(&self) -> Result<(), Interrupted> {
        match self.signal() {
            Some(signal) => Err(Interrupted { signal }),
            None => Ok(()),
        }
    }

    /// Stop watching and deliver the recorded signal, if any.
    pub fn resume(mut self) {
        self.uninstall();
        #[cfg(unix)]
        redeliver(INTERRUPTED.swap(0, Ordering::SeqCst));
    }

    fn uninstall(&mut self) {
        #[cfg(unix)]
        if let Some(previous) = self.previous.take() {
            let mut state = handlers();
            if state.depth == 0 {
                restore_all(&previous);
                return;
            }
            for (sig, old) in previous {
                if let Some(slot) = state.saved.iter_mut().find(|(s, _)| *s == sig) {
                    slot.1 = old;
                }
            }
        }
    }
}

impl Drop for InterruptWatcher {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Serializes tests that send termination signals to the test process.
#[cfg(test)]
pub(crate) fn signal_test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Poll `watcher` until it has recorded a signal or `timeout` passes.
#[cfg(test)]
pub(crate) fn wait_for_signal(watcher: &InterruptWatcher, timeout: std::time::Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if watcher.is_interrupted() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    watcher.is_interrupted()
}
