//! Pause/resume control for a running simulation
//!
//! The producer thread calls [`Stepper::check_point`] at places where it may
//! safely be suspended. A controller thread drives the run state: while
//! `Paused` the producer blocks inside `check_point` with all of its state
//! intact, and continues as soon as the controller moves to `Stepping` or
//! `Running`. `Stopped` makes every check point return [`CheckPoint::Halt`].

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, trace};

/// Default interval after which a paused producer re-checks the run state.
pub const DEFAULT_WATCHDOG: Duration = Duration::from_secs(10);

/// Run state shared between the producer and its controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Not running. Initial state; producers halt at their next check point.
    #[default]
    Stopped,
    /// Producer blocks at its next check point until the state changes.
    Paused,
    /// Producer pauses after the configured number of check points at the
    /// current grain.
    Stepping,
    /// Producer never pauses on steps.
    Running,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Stopped => "stopped",
            RunState::Paused => "paused",
            RunState::Stepping => "stepping",
            RunState::Running => "running",
        };
        write!(f, "{}", name)
    }
}

/// What the producer should do after a check point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckPoint {
    Continue,
    /// Stop and return; state is not preserved.
    Halt,
}

/// Called with the stepper's lock held whenever a check point pauses.
/// Must not call back into the stepper.
pub type PauseNotifier = Box<dyn FnMut() + Send>;

/// Called with the lock held at every check point while stepping; returning
/// true pauses. Must not call back into the stepper.
pub type StopChecker<G> = Box<dyn FnMut(&G) -> bool + Send>;

struct State<G> {
    run: RunState,
    grain: Option<G>,
    steps_per_click: i64,
    steps_remaining: i64,
    pause_notifier: Option<PauseNotifier>,
    stop_checker: Option<StopChecker<G>>,
}

impl<G> State<G> {
    fn notify_paused(&mut self) {
        if let Some(notify) = self.pause_notifier.as_mut() {
            notify();
        }
    }
}

/// Thread-safe pause/resume primitive, shared as `Arc<Stepper<G>>`.
///
/// `G` is the step granularity, usually the level token of the loop that
/// calls [`check_point`](Self::check_point).
pub struct Stepper<G> {
    state: Mutex<State<G>>,
    changed: Condvar,
    watchdog: Duration,
}

impl<G> Stepper<G>
where
    G: Clone + PartialEq + fmt::Debug + Send,
{
    /// New stepper in the `Stopped` state.
    pub fn new<F>(pause_notifier: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self {
            state: Mutex::new(State {
                run: RunState::Stopped,
                grain: None,
                steps_per_click: 1,
                steps_remaining: 0,
                pause_notifier: Some(Box::new(pause_notifier)),
                stop_checker: None,
            }),
            changed: Condvar::new(),
            watchdog: DEFAULT_WATCHDOG,
        }
    }

    /// Replace the wait interval used while paused.
    pub fn with_watchdog(mut self, watchdog: Duration) -> Self {
        self.watchdog = watchdog;
        self
    }

    fn lock_or_recover(&self) -> MutexGuard<'_, State<G>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the run state and wake any paused producer.
    pub fn enter(&self, state: RunState) {
        let mut st = self.lock_or_recover();
        debug!(from = %st.run, to = %state, "Stepper state change");
        st.run = state;
        self.changed.notify_all();
    }

    pub fn pause(&self) {
        self.enter(RunState::Paused);
    }

    /// Enter `Stopped`. The producer halts at its next check point.
    pub fn stop(&self) {
        self.enter(RunState::Stopped);
    }

    /// Enter `Stepping` at `grain`. When `steps > 0` it also becomes the
    /// number of check points to pass before each pause.
    pub fn start_stepping(&self, grain: G, steps: i64) {
        let mut st = self.lock_or_recover();
        if steps > 0 {
            st.steps_per_click = steps;
            st.steps_remaining = steps;
        }
        debug!(grain = ?grain, steps = st.steps_remaining, "Stepper start stepping");
        st.grain = Some(grain);
        st.run = RunState::Stepping;
        self.changed.notify_all();
    }

    /// Number of check points at the current grain between pauses.
    pub fn set_steps(&self, steps: i64) {
        let mut st = self.lock_or_recover();
        st.steps_per_click = steps;
        st.steps_remaining = steps;
    }

    pub fn set_grain(&self, grain: G) {
        self.lock_or_recover().grain = Some(grain);
    }

    pub fn grain(&self) -> Option<G> {
        self.lock_or_recover().grain.clone()
    }

    pub fn state(&self) -> RunState {
        self.lock_or_recover().run
    }

    /// True while `Running` or `Stepping`.
    pub fn active(&self) -> bool {
        matches!(self.state(), RunState::Running | RunState::Stepping)
    }

    pub fn register_stop_checker<F>(&self, checker: F)
    where
        F: FnMut(&G) -> bool + Send + 'static,
    {
        self.lock_or_recover().stop_checker = Some(Box::new(checker));
    }

    pub fn register_pause_notifier<F>(&self, notifier: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.lock_or_recover().pause_notifier = Some(Box::new(notifier));
    }

    /// Check for a pause or stop at `grain`. Blocks while paused.
    pub fn check_point(&self, grain: &G) -> CheckPoint {
        let mut st = self.lock_or_recover();
        match st.run {
            RunState::Stopped => return CheckPoint::Halt,
            RunState::Running => return CheckPoint::Continue,
            RunState::Paused | RunState::Stepping => {}
        }

        if st.run == RunState::Stepping && st.grain.as_ref() == Some(grain) {
            st.steps_remaining -= 1;
            if st.steps_remaining <= 0 {
                st.steps_remaining = st.steps_per_click;
                st.run = RunState::Paused;
                debug!(grain = ?grain, "Stepper paused after steps");
                st.notify_paused();
            }
        }

        let state = &mut *st;
        if let Some(checker) = state.stop_checker.as_mut() {
            if checker(grain) && state.run != RunState::Paused {
                state.run = RunState::Paused;
                debug!(grain = ?grain, "Stepper paused by stop checker");
                state.notify_paused();
            }
        }

        loop {
            match st.run {
                RunState::Stopped => return CheckPoint::Halt,
                RunState::Running | RunState::Stepping => return CheckPoint::Continue,
                RunState::Paused => {
                    let (guard, wait) = self
                        .changed
                        .wait_timeout(st, self.watchdog)
                        .unwrap_or_else(PoisonError::into_inner);
                    st = guard;
                    if wait.timed_out() {
                        trace!(watchdog_ms = self.watchdog.as_millis() as u64, "Stepper still paused");
                    }
                }
            }
        }
    }
}

impl<G> fmt::Debug for Stepper<G>
where
    G: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Stepper")
            .field("run", &st.run)
            .field("grain", &st.grain)
            .field("steps_per_click", &st.steps_per_click)
            .field("steps_remaining", &st.steps_remaining)
            .field("watchdog", &self.watchdog)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_initial_state_halts() {
        let stepper: Stepper<&str> = Stepper::new(|| {});
        assert_eq!(stepper.state(), RunState::Stopped);
        assert!(!stepper.active());
        assert_eq!(stepper.check_point(&"trial"), CheckPoint::Halt);
    }

    #[test]
    fn test_running_never_pauses() {
        let pauses = Arc::new(AtomicUsize::new(0));
        let p = pauses.clone();
        let stepper = Stepper::new(move || {
            p.fetch_add(1, Ordering::SeqCst);
        });
        stepper.start_stepping("trial", 1);
        stepper.enter(RunState::Running);

        for _ in 0..10 {
            assert_eq!(stepper.check_point(&"trial"), CheckPoint::Continue);
        }
        assert_eq!(pauses.load(Ordering::SeqCst), 0);
        assert!(stepper.active());
    }

    #[test]
    fn test_other_grain_does_not_count() {
        let stepper = Stepper::new(|| {});
        stepper.start_stepping("epoch", 1);
        for _ in 0..5 {
            assert_eq!(stepper.check_point(&"trial"), CheckPoint::Continue);
        }
        assert_eq!(stepper.state(), RunState::Stepping);
        assert_eq!(stepper.grain(), Some("epoch"));
    }

    #[test]
    fn test_pause_after_steps_then_resume() {
        let (tx, rx) = mpsc::channel();
        let stepper = Arc::new(Stepper::new(move || {
            let _ = tx.send(());
        }));
        stepper.start_stepping("trial", 3);

        let worker = {
            let stepper = stepper.clone();
            thread::spawn(move || {
                let mut passed = 0;
                while stepper.check_point(&"trial") == CheckPoint::Continue {
                    passed += 1;
                }
                passed
            })
        };

        rx.recv_timeout(WAIT).unwrap();
        assert_eq!(stepper.state(), RunState::Paused);
        // resume with the same step count
        stepper.start_stepping("trial", 0);
        rx.recv_timeout(WAIT).unwrap();
        stepper.stop();

        // two full clicks of three, minus the check point that halted
        assert_eq!(worker.join().unwrap(), 5);
    }

    #[test]
    fn test_stop_checker_forces_pause() {
        let notified = Arc::new(AtomicUsize::new(0));
        let n = notified.clone();
        let stepper = Arc::new(Stepper::new(move || {
            n.fetch_add(1, Ordering::SeqCst);
        }));
        stepper.start_stepping("trial", 100);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        stepper.register_stop_checker(move |grain| *grain == "epoch" && c.fetch_add(1, Ordering::SeqCst) == 0);

        assert_eq!(stepper.check_point(&"trial"), CheckPoint::Continue);

        let worker = {
            let stepper = stepper.clone();
            thread::spawn(move || stepper.check_point(&"epoch"))
        };
        while stepper.state() != RunState::Paused {
            thread::yield_now();
        }
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        stepper.enter(RunState::Running);
        assert_eq!(worker.join().unwrap(), CheckPoint::Continue);
    }

    #[test]
    fn test_watchdog_keeps_paused_until_stopped() {
        let stepper = Arc::new(Stepper::new(|| {}).with_watchdog(Duration::from_millis(5)));
        stepper.start_stepping("trial", 1);
        stepper.pause();

        let worker = {
            let stepper = stepper.clone();
            thread::spawn(move || stepper.check_point(&"trial"))
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!worker.is_finished());
        assert_eq!(stepper.state(), RunState::Paused);

        stepper.stop();
        assert_eq!(worker.join().unwrap(), CheckPoint::Halt);
    }

    #[test]
    fn test_set_steps_resets_remaining() {
        let (tx, rx) = mpsc::channel();
        let stepper = Arc::new(Stepper::new(move || {
            let _ = tx.send(());
        }));
        stepper.start_stepping("trial", 5);
        stepper.set_steps(1);

        let worker = {
            let stepper = stepper.clone();
            thread::spawn(move || stepper.check_point(&"trial"))
        };
        rx.recv_timeout(WAIT).unwrap();
        stepper.stop();
        assert_eq!(worker.join().unwrap(), CheckPoint::Halt);
    }

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::Stepping.to_string(), "stepping");
        assert_eq!(RunState::default(), RunState::Stopped);
    }
}
