use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::engine::cancel::CancelToken;
use crate::error::{LinkError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunnerState {
    Created = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
    Stopped = 4,
    /// `start` failed, or the worker panicked. Terminal.
    Error = 5,
}

impl RunnerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Created,
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            4 => Self::Stopped,
            _ => Self::Error,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// Carrier logic driven by a [`Runner`] on its own thread.
///
/// # Lifecycle
/// 1. [`start`](Self::start) once. On `Err` the runner ends in
///    [`RunnerState::Error`] and neither `poll` nor `stop` is called, so
///    `start` must undo any partial acquisition itself before failing.
/// 2. [`poll`](Self::poll) repeatedly until it returns [`LoopAction::Stop`]
///    or a stop request is seen between two calls. A panic in `poll` also
///    ends the loop and leaves the runner in [`RunnerState::Error`].
/// 3. [`stop`](Self::stop) exactly once, panic or not.
///
/// # Contract
/// A stop request never interrupts a `poll` in progress. Each `poll` must
/// return within a bounded time (its poll interval), otherwise shutdown
/// hangs. Pace with [`CancelToken::sleep`] rather than `thread::sleep`, and
/// give any blocking call (a child process, say) a way to observe the token.
pub trait Worker: Send + 'static {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn poll(&mut self, cancel: &CancelToken) -> LoopAction;

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: RunnerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> RunnerState {
        RunnerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: RunnerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// What a finished runner hands back: the worker (its user data) plus the
/// outcome of each lifecycle step.
pub struct RunnerReport<W> {
    pub worker: W,
    pub state: RunnerState,
    pub start: Result<()>,
    /// `None` when `stop` was never called because `start` failed.
    pub stop: Option<Result<()>>,
    pub iterations: u64,
    /// `poll` panicked. `stop` still ran and its outcome is in `stop`.
    pub panicked: bool,
}

impl<W> RunnerReport<W> {
    pub fn is_clean(&self) -> bool {
        !self.panicked && self.start.is_ok() && matches!(self.stop, Some(Ok(())))
    }

    /// The worker if every step succeeded, else the first failure.
    pub fn into_result(self) -> Result<W> {
        self.start?;
        if let Some(stop) = self.stop {
            stop?;
        }
        Ok(self.worker)
    }
}

/// A managed thread running one [`Worker`].
///
/// [`stop`](Self::stop) takes the runner by value, so it can only be called
/// once. A runner dropped without `stop` still cancels and joins its thread.
pub struct Runner<W: Worker> {
    name: String,
    cancel: CancelToken,
    state: Arc<StateCell>,
    thread: Option<JoinHandle<RunnerReport<W>>>,
}

impl<W: Worker> Runner<W> {
    /// Spawns the worker thread and returns without waiting for `start`.
    pub fn start(name: &str, worker: W) -> Result<Self> {
        let cancel = CancelToken::new();
        let state = Arc::new(StateCell::new(RunnerState::Created));

        let thread = {
            let name = name.to_string();
            let cancel = cancel.clone();
            let state = state.clone();
            thread::Builder::new()
                .name(name.clone())
                .spawn(move || run_worker(name, worker, cancel, state))
                .map_err(LinkError::Spawn)?
        };

        Ok(Self {
            name: name.to_string(),
            cancel,
            state,
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RunnerState {
        self.state.get()
    }

    /// True once the thread has exited, whether or not `stop` was called.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Requests cancellation and blocks until the thread has exited.
    pub fn stop(mut self) -> Result<RunnerReport<W>> {
        match self.thread.take() {
            Some(handle) => self.join(handle),
            None => Err(LinkError::WorkerPanicked(self.name.clone())),
        }
    }

    fn join(&self, handle: JoinHandle<RunnerReport<W>>) -> Result<RunnerReport<W>> {
        debug!("[{}] stop requested", self.name);
        self.cancel.cancel();

        match handle.join() {
            Ok(report) if report.panicked => Err(LinkError::WorkerPanicked(self.name.clone())),
            Ok(report) => Ok(report),
            Err(_) => {
                error!("[{}] worker thread panicked", self.name);
                self.state.set(RunnerState::Error);
                Err(LinkError::WorkerPanicked(self.name.clone()))
            }
        }
    }
}

impl<W: Worker> Drop for Runner<W> {
    fn drop(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = self.join(handle);
        }
    }
}

fn run_worker<W: Worker>(
    name: String,
    mut worker: W,
    cancel: CancelToken,
    state: Arc<StateCell>,
) -> RunnerReport<W> {
    state.set(RunnerState::Starting);

    if let Err(e) = worker.start() {
        error!("[{}] start failed: {}", name, e);
        state.set(RunnerState::Error);
        return RunnerReport {
            worker,
            state: RunnerState::Error,
            start: Err(e),
            stop: None,
            iterations: 0,
            panicked: false,
        };
    }

    state.set(RunnerState::Running);
    info!("[{}] running", name);

    let mut iterations = 0u64;
    let mut panicked = false;
    loop {
        if cancel.is_cancelled() {
            debug!("[{}] cancelled after {} iterations", name, iterations);
            break;
        }
        iterations += 1;
        match panic::catch_unwind(AssertUnwindSafe(|| worker.poll(&cancel))) {
            Ok(LoopAction::Continue) => {}
            Ok(LoopAction::Stop) => {
                debug!("[{}] worker finished after {} iterations", name, iterations);
                break;
            }
            Err(_) => {
                error!("[{}] worker panicked in poll, releasing it", name);
                panicked = true;
                break;
            }
        }
    }

    state.set(RunnerState::Stopping);
    let stop = worker.stop();
    if let Err(e) = &stop {
        warn!("[{}] stop failed: {}", name, e);
    }

    let final_state = if panicked {
        RunnerState::Error
    } else {
        RunnerState::Stopped
    };
    state.set(final_state);
    info!("[{}] stopped", name);

    RunnerReport {
        worker,
        state: final_state,
        start: Ok(()),
        stop: Some(stop),
        iterations,
        panicked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Calls {
        start: AtomicUsize,
        poll: AtomicUsize,
        stop: AtomicUsize,
    }

    struct Scripted {
        calls: Arc<Calls>,
        fail_start: bool,
        fail_stop: bool,
        stop_after: Option<usize>,
        panic_in_poll: bool,
    }

    impl Scripted {
        fn new(calls: &Arc<Calls>) -> Self {
            Self {
                calls: calls.clone(),
                fail_start: false,
                fail_stop: false,
                stop_after: None,
                panic_in_poll: false,
            }
        }
    }

    impl Worker for Scripted {
        fn start(&mut self) -> Result<()> {
            self.calls.start.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                return Err(LinkError::StartFailed {
                    name: "scripted".into(),
                    reason: "no device".into(),
                });
            }
            Ok(())
        }

        fn poll(&mut self, cancel: &CancelToken) -> LoopAction {
            if self.panic_in_poll {
                panic!("poll blew up");
            }
            let n = self.calls.poll.fetch_add(1, Ordering::SeqCst) + 1;
            if self.stop_after.is_some_and(|limit| n >= limit) {
                return LoopAction::Stop;
            }
            cancel.sleep(Duration::from_millis(2));
            LoopAction::Continue
        }

        fn stop(&mut self) -> Result<()> {
            self.calls.stop.fetch_add(1, Ordering::SeqCst);
            if self.fail_stop {
                return Err(LinkError::StopFailed {
                    name: "scripted".into(),
                    reason: "device busy".into(),
                });
            }
            Ok(())
        }
    }

    fn wait_for<F: Fn() -> bool>(cond: F) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_failed_start_skips_loop_and_stop() {
        let calls = Arc::new(Calls::default());
        let mut worker = Scripted::new(&calls);
        worker.fail_start = true;

        let runner = Runner::start("worker-fail", worker).expect("spawn");
        wait_for(|| runner.is_finished());
        assert_eq!(runner.state(), RunnerState::Error);

        let report = runner.stop().expect("join");
        assert_eq!(report.state, RunnerState::Error);
        assert!(report.start.is_err());
        assert!(report.stop.is_none());
        assert_eq!(report.iterations, 0);
        assert_eq!(calls.start.load(Ordering::SeqCst), 1);
        assert_eq!(calls.poll.load(Ordering::SeqCst), 0);
        assert_eq!(calls.stop.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_request_runs_stop_exactly_once() {
        let calls = Arc::new(Calls::default());
        let runner = Runner::start("worker-run", Scripted::new(&calls)).expect("spawn");

        wait_for(|| calls.poll.load(Ordering::SeqCst) >= 3);
        assert_eq!(runner.state(), RunnerState::Running);

        let report = runner.stop().expect("join");
        assert!(report.is_clean());
        assert_eq!(report.state, RunnerState::Stopped);
        assert_eq!(calls.stop.load(Ordering::SeqCst), 1);

        // Joined: the loop can no longer run.
        let polls = calls.poll.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.poll.load(Ordering::SeqCst), polls);
        assert_eq!(report.iterations as usize, polls);
    }

    #[test]
    fn test_worker_can_end_its_own_loop() {
        let calls = Arc::new(Calls::default());
        let mut worker = Scripted::new(&calls);
        worker.stop_after = Some(4);

        let runner = Runner::start("worker-self-stop", worker).expect("spawn");
        wait_for(|| runner.state() == RunnerState::Stopped);
        assert_eq!(calls.stop.load(Ordering::SeqCst), 1);

        let report = runner.stop().expect("join");
        assert_eq!(report.iterations, 4);
        assert_eq!(calls.poll.load(Ordering::SeqCst), 4);
        assert_eq!(calls.stop.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_failure_is_reported_not_retried() {
        let calls = Arc::new(Calls::default());
        let mut worker = Scripted::new(&calls);
        worker.fail_stop = true;

        let runner = Runner::start("worker-stop-fail", worker).expect("spawn");
        wait_for(|| calls.poll.load(Ordering::SeqCst) >= 1);

        let report = runner.stop().expect("join");
        assert_eq!(report.state, RunnerState::Stopped);
        assert!(matches!(report.stop, Some(Err(LinkError::StopFailed { .. }))));
        assert_eq!(calls.stop.load(Ordering::SeqCst), 1);
        assert!(report.into_result().is_err());
    }

    #[test]
    fn test_drop_without_stop_still_joins() {
        let calls = Arc::new(Calls::default());
        let runner = Runner::start("worker-drop", Scripted::new(&calls)).expect("spawn");
        wait_for(|| calls.poll.load(Ordering::SeqCst) >= 1);

        drop(runner);
        assert_eq!(calls.stop.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_worker_is_handed_back() {
        let calls = Arc::new(Calls::default());
        let runner = Runner::start("worker-handback", Scripted::new(&calls)).expect("spawn");
        assert_eq!(runner.name(), "worker-handback");

        let worker = runner.stop().expect("join").into_result().expect("clean run");
        assert!(Arc::ptr_eq(&worker.calls, &calls));
    }

    #[test]
    fn test_panicking_worker_surfaces_on_stop() {
        let calls = Arc::new(Calls::default());
        let mut worker = Scripted::new(&calls);
        worker.panic_in_poll = true;

        let runner = Runner::start("worker-panic", worker).expect("spawn");
        wait_for(|| runner.is_finished());

        assert_eq!(runner.state(), RunnerState::Error);

        let err = runner.stop().err().expect("panic should surface");
        assert!(matches!(err, LinkError::WorkerPanicked(name) if name == "worker-panic"));
        assert_eq!(calls.start.load(Ordering::SeqCst), 1);
        assert_eq!(calls.poll.load(Ordering::SeqCst), 0);
        assert_eq!(calls.stop.load(Ordering::SeqCst), 1);
    }
}
