use crate::ports;
use crate::types::timers::Timer;
use crate::types::users::UserId;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::oneshot;

pub(crate) fn t0() -> OffsetDateTime {
    OffsetDateTime::parse("2025-01-12T09:30:00Z", &Rfc3339).expect("parse t0")
}

pub(crate) fn timer(id: i64, user_id: UserId, description: &str) -> Timer {
    Timer {
        id,
        user_id,
        description: description.to_string(),
        start: t0(),
        end: None,
        is_active: true,
    }
}

/// Clock whose sleeps only finish when the test says so.
#[derive(Clone)]
pub(crate) struct TestTime {
    now: Arc<Mutex<OffsetDateTime>>,
    sleeps: Arc<Mutex<Vec<oneshot::Sender<()>>>>,
    durations: Arc<Mutex<Vec<Duration>>>,
}

impl TestTime {
    pub(crate) fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
            durations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn advance(&self, by: time::Duration) {
        let mut now = self.now.lock().expect("now lock");
        *now += by;
    }

    pub(crate) fn sleep_durations(&self) -> Vec<Duration> {
        self.durations.lock().expect("durations lock").clone()
    }

    pub(crate) fn pending_sleeps(&self) -> usize {
        self.sleeps.lock().expect("sleeps lock").len()
    }

    /// Wait until some task is parked in `sleep`.
    pub(crate) async fn wait_for_sleeper(&self) {
        while self.pending_sleeps() == 0 {
            tokio::task::yield_now().await;
        }
    }

    pub(crate) fn trigger_all(&self) {
        let mut sends = self.sleeps.lock().expect("sleeps lock");
        for sender in sends.drain(..) {
            let _ = sender.send(());
        }
    }
}

pub(crate) struct ManualSleep {
    receiver: oneshot::Receiver<()>,
}

impl Future for ManualSleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(_) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl ports::TimeProvider for TestTime {
    type Sleep<'a>
        = ManualSleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("now lock")
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        let (sender, receiver) = oneshot::channel();
        self.durations
            .lock()
            .expect("durations lock")
            .push(duration);
        self.sleeps.lock().expect("sleeps lock").push(sender);
        ManualSleep { receiver }
    }
}

#[derive(Debug)]
pub(crate) struct TestSourceError;

impl std::fmt::Display for TestSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("storage unavailable")
    }
}

/// In-memory timer source that can be switched into a failing state.
#[derive(Clone, Default)]
pub(crate) struct TestSource {
    timers: Arc<Mutex<Vec<Timer>>>,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl TestSource {
    pub(crate) fn with_timers(timers: Vec<Timer>) -> Self {
        let source = Self::default();
        *source.timers.lock().expect("timers lock") = timers;
        source
    }

    pub(crate) fn push(&self, timer: Timer) {
        self.timers.lock().expect("timers lock").push(timer);
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ports::TimerSource for TestSource {
    type Error = TestSourceError;
    type Fut<'a>
        = std::future::Ready<Result<Vec<Timer>, Self::Error>>
    where
        Self: 'a;

    fn timers_for_user<'a>(&'a self, user_id: UserId) -> Self::Fut<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return std::future::ready(Err(TestSourceError));
        }
        let timers = self
            .timers
            .lock()
            .expect("timers lock")
            .iter()
            .filter(|timer| timer.user_id == user_id)
            .cloned()
            .collect();
        std::future::ready(Ok(timers))
    }
}
