use std::time::Duration;

use time::OffsetDateTime;

/// Wall clock and sleeping, swappable so the refresh loop and the
/// presentation of elapsed times can be driven by hand in tests.
pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime;
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;
}
