use std::pin::Pin;
use std::time::Duration;

use time::OffsetDateTime;

use crate::ports;
use crate::store::{Store, StoreError};
use crate::types::timers::Timer;
use crate::types::users::UserId;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

impl ports::TimerSource for Store {
    type Error = StoreError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<Vec<Timer>, Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn timers_for_user<'a>(&'a self, user_id: UserId) -> Self::Fut<'a> {
        Box::pin(self.run(move |store| store.list_by_user(user_id, None)))
    }
}
