use crate::types::timers::Timer;
use crate::types::users::UserId;

/// Read side of the timer store used by the live push paths.
pub trait TimerSource: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<Vec<Timer>, Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn timers_for_user<'a>(&'a self, user_id: UserId) -> Self::Fut<'a>;
}
