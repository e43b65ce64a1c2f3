use crate::types::users::UserId;

use time::OffsetDateTime;

pub type TimerId = i64;

/// A stored timer. `end` is set exactly when the timer is no longer active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub id: TimerId,
    pub user_id: UserId,
    pub description: String,
    pub start: OffsetDateTime,
    pub end: Option<OffsetDateTime>,
    pub is_active: bool,
}

impl Timer {
    pub fn is_consistent(&self) -> bool {
        self.is_active == self.end.is_none()
    }
}
