pub mod live;
pub mod timers;
pub mod users;
