pub mod time;
pub mod timers;

pub use self::time::TimeProvider;
pub use self::timers::TimerSource;
