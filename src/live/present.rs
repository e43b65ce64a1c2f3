//! Display fields derived from stored timestamps at send time.

use crate::types::live::TimerView;
use crate::types::timers::Timer;

use time::OffsetDateTime;

/// Map one stored timer for display: active timers carry `progress`
/// (`now - start`), stopped ones `duration` (`end - start`), both in
/// milliseconds. Negative spans and records that break the active/end
/// pairing are logged and marked as anomalies; a negative span is shown as 0.
pub fn present_timer(timer: &Timer, now: OffsetDateTime) -> TimerView {
    let mut view = TimerView {
        id: timer.id,
        description: timer.description.clone(),
        is_active: timer.is_active,
        start: timer.start,
        end: timer.end,
        progress: None,
        duration: None,
        anomaly: false,
    };

    if !timer.is_consistent() {
        tracing::warn!(
            timer_id = timer.id,
            user_id = timer.user_id,
            is_active = timer.is_active,
            has_end = timer.end.is_some(),
            "timer record has inconsistent active flag and end"
        );
        view.anomaly = true;
    }

    match (timer.is_active, timer.end) {
        (true, _) => {
            let (progress, negative) = span_millis(timer.start, now);
            if negative {
                tracing::warn!(
                    timer_id = timer.id,
                    user_id = timer.user_id,
                    "active timer starts in the future"
                );
                view.anomaly = true;
            }
            view.progress = Some(progress);
        }
        (false, Some(end)) => {
            let (duration, negative) = span_millis(timer.start, end);
            if negative {
                tracing::warn!(
                    timer_id = timer.id,
                    user_id = timer.user_id,
                    "stopped timer ends before it starts"
                );
                view.anomaly = true;
            }
            view.duration = Some(duration);
        }
        (false, None) => {}
    }

    view
}

/// Map a whole list, preserving order.
pub fn present_timers(timers: &[Timer], now: OffsetDateTime) -> Vec<TimerView> {
    timers.iter().map(|timer| present_timer(timer, now)).collect()
}

fn span_millis(from: OffsetDateTime, to: OffsetDateTime) -> (i64, bool) {
    let millis = (to - from).whole_milliseconds();
    if millis < 0 {
        return (0, true);
    }
    (i64::try_from(millis).unwrap_or(i64::MAX), false)
}
