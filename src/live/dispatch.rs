use super::{ConnectionRegistry, snapshot_for_user};
use crate::ports;
use crate::types::users::UserId;

use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Pushes a fresh snapshot to every live connection of a user after one of
/// their timers changed.
#[derive(Clone)]
pub struct Dispatcher<S, T> {
    registry: Arc<ConnectionRegistry>,
    source: S,
    time: T,
}

impl<S, T> Dispatcher<S, T>
where
    S: ports::TimerSource,
    T: ports::TimeProvider,
{
    pub fn new(registry: Arc<ConnectionRegistry>, source: S, time: T) -> Self {
        Self {
            registry,
            source,
            time,
        }
    }

    /// Fire-and-forget broadcast for `user_id`.
    pub fn notify(&self, user_id: UserId) -> JoinHandle<DeliveryReport> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.broadcast(user_id).await })
    }

    /// Deliver one snapshot to each registered channel of `user_id`. A closed
    /// channel is released from the registry and does not affect the others.
    pub async fn broadcast(&self, user_id: UserId) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let channels = self.registry.channels_for_user(user_id);
        if channels.is_empty() {
            return report;
        }

        let message = match snapshot_for_user(&self.source, &self.time, user_id).await {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "broadcast skipped");
                return report;
            }
        };

        for (key, channel) in channels {
            match channel.send(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    self.registry.release(&key, channel.id());
                    tracing::debug!(
                        user_id,
                        connection_id = channel.id(),
                        error = %err,
                        "broadcast dropped closed channel"
                    );
                    report.dropped += 1;
                }
            }
        }

        tracing::debug!(
            user_id,
            delivered = report.delivered,
            dropped = report.dropped,
            "broadcast delivered"
        );
        report
    }
}
