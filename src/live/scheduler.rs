use super::{ConnectionKey, ConnectionRegistry, LiveChannel, LiveError, push_snapshot};
use crate::ports;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to a connection's refresh task. The task is aborted on `stop` and
/// when the handle is dropped.
#[derive(Debug)]
pub struct RefreshHandle {
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    #[cfg(test)]
    pub(crate) async fn join(&mut self) -> Result<(), tokio::task::JoinError> {
        (&mut self.handle).await
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
pub struct RefreshScheduler<S, T> {
    source: S,
    time: T,
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
}

impl<S, T> RefreshScheduler<S, T>
where
    S: ports::TimerSource,
    T: ports::TimeProvider,
{
    pub fn new(source: S, time: T, registry: Arc<ConnectionRegistry>, interval: Duration) -> Self {
        Self {
            source,
            time,
            registry,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Push the first snapshot right away, then spawn the periodic refresh.
    /// Fails only when the channel is already closed; a storage failure on
    /// the first snapshot is left for the next tick to retry.
    pub async fn start(
        &self,
        key: ConnectionKey,
        channel: LiveChannel,
    ) -> Result<RefreshHandle, LiveError> {
        match push_snapshot(&self.source, &self.time, key.user_id, &channel).await {
            Ok(()) => {}
            Err(LiveError::Source { user_id, message }) => {
                tracing::warn!(
                    user_id,
                    connection_id = channel.id(),
                    error = %message,
                    "initial snapshot skipped"
                );
            }
            Err(err @ LiveError::Closed(_)) => return Err(err),
        }

        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            scheduler.run(key, channel).await;
        });
        Ok(RefreshHandle { handle })
    }

    async fn run(self, key: ConnectionKey, channel: LiveChannel) {
        loop {
            self.time.sleep(self.interval).await;

            match push_snapshot(&self.source, &self.time, key.user_id, &channel).await {
                Ok(()) => {}
                Err(LiveError::Source { user_id, message }) => {
                    tracing::warn!(
                        user_id,
                        connection_id = channel.id(),
                        error = %message,
                        "refresh tick skipped"
                    );
                }
                Err(LiveError::Closed(_)) => {
                    self.registry.release(&key, channel.id());
                    tracing::debug!(
                        user_id = key.user_id,
                        connection_id = channel.id(),
                        "refresh stopped: channel closed"
                    );
                    break;
                }
            }
        }
    }
}
