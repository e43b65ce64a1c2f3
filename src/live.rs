//! Real-time push of timer snapshots to live connections.
//!
//! A connection registers a [`LiveChannel`] under its [`ConnectionKey`], is
//! driven by its own [`RefreshScheduler`] task, and additionally receives a
//! snapshot whenever the [`Dispatcher`] is told that the user's timers
//! changed. Every push is a full snapshot, so duplicates and reordering
//! between the two paths are harmless.

mod connection;
mod dispatch;
pub mod present;
mod registry;
mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use connection::run_connection;
pub use dispatch::{DeliveryReport, Dispatcher};
pub use registry::{ChannelClosed, ConnectionId, ConnectionKey, ConnectionRegistry, LiveChannel};
pub use scheduler::{RefreshHandle, RefreshScheduler};

use crate::ports;
use crate::types::live::ServerMessage;
use crate::types::users::UserId;

#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    #[error("failed to load timers for user {user_id}: {message}")]
    Source { user_id: UserId, message: String },
    #[error(transparent)]
    Closed(#[from] ChannelClosed),
}

/// Fetch the user's timers and map them for display. No registry lock is
/// held while the source is queried.
pub async fn snapshot_for_user<S, T>(
    source: &S,
    time: &T,
    user_id: UserId,
) -> Result<ServerMessage, LiveError>
where
    S: ports::TimerSource,
    T: ports::TimeProvider,
{
    let timers = source
        .timers_for_user(user_id)
        .await
        .map_err(|err| LiveError::Source {
            user_id,
            message: err.to_string(),
        })?;
    let list = present::present_timers(&timers, time.now());
    Ok(ServerMessage::AllTimers { list })
}

async fn push_snapshot<S, T>(
    source: &S,
    time: &T,
    user_id: UserId,
    channel: &LiveChannel,
) -> Result<(), LiveError>
where
    S: ports::TimerSource,
    T: ports::TimeProvider,
{
    let message = snapshot_for_user(source, time, user_id).await?;
    channel.send(message)?;
    Ok(())
}
