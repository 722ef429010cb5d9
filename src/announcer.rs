use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{config::AnnouncerConfig, tracker::Notifier};

/// Posts a fixed message to a channel on a fixed interval until cancelled.
///
/// Send failures are logged and the next tick proceeds normally.
pub fn spawn_announcer(
    config: AnnouncerConfig,
    notifier: Arc<dyn Notifier>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = std::time::Duration::from_secs(config.interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        // The immediate first tick is skipped so the first post waits a full
        // period, like the original schedule.
        interval.tick().await;

        info!(
            "Announcer posting to {} every {:?}",
            config.channel_id, period
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = notifier
                        .send_message(config.channel_id, &config.message)
                        .await
                    {
                        warn!("Announcer send failed: {}", e);
                    }
                }
            }
        }
    })
}
