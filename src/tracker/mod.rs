use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::{
    common::{
        errors::NotifyError,
        types::{ChannelId, UserId},
    },
    protocol::events::VoiceEvent,
};

pub mod classifier;
pub mod report;

pub use classifier::{Classification, WatchScope};

/// Outbound capability to post a text message to a channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<(), NotifyError>;
}

/// Correlates join/leave events per participant and reports the session
/// duration when a participant leaves the watched scope.
///
/// One instance is shared across every event-handling task; the session map
/// is the only mutable state and every access goes through an atomic
/// insert/remove.
pub struct SessionTracker {
    scope: WatchScope,
    notify_channel: ChannelId,
    notifier: Arc<dyn Notifier>,
    sessions: DashMap<UserId, Instant>,
}

impl SessionTracker {
    pub fn new(scope: WatchScope, notify_channel: ChannelId, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            scope,
            notify_channel,
            notifier,
            sessions: DashMap::new(),
        }
    }

    /// Apply one voice event. Safe to call from concurrently running tasks.
    pub async fn handle_event(&self, event: VoiceEvent) {
        match self.scope.classify(&event) {
            Classification::Join => {
                // A repeat join resets the start time; missed leaves are
                // absorbed here at the cost of the original start.
                self.sessions.insert(event.user, Instant::now());
                debug!("Session opened for {}", event.user);
            }
            Classification::Leave => {
                // The entry is removed before the send so no map shard lock
                // is held across the network call.
                let Some((user, joined_at)) = self.sessions.remove(&event.user) else {
                    info!("{} left with no tracked session; ignoring", event.user);
                    return;
                };
                let elapsed = joined_at.elapsed();
                debug!("Session closed for {} after {:?}", user, elapsed);

                let text = report::session_report(user, elapsed);
                if let Err(e) = self.notifier.send_message(self.notify_channel, &text).await {
                    // The entry is already gone; the report for this session
                    // is lost rather than retried.
                    error!("Failed to deliver session report for {}: {}", user, e);
                }
            }
            Classification::Irrelevant => {}
        }
    }

    /// Number of currently open sessions.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::time::{Duration, advance};

    use super::*;

    const VOICE: ChannelId = ChannelId(100);
    const NOTIFY: ChannelId = ChannelId(200);

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(ChannelId, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_message(&self, channel: ChannelId, content: &str) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Api {
                    status: 500,
                    body: "boom".into(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((channel, content.to_string()));
            Ok(())
        }
    }

    fn tracker_with(notifier: Arc<RecordingNotifier>) -> SessionTracker {
        SessionTracker::new(WatchScope::Channel(VOICE), NOTIFY, notifier)
    }

    fn event(user: u64, previous: Option<ChannelId>, current: Option<ChannelId>) -> VoiceEvent {
        VoiceEvent {
            user: UserId(user),
            previous,
            current,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_then_leave_reports_once() {
        let notifier = Arc::new(RecordingNotifier::default());
        let tracker = tracker_with(notifier.clone());

        tracker.handle_event(event(1, None, Some(VOICE))).await;
        assert_eq!(tracker.open_sessions(), 1);

        advance(Duration::from_secs(65)).await;
        tracker.handle_event(event(1, Some(VOICE), None)).await;

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, NOTIFY);
        assert!(sent[0].1.contains("<@1>"));
        assert!(sent[0].1.contains("00:01:05"));
        assert_eq!(tracker.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_untracked_leave_is_ignored() {
        let notifier = Arc::new(RecordingNotifier::default());
        let tracker = tracker_with(notifier.clone());

        tracker.handle_event(event(2, Some(VOICE), None)).await;

        assert!(notifier.sent.lock().unwrap().is_empty());
        assert_eq!(tracker.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_join_resets_the_clock() {
        let notifier = Arc::new(RecordingNotifier::default());
        let tracker = tracker_with(notifier.clone());

        tracker.handle_event(event(1, None, Some(VOICE))).await;
        advance(Duration::from_secs(600)).await;
        // Second join with no leave in between, as happens when a leave
        // event was missed.
        tracker.handle_event(event(1, None, Some(VOICE))).await;
        assert_eq!(tracker.open_sessions(), 1);

        advance(Duration::from_secs(65)).await;
        tracker.handle_event(event(1, Some(VOICE), None)).await;

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("00:01:05"), "got: {}", sent[0].1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_switch_keeps_session_open_under_any_scope() {
        let notifier = Arc::new(RecordingNotifier::default());
        let tracker = SessionTracker::new(WatchScope::AnyChannel, NOTIFY, notifier.clone());
        let other = ChannelId(300);

        tracker.handle_event(event(1, None, Some(VOICE))).await;
        advance(Duration::from_secs(10)).await;
        tracker.handle_event(event(1, Some(VOICE), Some(other))).await;

        assert_eq!(tracker.open_sessions(), 1);
        assert!(notifier.sent.lock().unwrap().is_empty());

        advance(Duration::from_secs(10)).await;
        tracker.handle_event(event(1, Some(other), None)).await;

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("00:00:20"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_still_closes_the_session() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let tracker = tracker_with(notifier.clone());

        tracker.handle_event(event(1, None, Some(VOICE))).await;
        tracker.handle_event(event(1, Some(VOICE), None)).await;

        assert!(notifier.sent.lock().unwrap().is_empty());
        assert_eq!(tracker.open_sessions(), 0);

        // A duplicate leave after the failure is just an untracked leave.
        tracker.handle_event(event(1, Some(VOICE), None)).await;
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_sessions_do_not_interfere() {
        const USERS: u64 = 16;

        let notifier = Arc::new(RecordingNotifier::default());
        let tracker = Arc::new(tracker_with(notifier.clone()));

        let joins: Vec<_> = (0..USERS)
            .map(|i| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    tracker.handle_event(event(i, None, Some(VOICE))).await;
                })
            })
            .collect();
        for join in joins {
            join.await.unwrap();
        }
        assert_eq!(tracker.open_sessions(), USERS as usize);

        advance(Duration::from_secs(5)).await;

        let leaves: Vec<_> = (0..USERS)
            .map(|i| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    tracker.handle_event(event(i, Some(VOICE), None)).await;
                })
            })
            .collect();
        for leave in leaves {
            leave.await.unwrap();
        }

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), USERS as usize);
        let distinct: std::collections::HashSet<&String> =
            sent.iter().map(|(_, text)| text).collect();
        assert_eq!(distinct.len(), USERS as usize);
        assert_eq!(tracker.open_sessions(), 0);
    }
}
