use std::{
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    common::types::{AnyResult, ChannelId, UserId},
    gateway::constants::{
        GATEWAY_HOST, GATEWAY_INTENTS, GATEWAY_VERSION, RECONNECT_DELAY_FRESH_MS,
        WRITE_TASK_SHUTDOWN_MS,
    },
    protocol::events::{VoiceEvent, VoiceState},
};

pub mod backoff;
pub mod handler;
pub mod heartbeat;
pub mod types;

use self::{
    backoff::Backoff,
    types::{GatewayPayload, SessionOutcome, is_fatal_close, is_reidentify_close, is_resumable_close},
};

/// Resume coordinates captured from READY.
struct ResumeState {
    session_id: String,
    resume_url: String,
}

/// Long-lived client for the platform's main gateway. Decodes voice-state
/// dispatches into [`VoiceEvent`]s and forwards them to the tracker side.
pub struct GatewayClient {
    token: String,
    event_tx: flume::Sender<VoiceEvent>,
    resume: RwLock<Option<ResumeState>>,
    /// Last known voice channel per user, used to derive `previous`.
    voice_states: DashMap<UserId, ChannelId>,
    cancel_token: CancellationToken,
}

impl GatewayClient {
    pub fn new(
        token: String,
        event_tx: flume::Sender<VoiceEvent>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            token,
            event_tx,
            resume: RwLock::new(None),
            voice_states: DashMap::new(),
            cancel_token,
        }
    }

    pub async fn run(self) -> AnyResult<()> {
        let mut backoff = Backoff::new();
        let mut is_resume = false;
        let seq = Arc::new(AtomicI64::new(-1));

        loop {
            if self.cancel_token.is_cancelled() {
                return Ok(());
            }

            match self.connect(is_resume, seq.clone()).await {
                Ok(SessionOutcome::Shutdown) => {
                    debug!("Gateway shutting down cleanly");
                    return Ok(());
                }
                Ok(SessionOutcome::Reconnect) => {
                    if backoff.is_exhausted() {
                        warn!("Max reconnect attempts reached");
                        return Ok(());
                    }
                    let delay = backoff.next();
                    debug!("Reconnecting in {:?} (resume=true)", delay);
                    tokio::time::sleep(delay).await;
                    is_resume = true;
                }
                Ok(SessionOutcome::Identify) => {
                    if backoff.is_exhausted() {
                        warn!("Max re-identify attempts reached");
                        return Ok(());
                    }
                    is_resume = false;
                    seq.store(-1, Ordering::Relaxed);
                    let delay = Duration::from_millis(RECONNECT_DELAY_FRESH_MS);
                    debug!("Session invalid; identifying fresh in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    backoff.next();
                }
                Err(e) => {
                    if backoff.is_exhausted() {
                        error!("Connection error after max attempts: {}", e);
                        return Err(e);
                    }
                    let delay = backoff.next();
                    warn!("Connection error: {}. Retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    is_resume = false;
                }
            }
        }
    }

    async fn connect(&self, is_resume: bool, seq: Arc<AtomicI64>) -> AnyResult<SessionOutcome> {
        let base = if is_resume {
            self.resume.read().as_ref().map(|r| r.resume_url.clone())
        } else {
            None
        };
        let base = base.unwrap_or_else(|| format!("wss://{}", GATEWAY_HOST));
        let url = format!("{}/?v={}&encoding=json", base, GATEWAY_VERSION);
        debug!("Connecting to gateway: {}", url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&url).await?;
        let (mut write, mut read) = ws_stream.split();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();

        // A child token lets one session's write task die without touching
        // the client-wide shutdown token.
        let conn_cancel = self.cancel_token.child_token();
        let write_cancel = conn_cancel.clone();
        let write_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = write_cancel.cancelled() => break,
                    msg = rx.recv() => {
                        let Some(msg) = msg else { break };
                        if let Err(e) = write.send(msg).await {
                            warn!("WS write error: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        let mut state = handler::SessionState::new(self, tx.clone(), seq.clone(), is_resume);

        let outcome = loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    break SessionOutcome::Shutdown;
                }
                msg = read.next() => {
                    let msg = match msg {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => {
                            warn!("WS read error: {}", e);
                            break SessionOutcome::Reconnect;
                        }
                        None => {
                            debug!("WS stream ended");
                            break SessionOutcome::Reconnect;
                        }
                    };

                    match msg {
                        Message::Text(text) => {
                            if let Some(outcome) = state.handle_text(text.as_str()) {
                                break outcome;
                            }
                        }
                        Message::Close(frame) => {
                            let (code, reason) = frame
                                .map(|cf| (cf.code.into(), cf.reason.to_string()))
                                .unwrap_or((1000u16, "No reason".into()));

                            info!("WS closed: code={}, reason='{}'", code, reason);

                            if is_resumable_close(code) {
                                break SessionOutcome::Reconnect;
                            }
                            if is_reidentify_close(code) {
                                break SessionOutcome::Identify;
                            }
                            if is_fatal_close(code) {
                                error!("Fatal gateway close code {}; giving up", code);
                                break SessionOutcome::Shutdown;
                            }
                            break SessionOutcome::Reconnect;
                        }
                        _ => {}
                    }
                }
            }
        };

        conn_cancel.cancel();
        drop(state);
        drop(tx);
        let _ = tokio::time::timeout(
            Duration::from_millis(WRITE_TASK_SHUTDOWN_MS),
            write_task,
        )
        .await;

        Ok(outcome)
    }

    fn identify_payload(&self) -> GatewayPayload {
        GatewayPayload::new(
            2,
            serde_json::json!({
                "token": self.token,
                "intents": GATEWAY_INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "voicelog",
                    "device": "voicelog",
                },
            }),
        )
    }

    fn resume_payload(&self, seq: i64) -> Option<GatewayPayload> {
        let resume = self.resume.read();
        let r = resume.as_ref()?;
        Some(GatewayPayload::new(
            6,
            serde_json::json!({
                "token": self.token,
                "session_id": r.session_id,
                "seq": seq,
            }),
        ))
    }

    fn store_resume_state(&self, session_id: String, resume_url: String) {
        *self.resume.write() = Some(ResumeState {
            session_id,
            resume_url,
        });
    }

    fn clear_resume_state(&self) {
        *self.resume.write() = None;
    }

    /// Record the new state and derive the previous channel atomically.
    fn observe_voice_state(&self, state: &VoiceState) -> VoiceEvent {
        let previous = match state.channel_id {
            Some(channel) => self.voice_states.insert(state.user_id, channel),
            None => self.voice_states.remove(&state.user_id).map(|(_, ch)| ch),
        };
        VoiceEvent {
            user: state.user_id,
            previous,
            current: state.channel_id,
        }
    }

    fn seed_voice_state(&self, user: UserId, channel: ChannelId) {
        self.voice_states.insert(user, channel);
    }

    fn forward_event(&self, event: VoiceEvent) -> Result<(), flume::SendError<VoiceEvent>> {
        self.event_tx.send(event)
    }
}
