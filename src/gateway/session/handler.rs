use std::sync::{
    Arc,
    atomic::{AtomicI64, AtomicU64, Ordering},
};

use serde_json::Value;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use super::{
    GatewayClient,
    heartbeat::{heartbeat_payload, spawn_heartbeat},
    types::{GatewayPayload, SessionOutcome},
};
use crate::{
    gateway::constants::DEFAULT_HEARTBEAT_INTERVAL_MS,
    protocol::events::VoiceState,
};

pub struct SessionState<'a> {
    client: &'a GatewayClient,
    tx: tokio::sync::mpsc::UnboundedSender<Message>,
    seq: Arc<AtomicI64>,
    is_resume: bool,
    heartbeat_handle: Option<tokio::task::JoinHandle<()>>,
    last_heartbeat: Arc<AtomicU64>,
}

impl<'a> SessionState<'a> {
    pub fn new(
        client: &'a GatewayClient,
        tx: tokio::sync::mpsc::UnboundedSender<Message>,
        seq: Arc<AtomicI64>,
        is_resume: bool,
    ) -> Self {
        Self {
            client,
            tx,
            seq,
            is_resume,
            heartbeat_handle: None,
            last_heartbeat: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn handle_text(&mut self, text: &str) -> Option<SessionOutcome> {
        let payload: GatewayPayload = match serde_json::from_str(text) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to parse gateway payload: {} - Text: {}", e, text);
                return None;
            }
        };

        if let Some(s) = payload.s {
            self.seq.store(s, Ordering::Relaxed);
        }

        match payload.op {
            10 => self.handle_hello(payload.d),
            11 => self.handle_heartbeat_ack(),
            1 => self.handle_heartbeat_request(),
            7 => {
                info!("Gateway requested a reconnect");
                Some(SessionOutcome::Reconnect)
            }
            9 => self.handle_invalid_session(payload.d),
            0 => self.handle_dispatch(payload.t.as_deref(), payload.d),
            other => {
                debug!("Unhandled gateway op {}: {:?}", other, payload.d);
                None
            }
        }
    }

    fn handle_hello(&mut self, d: Value) -> Option<SessionOutcome> {
        let interval = d["heartbeat_interval"]
            .as_u64()
            .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS);
        if let Some(h) = self.heartbeat_handle.take() {
            h.abort();
        }

        debug!("Heartbeat interval set to {}ms", interval);
        self.heartbeat_handle = Some(spawn_heartbeat(
            self.tx.clone(),
            self.seq.clone(),
            self.last_heartbeat.clone(),
            interval,
        ));

        // Identify (or resume) only after Hello, as the gateway requires.
        let resume = if self.is_resume {
            self.client.resume_payload(self.seq.load(Ordering::Relaxed))
        } else {
            None
        };
        match resume {
            Some(payload) => {
                info!("Resuming gateway session");
                self.send(payload);
            }
            None => self.send(self.client.identify_payload()),
        }
        None
    }

    fn handle_heartbeat_ack(&self) -> Option<SessionOutcome> {
        let sent_ms = self.last_heartbeat.load(Ordering::Relaxed);
        if sent_ms > 0 {
            let now_ms = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;
            debug!("Heartbeat acknowledged in {}ms", now_ms.saturating_sub(sent_ms));
        }
        None
    }

    /// The gateway may request an immediate beat outside the interval.
    fn handle_heartbeat_request(&self) -> Option<SessionOutcome> {
        self.send(heartbeat_payload(self.seq.load(Ordering::Relaxed)));
        None
    }

    fn handle_invalid_session(&self, d: Value) -> Option<SessionOutcome> {
        if d.as_bool().unwrap_or(false) {
            warn!("Session invalidated; resume is possible");
            Some(SessionOutcome::Reconnect)
        } else {
            warn!("Session invalidated; fresh identify required");
            self.client.clear_resume_state();
            Some(SessionOutcome::Identify)
        }
    }

    fn handle_dispatch(&mut self, event_type: Option<&str>, d: Value) -> Option<SessionOutcome> {
        match event_type {
            Some("READY") => self.handle_ready(d),
            Some("RESUMED") => {
                info!("Gateway session resumed successfully");
                None
            }
            Some("VOICE_STATE_UPDATE") => self.handle_voice_state(d),
            Some("GUILD_CREATE") => self.handle_guild_create(d),
            Some(other) => {
                debug!("Ignoring dispatch {}", other);
                None
            }
            None => {
                debug!("Dispatch without an event type");
                None
            }
        }
    }

    fn handle_ready(&mut self, d: Value) -> Option<SessionOutcome> {
        let username = d["user"]["username"].as_str().unwrap_or("unknown");
        let guilds = d["guilds"].as_array().map(|g| g.len()).unwrap_or(0);
        info!("Logged in as {} ({} guilds visible)", username, guilds);

        let session_id = d["session_id"].as_str().unwrap_or_default();
        let resume_url = d["resume_gateway_url"].as_str().unwrap_or_default();
        if session_id.is_empty() || resume_url.is_empty() {
            warn!("READY missing resume fields; resume disabled for this session");
        } else {
            self.client
                .store_resume_state(session_id.to_string(), resume_url.to_string());
        }
        None
    }

    fn handle_voice_state(&mut self, d: Value) -> Option<SessionOutcome> {
        let Some(state) = VoiceState::from_dispatch(&d) else {
            warn!("Malformed VOICE_STATE_UPDATE payload: {}", d);
            return None;
        };

        let event = self.client.observe_voice_state(&state);
        debug!(
            "Voice transition for {} (guild {:?}): {:?} -> {:?}",
            event.user, state.guild_id, event.previous, event.current
        );

        if self.client.forward_event(event).is_err() {
            warn!("Event consumer is gone; shutting the gateway down");
            return Some(SessionOutcome::Shutdown);
        }
        None
    }

    /// Members already in voice when a guild becomes available are seeded
    /// into the cache so their eventual leave carries the right previous
    /// channel. No events are emitted for them.
    fn handle_guild_create(&mut self, d: Value) -> Option<SessionOutcome> {
        let Some(states) = d["voice_states"].as_array() else {
            return None;
        };

        let mut seeded = 0usize;
        for vs in states {
            if let Some(state) = VoiceState::from_dispatch(vs) {
                if let Some(channel) = state.channel_id {
                    self.client.seed_voice_state(state.user_id, channel);
                    seeded += 1;
                }
            }
        }
        if seeded > 0 {
            debug!(
                "Seeded {} voice states from guild {}",
                seeded,
                d["id"].as_str().unwrap_or("?")
            );
        }
        None
    }

    fn send(&self, payload: GatewayPayload) {
        if let Ok(json) = serde_json::to_string(&payload) {
            let _ = self.tx.send(Message::Text(json.into()));
        }
    }
}

impl<'a> Drop for SessionState<'a> {
    fn drop(&mut self) {
        if let Some(h) = self.heartbeat_handle.take() {
            h.abort();
        }
    }
}
