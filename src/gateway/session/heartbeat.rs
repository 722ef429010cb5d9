use std::{
    sync::{
        Arc,
        atomic::{AtomicI64, AtomicU64, Ordering},
    },
    time::Duration,
};

use rand::Rng;
use serde_json::Value;
use tokio_tungstenite::tungstenite::protocol::Message;

use super::types::GatewayPayload;

/// Op 1 heartbeat carrying the last seen sequence number (null before any
/// dispatch has arrived).
pub fn heartbeat_payload(seq: i64) -> GatewayPayload {
    let d = if seq < 0 { Value::Null } else { Value::from(seq) };
    GatewayPayload::new(1, d)
}

pub fn spawn_heartbeat(
    tx_hb: tokio::sync::mpsc::UnboundedSender<Message>,
    seq: Arc<AtomicI64>,
    last_sent_ms: Arc<AtomicU64>,
    interval_ms: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // The first beat lands at a random point inside the first interval,
        // per the gateway contract.
        let jitter = rand::thread_rng().gen_range(0.0..1.0_f64);
        tokio::time::sleep(Duration::from_millis((interval_ms as f64 * jitter) as u64)).await;

        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        loop {
            interval.tick().await;

            let now_ms = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;
            last_sent_ms.store(now_ms, Ordering::Relaxed);

            let beat = heartbeat_payload(seq.load(Ordering::Relaxed));
            if let Ok(json) = serde_json::to_string(&beat) {
                if tx_hb.send(Message::Text(json.into())).is_err() {
                    break; // Channel closed — session ending
                }
            }
        }
    })
}
