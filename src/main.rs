use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use voicelog::{
    announcer::spawn_announcer,
    common::{logger, types::AnyResult},
    config::{Config, ScopeKind},
    gateway::GatewayClient,
    rest::RestClient,
    tracker::{SessionTracker, WatchScope},
};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = Config::load()?;
    logger::init(&config);

    let scope = match config.tracker.scope {
        ScopeKind::Channel => {
            let target = config
                .tracker
                .channel_id
                .ok_or("tracker.channel_id is required when tracker.scope = \"channel\"")?;
            WatchScope::Channel(target)
        }
        ScopeKind::Any => WatchScope::AnyChannel,
    };

    let rest = Arc::new(RestClient::new(config.discord.token.clone())?);
    let tracker = Arc::new(SessionTracker::new(
        scope,
        config.tracker.notify_channel_id,
        rest.clone(),
    ));

    let shutdown = CancellationToken::new();
    let (event_tx, event_rx) = flume::unbounded();

    let gateway = GatewayClient::new(config.discord.token.clone(), event_tx, shutdown.clone());
    let gateway_task = tokio::spawn(async move {
        if let Err(e) = gateway.run().await {
            error!("Gateway session ended with error: {}", e);
        }
    });

    if let Some(announcer_config) = config.announcer.clone() {
        spawn_announcer(announcer_config, rest.clone(), shutdown.clone());
    }

    info!("voicelog is running; press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            event = event_rx.recv_async() => {
                match event {
                    Ok(event) => {
                        // One task per event delivery; the tracker's map
                        // absorbs the interleaving.
                        let tracker = tracker.clone();
                        tokio::spawn(async move {
                            tracker.handle_event(event).await;
                        });
                    }
                    Err(_) => {
                        error!("Gateway event channel closed");
                        break;
                    }
                }
            }
        }
    }

    shutdown.cancel();
    let _ = gateway_task.await;

    Ok(())
}
