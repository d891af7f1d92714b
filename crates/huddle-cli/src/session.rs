//! One scripted channel session against the loopback transport.

use std::sync::Arc;
use std::time::Duration;

use huddle_channel::{
    ChannelManager, Event, LoopbackTransport, MediaKind, StaticCredentialProvider,
    TransportError,
};
use huddle_common::{HuddleError, Result};
use huddle_config::HuddleConfig;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::cli::Args;
use crate::settings;

pub async fn run(args: &Args, config: &HuddleConfig) -> Result<()> {
    let settings = settings::channel_settings(config);
    let publish_deadline = settings::publish_deadline(&settings);

    let (transport, transport_events) = LoopbackTransport::new(settings.event_buffer);
    for _ in 0..args.publish_failures {
        transport.push_publish_failure(TransportError::disconnected("simulated connection drop"));
    }
    transport.fail_leave(args.fail_leave);

    let credentials = StaticCredentialProvider::new(
        config.credentials.transport_identity.clone(),
        Duration::from_secs(config.credentials.token_ttl_secs),
    );
    let manager = ChannelManager::new(
        Arc::new(transport.clone()),
        transport_events,
        Arc::new(credentials),
        settings,
    );

    let printer = tokio::spawn(print_events(manager.subscribe_events()));
    let mut publish_events = manager.subscribe_events();

    let outcome = manager
        .join(&args.channel, args.uid)
        .await
        .map_err(|e| HuddleError::Channel(e.to_string()))?;
    tracing::info!(channel = %args.channel, ?outcome, "join finished");

    for n in 1..=args.remotes {
        transport
            .remote_publish(&format!("agent-{n}"), MediaKind::Audio)
            .await;
    }

    let published = tokio::time::timeout(publish_deadline, wait_for_publish(&mut publish_events))
        .await
        .unwrap_or(false);
    if !published {
        tracing::warn!("continuing without local audio");
    } else if args.mute {
        let muted = manager
            .toggle_mute()
            .await
            .map_err(|e| HuddleError::Transport(e.to_string()))?;
        tracing::info!(muted, "mute toggled");
    }

    let participants = manager.remote_participants();
    tracing::info!(
        state = %manager.connection_state(),
        participants = participants.len(),
        "in channel"
    );

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.hold_secs)) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted, leaving"),
    }

    if args.remotes > 0 {
        transport.remote_leave("agent-1").await;
    }
    manager.leave().await;
    tracing::info!(state = %manager.connection_state(), "session finished");

    drop(manager);
    if tokio::time::timeout(Duration::from_secs(1), printer).await.is_err() {
        tracing::debug!("event printer did not finish");
    }
    Ok(())
}

/// True once the microphone is published, false if publishing was given up.
async fn wait_for_publish(rx: &mut broadcast::Receiver<Event>) -> bool {
    loop {
        match rx.recv().await {
            Ok(Event::LocalAudioPublished) => return true,
            Ok(Event::PublishAbandoned { .. }) => return false,
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => return false,
        }
    }
}

/// Print every channel event as one JSON line on stdout.
async fn print_events(mut rx: broadcast::Receiver<Event>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event printer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
