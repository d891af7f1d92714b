use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use huddle_common::{ConnectionState, Event, MediaKind};
use tokio::sync::broadcast;

use super::ChannelManager;
use crate::credentials::{CredentialProvider, StaticCredentialProvider};
use crate::error::{CredentialError, JoinError, TransportError};
use crate::loopback::LoopbackTransport;
use crate::transport::{DisconnectReason, LocalAudioTrack, TransportConnectionState};
use crate::types::{ChannelSettings, JoinOutcome};

struct Harness {
    manager: ChannelManager,
    transport: LoopbackTransport,
}

fn harness() -> Harness {
    harness_with(Arc::new(StaticCredentialProvider::new(
        "huddle-test",
        Duration::from_secs(600),
    )))
}

fn harness_with(credentials: Arc<dyn CredentialProvider>) -> Harness {
    let (transport, events) = LoopbackTransport::new(64);
    let manager = ChannelManager::new(
        Arc::new(transport.clone()),
        events,
        credentials,
        ChannelSettings::default(),
    );
    Harness { manager, transport }
}

struct FailingCredentials;

#[async_trait]
impl CredentialProvider for FailingCredentials {
    async fn issue_token(&self, _channel: &str, _uid: u32) -> Result<String, CredentialError> {
        Err(CredentialError::Token("token service returned 503".into()))
    }

    async fn transport_identity(&self) -> Result<String, CredentialError> {
        Ok("huddle-test".into())
    }
}

/// Let the transport event pump drain without moving the clock.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn states(events: &[Event]) -> Vec<ConnectionState> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::StateChanged { current, .. } => Some(*current),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn join_connects_and_publishes_after_delay() {
    let h = harness();
    let outcome = h.manager.join("room-1", None).await.unwrap();
    assert_eq!(outcome, JoinOutcome::Joined);
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert!(h.manager.has_joined());
    assert_eq!(h.manager.channel().unwrap().name, "room-1");
    assert!(h.manager.local_audio_track().is_none());

    sleep_ms(250).await;
    assert!(h.manager.local_audio_track().is_none());

    sleep_ms(100).await;
    assert!(h.manager.local_audio_track().is_some());
    assert_eq!(h.transport.publish_calls(), 1);
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn join_uses_supplied_uid() {
    let h = harness();
    h.manager.join("room-1", Some(42)).await.unwrap();
    assert_eq!(h.manager.channel().unwrap().local_uid, 42);
}

#[tokio::test(start_paused = true)]
async fn generated_uid_is_nonzero() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    assert_ne!(h.manager.channel().unwrap().local_uid, 0);
}

#[tokio::test(start_paused = true)]
async fn rapid_duplicate_join_is_coalesced() {
    let h = harness();
    h.transport.set_join_latency(Duration::from_millis(100));

    let (first, second) = tokio::join!(
        h.manager.join("room-1", None),
        h.manager.join("room-1", None)
    );
    assert_eq!(first.unwrap(), JoinOutcome::Joined);
    assert_eq!(second.unwrap(), JoinOutcome::Coalesced);
    assert_eq!(h.transport.join_calls(), 1);
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn joining_same_channel_again_is_a_noop() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    let outcome = h.manager.join(" room-1 ", None).await.unwrap();
    assert_eq!(outcome, JoinOutcome::AlreadyJoined);
    assert_eq!(h.transport.join_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_channel_is_rejected() {
    let h = harness();
    let err = h.manager.join("   ", None).await.unwrap_err();
    assert!(matches!(err, JoinError::InvalidChannel(_)));
    assert_eq!(h.transport.join_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn credential_failure_ends_disconnected() {
    let h = harness_with(Arc::new(FailingCredentials));
    let mut events = h.manager.subscribe_events();

    let err = h.manager.join("room-1", None).await.unwrap_err();
    assert!(matches!(err, JoinError::Credential(CredentialError::Token(_))));
    assert_eq!(h.manager.connection_state(), ConnectionState::Disconnected);
    assert!(!h.manager.has_joined());
    assert!(h.manager.channel().is_none());
    assert_eq!(h.transport.join_calls(), 0);

    let events = drain(&mut events);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::JoinFailed { channel, .. } if channel == "room-1")));
    assert_eq!(
        states(&events),
        vec![ConnectionState::Connecting, ConnectionState::Disconnected]
    );
}

#[tokio::test(start_paused = true)]
async fn transport_join_failure_then_rejoin() {
    let h = harness();
    h.transport
        .fail_next_join(TransportError::rejected("invalid token"));

    let err = h.manager.join("room-1", None).await.unwrap_err();
    assert!(matches!(err, JoinError::Transport(_)));
    assert_eq!(h.manager.connection_state(), ConnectionState::Disconnected);
    assert!(!h.manager.has_joined());

    sleep_ms(1000).await;
    assert_eq!(h.transport.publish_calls(), 0);

    let outcome = h.manager.join("room-1", None).await.unwrap();
    assert_eq!(outcome, JoinOutcome::Joined);
    assert_eq!(h.transport.join_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn switching_channels_passes_through_disconnected() {
    let h = harness();
    let mut events = h.manager.subscribe_events();

    h.manager.join("room-1", None).await.unwrap();
    sleep_ms(350).await;
    let first_track = h.transport.created_tracks()[0].clone();

    let outcome = h.manager.join("room-2", None).await.unwrap();
    assert_eq!(outcome, JoinOutcome::Joined);
    assert_eq!(h.manager.channel().unwrap().name, "room-2");
    assert!(first_track.is_closed());
    assert_eq!(h.transport.leave_calls(), 1);

    let seen = states(&drain(&mut events));
    assert_eq!(
        seen,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnecting,
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn leave_while_connecting_cancels_the_join() {
    let h = harness();
    h.transport.set_join_latency(Duration::from_millis(200));

    let (joined, ()) = tokio::join!(h.manager.join("room-1", None), async {
        sleep_ms(50).await;
        h.manager.leave().await;
    });

    assert!(matches!(joined, Err(JoinError::Cancelled { .. })));
    assert_eq!(h.manager.connection_state(), ConnectionState::Disconnected);
    assert!(!h.manager.has_joined());
    // The late transport join is undone.
    assert_eq!(h.transport.leave_calls(), 1);
    assert!(h.transport.joined_channel().is_none());

    sleep_ms(1000).await;
    assert_eq!(h.transport.publish_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn transport_disconnect_while_connecting_cancels_the_join() {
    let h = harness();
    h.transport.set_join_latency(Duration::from_millis(200));

    let (joined, ()) = tokio::join!(h.manager.join("room-1", None), async {
        sleep_ms(50).await;
        h.transport.drop_connection(DisconnectReason::NetworkError).await;
    });

    assert!(matches!(
        joined,
        Err(JoinError::Cancelled { ref channel }) if channel == "room-1"
    ));
    assert_eq!(h.manager.connection_state(), ConnectionState::Disconnected);
    assert!(!h.manager.has_joined());
    assert!(h.transport.joined_channel().is_none());

    sleep_ms(1000).await;
    assert_eq!(h.transport.publish_calls(), 0);
    assert_eq!(h.manager.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn join_during_leave_is_deferred_then_runs() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    h.transport.set_leave_latency(Duration::from_millis(200));

    let ((), deferred) = tokio::join!(h.manager.leave(), async {
        sleep_ms(50).await;
        h.manager.join("room-2", None).await
    });
    assert_eq!(deferred.unwrap(), JoinOutcome::Deferred);
    assert_eq!(h.manager.connection_state(), ConnectionState::Disconnected);

    sleep_ms(600).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert_eq!(h.manager.channel().unwrap().name, "room-2");
    assert_eq!(h.transport.join_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn newer_join_cancels_a_pending_deferred_join() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    h.transport.set_leave_latency(Duration::from_millis(200));

    let ((), deferred) = tokio::join!(h.manager.leave(), async {
        sleep_ms(50).await;
        h.manager.join("room-2", None).await
    });
    assert_eq!(deferred.unwrap(), JoinOutcome::Deferred);
    assert_eq!(h.manager.pending_timers(), 1);

    sleep_ms(50).await;
    assert_eq!(h.manager.join("room-3", None).await.unwrap(), JoinOutcome::Joined);

    sleep_ms(1000).await;
    assert_eq!(h.manager.channel().unwrap().name, "room-3");
    assert_eq!(h.transport.join_calls(), 2);
    assert_eq!(h.manager.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn deferred_join_is_dropped_if_still_transitioning() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    h.transport.set_leave_latency(Duration::from_millis(1000));

    let ((), deferred) = tokio::join!(h.manager.leave(), async {
        sleep_ms(50).await;
        h.manager.join("room-2", None).await
    });
    assert_eq!(deferred.unwrap(), JoinOutcome::Deferred);

    sleep_ms(2000).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Disconnected);
    assert_eq!(h.transport.join_calls(), 1);
    assert_eq!(h.manager.pending_timers(), 0);
}

// ---------------------------------------------------------------------------
// Publish
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn publish_succeeds_on_third_attempt() {
    let h = harness();
    h.transport
        .push_publish_failure(TransportError::disconnected("WS_ABORT"));
    h.transport
        .push_publish_failure(TransportError::disconnected("WS_ABORT"));

    h.manager.join("room-1", None).await.unwrap();

    sleep_ms(350).await;
    assert_eq!(h.transport.publish_calls(), 1);
    assert!(h.manager.local_audio_track().is_none());

    // First retry after 1s.
    sleep_ms(1000).await;
    assert_eq!(h.transport.publish_calls(), 2);
    assert!(h.manager.local_audio_track().is_none());

    // Second retry after 2s more.
    sleep_ms(1900).await;
    assert!(h.manager.local_audio_track().is_none());
    sleep_ms(100).await;
    assert_eq!(h.transport.publish_calls(), 3);
    assert!(h.manager.local_audio_track().is_some());

    let tracks = h.transport.created_tracks();
    assert_eq!(tracks.len(), 3);
    assert!(tracks[0].is_closed());
    assert!(tracks[1].is_closed());
    assert!(!tracks[2].is_closed());
}

#[tokio::test(start_paused = true)]
async fn publish_gives_up_after_three_retries() {
    let h = harness();
    for _ in 0..10 {
        h.transport
            .push_publish_failure(TransportError::disconnected("WS_ABORT"));
    }
    let mut events = h.manager.subscribe_events();

    h.manager.join("room-1", None).await.unwrap();
    // 0.3s + 1s + 2s + 3s of backoff.
    sleep_ms(10_000).await;

    assert_eq!(h.transport.publish_calls(), 4);
    assert!(h.manager.local_audio_track().is_none());
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert_eq!(h.manager.pending_timers(), 0);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, Event::PublishAbandoned { .. })));
}

#[tokio::test(start_paused = true)]
async fn non_transient_publish_error_is_not_retried() {
    let h = harness();
    h.transport
        .push_publish_failure(TransportError::device("microphone busy"));

    h.manager.join("room-1", None).await.unwrap();
    sleep_ms(5000).await;

    assert_eq!(h.transport.publish_calls(), 1);
    assert!(h.manager.local_audio_track().is_none());
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert_eq!(h.manager.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_publish_attempts_publish_once() {
    let h = harness();
    h.transport.set_publish_latency(Duration::from_millis(100));
    h.manager.join("room-1", None).await.unwrap();

    let inner = Arc::clone(&h.manager.inner);
    let generation = inner.session.lock().generation;
    let (a, b) = tokio::join!(
        inner.attempt_publish(generation),
        inner.attempt_publish(generation)
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(h.transport.publish_calls(), 1);

    // The scheduled post-join attempt finds the track and does nothing.
    sleep_ms(500).await;
    assert_eq!(h.transport.publish_calls(), 1);
    assert!(h.manager.local_audio_track().is_some());
}

#[tokio::test(start_paused = true)]
async fn publish_finishing_after_leave_does_not_keep_the_track() {
    let h = harness();
    h.transport.set_publish_latency(Duration::from_millis(500));
    h.manager.join("room-1", None).await.unwrap();

    sleep_ms(400).await;
    h.manager.leave().await;
    sleep_ms(1000).await;

    assert_eq!(h.manager.connection_state(), ConnectionState::Disconnected);
    assert!(h.manager.local_audio_track().is_none());
    assert!(h.transport.created_tracks()[0].is_closed());
    assert_eq!(h.manager.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn publish_outliving_its_session_blocks_the_next_one_then_hands_over() {
    let h = harness();
    h.transport.set_publish_latency(Duration::from_millis(500));
    h.manager.join("room-1", None).await.unwrap();

    // The first publish starts at 300 ms and is still running at 400 ms.
    sleep_ms(400).await;
    h.manager.leave().await;
    assert_eq!(h.manager.join("room-1", None).await.unwrap(), JoinOutcome::Joined);

    // The rejoin's own publish timer fired at 700 ms but found one in flight.
    sleep_ms(350).await;
    assert_eq!(h.transport.publish_calls(), 1);
    assert_eq!(h.transport.created_tracks().len(), 1);

    // At 800 ms the stale track lands, is withdrawn and a new publish is queued.
    sleep_ms(100).await;
    assert!(h.transport.created_tracks()[0].is_closed());
    assert_eq!(h.transport.unpublish_calls(), 1);
    assert!(h.manager.local_audio_track().is_none());
    assert_eq!(h.manager.pending_timers(), 1);

    sleep_ms(1000).await;
    let tracks = h.transport.created_tracks();
    assert_eq!(h.transport.publish_calls(), 2);
    assert_eq!(tracks.len(), 2);
    assert!(!tracks[1].is_closed());
    assert_eq!(h.manager.local_audio_track().unwrap().id(), tracks[1].id());
    assert_eq!(h.transport.unpublish_calls(), 1);
}

// ---------------------------------------------------------------------------
// Leave and transport state
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn spontaneous_disconnect_resets_everything() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    h.transport.remote_publish("agent-1", MediaKind::Audio).await;
    settle().await;
    assert_eq!(h.manager.remote_participants().len(), 1);
    assert_eq!(h.manager.pending_timers(), 1);

    h.transport.drop_connection(DisconnectReason::NetworkError).await;
    settle().await;

    assert_eq!(h.manager.connection_state(), ConnectionState::Disconnected);
    assert!(!h.manager.has_joined());
    assert!(h.manager.channel().is_none());
    assert!(h.manager.remote_participants().is_empty());
    assert_eq!(h.manager.pending_timers(), 0);
    assert!(!h.transport.remote_tracks("agent-1")[0].is_playing());

    sleep_ms(1000).await;
    assert_eq!(h.transport.publish_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_drops_pending_publish_retry() {
    let h = harness();
    h.transport
        .push_publish_failure(TransportError::disconnected("WS_ABORT"));
    h.manager.join("room-1", None).await.unwrap();
    sleep_ms(350).await;
    assert_eq!(h.manager.pending_timers(), 1);

    h.transport.drop_connection(DisconnectReason::ServerError).await;
    settle().await;
    assert_eq!(h.manager.pending_timers(), 0);

    sleep_ms(3000).await;
    assert_eq!(h.transport.publish_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn leave_survives_failing_transport() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    sleep_ms(350).await;
    assert!(h.manager.local_audio_track().is_some());

    h.transport.fail_unpublish(true);
    h.transport.fail_leave(true);
    let mut events = h.manager.subscribe_events();
    h.manager.leave().await;

    assert_eq!(h.manager.connection_state(), ConnectionState::Disconnected);
    assert!(h.manager.local_audio_track().is_none());
    assert!(h.transport.created_tracks()[0].is_closed());
    assert!(!h.manager.has_joined());
    assert_eq!(h.transport.leave_calls(), 1);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, Event::Left { channel: Some(c) } if c == "room-1")));
}

#[tokio::test(start_paused = true)]
async fn leave_clears_participants_and_mute() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    sleep_ms(350).await;
    h.transport.remote_publish("agent-1", MediaKind::Audio).await;
    settle().await;
    assert!(h.manager.toggle_mute().await.unwrap());

    h.manager.leave().await;
    assert!(h.manager.remote_participants().is_empty());
    assert!(!h.manager.is_muted());
    assert!(!h.transport.remote_tracks("agent-1")[0].is_playing());
}

#[tokio::test(start_paused = true)]
async fn leave_when_disconnected_is_a_noop() {
    let h = harness();
    let mut events = h.manager.subscribe_events();
    h.manager.leave().await;
    assert_eq!(h.transport.leave_calls(), 0);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn reconnect_keeps_the_session() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    sleep_ms(350).await;

    h.transport
        .report_state(
            TransportConnectionState::Connected,
            TransportConnectionState::Reconnecting,
            None,
        )
        .await;
    settle().await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Reconnecting);
    assert_eq!(
        h.manager.join("room-1", None).await.unwrap(),
        JoinOutcome::AlreadyJoined
    );

    h.transport
        .report_state(
            TransportConnectionState::Reconnecting,
            TransportConnectionState::Connected,
            None,
        )
        .await;
    settle().await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert!(h.manager.local_audio_track().is_some());
    assert_eq!(h.manager.pending_timers(), 0);
    assert_eq!(h.transport.join_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnect_without_track_publishes_again() {
    let h = harness();
    h.transport
        .push_publish_failure(TransportError::rejected("publish quota"));
    h.manager.join("room-1", None).await.unwrap();
    sleep_ms(350).await;
    assert!(h.manager.local_audio_track().is_none());

    h.transport
        .report_state(
            TransportConnectionState::Connected,
            TransportConnectionState::Reconnecting,
            None,
        )
        .await;
    h.transport
        .report_state(
            TransportConnectionState::Reconnecting,
            TransportConnectionState::Connected,
            None,
        )
        .await;
    settle().await;
    assert_eq!(h.manager.pending_timers(), 1);

    sleep_ms(350).await;
    assert!(h.manager.local_audio_track().is_some());
    assert_eq!(h.transport.publish_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn stale_events_outside_a_session_are_ignored() {
    let h = harness();
    h.transport.remote_publish("ghost", MediaKind::Audio).await;
    h.transport
        .report_state(
            TransportConnectionState::Connecting,
            TransportConnectionState::Connected,
            None,
        )
        .await;
    settle().await;

    assert_eq!(h.manager.connection_state(), ConnectionState::Disconnected);
    assert!(h.manager.remote_participants().is_empty());
    assert_eq!(h.transport.subscribe_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn own_leave_disconnect_event_is_ignored() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    h.manager.leave().await;
    let mut events = h.manager.subscribe_events();

    // A fresh join must not be torn down by the previous leave's event.
    h.manager.join("room-2", None).await.unwrap();
    settle().await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert!(!states(&drain(&mut events)).contains(&ConnectionState::Disconnected));
}

// ---------------------------------------------------------------------------
// Remote participants
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn repeated_publications_do_not_duplicate_participants() {
    let h = harness();
    let mut events = h.manager.subscribe_events();
    h.manager.join("room-1", None).await.unwrap();
    for _ in 0..3 {
        h.transport.remote_publish("agent-1", MediaKind::Audio).await;
    }
    settle().await;

    assert_eq!(h.manager.remote_participants().len(), 1);
    assert_eq!(h.transport.subscribe_calls(), 3);
    let handles = h.transport.remote_tracks("agent-1");
    assert_eq!(handles.len(), 3);
    assert!(!handles[0].is_playing());
    assert!(!handles[1].is_playing());
    assert!(handles[2].is_playing());

    let joined = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, Event::ParticipantJoined { .. }))
        .count();
    assert_eq!(joined, 1);
}

#[tokio::test(start_paused = true)]
async fn unpublish_keeps_participant_and_left_removes_it() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    h.transport.remote_publish("agent-1", MediaKind::Audio).await;
    settle().await;

    h.transport.remote_unpublish("agent-1", MediaKind::Audio).await;
    settle().await;
    let participants = h.manager.remote_participants();
    assert_eq!(participants.len(), 1);
    assert!(!participants[0].has_audio);
    assert!(!h.transport.remote_tracks("agent-1")[0].is_playing());

    h.transport.remote_leave("agent-1").await;
    settle().await;
    assert!(h.manager.remote_participants().is_empty());
}

#[tokio::test(start_paused = true)]
async fn subscription_finishing_after_a_rejoin_is_discarded() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    h.transport.set_subscribe_latency(Duration::from_millis(200));

    h.transport.remote_publish("agent-1", MediaKind::Audio).await;
    settle().await;
    h.manager.leave().await;
    h.manager.join("room-1", None).await.unwrap();

    sleep_ms(300).await;
    assert!(h.manager.remote_participants().is_empty());
    let handles = h.transport.remote_tracks("agent-1");
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].play_count(), 0);
    assert!(!handles[0].is_playing());
}

#[tokio::test(start_paused = true)]
async fn video_publications_are_not_tracked() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    h.transport.remote_publish("agent-1", MediaKind::Video).await;
    settle().await;

    assert_eq!(h.transport.subscribe_calls(), 1);
    assert!(h.manager.remote_participants().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_subscribe_still_records_participant() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    h.transport.fail_subscribe(true);
    h.transport.remote_publish("agent-1", MediaKind::Audio).await;
    settle().await;

    let participants = h.manager.remote_participants();
    assert_eq!(participants.len(), 1);
    assert!(!participants[0].has_audio);
}

#[tokio::test(start_paused = true)]
async fn remote_mute_is_tracked() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    h.transport.remote_publish("agent-1", MediaKind::Audio).await;
    h.transport.remote_mute("agent-1", true).await;
    settle().await;
    assert!(h.manager.remote_participants()[0].is_muted);
}

// ---------------------------------------------------------------------------
// Mute
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn toggle_mute_without_track_is_a_noop() {
    let h = harness();
    assert!(!h.manager.toggle_mute().await.unwrap());
    assert!(!h.manager.is_muted());

    h.manager.join("room-1", None).await.unwrap();
    assert!(!h.manager.toggle_mute().await.unwrap());
    assert!(!h.manager.is_muted());
}

#[tokio::test(start_paused = true)]
async fn toggle_mute_flips_the_track() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    sleep_ms(350).await;

    assert!(h.manager.toggle_mute().await.unwrap());
    assert!(h.manager.is_muted());
    assert!(h.transport.created_tracks()[0].is_muted());

    assert!(!h.manager.toggle_mute().await.unwrap());
    assert!(!h.transport.created_tracks()[0].is_muted());
}

#[tokio::test(start_paused = true)]
async fn mute_preference_carries_over_to_a_new_track() {
    let h = harness();
    h.manager.join("room-1", None).await.unwrap();
    sleep_ms(350).await;
    h.manager.toggle_mute().await.unwrap();

    h.transport.drop_connection(DisconnectReason::NetworkError).await;
    settle().await;
    h.manager.join("room-1", None).await.unwrap();
    sleep_ms(350).await;

    let tracks = h.transport.created_tracks();
    assert_eq!(tracks.len(), 2);
    assert!(tracks[0].is_closed());
    assert!(tracks[1].is_muted());
    assert!(h.manager.is_muted());
}
