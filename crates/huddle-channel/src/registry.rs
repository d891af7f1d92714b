//! Live set of remote participants and their playback handles.

use std::collections::HashMap;
use std::sync::Arc;

use huddle_common::MediaKind;

use crate::transport::RemoteAudioTrack;
use crate::types::ParticipantSnapshot;

#[derive(Debug, Clone)]
pub struct RemoteParticipant {
    pub id: String,
    pub audio_track: Option<Arc<dyn RemoteAudioTrack>>,
    pub is_muted: bool,
}

impl RemoteParticipant {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            audio_track: None,
            is_muted: false,
        }
    }

    fn stop_audio(&mut self) {
        if let Some(track) = self.audio_track.take() {
            track.stop();
        }
    }

    pub fn snapshot(&self) -> ParticipantSnapshot {
        ParticipantSnapshot {
            id: self.id.clone(),
            has_audio: self.audio_track.is_some(),
            is_muted: self.is_muted,
        }
    }
}

/// Remote participants keyed by id. Every mutation is an upsert or a
/// removal, so events may arrive in any order and repeat without leaving
/// duplicates or orphaned playback behind.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: HashMap<String, RemoteParticipant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `track` as the participant's audio and start playback.
    ///
    /// Returns true when the participant was not known before. A different
    /// handle already attached is stopped first; re-attaching the same
    /// handle is a no-op.
    pub fn upsert_audio(&mut self, id: &str, track: Arc<dyn RemoteAudioTrack>) -> bool {
        let inserted = !self.participants.contains_key(id);
        let participant = self
            .participants
            .entry(id.to_string())
            .or_insert_with(|| RemoteParticipant::new(id));

        if let Some(existing) = &participant.audio_track {
            if Arc::ptr_eq(existing, &track) {
                return inserted;
            }
        }
        participant.stop_audio();
        track.play();
        participant.audio_track = Some(track);
        participant.is_muted = false;
        inserted
    }

    /// Make sure the participant exists without touching its media.
    pub fn ensure(&mut self, id: &str) -> bool {
        if self.participants.contains_key(id) {
            return false;
        }
        self.participants
            .insert(id.to_string(), RemoteParticipant::new(id));
        true
    }

    /// Stop playback of one media kind; the participant stays registered.
    pub fn detach(&mut self, id: &str, kind: MediaKind) {
        if kind != MediaKind::Audio {
            return;
        }
        if let Some(participant) = self.participants.get_mut(id) {
            participant.stop_audio();
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<RemoteParticipant> {
        let mut participant = self.participants.remove(id)?;
        participant.stop_audio();
        Some(participant)
    }

    pub fn set_muted(&mut self, id: &str, muted: bool) -> bool {
        match self.participants.get_mut(id) {
            Some(participant) => {
                participant.is_muted = muted;
                true
            }
            None => false,
        }
    }

    /// Stop all playback and forget everyone. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.participants.len();
        for (_, mut participant) in self.participants.drain() {
            participant.stop_audio();
        }
        count
    }

    pub fn get(&self, id: &str) -> Option<&RemoteParticipant> {
        self.participants.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.participants.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Snapshots sorted by id.
    pub fn snapshot(&self) -> Vec<ParticipantSnapshot> {
        let mut list: Vec<ParticipantSnapshot> =
            self.participants.values().map(RemoteParticipant::snapshot).collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }
}
