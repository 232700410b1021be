//! Authoritative session state and its serializable snapshot.

use serde::Serialize;

/// Coarse session phase derived from the track slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Preparing,
    Prepared,
}

/// How an engine event's track relates to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// The track currently being loaded.
    Preparing,
    /// The confirmed track, with no preparation pending.
    Prepared,
    /// Anything else: stale or foreign.
    Foreign,
}

/// The single playback session owned by the actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub preparing_uri: Option<String>,
    pub prepared_uri: Option<String>,
    pub desired_playing: bool,
    pub resume_in_flight: bool,
    pub pause_in_flight: bool,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        if self.preparing_uri.is_some() {
            SessionPhase::Preparing
        } else if self.prepared_uri.is_some() {
            SessionPhase::Prepared
        } else {
            SessionPhase::Idle
        }
    }

    /// Starts loading `uri`. Guards from the previous instance are void.
    pub fn begin_prepare(&mut self, uri: &str) {
        self.preparing_uri = Some(uri.to_string());
        self.prepared_uri = None;
        self.desired_playing = false;
        self.resume_in_flight = false;
        self.pause_in_flight = false;
    }

    /// Moves the preparing track to prepared, returning its URI.
    pub fn confirm_prepared(&mut self) -> Option<String> {
        let uri = self.preparing_uri.take()?;
        self.prepared_uri = Some(uri.clone());
        Some(uri)
    }

    /// Attributes an engine event for `uri` to the session.
    ///
    /// Prepared-track events only count once preparation has completed.
    pub fn attribute(&self, uri: &str) -> Attribution {
        match (&self.preparing_uri, &self.prepared_uri) {
            (Some(preparing), _) if preparing == uri => Attribution::Preparing,
            (None, Some(prepared)) if prepared == uri => Attribution::Prepared,
            _ => Attribution::Foreign,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self, generation: Option<u64>) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            preparing_uri: self.preparing_uri.clone(),
            prepared_uri: self.prepared_uri.clone(),
            desired_playing: self.desired_playing,
            resume_in_flight: self.resume_in_flight,
            pause_in_flight: self.pause_in_flight,
            generation,
        }
    }
}

/// Point-in-time copy of the session, served over HTTP and used by tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub preparing_uri: Option<String>,
    pub prepared_uri: Option<String>,
    pub desired_playing: bool,
    pub resume_in_flight: bool,
    pub pause_in_flight: bool,
    /// Generation of the live engine instance, if any.
    pub generation: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_then_confirm_moves_track_between_slots() {
        let mut state = SessionState::default();
        assert_eq!(state.phase(), SessionPhase::Idle);

        state.begin_prepare("track:42");
        assert_eq!(state.phase(), SessionPhase::Preparing);
        assert_eq!(state.attribute("track:42"), Attribution::Preparing);

        assert_eq!(state.confirm_prepared().as_deref(), Some("track:42"));
        assert_eq!(state.phase(), SessionPhase::Prepared);
        assert_eq!(state.preparing_uri, None);
        assert_eq!(state.attribute("track:42"), Attribution::Prepared);
    }

    #[test]
    fn prepared_track_is_foreign_while_another_prepares() {
        let mut state = SessionState::default();
        state.begin_prepare("track:1");
        state.confirm_prepared();
        state.preparing_uri = Some("track:2".into());

        assert_eq!(state.attribute("track:1"), Attribution::Foreign);
        assert_eq!(state.attribute("track:2"), Attribution::Preparing);
        assert_eq!(state.attribute("track:3"), Attribution::Foreign);
    }

    #[test]
    fn begin_prepare_clears_guards_and_intent() {
        let mut state = SessionState {
            prepared_uri: Some("track:1".into()),
            desired_playing: true,
            resume_in_flight: true,
            pause_in_flight: true,
            ..SessionState::default()
        };

        state.begin_prepare("track:2");
        assert!(!state.desired_playing);
        assert!(!state.resume_in_flight);
        assert!(!state.pause_in_flight);
        assert_eq!(state.prepared_uri, None);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let mut state = SessionState::default();
        state.begin_prepare("track:9");
        let json = serde_json::to_value(state.snapshot(Some(3))).unwrap();

        assert_eq!(json["phase"], "preparing");
        assert_eq!(json["preparingUri"], "track:9");
        assert_eq!(json["resumeInFlight"], false);
        assert_eq!(json["generation"], 3);
    }
}
