use std::time::Duration;

use super::models::{MediaItem, MediaKind};

/// Where a full-screen viewing session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Media is on screen; playback or the dwell timer is running.
    Viewing,
    /// Consumption detected; the brief "watched" notification is showing.
    Notifying,
    /// Terminal for this open session. The record call (if any) has been
    /// issued exactly once.
    Watched,
    /// The viewer closed the session before it finished.
    Closed,
}

/// Side effects the app must execute after a transition. The session itself
/// never touches timers or the network, which keeps it testable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEffect {
    /// Arm a timer that reports back as a media-finished event. For images
    /// this is the dwell timer; for videos, the playback-length fallback.
    ArmFinishTimer(Duration),
    /// Show the watched notification and arm the short notify delay.
    ShowWatchedNotification(Duration),
    /// Issue the watch-record call for (media_id, viewer_id).
    RecordWatch { media_id: String, viewer_id: String },
}

const NOTIFY_DELAY: Duration = Duration::from_secs(1);

/// Per-item, per-open viewing tracker. Detects "the viewer has consumed this
/// media" exactly once and decides whether a watch record should be sent.
///
/// Every session carries a `generation` the app bumps on each full-screen
/// open; timer events tagged with an older generation are dropped before
/// they reach the session, so a closed view cannot record a watch.
#[derive(Debug)]
pub struct WatchSession {
    media_id: String,
    viewer_id: String,
    uploader_id: String,
    already_watched: bool,
    state: WatchState,
    record_in_flight: bool,
    generation: u64,
}

impl WatchSession {
    /// Open a session for `item`. Returns the session and the entry effect:
    /// the finish timer to arm (image dwell or video playback length).
    pub fn open(
        item: &MediaItem,
        viewer_id: impl Into<String>,
        generation: u64,
        dwell: Duration,
        video_length: Duration,
    ) -> (Self, WatchEffect) {
        let session = Self {
            media_id: item.id.clone(),
            viewer_id: viewer_id.into(),
            uploader_id: item.uploader_id.clone(),
            already_watched: item.has_watched,
            state: WatchState::Viewing,
            record_in_flight: false,
            generation,
        };
        let delay = match item.kind {
            MediaKind::Image => dwell,
            MediaKind::Video => video_length,
        };
        (session, WatchEffect::ArmFinishTimer(delay))
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    /// Playback reached its natural end, or the dwell timer elapsed.
    pub fn on_media_finished(&mut self) -> Option<WatchEffect> {
        if self.state != WatchState::Viewing {
            return None;
        }
        self.state = WatchState::Notifying;
        Some(WatchEffect::ShowWatchedNotification(NOTIFY_DELAY))
    }

    /// The notification delay elapsed; decide whether to record the watch.
    ///
    /// Self-views (viewer == uploader) reach `Watched` without a call, as do
    /// items already marked watched and sessions with a call in flight.
    pub fn on_notify_elapsed(&mut self) -> Option<WatchEffect> {
        if self.state != WatchState::Notifying {
            return None;
        }
        self.state = WatchState::Watched;

        if self.viewer_id == self.uploader_id {
            tracing::debug!(media_id = %self.media_id, "self-view, skipping watch record");
            return None;
        }
        if self.already_watched || self.record_in_flight {
            return None;
        }
        self.record_in_flight = true;
        Some(WatchEffect::RecordWatch {
            media_id: self.media_id.clone(),
            viewer_id: self.viewer_id.clone(),
        })
    }

    /// The viewer closed the view. Any armed timers for this generation are
    /// dead on arrival from here on.
    pub fn on_closed(&mut self) {
        if self.state != WatchState::Watched {
            self.state = WatchState::Closed;
        }
    }

    /// The record call resolved (either way).
    pub fn on_record_settled(&mut self) {
        self.record_in_flight = false;
        self.already_watched = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::models::{MediaKind, Tag};
    use jiff::Timestamp;

    fn item(kind: MediaKind, uploader_id: &str, has_watched: bool) -> crate::internal::models::MediaItem {
        crate::internal::models::MediaItem {
            id: "m-1".to_string(),
            kind,
            url: "https://cdn.example.com/m-1".to_string(),
            thumbnail: None,
            description: None,
            reward: 50,
            uploader_id: uploader_id.to_string(),
            uploader_username: "up".to_string(),
            tags: vec![Tag::Slug("t".to_string())],
            view_count: 1,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
            has_watched,
            quiz_number: None,
        }
    }

    const DWELL: Duration = Duration::from_secs(5);
    const VIDEO: Duration = Duration::from_secs(30);

    #[test]
    fn test_image_open_arms_dwell_timer() {
        let (_, effect) = WatchSession::open(&item(MediaKind::Image, "u-2", false), "v-1", 1, DWELL, VIDEO);
        assert_eq!(effect, WatchEffect::ArmFinishTimer(DWELL));
    }

    #[test]
    fn test_video_open_arms_playback_timer() {
        let (_, effect) = WatchSession::open(&item(MediaKind::Video, "u-2", false), "v-1", 1, DWELL, VIDEO);
        assert_eq!(effect, WatchEffect::ArmFinishTimer(VIDEO));
    }

    #[test]
    fn test_full_path_records_exactly_once() {
        let (mut s, _) = WatchSession::open(&item(MediaKind::Image, "u-2", false), "v-1", 1, DWELL, VIDEO);

        let effect = s.on_media_finished().unwrap();
        assert!(matches!(effect, WatchEffect::ShowWatchedNotification(_)));
        assert_eq!(s.state(), WatchState::Notifying);

        let effect = s.on_notify_elapsed().unwrap();
        assert_eq!(
            effect,
            WatchEffect::RecordWatch {
                media_id: "m-1".to_string(),
                viewer_id: "v-1".to_string(),
            }
        );
        assert_eq!(s.state(), WatchState::Watched);

        // Duplicate timer deliveries are no-ops.
        assert!(s.on_media_finished().is_none());
        assert!(s.on_notify_elapsed().is_none());
    }

    #[test]
    fn test_self_view_reaches_watched_without_record() {
        let (mut s, _) = WatchSession::open(&item(MediaKind::Image, "v-1", false), "v-1", 1, DWELL, VIDEO);
        s.on_media_finished();
        assert!(s.on_notify_elapsed().is_none());
        assert_eq!(s.state(), WatchState::Watched);
    }

    #[test]
    fn test_already_watched_item_not_rerecorded() {
        let (mut s, _) = WatchSession::open(&item(MediaKind::Image, "u-2", true), "v-1", 1, DWELL, VIDEO);
        s.on_media_finished();
        assert!(s.on_notify_elapsed().is_none());
        assert_eq!(s.state(), WatchState::Watched);
    }

    #[test]
    fn test_close_before_finish_cancels() {
        let (mut s, _) = WatchSession::open(&item(MediaKind::Image, "u-2", false), "v-1", 1, DWELL, VIDEO);
        s.on_closed();
        assert_eq!(s.state(), WatchState::Closed);
        // A late dwell event after close must not restart the path.
        assert!(s.on_media_finished().is_none());
        assert!(s.on_notify_elapsed().is_none());
    }

    #[test]
    fn test_close_after_watched_stays_watched() {
        let (mut s, _) = WatchSession::open(&item(MediaKind::Image, "u-2", false), "v-1", 1, DWELL, VIDEO);
        s.on_media_finished();
        s.on_notify_elapsed();
        s.on_closed();
        assert_eq!(s.state(), WatchState::Watched);
    }
}
