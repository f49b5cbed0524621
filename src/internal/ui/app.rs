use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseEventKind};
use ratatui::Frame;
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::api::{ApiError, CatalogService};
use crate::config::AppConfig;
use crate::internal::feed::{FeedCursor, PageRequest};
use crate::internal::loader::PrefetchTrigger;
use crate::internal::models::{FeedPage, MediaItem, MediaKind, QuizOutcome, WatchOutcome};
use crate::internal::notification::Notification;
use crate::internal::quiz::{QuizRound, QuizSession, QUIZ_SAFETY_TIMEOUT, RESULT_DELAY};
use crate::internal::watch::{WatchEffect, WatchSession};
use crate::session::{SessionStore, Viewer};
use crate::utils::theme::TuiTheme;

/// Application view modes.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViewMode {
    Feed,
    FullScreen,
    QuizInvite,
    QuizQuestion,
    QuizResult,
    SessionExpired,
}

/// Input modes for the UI.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InputMode {
    Normal,
    Search,
}

/// Actions/messages sent through the app action channel.
///
/// Timer-driven actions carry the generation of the watch session or quiz
/// round that armed them; stale generations are dropped on receipt.
#[derive(Debug, Clone)]
pub enum Action {
    Quit,
    NavigateUp,
    NavigateDown,
    OpenFullScreen,
    CloseFullScreen,
    RetryInitialLoad,
    ApplySearch,
    ClearSearch,
    PageLoaded(PageRequest, FeedPage),
    PageFailed(PageRequest, String),
    MediaFinished { generation: u64 },
    NotifyElapsed { generation: u64 },
    WatchRecorded { media_id: String, outcome: WatchOutcome },
    WatchRecordFailed { media_id: String },
    AcceptQuiz,
    DeclineQuiz,
    SelectAnswer(usize),
    QuizTick { generation: u64 },
    QuizSafetyTimeout { generation: u64 },
    QuizResolved { generation: u64 },
    CloseQuizResult,
    SessionExpired,
}

/// Main application state: the feed view controller plus the watch and quiz
/// flows hanging off it.
pub struct App {
    pub running: bool,
    pub app_version: String,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub cursor: FeedCursor,
    pub current_index: usize,
    pub search_input: String,
    pub selected_media: Option<MediaItem>,
    pub notification: Option<Notification>,
    pub quiz_session: QuizSession,
    pub quiz_round: Option<QuizRound>,
    pub quiz_outcome: Option<QuizOutcome>,
    pub theme: TuiTheme,
    pub config: AppConfig,
    pub viewer: Option<Viewer>,
    api: CatalogService,
    trigger: PrefetchTrigger,
    watch: Option<WatchSession>,
    watch_generation: u64,
    quiz_generation: u64,
    pub action_tx: UnboundedSender<Action>,
    action_rx: UnboundedReceiver<Action>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let session = SessionStore::load(config.session_file.clone().map(Into::into));
        let viewer = session.viewer();
        let api = CatalogService::new(config.api_base_url.clone(), session);

        if viewer.is_none() {
            tracing::warn!("No persisted session; feed requests will be anonymous");
        }

        Self {
            running: true,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            view_mode: ViewMode::Feed,
            input_mode: InputMode::Normal,
            cursor: FeedCursor::new(config.per_page),
            current_index: 0,
            search_input: String::new(),
            selected_media: None,
            notification: None,
            quiz_session: QuizSession::default(),
            quiz_round: None,
            quiz_outcome: None,
            theme: TuiTheme::default(),
            trigger: PrefetchTrigger::new(config.load_threshold),
            watch: None,
            watch_generation: 0,
            quiz_generation: 0,
            viewer,
            api,
            config,
            action_tx,
            action_rx,
        }
    }

    pub async fn run(&mut self, mut tui: crate::tui::Tui) -> Result<()> {
        // Initial load
        if let Some(req) = self.cursor.initial_request() {
            self.spawn_fetch(req);
        }

        let mut event_interval = tokio::time::interval(Duration::from_millis(16));

        loop {
            self.guard_quiz_views();
            tui.draw(|f| self.ui(f))?;

            tokio::select! {
                _ = event_interval.tick() => {
                    if event::poll(Duration::from_millis(0))? {
                        match event::read()? {
                            Event::Key(key) if key.kind == KeyEventKind::Press => {
                                self.handle_key_event(key);
                            }
                            Event::Mouse(mouse) => match mouse.kind {
                                MouseEventKind::ScrollDown => self.handle_action_now(Action::NavigateDown),
                                MouseEventKind::ScrollUp => self.handle_action_now(Action::NavigateUp),
                                _ => {}
                            },
                            _ => {}
                        }
                    }
                    if self.notification.as_ref().is_some_and(|n| n.should_dismiss()) {
                        self.notification = None;
                    }
                }
                Some(action) = self.action_rx.recv() => {
                    self.handle_action(action);
                }
            }

            if !self.running {
                break;
            }
        }
        Ok(())
    }

    /// Quiz views are only reachable with an active challenge (or, for the
    /// result view, a resolved outcome). Anything else redirects to the feed.
    fn guard_quiz_views(&mut self) {
        let valid = match self.view_mode {
            ViewMode::QuizInvite | ViewMode::QuizQuestion => self.quiz_session.is_active(),
            ViewMode::QuizResult => self.quiz_outcome.is_some(),
            _ => true,
        };
        if !valid {
            tracing::debug!(view = ?self.view_mode, "no active quiz, redirecting to feed");
            self.view_mode = ViewMode::Feed;
        }
    }

    fn ui(&mut self, f: &mut Frame) {
        super::view::draw(self, f);
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match self.input_mode {
            InputMode::Search => self.handle_search_input(key),
            InputMode::Normal => self.handle_normal_input(key),
        }
    }

    fn handle_search_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => {
                self.search_input.push(c);
            }
            KeyCode::Backspace => {
                self.search_input.pop();
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.handle_action_now(Action::ApplySearch);
            }
            KeyCode::Esc => {
                // Abandon the edit, keep the applied term.
                self.search_input = self.cursor.search_term().to_string();
                self.input_mode = InputMode::Normal;
            }
            _ => {}
        }
    }

    fn handle_normal_input(&mut self, key: KeyEvent) {
        let tx = self.action_tx.clone();
        match self.view_mode {
            ViewMode::Feed => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => {
                    let _ = tx.send(Action::Quit);
                }
                KeyCode::Char('j') | KeyCode::Down => {
                    let _ = tx.send(Action::NavigateDown);
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    let _ = tx.send(Action::NavigateUp);
                }
                KeyCode::Enter => {
                    let _ = tx.send(Action::OpenFullScreen);
                }
                KeyCode::Char('/') => {
                    self.input_mode = InputMode::Search;
                }
                KeyCode::Char('C') => {
                    let _ = tx.send(Action::ClearSearch);
                }
                KeyCode::Char('r') => {
                    if self.cursor.initial_error().is_some() {
                        let _ = tx.send(Action::RetryInitialLoad);
                    }
                }
                _ => {}
            },
            ViewMode::FullScreen => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => {
                    let _ = tx.send(Action::CloseFullScreen);
                }
                KeyCode::Char('o') => {
                    if let Some(item) = &self.selected_media {
                        let _ = open::that(&item.url);
                    }
                }
                _ => {}
            },
            ViewMode::QuizInvite => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let _ = tx.send(Action::AcceptQuiz);
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    let _ = tx.send(Action::DeclineQuiz);
                }
                _ => {}
            },
            ViewMode::QuizQuestion => match key.code {
                KeyCode::Char('a') | KeyCode::Char('1') => {
                    let _ = tx.send(Action::SelectAnswer(0));
                }
                KeyCode::Char('b') | KeyCode::Char('2') => {
                    let _ = tx.send(Action::SelectAnswer(1));
                }
                KeyCode::Char('c') | KeyCode::Char('3') => {
                    let _ = tx.send(Action::SelectAnswer(2));
                }
                KeyCode::Char('d') | KeyCode::Char('4') => {
                    let _ = tx.send(Action::SelectAnswer(3));
                }
                _ => {}
            },
            ViewMode::QuizResult => {
                let _ = tx.send(Action::CloseQuizResult);
            }
            ViewMode::SessionExpired => {
                let _ = tx.send(Action::Quit);
            }
        }
    }

    /// Synchronous shortcut for actions raised while handling input.
    fn handle_action_now(&mut self, action: Action) {
        self.handle_action(action);
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::NavigateDown => {
                if self.current_index + 1 < self.cursor.len() {
                    self.current_index += 1;
                }
                self.maybe_prefetch();
            }
            Action::NavigateUp => {
                if self.current_index > 0 {
                    self.current_index -= 1;
                }
                self.maybe_prefetch();
            }
            Action::OpenFullScreen => self.open_full_screen(),
            Action::CloseFullScreen => self.close_full_screen(),
            Action::RetryInitialLoad => {
                if let Some(req) = self.cursor.initial_request() {
                    self.spawn_fetch(req);
                }
            }
            Action::ApplySearch => {
                let term = self.search_input.clone();
                if let Some(req) = self.cursor.set_search(term.clone()) {
                    self.current_index = 0;
                    self.trigger.reset();
                    self.spawn_fetch(req);
                    if !term.is_empty() {
                        self.notification =
                            Some(Notification::info(format!("Searching for \"{term}\"")));
                    }
                }
            }
            Action::ClearSearch => {
                self.search_input.clear();
                if let Some(req) = self.cursor.set_search("") {
                    self.current_index = 0;
                    self.trigger.reset();
                    self.spawn_fetch(req);
                }
            }
            Action::PageLoaded(req, page) => {
                self.cursor.apply_page(&req, page);
                self.clamp_index();
                // A grown list may satisfy the prefetch predicate again.
                self.maybe_prefetch();
            }
            Action::PageFailed(req, error) => {
                tracing::warn!(page = req.page, search = %req.search, %error, "feed page fetch failed");
                self.cursor.fetch_failed(&req, error);
            }
            Action::MediaFinished { generation } => {
                if self.watch_generation != generation {
                    return;
                }
                let effect = match self.watch.as_mut() {
                    Some(session) => session.on_media_finished(),
                    None => None,
                };
                if let Some(effect) = effect {
                    self.execute_watch_effect(effect);
                }
            }
            Action::NotifyElapsed { generation } => {
                if self.watch_generation != generation {
                    return;
                }
                let effect = match self.watch.as_mut() {
                    Some(session) => session.on_notify_elapsed(),
                    None => None,
                };
                if let Some(effect) = effect {
                    self.execute_watch_effect(effect);
                }
            }
            Action::WatchRecorded { media_id, outcome } => {
                // The response may land after the viewer moved on to another
                // item; only the owning session gets the settlement.
                if let Some(session) = self.watch.as_mut() {
                    if session.media_id() == media_id {
                        session.on_record_settled();
                    }
                }
                self.cursor.mark_watched(&media_id);
                if let Some(item) = self.selected_media.as_mut() {
                    if item.id == media_id {
                        item.has_watched = true;
                    }
                }
                // Cache-coherency signal for any other consumer of the feed query.
                self.api.invalidate_feed();

                if outcome.trigger_quiz {
                    if let Some(challenge) = outcome.quiz_data {
                        self.quiz_session.set(challenge);
                        self.close_full_screen();
                        self.view_mode = ViewMode::QuizInvite;
                    }
                }
            }
            Action::WatchRecordFailed { media_id } => {
                tracing::warn!(%media_id, "watch record failed");
                if let Some(session) = self.watch.as_mut() {
                    if session.media_id() == media_id {
                        session.on_record_settled();
                    }
                }
            }
            Action::AcceptQuiz => self.start_quiz_round(),
            Action::DeclineQuiz => {
                self.quiz_session.clear();
                self.view_mode = ViewMode::Feed;
            }
            Action::SelectAnswer(index) => {
                let outcome = match self.quiz_round.as_mut() {
                    Some(round) => round.select(index),
                    None => None,
                };
                if let Some(outcome) = outcome {
                    self.on_quiz_answered(outcome);
                }
            }
            Action::QuizTick { generation } => {
                if self.quiz_generation != generation {
                    return;
                }
                let outcome = match self.quiz_round.as_mut() {
                    Some(round) => round.tick(),
                    None => None,
                };
                if let Some(outcome) = outcome {
                    self.on_quiz_answered(outcome);
                }
            }
            Action::QuizSafetyTimeout { generation } => {
                if self.quiz_generation != generation {
                    return;
                }
                let outcome = match self.quiz_round.as_mut() {
                    Some(round) => round.force_expire(),
                    None => None,
                };
                if let Some(outcome) = outcome {
                    tracing::warn!("quiz safety timeout fired before the countdown resolved");
                    self.on_quiz_answered(outcome);
                }
            }
            Action::QuizResolved { generation } => {
                if self.quiz_generation != generation {
                    return;
                }
                if self.quiz_outcome.is_some() {
                    self.view_mode = ViewMode::QuizResult;
                }
            }
            Action::CloseQuizResult => {
                self.quiz_session.clear();
                self.quiz_round = None;
                self.quiz_outcome = None;
                self.view_mode = ViewMode::Feed;
            }
            Action::SessionExpired => {
                tracing::info!("session expired, discarding feed and quiz state");
                self.cursor = FeedCursor::new(self.config.per_page);
                self.trigger.reset();
                self.current_index = 0;
                self.selected_media = None;
                self.watch = None;
                self.quiz_session.clear();
                self.quiz_round = None;
                self.quiz_outcome = None;
                self.viewer = None;
                self.view_mode = ViewMode::SessionExpired;
            }
        }
    }

    fn clamp_index(&mut self) {
        if self.cursor.is_empty() {
            self.current_index = 0;
        } else if self.current_index > self.cursor.len() - 1 {
            self.current_index = self.cursor.len() - 1;
        }
    }

    fn maybe_prefetch(&mut self) {
        let fire = self.trigger.should_load(
            self.current_index,
            self.cursor.len(),
            self.cursor.has_more(),
            self.cursor.is_loading(),
        );
        if fire {
            if let Some(req) = self.cursor.load_more() {
                self.spawn_fetch(req);
            }
        }
    }

    fn spawn_fetch(&self, req: PageRequest) {
        let api = self.api.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let search = if req.search.is_empty() {
                None
            } else {
                Some(req.search.as_str())
            };
            match api.get_media(req.page, req.per_page, search, &[]).await {
                Ok(page) => {
                    let _ = tx.send(Action::PageLoaded(req, page));
                }
                Err(ApiError::SessionExpired) => {
                    let _ = tx.send(Action::SessionExpired);
                }
                Err(e) => {
                    let _ = tx.send(Action::PageFailed(req, e.to_string()));
                }
            }
        });
    }

    fn open_full_screen(&mut self) {
        let item = match self.cursor.get(self.current_index) {
            Some(item) => item.clone(),
            None => return,
        };
        let viewer_id = match &self.viewer {
            Some(viewer) => viewer.id.clone(),
            None => {
                self.notification = Some(Notification::error("Sign in to watch media"));
                return;
            }
        };

        self.watch_generation += 1;
        let (session, effect) = WatchSession::open(
            &item,
            viewer_id,
            self.watch_generation,
            Duration::from_secs(self.config.image_dwell_secs),
            Duration::from_secs(self.config.video_length_secs),
        );

        // Playback itself is the OS's job; the finish timer bounds it.
        if item.kind == MediaKind::Video {
            if let Err(e) = open::that(&item.url) {
                tracing::warn!(url = %item.url, "failed to hand video to the OS: {e}");
            }
        }

        self.selected_media = Some(item);
        self.watch = Some(session);
        self.view_mode = ViewMode::FullScreen;
        self.execute_watch_effect(effect);
    }

    fn close_full_screen(&mut self) {
        if let Some(session) = self.watch.as_mut() {
            session.on_closed();
        }
        // Bump the generation so armed dwell/notify timers die on arrival.
        self.watch_generation += 1;
        self.selected_media = None;
        self.watch = None;
        if self.view_mode == ViewMode::FullScreen {
            self.view_mode = ViewMode::Feed;
        }
    }

    fn execute_watch_effect(&mut self, effect: WatchEffect) {
        match effect {
            WatchEffect::ArmFinishTimer(delay) => {
                let tx = self.action_tx.clone();
                let generation = self.watch_generation;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Action::MediaFinished { generation });
                });
            }
            WatchEffect::ShowWatchedNotification(delay) => {
                let first_time = self
                    .selected_media
                    .as_ref()
                    .is_some_and(|item| !item.has_watched);
                let reward = self.selected_media.as_ref().map_or(0, |item| item.reward);
                self.notification = Some(Notification::watched(reward, first_time));

                let tx = self.action_tx.clone();
                let generation = self.watch_generation;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Action::NotifyElapsed { generation });
                });
            }
            WatchEffect::RecordWatch {
                media_id,
                viewer_id,
            } => {
                let api = self.api.clone();
                let tx = self.action_tx.clone();
                tokio::spawn(async move {
                    match api.mark_watched(&media_id, &viewer_id).await {
                        Ok(outcome) => {
                            let _ = tx.send(Action::WatchRecorded { media_id, outcome });
                        }
                        Err(ApiError::SessionExpired) => {
                            let _ = tx.send(Action::SessionExpired);
                        }
                        Err(e) => {
                            tracing::warn!(%media_id, "mark_watched failed: {e}");
                            let _ = tx.send(Action::WatchRecordFailed { media_id });
                        }
                    }
                });
            }
        }
    }

    fn start_quiz_round(&mut self) {
        let challenge = match self.quiz_session.active() {
            Some(challenge) => challenge,
            None => {
                self.view_mode = ViewMode::Feed;
                return;
            }
        };

        self.quiz_generation += 1;
        let generation = self.quiz_generation;
        let duration = self.config.quiz_duration_secs;
        self.quiz_round = Some(QuizRound::new(challenge, duration, generation));
        self.quiz_outcome = None;
        self.view_mode = ViewMode::QuizQuestion;

        // Countdown ticker. It stops by itself; a stale generation also
        // makes every remaining tick a no-op.
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            for _ in 0..duration {
                tokio::time::sleep(Duration::from_secs(1)).await;
                if tx.send(Action::QuizTick { generation }).is_err() {
                    return;
                }
            }
        });

        // Absolute safety net for a stalled countdown.
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(QUIZ_SAFETY_TIMEOUT).await;
            let _ = tx.send(Action::QuizSafetyTimeout { generation });
        });
    }

    fn on_quiz_answered(&mut self, outcome: QuizOutcome) {
        self.quiz_outcome = Some(outcome);

        // Fire-and-forget result submission; failure is logged only.
        if let Some(challenge) = self.quiz_session.active() {
            let api = self.api.clone();
            let media_id = challenge.media_id.clone();
            let is_correct = outcome.is_correct;
            tokio::spawn(async move {
                if let Err(e) = api.submit_quiz_result(is_correct, &media_id).await {
                    tracing::warn!(%media_id, "quiz result submission failed: {e}");
                }
            });
        }

        let tx = self.action_tx.clone();
        let generation = self.quiz_generation;
        tokio::spawn(async move {
            tokio::time::sleep(RESULT_DELAY).await;
            let _ = tx.send(Action::QuizResolved { generation });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::models::{
        MediaItem, PageMeta, QuizChallenge, QuizQuestion, Tag, WatchOutcome,
    };
    use crate::internal::notification::NotificationType;
    use jiff::Timestamp;

    fn test_app() -> App {
        let mut config = AppConfig::default();
        config.session_file = Some("/nonexistent/session.json".to_string());
        let mut app = App::new(config);
        app.viewer = Some(Viewer {
            id: "v-1".to_string(),
            username: "tester".to_string(),
        });
        app
    }

    fn item(id: &str, uploader_id: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            kind: MediaKind::Image,
            url: format!("https://cdn.example.com/{id}.jpg"),
            thumbnail: None,
            description: Some(format!("item {id}")),
            reward: 150,
            uploader_id: uploader_id.to_string(),
            uploader_username: "up".to_string(),
            tags: vec![Tag::Slug("t".to_string())],
            view_count: 3,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
            has_watched: false,
            quiz_number: None,
        }
    }

    fn page(ids: &[&str], current: u32, last: u32) -> FeedPage {
        FeedPage {
            data: ids.iter().map(|id| item(id, "u-9")).collect(),
            meta: PageMeta {
                current_page: current,
                last_page: last,
                per_page: ids.len() as u32,
                total: 0,
            },
        }
    }

    fn load_page(app: &mut App, ids: &[&str], current: u32, last: u32) {
        let req = if current == 1 {
            app.cursor.initial_request().unwrap()
        } else {
            app.cursor.load_more().unwrap()
        };
        app.handle_action(Action::PageLoaded(req, page(ids, current, last)));
    }

    fn challenge() -> QuizChallenge {
        QuizChallenge {
            media_id: "a".to_string(),
            reward: 500,
            question: QuizQuestion {
                id: "q-1".to_string(),
                question: "Which?".to_string(),
                answer: "B".to_string(),
                option_a: "1".to_string(),
                option_b: "2".to_string(),
                option_c: "3".to_string(),
                option_d: "4".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_navigation_clamped_to_loaded_data() {
        let mut app = test_app();
        load_page(&mut app, &["a", "b"], 1, 2);

        app.handle_action(Action::NavigateUp);
        assert_eq!(app.current_index, 0);

        app.handle_action(Action::NavigateDown);
        assert_eq!(app.current_index, 1);
        // More pages exist but only two items are loaded: stay put.
        app.handle_action(Action::NavigateDown);
        assert_eq!(app.current_index, 1);
    }

    #[tokio::test]
    async fn test_index_clamped_when_feed_shrinks() {
        let mut app = test_app();
        load_page(&mut app, &["a", "b", "c"], 1, 1);
        app.current_index = 2;

        app.search_input = "cats".to_string();
        app.handle_action(Action::ApplySearch);
        assert_eq!(app.current_index, 0);

        // The single-item result keeps the index valid.
        let req = PageRequest {
            page: 1,
            per_page: app.config.per_page,
            search: "cats".to_string(),
        };
        app.current_index = 2;
        app.handle_action(Action::PageLoaded(req, page(&["x"], 1, 1)));
        assert_eq!(app.current_index, 0);
    }

    #[tokio::test]
    async fn test_open_full_screen_requires_sign_in() {
        let mut app = test_app();
        app.viewer = None;
        load_page(&mut app, &["a"], 1, 1);

        app.handle_action(Action::OpenFullScreen);
        assert_eq!(app.view_mode, ViewMode::Feed);
        assert!(app.notification.is_some());
    }

    #[tokio::test]
    async fn test_open_and_close_full_screen() {
        let mut app = test_app();
        load_page(&mut app, &["a"], 1, 1);

        app.handle_action(Action::OpenFullScreen);
        assert_eq!(app.view_mode, ViewMode::FullScreen);
        assert_eq!(app.selected_media.as_ref().unwrap().id, "a");

        app.handle_action(Action::CloseFullScreen);
        assert_eq!(app.view_mode, ViewMode::Feed);
        assert!(app.selected_media.is_none());
    }

    #[tokio::test]
    async fn test_stale_watch_timer_ignored_after_close() {
        let mut app = test_app();
        load_page(&mut app, &["a"], 1, 1);
        app.handle_action(Action::OpenFullScreen);
        let generation = app.watch_generation;

        app.handle_action(Action::CloseFullScreen);
        // The dwell timer from the closed session fires late.
        app.handle_action(Action::MediaFinished { generation });
        app.handle_action(Action::NotifyElapsed { generation });
        assert!(app.notification.is_none());
        assert!(!app.cursor.items()[0].has_watched);
    }

    #[tokio::test]
    async fn test_watch_recorded_patches_feed_and_installs_quiz() {
        let mut app = test_app();
        load_page(&mut app, &["a"], 1, 1);
        app.handle_action(Action::OpenFullScreen);

        app.handle_action(Action::WatchRecorded {
            media_id: "a".to_string(),
            outcome: WatchOutcome {
                trigger_quiz: true,
                quiz_data: Some(challenge()),
            },
        });

        assert!(app.cursor.items()[0].has_watched);
        assert_eq!(app.view_mode, ViewMode::QuizInvite);
        assert!(app.quiz_session.is_active());
    }

    #[tokio::test]
    async fn test_late_record_response_does_not_settle_other_session() {
        let mut app = test_app();
        load_page(&mut app, &["a", "b"], 1, 1);

        // Item "a" is consumed fully; its record call goes in flight.
        app.handle_action(Action::OpenFullScreen);
        let gen_a = app.watch_generation;
        app.handle_action(Action::MediaFinished { generation: gen_a });
        app.handle_action(Action::NotifyElapsed { generation: gen_a });

        // The viewer moves on to "b" before the response lands.
        app.handle_action(Action::CloseFullScreen);
        app.handle_action(Action::NavigateDown);
        app.handle_action(Action::OpenFullScreen);
        assert_eq!(app.selected_media.as_ref().unwrap().id, "b");

        app.handle_action(Action::WatchRecorded {
            media_id: "a".to_string(),
            outcome: WatchOutcome {
                trigger_quiz: false,
                quiz_data: None,
            },
        });
        assert!(app.cursor.items()[0].has_watched);
        assert!(!app.cursor.items()[1].has_watched);

        // "b" still records its own watch when it finishes.
        let session = app.watch.as_mut().unwrap();
        session.on_media_finished();
        assert_eq!(
            session.on_notify_elapsed(),
            Some(WatchEffect::RecordWatch {
                media_id: "b".to_string(),
                viewer_id: "v-1".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_late_record_failure_does_not_settle_other_session() {
        let mut app = test_app();
        load_page(&mut app, &["a", "b"], 1, 1);

        app.handle_action(Action::OpenFullScreen);
        let gen_a = app.watch_generation;
        app.handle_action(Action::MediaFinished { generation: gen_a });
        app.handle_action(Action::NotifyElapsed { generation: gen_a });

        app.handle_action(Action::CloseFullScreen);
        app.handle_action(Action::NavigateDown);
        app.handle_action(Action::OpenFullScreen);

        app.handle_action(Action::WatchRecordFailed {
            media_id: "a".to_string(),
        });

        let session = app.watch.as_mut().unwrap();
        session.on_media_finished();
        assert!(matches!(
            session.on_notify_elapsed(),
            Some(WatchEffect::RecordWatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_watch_recorded_without_quiz_stays_full_screen() {
        let mut app = test_app();
        load_page(&mut app, &["a"], 1, 1);
        app.handle_action(Action::OpenFullScreen);

        app.handle_action(Action::WatchRecorded {
            media_id: "a".to_string(),
            outcome: WatchOutcome {
                trigger_quiz: false,
                quiz_data: None,
            },
        });

        assert!(app.cursor.items()[0].has_watched);
        assert_eq!(app.view_mode, ViewMode::FullScreen);
        assert!(app.selected_media.as_ref().unwrap().has_watched);
    }

    #[tokio::test]
    async fn test_decline_quiz_clears_and_returns_to_feed() {
        let mut app = test_app();
        app.quiz_session.set(challenge());
        app.view_mode = ViewMode::QuizInvite;

        app.handle_action(Action::DeclineQuiz);
        assert!(!app.quiz_session.is_active());
        assert_eq!(app.view_mode, ViewMode::Feed);
    }

    #[tokio::test]
    async fn test_accept_quiz_starts_round() {
        let mut app = test_app();
        app.quiz_session.set(challenge());
        app.view_mode = ViewMode::QuizInvite;

        app.handle_action(Action::AcceptQuiz);
        assert_eq!(app.view_mode, ViewMode::QuizQuestion);
        let round = app.quiz_round.as_ref().unwrap();
        assert_eq!(round.time_left(), app.config.quiz_duration_secs);
        assert_eq!(round.correct_index(), 1);
    }

    #[tokio::test]
    async fn test_quiz_answer_resolves_to_result_view() {
        let mut app = test_app();
        app.quiz_session.set(challenge());
        app.handle_action(Action::AcceptQuiz);
        let generation = app.quiz_round.as_ref().unwrap().generation();

        app.handle_action(Action::SelectAnswer(1));
        let outcome = app.quiz_outcome.unwrap();
        assert!(outcome.is_correct);

        // A second answer and late ticks change nothing.
        app.handle_action(Action::SelectAnswer(0));
        app.handle_action(Action::QuizTick { generation });
        assert_eq!(app.quiz_outcome.unwrap().selected, Some(1));

        app.handle_action(Action::QuizResolved { generation });
        assert_eq!(app.view_mode, ViewMode::QuizResult);

        app.handle_action(Action::CloseQuizResult);
        assert_eq!(app.view_mode, ViewMode::Feed);
        assert!(!app.quiz_session.is_active());
        assert!(app.quiz_outcome.is_none());
    }

    #[tokio::test]
    async fn test_stale_quiz_tick_ignored() {
        let mut app = test_app();
        app.quiz_session.set(challenge());
        app.handle_action(Action::AcceptQuiz);
        let stale = app.quiz_round.as_ref().unwrap().generation() - 1;

        app.handle_action(Action::QuizTick { generation: stale });
        assert_eq!(
            app.quiz_round.as_ref().unwrap().time_left(),
            app.config.quiz_duration_secs
        );
    }

    #[tokio::test]
    async fn test_quiz_views_redirect_without_challenge() {
        let mut app = test_app();
        app.view_mode = ViewMode::QuizQuestion;
        app.guard_quiz_views();
        assert_eq!(app.view_mode, ViewMode::Feed);

        app.view_mode = ViewMode::QuizResult;
        app.guard_quiz_views();
        assert_eq!(app.view_mode, ViewMode::Feed);
    }

    #[tokio::test]
    async fn test_session_expired_discards_state() {
        let mut app = test_app();
        load_page(&mut app, &["a", "b"], 1, 1);
        app.current_index = 1;
        app.quiz_session.set(challenge());

        app.handle_action(Action::SessionExpired);
        assert_eq!(app.view_mode, ViewMode::SessionExpired);
        assert!(app.cursor.is_empty());
        assert_eq!(app.current_index, 0);
        assert!(!app.quiz_session.is_active());
        assert!(app.viewer.is_none());
    }

    #[tokio::test]
    async fn test_clear_search_resets_cursor() {
        let mut app = test_app();
        load_page(&mut app, &["a"], 1, 1);
        app.search_input = "dogs".to_string();
        app.handle_action(Action::ApplySearch);
        assert_eq!(app.cursor.search_term(), "dogs");
        let n = app.notification.as_ref().unwrap();
        assert_eq!(n.message, "Searching for \"dogs\"");
        assert_eq!(n.notification_type, NotificationType::Info);

        app.handle_action(Action::ClearSearch);
        assert_eq!(app.cursor.search_term(), "");
        assert!(app.search_input.is_empty());
    }
}
