use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::data::{FeedSource, KeyValueStore, Navigator};
use crate::identity;
use crate::loader;
use crate::media::MediaResolver;
use crate::model::{NavigationPayload, PresentedPost, ViewerIdentity};
use crate::store::{FeedStore, Readiness};

pub const EVENT_DETAIL_ROUTE: &str = "EventDetail";

/// Collaborators the feed screen is mounted with.
#[derive(Clone)]
pub struct Services {
    pub feed: Arc<dyn FeedSource>,
    pub storage: Arc<dyn KeyValueStore>,
    pub navigator: Arc<dyn Navigator>,
    pub media: MediaResolver,
    pub viewer_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectTarget {
    Image,
    Title,
    Body,
    ActionRow,
}

/// Render-ready view of one feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub id: String,
    pub author_name: String,
    pub avatar_url: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub like_count: u64,
    pub comment_count: u64,
    pub comments_expanded: bool,
}

impl PostCard {
    pub fn new(post: &PresentedPost, media: &MediaResolver) -> Self {
        let entity = post.entity();
        Self {
            id: entity.id.clone(),
            author_name: entity.author_name.clone(),
            avatar_url: media.avatar(entity.author_avatar.as_deref()),
            category: entity.category.clone(),
            title: entity.title.clone(),
            description: entity.description.clone(),
            image_url: media.image(entity.image.as_deref()),
            like_count: post.like_count(),
            comment_count: post.comment_count(),
            comments_expanded: post.comments_expanded(),
        }
    }
}

/// Inputs handed to the like/comment action row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRowInput {
    pub post_id: String,
    pub viewer_identity: Option<String>,
    pub identity_settled: bool,
    pub like_count: u64,
    pub comment_count: u64,
    pub comments_expanded: bool,
}

/// Inputs handed to the inline comment panel of an expanded post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentPanelInput {
    pub post_id: String,
    pub viewer_identity: Option<String>,
    pub identity_settled: bool,
    pub comment_count: u64,
}

enum AsyncResponse {
    Identity { identity: ViewerIdentity },
    Feed { result: Result<Vec<PresentedPost>> },
}

pub struct FeedScreen {
    services: Services,
    store: FeedStore,
    identity: ViewerIdentity,
    status_message: String,
    mounted: bool,
    cancel_flag: Arc<AtomicBool>,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl FeedScreen {
    pub fn new(services: Services) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            services,
            store: FeedStore::new(),
            identity: ViewerIdentity::Unresolved,
            status_message: "Loading events...".to_string(),
            mounted: false,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            response_tx,
            response_rx,
        }
    }

    /// Starts the identity read and the feed fetch side by side. Only the
    /// first call does anything.
    pub fn mount(&mut self) -> bool {
        if self.mounted {
            return false;
        }
        self.mounted = true;
        tracing::info!("mounting feed screen");

        let tx = self.response_tx.clone();
        let cancel = self.cancel_flag.clone();
        let storage = self.services.storage.clone();
        let key = self.services.viewer_key.clone();
        thread::spawn(move || {
            let identity = identity::resolve(storage.as_ref(), &key);
            if !cancel.load(Ordering::SeqCst) {
                let _ = tx.send(AsyncResponse::Identity { identity });
            }
        });

        let tx = self.response_tx.clone();
        let cancel = self.cancel_flag.clone();
        let feed = self.services.feed.clone();
        thread::spawn(move || {
            let result = loader::load(feed.as_ref());
            if !cancel.load(Ordering::SeqCst) {
                let _ = tx.send(AsyncResponse::Feed { result });
            }
        });

        true
    }

    /// Drops interest in in-flight work. Late results are discarded.
    pub fn unmount(&mut self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    pub fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            changed |= self.handle_async_response(message);
        }
        changed
    }

    /// Blocks until the feed has settled. Identity may still be unresolved.
    pub fn wait_until_ready(&mut self, timeout: Duration) -> bool {
        self.wait_until(timeout, |screen| screen.is_ready())
    }

    /// Blocks until both the feed and the identity read have settled.
    pub fn wait_until_settled(&mut self, timeout: Duration) -> bool {
        self.wait_until(timeout, |screen| {
            screen.is_ready() && screen.identity.is_settled()
        })
    }

    fn wait_until(&mut self, timeout: Duration, done: impl Fn(&Self) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        self.poll_async();
        while !done(self) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(message) => {
                    self.handle_async_response(message);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return done(self);
                }
            }
        }
        true
    }

    fn handle_async_response(&mut self, message: AsyncResponse) -> bool {
        if self.cancel_flag.load(Ordering::SeqCst) {
            return false;
        }
        match message {
            AsyncResponse::Identity { identity } => {
                if self.identity.is_settled() {
                    return false;
                }
                tracing::debug!(known = identity.as_option().is_some(), "viewer identity settled");
                self.identity = identity;
            }
            AsyncResponse::Feed { result } => {
                if self.store.readiness() == Readiness::Ready {
                    return false;
                }
                if self.store.settle(result) {
                    self.status_message = format!("Loaded {} events.", self.store.len());
                } else {
                    self.status_message = "Failed to load events.".to_string();
                }
                tracing::info!(events = self.store.len(), "feed ready");
            }
        }
        true
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    pub fn identity(&self) -> &ViewerIdentity {
        &self.identity
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Handle for child widgets that report back from other threads.
    pub fn store(&self) -> FeedStore {
        self.store.clone()
    }

    pub fn cards(&self) -> Vec<PostCard> {
        self.store
            .snapshot()
            .iter()
            .map(|post| PostCard::new(post, &self.services.media))
            .collect()
    }

    pub fn action_row(&self, id: &str) -> Option<ActionRowInput> {
        let post = self.store.get(id)?;
        Some(ActionRowInput {
            post_id: post.id().to_string(),
            viewer_identity: self.viewer_identity(),
            identity_settled: self.identity.is_settled(),
            like_count: post.like_count(),
            comment_count: post.comment_count(),
            comments_expanded: post.comments_expanded(),
        })
    }

    pub fn comment_panel(&self, id: &str) -> Option<CommentPanelInput> {
        let post = self.store.get(id)?;
        if !post.comments_expanded() {
            return None;
        }
        Some(CommentPanelInput {
            post_id: post.id().to_string(),
            viewer_identity: self.viewer_identity(),
            identity_settled: self.identity.is_settled(),
            comment_count: post.comment_count(),
        })
    }

    pub fn on_toggle_comments(&self, id: &str) -> bool {
        self.store.toggle_comments(id)
    }

    pub fn on_comment_count_changed(&self, id: &str, count: u64) -> bool {
        self.store.patch_comment_count(id, count)
    }

    /// Hands the selected post to the navigator. Taps on the action row are
    /// handled by the row itself and never navigate.
    pub fn select(&self, id: &str, target: SelectTarget) -> bool {
        if target == SelectTarget::ActionRow {
            return false;
        }
        let Some(post) = self.store.get(id) else {
            tracing::debug!(id, "ignoring selection of unknown event");
            return false;
        };
        let payload = NavigationPayload {
            post: (*post).clone(),
            viewer_identity: self.viewer_identity(),
        };
        self.services.navigator.navigate(EVENT_DETAIL_ROUTE, payload);
        true
    }

    fn viewer_identity(&self) -> Option<String> {
        self.identity.as_option().map(str::to_string)
    }
}

impl Drop for FeedScreen {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MockFeedSource, MockKeyValueStore, RecordingNavigator};
    use crate::model::PostEntity;
    use anyhow::anyhow;

    /// Feed source that blocks until the test releases it.
    struct GatedFeed {
        gate: Receiver<()>,
        events: Vec<PostEntity>,
    }

    impl FeedSource for GatedFeed {
        fn load_events(&self) -> Result<Vec<PostEntity>> {
            self.gate
                .recv()
                .map_err(|_| anyhow!("gate closed"))?;
            Ok(self.events.clone())
        }
    }

    struct GatedStorage {
        gate: Receiver<()>,
    }

    impl KeyValueStore for GatedStorage {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            self.gate.recv().map_err(|_| anyhow!("gate closed"))?;
            Ok(Some("u123".into()))
        }
    }

    fn services(
        feed: Arc<dyn FeedSource>,
        storage: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Services {
        Services {
            feed,
            storage,
            navigator,
            media: MediaResolver::default(),
            viewer_key: "userId".into(),
        }
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn ready_does_not_wait_for_identity() {
        let (release_storage, gate) = unbounded();
        let mut screen = FeedScreen::new(services(
            Arc::new(MockFeedSource::sample()),
            Arc::new(GatedStorage { gate }),
            Arc::new(RecordingNavigator::default()),
        ));
        screen.mount();
        assert!(screen.wait_until_ready(WAIT));
        assert_eq!(screen.identity(), &ViewerIdentity::Unresolved);
        assert!(!screen.action_row("welcome").unwrap().identity_settled);

        release_storage.send(()).unwrap();
        assert!(screen.wait_until_settled(WAIT));
        assert_eq!(screen.identity(), &ViewerIdentity::Known("u123".into()));
    }

    #[test]
    fn identity_settling_first_does_not_make_ready() {
        let (release_feed, gate) = unbounded();
        let mut screen = FeedScreen::new(services(
            Arc::new(GatedFeed {
                gate,
                events: crate::data::sample_events(),
            }),
            Arc::new(MockKeyValueStore::default()),
            Arc::new(RecordingNavigator::default()),
        ));
        screen.mount();
        assert!(!screen.wait_until_ready(Duration::from_millis(300)));
        assert_eq!(screen.identity(), &ViewerIdentity::Anonymous);
        assert_eq!(screen.status_message(), "Loading events...");

        release_feed.send(()).unwrap();
        assert!(screen.wait_until_ready(WAIT));
        assert_eq!(screen.cards().len(), 2);
    }

    #[test]
    fn feed_failure_still_becomes_ready() {
        let mut screen = FeedScreen::new(services(
            Arc::new(MockFeedSource::failing()),
            Arc::new(MockKeyValueStore::failing()),
            Arc::new(RecordingNavigator::default()),
        ));
        screen.mount();
        assert!(screen.wait_until_settled(WAIT));
        assert!(screen.cards().is_empty());
        assert_eq!(screen.identity(), &ViewerIdentity::Anonymous);
        assert_eq!(screen.status_message(), "Failed to load events.");
    }

    #[test]
    fn mount_runs_once() {
        let mut screen = FeedScreen::new(services(
            Arc::new(MockFeedSource::sample()),
            Arc::new(MockKeyValueStore::default()),
            Arc::new(RecordingNavigator::default()),
        ));
        assert!(screen.mount());
        assert!(!screen.mount());
    }

    #[test]
    fn unmount_discards_late_results() {
        let (release_feed, gate) = unbounded();
        let mut screen = FeedScreen::new(services(
            Arc::new(GatedFeed {
                gate,
                events: crate::data::sample_events(),
            }),
            Arc::new(MockKeyValueStore::default()),
            Arc::new(RecordingNavigator::default()),
        ));
        screen.mount();
        screen.unmount();
        release_feed.send(()).unwrap();
        assert!(!screen.wait_until_ready(Duration::from_millis(200)));
        assert!(screen.cards().is_empty());
    }

    #[test]
    fn action_row_selection_does_not_navigate() {
        let navigator = Arc::new(RecordingNavigator::default());
        let mut screen = FeedScreen::new(services(
            Arc::new(MockFeedSource::sample()),
            Arc::new(MockKeyValueStore::default()),
            navigator.clone(),
        ));
        screen.mount();
        assert!(screen.wait_until_settled(WAIT));

        assert!(!screen.select("welcome", SelectTarget::ActionRow));
        assert!(!screen.select("missing", SelectTarget::Title));
        assert!(navigator.calls().is_empty());

        for target in [SelectTarget::Image, SelectTarget::Title, SelectTarget::Body] {
            assert!(screen.select("meetup", target));
        }
        let calls = navigator.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(route, payload)| {
            route == EVENT_DETAIL_ROUTE
                && payload.post.id() == "meetup"
                && payload.viewer_identity.is_none()
        }));
    }

    #[test]
    fn comment_panel_only_for_expanded_posts() {
        let mut screen = FeedScreen::new(services(
            Arc::new(MockFeedSource::sample()),
            Arc::new(MockKeyValueStore::with("userId", "u9")),
            Arc::new(RecordingNavigator::default()),
        ));
        screen.mount();
        assert!(screen.wait_until_settled(WAIT));

        assert!(screen.comment_panel("welcome").is_none());
        assert!(screen.on_toggle_comments("welcome"));
        let panel = screen.comment_panel("welcome").unwrap();
        assert_eq!(panel.viewer_identity.as_deref(), Some("u9"));
        assert!(panel.identity_settled);
        assert_eq!(panel.comment_count, 2);
    }

    #[test]
    fn cards_resolve_media() {
        let mut svc = services(
            Arc::new(MockFeedSource::sample()),
            Arc::new(MockKeyValueStore::default()),
            Arc::new(RecordingNavigator::default()),
        );
        svc.media = MediaResolver::new(&crate::config::MediaConfig {
            origin: "https://cdn.example.com".into(),
            ..Default::default()
        });
        let mut screen = FeedScreen::new(svc);
        screen.mount();
        assert!(screen.wait_until_ready(WAIT));

        let cards = screen.cards();
        assert_eq!(cards[0].image_url, "https://cdn.example.com/images/welcome.jpg");
        assert_eq!(cards[0].avatar_url, crate::media::DEFAULT_AVATAR_URL);
        assert_eq!(cards[1].image_url, crate::media::PLACEHOLDER_IMAGE_URL);
        assert_eq!(cards[1].avatar_url, "https://avatars.example.com/organizers.png");
    }
}
