use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;

use crate::api;
use crate::model::{NavigationPayload, PostEntity};

pub trait FeedSource: Send + Sync {
    fn load_events(&self) -> Result<Vec<PostEntity>>;
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: &str, payload: NavigationPayload);
}

pub struct ApiFeedSource {
    client: Arc<api::Client>,
}

impl ApiFeedSource {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl FeedSource for ApiFeedSource {
    fn load_events(&self) -> Result<Vec<PostEntity>> {
        self.client.events().context("fetch events")
    }
}

/// Navigator that only records the hand-off in the log.
#[derive(Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, destination: &str, payload: NavigationPayload) {
        tracing::info!(
            destination,
            post = payload.post.id(),
            viewer = payload.viewer_identity.as_deref().unwrap_or("anonymous"),
            "navigate"
        );
    }
}

#[derive(Default)]
pub struct MockFeedSource {
    events: Vec<PostEntity>,
    fail: bool,
}

impl MockFeedSource {
    pub fn new(events: Vec<PostEntity>) -> Self {
        Self {
            events,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            events: Vec::new(),
            fail: true,
        }
    }

    pub fn sample() -> Self {
        Self::new(sample_events())
    }
}

impl FeedSource for MockFeedSource {
    fn load_events(&self) -> Result<Vec<PostEntity>> {
        if self.fail {
            return Err(anyhow!("mock feed source unavailable"));
        }
        Ok(self.events.clone())
    }
}

#[derive(Default)]
pub struct MockKeyValueStore {
    values: HashMap<String, String>,
    fail: bool,
}

impl MockKeyValueStore {
    pub fn with(key: &str, value: &str) -> Self {
        let mut values = HashMap::new();
        values.insert(key.to_string(), value.to_string());
        Self {
            values,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            values: HashMap::new(),
            fail: true,
        }
    }
}

impl KeyValueStore for MockKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail {
            return Err(anyhow!("mock storage unavailable"));
        }
        Ok(self.values.get(key).cloned())
    }
}

/// Navigator that keeps every hand-off for later inspection.
#[derive(Default)]
pub struct RecordingNavigator {
    calls: Mutex<Vec<(String, NavigationPayload)>>,
}

impl RecordingNavigator {
    pub fn calls(&self) -> Vec<(String, NavigationPayload)> {
        self.calls.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: &str, payload: NavigationPayload) {
        self.calls.lock().push((destination.to_string(), payload));
    }
}

pub fn sample_events() -> Vec<PostEntity> {
    vec![
        PostEntity {
            id: "welcome".into(),
            author_name: "event-feed".into(),
            author_avatar: None,
            category: "Community".into(),
            title: "Welcome to Event Feed".into(),
            description: "Sample content provided for offline browsing.".into(),
            image: Some("/images/welcome.jpg".into()),
            like_count: 12,
            comment_count: 2,
            created_at: None,
        },
        PostEntity {
            id: "meetup".into(),
            author_name: "organizers".into(),
            author_avatar: Some("https://avatars.example.com/organizers.png".into()),
            category: "Meetup".into(),
            title: "Monthly meetup".into(),
            description: "Short talks followed by open discussion.".into(),
            image: None,
            like_count: 4,
            comment_count: 0,
            created_at: None,
        },
    ]
}
