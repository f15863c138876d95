use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A feed item as delivered by the backend. The server owns every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEntity {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default, alias = "author_name")]
    pub author_name: String,
    #[serde(default, alias = "author_avatar")]
    pub author_avatar: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "image_url")]
    pub image: Option<String>,
    #[serde(default, alias = "like_count", alias = "likes")]
    pub like_count: u64,
    #[serde(default, alias = "comment_count", alias = "comments")]
    pub comment_count: u64,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Screen-local state that never leaves the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiState {
    pub comments_expanded: bool,
}

/// A server entity paired with its transient UI state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedPost {
    entity: PostEntity,
    ui: UiState,
    comment_count: u64,
}

impl PresentedPost {
    pub fn new(entity: PostEntity) -> Self {
        let comment_count = entity.comment_count;
        Self {
            entity,
            ui: UiState::default(),
            comment_count,
        }
    }

    pub fn id(&self) -> &str {
        &self.entity.id
    }

    /// The entity exactly as the server sent it.
    pub fn entity(&self) -> &PostEntity {
        &self.entity
    }

    pub fn comments_expanded(&self) -> bool {
        self.ui.comments_expanded
    }

    /// Current comment count. Starts at the server value and follows
    /// patches reported by the comment panel.
    pub fn comment_count(&self) -> u64 {
        self.comment_count
    }

    pub fn like_count(&self) -> u64 {
        self.entity.like_count
    }

    pub(crate) fn with_comments_toggled(&self) -> Self {
        let mut next = self.clone();
        next.ui.comments_expanded = !next.ui.comments_expanded;
        next
    }

    pub(crate) fn with_comment_count(&self, count: u64) -> Self {
        let mut next = self.clone();
        next.comment_count = count;
        next
    }
}

/// Who is looking at the feed.
///
/// `Unresolved` only exists while the storage read is in flight; once it
/// settles the identity is either `Known` or `Anonymous` and never goes back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewerIdentity {
    #[default]
    Unresolved,
    Known(String),
    Anonymous,
}

impl ViewerIdentity {
    pub fn from_stored(value: Option<String>) -> Self {
        match value {
            Some(id) if !id.trim().is_empty() => ViewerIdentity::Known(id),
            _ => ViewerIdentity::Anonymous,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, ViewerIdentity::Unresolved)
    }

    pub fn as_option(&self) -> Option<&str> {
        match self {
            ViewerIdentity::Known(id) => Some(id.as_str()),
            _ => None,
        }
    }
}

/// Opaque hand-off given to the navigation collaborator on selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationPayload {
    pub post: PresentedPost,
    pub viewer_identity: Option<String>,
}
