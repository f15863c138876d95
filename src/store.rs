use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;

use crate::model::PresentedPost;

/// Shared, immutable snapshot of the feed. Untouched entries keep their
/// `Arc` across updates so callers can skip work with `Arc::ptr_eq`.
pub type FeedSnapshot = Arc<Vec<Arc<PresentedPost>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Booting,
    Ready,
}

#[derive(Debug)]
struct FeedState {
    posts: FeedSnapshot,
    index: HashMap<String, usize>,
    readiness: Readiness,
}

impl FeedState {
    fn empty() -> Self {
        Self {
            posts: Arc::new(Vec::new()),
            index: HashMap::new(),
            readiness: Readiness::Booting,
        }
    }

    /// Copy-on-write replace of the entry for `id`.
    fn replace_with(
        &mut self,
        id: &str,
        op: &str,
        f: impl FnOnce(&PresentedPost) -> PresentedPost,
    ) -> bool {
        let Some(&pos) = self.index.get(id) else {
            tracing::debug!(id, op, "ignoring update for unknown event");
            return false;
        };
        let mut next: Vec<Arc<PresentedPost>> = self.posts.as_ref().clone();
        let updated = Arc::new(f(&next[pos]));
        next[pos] = updated;
        self.posts = Arc::new(next);
        true
    }
}

/// Canonical list behind the feed screen. All mutation goes through
/// `toggle_comments` and `patch_comment_count`, serialized by one lock.
#[derive(Debug, Clone)]
pub struct FeedStore {
    state: Arc<Mutex<FeedState>>,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedState::empty())),
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.lock().posts.clone()
    }

    pub fn readiness(&self) -> Readiness {
        self.state.lock().readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness() == Readiness::Ready
    }

    pub fn len(&self) -> usize {
        self.state.lock().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<Arc<PresentedPost>> {
        let state = self.state.lock();
        state.index.get(id).map(|&pos| state.posts[pos].clone())
    }

    /// Settles a load attempt. Success replaces the whole list; failure keeps
    /// whatever was there. Either way the store becomes ready.
    pub fn settle(&self, result: Result<Vec<PresentedPost>>) -> bool {
        let mut state = self.state.lock();
        let loaded = match result {
            Ok(posts) => {
                state.index = posts
                    .iter()
                    .enumerate()
                    .map(|(pos, post)| (post.id().to_string(), pos))
                    .collect();
                state.posts = Arc::new(posts.into_iter().map(Arc::new).collect());
                true
            }
            Err(err) => {
                tracing::warn!(kept = state.posts.len(), "failed to load feed: {err:#}");
                false
            }
        };
        state.readiness = Readiness::Ready;
        loaded
    }

    /// Flips the comment panel of `id`. Unknown ids are a no-op.
    pub fn toggle_comments(&self, id: &str) -> bool {
        self.state
            .lock()
            .replace_with(id, "toggle_comments", PresentedPost::with_comments_toggled)
    }

    /// Sets the comment count of `id`. Unknown ids are a no-op.
    pub fn patch_comment_count(&self, id: &str, count: u64) -> bool {
        self.state
            .lock()
            .replace_with(id, "patch_comment_count", |post| post.with_comment_count(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;
    use crate::model::PostEntity;
    use anyhow::anyhow;
    use std::thread;

    fn entity(id: &str, comments: u64) -> PostEntity {
        serde_json::from_value(serde_json::json!({ "id": id, "commentCount": comments })).unwrap()
    }

    fn loaded(ids: &[&str]) -> FeedStore {
        let store = FeedStore::new();
        let posts = loader::present(ids.iter().map(|id| entity(id, 0)).collect());
        assert!(store.settle(Ok(posts)));
        store
    }

    fn expanded(store: &FeedStore) -> Vec<bool> {
        store.snapshot().iter().map(|p| p.comments_expanded()).collect()
    }

    #[test]
    fn starts_booting_and_empty() {
        let store = FeedStore::new();
        assert_eq!(store.readiness(), Readiness::Booting);
        assert!(store.is_empty());
    }

    #[test]
    fn failed_first_load_is_ready_and_empty() {
        let store = FeedStore::new();
        assert!(!store.settle(Err(anyhow!("offline"))));
        assert!(store.is_ready());
        assert!(store.is_empty());
    }

    #[test]
    fn failed_reload_keeps_previous_list() {
        let store = loaded(&["1", "2"]);
        let before = store.snapshot();
        store.settle(Err(anyhow!("offline")));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn toggle_twice_round_trips() {
        let store = loaded(&["1", "2", "3"]);
        let original = expanded(&store);
        assert!(store.toggle_comments("2"));
        assert_eq!(expanded(&store), [false, true, false]);
        assert!(store.toggle_comments("2"));
        assert_eq!(expanded(&store), original);
    }

    #[test]
    fn toggle_keeps_untouched_entries_identical() {
        let store = loaded(&["1", "2", "3"]);
        let before = store.snapshot();
        store.toggle_comments("2");
        let after = store.snapshot();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(Arc::ptr_eq(&before[0], &after[0]));
        assert!(!Arc::ptr_eq(&before[1], &after[1]));
        assert!(Arc::ptr_eq(&before[2], &after[2]));
        let ids: Vec<&str> = after.iter().map(|p| p.id()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn patch_only_changes_count() {
        let store = loaded(&["1", "2"]);
        store.toggle_comments("1");
        assert!(store.patch_comment_count("1", 5));
        let post = store.get("1").unwrap();
        assert_eq!(post.comment_count(), 5);
        assert!(post.comments_expanded());
        assert_eq!(post.like_count(), 0);
    }

    #[test]
    fn repeated_patch_is_content_equal() {
        let store = loaded(&["1", "2"]);
        store.patch_comment_count("1", 4);
        let once: Vec<PresentedPost> = store.snapshot().iter().map(|p| (**p).clone()).collect();
        store.patch_comment_count("1", 4);
        let twice: Vec<PresentedPost> = store.snapshot().iter().map(|p| (**p).clone()).collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn unknown_ids_leave_snapshot_untouched() {
        let store = loaded(&["1", "2"]);
        let before = store.snapshot();
        assert!(!store.toggle_comments("missing"));
        assert!(!store.patch_comment_count("missing", 9));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn stale_id_after_reload_is_a_no_op() {
        let store = loaded(&["old"]);
        store.settle(Ok(loader::present(vec![entity("new", 1)])));
        assert!(!store.toggle_comments("old"));
        assert!(!store.get("new").unwrap().comments_expanded());
    }

    #[test]
    fn concurrent_patches_do_not_lose_updates() {
        let ids: Vec<String> = (0..8).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let store = loaded(&refs);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    let id = i.to_string();
                    for n in 1..=50u64 {
                        store.patch_comment_count(&id, n);
                        store.toggle_comments(&id);
                        store.toggle_comments("0");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot();
        for post in snapshot.iter() {
            assert_eq!(post.comment_count(), 50, "id {}", post.id());
        }
        // "0" is toggled 50 times by itself and 400 times by everyone.
        assert!(!store.get("0").unwrap().comments_expanded());
        assert!(!store.get("3").unwrap().comments_expanded());
    }
}
