use crate::data::KeyValueStore;
use crate::model::ViewerIdentity;

/// Reads the viewer identifier once. A storage fault settles to
/// `Anonymous` so identity-gated children can still run their anonymous path.
pub fn resolve(store: &dyn KeyValueStore, key: &str) -> ViewerIdentity {
    match store.get(key) {
        Ok(value) => ViewerIdentity::from_stored(value),
        Err(err) => {
            tracing::warn!(key, "failed to read viewer identity: {err:#}");
            ViewerIdentity::Anonymous
        }
    }
}
