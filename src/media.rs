use crate::config::MediaConfig;

pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/600x400?text=No+Image";
pub const DEFAULT_AVATAR_URL: &str = "asset://default-avatar.png";

/// Resolves a post image reference against `origin`.
pub fn resolve(reference: Option<&str>, origin: &str) -> String {
    resolve_with_fallback(reference, origin, PLACEHOLDER_IMAGE_URL)
}

/// Resolves an author avatar reference against `origin`.
pub fn resolve_avatar(reference: Option<&str>, origin: &str) -> String {
    resolve_with_fallback(reference, origin, DEFAULT_AVATAR_URL)
}

/// Absent or blank references map to `fallback`; anything carrying a
/// `scheme://` prefix passes through untouched; anything else is joined to `origin` with exactly one
/// `/` between them.
pub fn resolve_with_fallback(reference: Option<&str>, origin: &str, fallback: &str) -> String {
    let reference = match reference.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return fallback.to_string(),
    };

    if is_absolute(reference) {
        return reference.to_string();
    }

    join(origin.trim(), reference)
}

fn is_absolute(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn join(origin: &str, path: &str) -> String {
    let origin = origin.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let mut out = String::with_capacity(origin.len() + path.len() + 1);
    out.push_str(origin);
    out.push('/');
    out.push_str(path);
    out
}

/// Resolver bound to the configured origin and fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaResolver {
    origin: String,
    placeholder_url: String,
    avatar_fallback: String,
}

impl Default for MediaResolver {
    fn default() -> Self {
        Self {
            origin: String::new(),
            placeholder_url: PLACEHOLDER_IMAGE_URL.to_string(),
            avatar_fallback: DEFAULT_AVATAR_URL.to_string(),
        }
    }
}

impl MediaResolver {
    pub fn new(cfg: &MediaConfig) -> Self {
        let defaults = Self::default();
        Self {
            origin: cfg.origin.trim().to_string(),
            placeholder_url: non_empty_or(&cfg.placeholder_url, defaults.placeholder_url),
            avatar_fallback: non_empty_or(&cfg.avatar_fallback, defaults.avatar_fallback),
        }
    }

    pub fn image(&self, reference: Option<&str>) -> String {
        resolve_with_fallback(reference, &self.origin, &self.placeholder_url)
    }

    pub fn avatar(&self, reference: Option<&str>) -> String {
        resolve_with_fallback(reference, &self.origin, &self.avatar_fallback)
    }
}

fn non_empty_or(value: &str, fallback: String) -> String {
    if value.trim().is_empty() {
        fallback
    } else {
        value.trim().to_string()
    }
}
