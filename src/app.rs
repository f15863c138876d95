use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api;
use crate::config;
use crate::data::{self, FeedSource, KeyValueStore, Navigator};
use crate::media::MediaResolver;
use crate::screen::{FeedScreen, Services};
use crate::storage;

const SETTLE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub offline: bool,
    pub viewer: Option<String>,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;

    let store = Arc::new(
        storage::Store::open(storage::Options {
            path: cfg.storage.path.clone(),
        })
        .context("open storage")?,
    );
    if let Some(viewer) = opts.viewer.as_deref() {
        store
            .set(&cfg.storage.viewer_key, viewer)
            .context("remember viewer")?;
    }

    let feed: Arc<dyn FeedSource> = if opts.offline {
        Arc::new(data::MockFeedSource::sample())
    } else {
        let client = api::Client::new(api::ClientConfig {
            base_url: cfg.api.base_url.clone(),
            user_agent: cfg.api.user_agent.clone(),
            timeout: Some(cfg.api.timeout),
            http_client: None,
        })
        .context("build events client")?;
        Arc::new(data::ApiFeedSource::new(Arc::new(client)))
    };
    let storage: Arc<dyn KeyValueStore> = store;
    let navigator: Arc<dyn Navigator> = Arc::new(data::LogNavigator);

    let mut screen = FeedScreen::new(Services {
        feed,
        storage,
        navigator,
        media: MediaResolver::new(&cfg.media),
        viewer_key: cfg.storage.viewer_key.clone(),
    });
    screen.mount();
    if !screen.wait_until_settled(cfg.api.timeout + SETTLE_GRACE) {
        tracing::warn!("feed did not settle before timeout");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    render(&screen, &mut out).context("write feed")?;
    out.flush()?;
    Ok(())
}

pub fn render(screen: &FeedScreen, out: &mut impl Write) -> io::Result<()> {
    let viewer = screen.identity().as_option().unwrap_or("anonymous");
    writeln!(out, "{}", screen.status_message())?;
    writeln!(out, "viewer: {viewer}")?;
    for card in screen.cards() {
        writeln!(out)?;
        writeln!(out, "[{}] {}", card.category, card.title)?;
        writeln!(out, "  by {} ({})", card.author_name, card.avatar_url)?;
        if !card.description.is_empty() {
            writeln!(out, "  {}", card.description)?;
        }
        writeln!(out, "  image: {}", card.image_url)?;
        writeln!(
            out,
            "  {} likes, {} comments",
            card.like_count, card.comment_count
        )?;
    }
    Ok(())
}
