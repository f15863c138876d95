use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use url::Url;

use crate::model::PostEntity;

pub const EVENTS_PATH: &str = "events";

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("events request failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error("decode events response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Payload shapes the events endpoint is known to return.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventsResponse {
    List(Vec<PostEntity>),
    Data { data: Vec<PostEntity> },
    Events { events: Vec<PostEntity> },
}

impl EventsResponse {
    fn into_events(self) -> Vec<PostEntity> {
        match self {
            EventsResponse::List(events)
            | EventsResponse::Data { data: events }
            | EventsResponse::Events { events } => events,
        }
    }
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    events_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("api client user agent required");
        }

        let mut base = Url::parse(config.base_url.trim())
            .with_context(|| format!("api: invalid base url {:?}", config.base_url))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let events_url = base.join(EVENTS_PATH).context("api: build events url")?;

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()
                .context("api: build http client")?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            events_url,
        })
    }

    pub fn events_url(&self) -> &Url {
        &self.events_url
    }

    pub fn events(&self) -> Result<Vec<PostEntity>> {
        let response = self
            .http
            .get(self.events_url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .with_context(|| format!("api: request {}", self.events_url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status).into());
        }

        let body = response.text().context("api: read events body")?;
        let parsed: EventsResponse = serde_json::from_str(&body).map_err(ApiError::from)?;
        Ok(parsed.into_events())
    }
}
