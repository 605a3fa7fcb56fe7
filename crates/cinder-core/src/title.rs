//! Asynchronous title resolution for remote sources.
//!
//! Titles race with playback start, so resolution runs off-store and
//! lands as a single atomic [`Intent::TitleResolved`] dispatch. A
//! transport failure leaves the state untouched (still
//! [`MediaTitle::Pending`]) and is only logged; the view keeps playing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::source::{Provider, Source};
use crate::store::{Intent, Store};

/// Title resolution failures.
#[derive(Debug, Error)]
pub enum TitleError {
    #[error("title lookup failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The source kind has no title to resolve (vault files resolve
    /// locally).
    #[error("source has no resolvable title")]
    Unsupported,
}

/// Resolves the display title of a remote source.
///
/// `Ok(Some(title))` → title known, `Ok(None)` → definitively no title.
#[async_trait]
pub trait TitleResolver: Send + Sync {
    async fn resolve(&self, source: &Source) -> Result<Option<String>, TitleError>;
}

/// Resolve the current source's title and dispatch the result.
///
/// Exactly one dispatch happens, once the async work resolves; errors are
/// logged and dispatch nothing.
pub fn spawn_title_resolution(
    store: Arc<Store>,
    resolver: Arc<dyn TitleResolver>,
) -> tokio::task::JoinHandle<()> {
    let source = store.state().source;
    tokio::spawn(async move {
        let Some(source) = source else { return };
        match resolver.resolve(&source).await {
            Ok(resolved) => {
                debug!(locator = source.locator(), ?resolved, "title resolved");
                store.dispatch(Intent::TitleResolved(resolved));
            }
            Err(err) => {
                warn!(locator = source.locator(), %err, "title resolution failed");
            }
        }
    })
}

const NOEMBED_ENDPOINT: &str = "https://noembed.com/embed";

#[derive(Debug, Deserialize)]
struct NoembedReply {
    title: Option<String>,
}

/// [noembed](https://noembed.com)-backed resolver for video hosts.
#[derive(Debug, Default)]
pub struct NoembedResolver {
    client: reqwest::Client,
}

impl NoembedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup url for a source, or `None` when noembed cannot help.
    fn meta_url(source: &Source) -> Option<String> {
        match source {
            Source::VideoHost {
                provider: Provider::Youtube,
                id,
                ..
            } => Some(format!(
                "{NOEMBED_ENDPOINT}?url=https://www.youtube.com/watch?v={id}"
            )),
            Source::VideoHost {
                provider: Provider::Vimeo,
                id,
                ..
            } => Some(format!("{NOEMBED_ENDPOINT}?url=https://vimeo.com/{id}")),
            _ => None,
        }
    }
}

#[async_trait]
impl TitleResolver for NoembedResolver {
    async fn resolve(&self, source: &Source) -> Result<Option<String>, TitleError> {
        let meta_url = Self::meta_url(source).ok_or(TitleError::Unsupported)?;
        let reply: NoembedReply = self
            .client
            .get(meta_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(reply.title)
    }
}
