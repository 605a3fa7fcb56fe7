//! Source model: what is playing, independent of transport.
//!
//! A [`Source`] is a tagged union over the three ways a view can obtain
//! media: a file inside the vault, a direct link to a media file, or a
//! recognized video-host page. Classification fails closed: a link that
//! matches nothing is an error, never a guess.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

use crate::error::ClassificationError;
use crate::settings::ProviderToggles;

/// Which native element the presentation layer must instantiate for a
/// source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    /// Media type not yet determined (resolved on `loadedmetadata`).
    Unknown,
    Audio,
    Video,
    /// YouTube iframe player.
    Youtube,
    /// Vimeo iframe player.
    Vimeo,
    /// Embedded webview page.
    Webview,
}

/// Supported video-host providers, in matcher priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Youtube,
    Bilibili,
    Vimeo,
    /// Any other web page, embedded as-is.
    General,
}

/// Title of a remote source.
///
/// Resolution is asynchronous and may race with playback start, so
/// "not yet known" is distinct from "known to have none": consumers render
/// a loading state for [`Pending`](MediaTitle::Pending) and a fallback for
/// [`Unavailable`](MediaTitle::Unavailable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaTitle {
    /// Resolution in flight.
    Pending,
    /// Resolved: no title exists.
    Unavailable,
    Known(String),
}

impl MediaTitle {
    /// Display text, or `None` while resolution is pending.
    pub fn display(&self) -> Option<&str> {
        match self {
            MediaTitle::Pending => Some(""),
            MediaTitle::Unavailable => None,
            MediaTitle::Known(title) => Some(title),
        }
    }
}

/// Description of what a view is playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "lowercase")]
pub enum Source {
    /// A media file inside the vault. Title is always known (the
    /// basename).
    Vault {
        path: String,
        basename: String,
        extension: String,
        title: String,
        kind: PlayerKind,
    },
    /// A direct link to a media file, played by a native element.
    #[serde(rename = "direct")]
    DirectLink {
        /// Raw url, unprocessed.
        url: String,
        /// Whether the element may request with CORS (http/https only).
        allow_cors: bool,
        kind: PlayerKind,
        title: MediaTitle,
    },
    /// A recognized video-host page.
    #[serde(rename = "host")]
    VideoHost {
        provider: Provider,
        /// Provider-specific video id; for [`Provider::General`] the page
        /// url itself.
        id: String,
        /// The original page url, kept for persistence and link menus.
        url: String,
        title: MediaTitle,
        kind: PlayerKind,
    },
}

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "3gp", "flac", "ogg", "oga", "opus"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogv", "mov", "mkv"];

/// Player kind implied by a media file extension.
pub fn kind_for_extension(extension: &str) -> PlayerKind {
    let ext = extension.to_ascii_lowercase();
    if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        PlayerKind::Audio
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        PlayerKind::Video
    } else {
        PlayerKind::Unknown
    }
}

/// Whether the extension belongs to a playable media file.
pub fn is_media_extension(extension: &str) -> bool {
    kind_for_extension(extension) != PlayerKind::Unknown
}

impl Source {
    /// Source for an in-vault media file reference.
    ///
    /// The path is trusted (vault lookup is the host's concern); basename
    /// and extension are derived from it.
    pub fn from_vault_path(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        let (basename, extension) = match name.rsplit_once('.') {
            Some((base, ext)) => (base.to_string(), ext.to_string()),
            None => (name.to_string(), String::new()),
        };
        Source::Vault {
            path: path.to_string(),
            title: basename.clone(),
            kind: kind_for_extension(&extension),
            basename,
            extension,
        }
    }

    /// Classify a raw link with all providers enabled.
    pub fn from_url(raw: &str) -> Result<Self, ClassificationError> {
        Self::from_url_with(raw, &ProviderToggles::default())
    }

    /// Classify a raw link, honoring provider toggles.
    ///
    /// Matchers run in fixed priority order: youtube, bilibili, vimeo,
    /// then the direct-link check for media-file urls, then the general
    /// webview fallback for any other http(s) page. A disabled provider
    /// falls through to the later matchers.
    pub fn from_url_with(
        raw: &str,
        toggles: &ProviderToggles,
    ) -> Result<Self, ClassificationError> {
        let url = Url::parse(raw)?;

        if toggles.youtube {
            if let Some(id) = match_youtube(&url) {
                return Ok(Source::VideoHost {
                    provider: Provider::Youtube,
                    id,
                    url: raw.to_string(),
                    title: MediaTitle::Pending,
                    kind: PlayerKind::Youtube,
                });
            }
        }
        if toggles.bilibili {
            if let Some(id) = match_bilibili(&url) {
                return Ok(Source::VideoHost {
                    provider: Provider::Bilibili,
                    id,
                    url: raw.to_string(),
                    title: MediaTitle::Pending,
                    kind: PlayerKind::Webview,
                });
            }
        }
        if toggles.vimeo {
            if let Some(id) = match_vimeo(&url) {
                return Ok(Source::VideoHost {
                    provider: Provider::Vimeo,
                    id,
                    url: raw.to_string(),
                    title: MediaTitle::Pending,
                    kind: PlayerKind::Vimeo,
                });
            }
        }

        let is_http = matches!(url.scheme(), "http" | "https");
        if let Some(ext) = path_extension(&url) {
            if is_media_extension(&ext) && (is_http || url.scheme() == "file") {
                return Ok(Source::DirectLink {
                    url: raw.to_string(),
                    allow_cors: is_http,
                    kind: kind_for_extension(&ext),
                    title: MediaTitle::Pending,
                });
            }
        }

        if toggles.general && is_http {
            return Ok(Source::VideoHost {
                provider: Provider::General,
                id: raw.to_string(),
                url: raw.to_string(),
                title: MediaTitle::Pending,
                kind: PlayerKind::Webview,
            });
        }

        Err(ClassificationError::Unsupported(raw.to_string()))
    }

    /// The single meaningful locator of this source.
    pub fn locator(&self) -> &str {
        match self {
            Source::Vault { path, .. } => path,
            Source::DirectLink { url, .. } => url,
            Source::VideoHost { id, .. } => id,
        }
    }

    /// Url for persistence and link menus; `None` for vault files.
    pub fn url(&self) -> Option<&str> {
        match self {
            Source::Vault { .. } => None,
            Source::DirectLink { url, .. } => Some(url),
            Source::VideoHost { url, .. } => Some(url),
        }
    }

    pub fn kind(&self) -> PlayerKind {
        match self {
            Source::Vault { kind, .. }
            | Source::DirectLink { kind, .. }
            | Source::VideoHost { kind, .. } => *kind,
        }
    }

    /// Title for display; vault titles are always known.
    pub fn title(&self) -> MediaTitle {
        match self {
            Source::Vault { title, .. } => MediaTitle::Known(title.clone()),
            Source::DirectLink { title, .. } | Source::VideoHost { title, .. } => title.clone(),
        }
    }
}

fn path_extension(url: &Url) -> Option<String> {
    let path = url.path();
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

fn bare_host(url: &Url) -> Option<&str> {
    let host = url.host_str()?;
    Some(
        host.strip_prefix("www.")
            .or_else(|| host.strip_prefix("m."))
            .or_else(|| host.strip_prefix("music."))
            .unwrap_or(host),
    )
}

fn match_youtube(url: &Url) -> Option<String> {
    let host = bare_host(url)?;
    let valid_id = |id: &str| !id.is_empty() && id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    let id = match host {
        "youtube.com" => {
            let path = url.path();
            if path == "/watch" {
                url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned())
            } else {
                path.strip_prefix("/embed/").map(str::to_string)
            }
        }
        "youtu.be" => url.path().strip_prefix('/').map(str::to_string),
        _ => None,
    }?;
    valid_id(&id).then_some(id)
}

fn match_bilibili(url: &Url) -> Option<String> {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| regex::Regex::new(r"^/video/(BV[0-9A-Za-z]+|av\d+)").expect("valid regex"));
    if bare_host(url)? != "bilibili.com" {
        return None;
    }
    pattern
        .captures(url.path())
        .map(|captures| captures[1].to_string())
}

fn match_vimeo(url: &Url) -> Option<String> {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| regex::Regex::new(r"^/(\d+)$").expect("valid regex"));
    if bare_host(url)? != "vimeo.com" {
        return None;
    }
    pattern
        .captures(url.path())
        .map(|captures| captures[1].to_string())
}
