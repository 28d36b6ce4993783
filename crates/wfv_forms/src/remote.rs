//! Remote form distribution point.
//!
//! The update site publishes one page per standard forms release. Requesting
//! the page for the installed version redirects to the page of the latest
//! version, so the final URL carries the remote version. The page links to
//! the archive through a file-sharing host whose link target rotates; the
//! link is recognised by a configured marker substring instead.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::UpdateConfig;
use crate::error::NetworkError;
use crate::version::FormVersion;

// href values of anchor elements, double-quoted, single-quoted or bare
static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\b[^>]*?\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("anchor pattern is valid")
});

/// Response to a GET request after following redirects.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// URL of the last response in the redirect chain
    pub final_url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking HTTP access used by the update sequence.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// GET a URL, following redirects.
    fn fetch(&self, url: &str) -> Result<Fetched, NetworkError>;
}

/// [`Transport`] backed by a blocking reqwest client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &UpdateConfig) -> Result<Self, NetworkError> {
        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(NetworkError::Client)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<Fetched, NetworkError> {
        let request_error = |source: reqwest::Error| NetworkError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().map_err(request_error)?;
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let body = response.bytes().map_err(request_error)?.to_vec();
        debug!("GET {} -> {} ({} bytes) via {}", url, status, body.len(), final_url);

        Ok(Fetched {
            final_url,
            status,
            body,
        })
    }
}

/// Latest release advertised by the update site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRelease {
    pub version: FormVersion,
    /// Link to the release archive
    pub download_url: String,
}

/// Client for the update site.
pub struct UpdateSite {
    transport: Box<dyn Transport>,
    config: UpdateConfig,
}

impl UpdateSite {
    pub fn new(transport: Box<dyn Transport>, config: UpdateConfig) -> Self {
        Self { transport, config }
    }

    /// Update-check URL for the installed version.
    ///
    /// With nothing installed the last known version is checked instead; its
    /// page redirects to the latest release like any other version page.
    pub fn check_url(&self, installed: Option<&FormVersion>) -> String {
        let fallback;
        let version = match installed {
            Some(version) => version,
            None => {
                fallback = FormVersion::from_token(&self.config.last_known_version);
                &fallback
            }
        };
        format!("{}{}", self.config.url_prefix, version.short_form())
    }

    /// Ask the update site for the latest release.
    pub fn latest_release(
        &self,
        installed: Option<&FormVersion>,
    ) -> Result<RemoteRelease, NetworkError> {
        let url = self.check_url(installed);
        info!("checking for new form version via: {}", url);

        let page = self.transport.fetch(&url)?;
        if !page.is_success() {
            return Err(NetworkError::Status {
                url,
                status: page.status,
            });
        }

        let token = page
            .final_url
            .strip_prefix(&self.config.url_prefix)
            .map(|rest| rest.trim_end_matches('/'))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| NetworkError::UnexpectedResponse {
                url: page.final_url.clone(),
                message: format!("expected a URL starting with {}", self.config.url_prefix),
            })?;
        let version = FormVersion::from_token(token);

        let download_url = find_download_link(&page.text(), &self.config.magic).ok_or_else(|| {
            NetworkError::NoDownloadLink {
                url: page.final_url.clone(),
                magic: self.config.magic.clone(),
            }
        })?;

        debug!(
            "remote version: {}, download url: {}, response url: {}",
            version.short_form(),
            download_url,
            page.final_url
        );
        Ok(RemoteRelease {
            version,
            download_url,
        })
    }

    /// Download the archive of a release.
    ///
    /// The link is followed once; if its final URL contains the configured
    /// redirect segment, the rewritten URL is fetched for the archive bytes.
    pub fn download(&self, release: &RemoteRelease) -> Result<Vec<u8>, NetworkError> {
        let first = self.fetch_ok(&release.download_url)?;

        let rewritten = first
            .final_url
            .replace(&self.config.redirect_from, &self.config.redirect_to);
        if rewritten == first.final_url {
            return Ok(first.body);
        }

        debug!("updated download url: {}", rewritten);
        Ok(self.fetch_ok(&rewritten)?.body)
    }

    fn fetch_ok(&self, url: &str) -> Result<Fetched, NetworkError> {
        let fetched = self.transport.fetch(url)?;
        if !fetched.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: fetched.status,
            });
        }
        Ok(fetched)
    }
}

/// First anchor target in an HTML page that contains `magic`.
pub fn find_download_link(html: &str, magic: &str) -> Option<String> {
    ANCHOR_HREF
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|href| href.as_str().replace("&amp;", "&"))
        .find(|href| href.contains(magic))
}
