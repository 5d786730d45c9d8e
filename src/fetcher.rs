use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, Url};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::fetch_error::FetchError;

pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// A workbook source resolved to a readable local file
///
/// Downloaded workbooks live in a temp file that is removed when this value is dropped.
#[derive(Debug)]
pub enum FetchedSource {
    Local(PathBuf),
    Downloaded(NamedTempFile),
}

impl FetchedSource {
    pub fn path(&self) -> &Path {
        match self {
            FetchedSource::Local(path) => path,
            FetchedSource::Downloaded(file) => file.path(),
        }
    }

    pub fn is_downloaded(&self) -> bool {
        matches!(self, FetchedSource::Downloaded(_))
    }

    /// Keep the file on disk and return its final path
    pub fn persist(self, dest: Option<&Path>) -> Result<PathBuf, FetchError> {
        match (self, dest) {
            (FetchedSource::Local(path), _) => Ok(path),
            (FetchedSource::Downloaded(file), Some(dest)) => {
                file.persist(dest).map_err(|e| FetchError::Io(e.error))?;
                Ok(dest.to_path_buf())
            }
            (FetchedSource::Downloaded(file), None) => {
                let (_, path) = file.keep().map_err(|e| FetchError::Io(e.error))?;
                Ok(path)
            }
        }
    }
}

/// Resolves a source reference (local path or http(s) URL) to a local workbook file
///
/// Redirects are followed by hand so that request headers (typically a session cookie for a
/// gated document store) are re-sent on every hop and the hop count stays bounded.
#[derive(Clone)]
pub struct SourceFetcher {
    client: Client,
    max_redirects: usize,
}

impl SourceFetcher {
    pub fn new() -> Self {
        Self::with_options(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_MAX_REDIRECTS)
    }

    pub fn with_options(timeout: Duration, max_redirects: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .redirect(Policy::none())
                .build()
                .expect("Failed to create HTTP client"),
            max_redirects,
        }
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Fetch with an optional `Cookie` header
    pub async fn fetch_with_cookie(
        &self,
        source: &str,
        cookie: Option<&str>,
    ) -> Result<FetchedSource, FetchError> {
        let mut headers = HashMap::new();
        if let Some(cookie) = cookie.filter(|c| !c.trim().is_empty()) {
            headers.insert(COOKIE.to_string(), cookie.to_string());
        }
        self.fetch(source, &headers).await
    }

    /// Resolve `source` to a local file
    ///
    /// Existing paths are used in place; `http://` and `https://` URLs are downloaded into a
    /// uniquely named temp file. Anything else must exist locally or fails with `NotFound`.
    #[instrument(skip(self, headers), fields(header_count = headers.len()))]
    pub async fn fetch(
        &self,
        source: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchedSource, FetchError> {
        if is_remote(source) {
            return self.download(source, headers).await;
        }

        let path = PathBuf::from(source);
        if path.exists() {
            debug!("Using local workbook {}", path.display());
            Ok(FetchedSource::Local(path))
        } else {
            warn!("Local source {} does not exist", source);
            Err(FetchError::NotFound(source.to_string()))
        }
    }

    async fn download(
        &self,
        source: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchedSource, FetchError> {
        let header_map = build_headers(headers)?;
        let mut url = Url::parse(source).map_err(|e| FetchError::Network {
            status: None,
            message: format!("invalid URL {source}: {e}"),
        })?;
        let mut hops = 0;

        loop {
            debug!("GET {}", url);
            let response = self
                .client
                .get(url.clone())
                .headers(header_map.clone())
                .send()
                .await?;
            let status = response.status();
            debug!("Received HTTP response with status: {}", status);

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| FetchError::Network {
                        status: Some(status.as_u16()),
                        message: format!("redirect from {url} without Location header"),
                    })?;

                if hops >= self.max_redirects {
                    warn!("Giving up on {} after {} redirects", source, hops);
                    return Err(FetchError::TooManyRedirects {
                        limit: self.max_redirects,
                    });
                }
                hops += 1;

                url = response.url().join(location).map_err(|e| FetchError::Network {
                    status: Some(status.as_u16()),
                    message: format!("invalid redirect location {location}: {e}"),
                })?;
                debug!("Following redirect {} to {}", hops, url);
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Network {
                    status: Some(status.as_u16()),
                    message: format!("GET {url} returned {status}"),
                });
            }

            return write_temp_file(response, &url).await;
        }
    }
}

impl Default for SourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn build_headers(headers: &HashMap<String, String>) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader(name.as_str().to_string()))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Stream the response body into a fresh temp file
async fn write_temp_file(mut response: Response, url: &Url) -> Result<FetchedSource, FetchError> {
    let mut file = tempfile::Builder::new()
        .prefix("qm-")
        .suffix(&workbook_suffix(url))
        .tempfile()?;

    let mut written = 0usize;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)?;
        written += chunk.len();
    }
    file.flush()?;

    if !file.path().exists() {
        return Err(FetchError::NotFound(file.path().display().to_string()));
    }

    info!("Downloaded {} ({} bytes) to {}", url, written, file.path().display());
    Ok(FetchedSource::Downloaded(file))
}

/// Temp file suffix; calamine picks the format by extension so keep a known one
fn workbook_suffix(url: &Url) -> String {
    let ext = Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| WORKBOOK_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or_else(|| "xlsx".to_string());
    format!(".{ext}")
}
