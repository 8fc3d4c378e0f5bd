//! Network side of the offline cache.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use tracing::{debug, warn};

use super::FetchError;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A fetched (or cached) asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub url: Url,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Anything that can answer an asset request: the network, or the offline
/// cache sitting in front of it.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Asset, FetchError>;
}

/// Fetches over HTTP(S) with reqwest, and `file://` URLs from disk.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, url: &Url) -> Result<Asset, FetchError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Asset request failed");
            return Err(match status.as_u16() {
                404 => FetchError::NotFound(url.to_string()),
                code => FetchError::Status {
                    url: url.to_string(),
                    status: code,
                },
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        debug!(%url, bytes = body.len(), "Fetched asset");
        Ok(Asset {
            url: url.clone(),
            content_type,
            body,
        })
    }

    async fn fetch_file(&self, url: &Url) -> Result<Asset, FetchError> {
        let path = url
            .to_file_path()
            .map_err(|_| FetchError::NotFound(url.to_string()))?;

        // A directory URL such as "./" stands for its index page
        let path = if url.path().ends_with('/') {
            path.join("index.html")
        } else {
            path
        };

        let body = tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound(url.to_string())
            } else {
                FetchError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        debug!(?path, bytes = body.len(), "Read local asset");
        Ok(Asset {
            url: url.clone(),
            content_type: guess_content_type(url.path()).map(str::to_string),
            body,
        })
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Asset, FetchError> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url).await,
            "file" => self.fetch_file(url).await,
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Content type for local files, by extension.
fn guess_content_type(path: &str) -> Option<&'static str> {
    let name = path.rsplit('/').next().unwrap_or_default();
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) => ext,
        None if name.is_empty() => "html",
        None => return None,
    };
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => Some("text/html"),
        "css" => Some("text/css"),
        "js" => Some("text/javascript"),
        "json" => Some("application/json"),
        "geojson" => Some("application/geo+json"),
        "png" => Some("image/png"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("/site/data/places.geojson"), Some("application/geo+json"));
        assert_eq!(guess_content_type("/site/style.CSS"), Some("text/css"));
        assert_eq!(guess_content_type("/site/"), Some("text/html"));
        assert_eq!(guess_content_type("/site/LICENSE"), None);
        assert_eq!(guess_content_type("/home/a.b/site/"), Some("text/html"));
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = std::env::temp_dir().join(format!("manabi-fetch-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("index.html"), b"<h1>quiz</h1>").await.unwrap();

        let fetcher = HttpFetcher::new().unwrap();
        let root = Url::from_directory_path(&dir).unwrap();
        let asset = fetcher.fetch(&root).await.unwrap();
        assert_eq!(asset.body, b"<h1>quiz</h1>");
        assert_eq!(asset.content_type.as_deref(), Some("text/html"));

        let missing = root.join("missing.css").unwrap();
        assert!(matches!(
            fetcher.fetch(&missing).await,
            Err(FetchError::NotFound(_))
        ));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let fetcher = HttpFetcher::new().unwrap();
        let url = Url::parse("ftp://example.org/leaflet.js").unwrap();
        assert!(matches!(
            fetcher.fetch(&url).await,
            Err(FetchError::UnsupportedScheme(_))
        ));
    }
}
