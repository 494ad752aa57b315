//! HTTP content source backed by the viewer's data API.
//!
//! Endpoints (relative to the base URL):
//! - `GET  /api/data/{folder}` - JSON array of `{name, size}`
//! - `HEAD /api/data/{folder}/{filename}` - size probe
//! - `GET  /api/data/{folder}/{filename}` - file body

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

use super::{ContentSource, OpenedStream, Probe, SourceError};
use crate::models::{FetchTarget, FileEntry};

/// Default user agent sent with every request.
pub const USER_AGENT: &str = concat!("dataview/", env!("CARGO_PKG_VERSION"));

/// Content source talking to the data API over HTTP.
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
    base_url: Url,
}

impl HttpSource {
    /// Create a new HTTP source. `timeout` is the connect and per-read idle limit.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        Self::with_user_agent(base_url, timeout, USER_AGENT)
    }

    /// Create a new HTTP source with a custom user agent.
    pub fn with_user_agent(
        base_url: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, SourceError> {
        let base_url =
            Url::parse(base_url).map_err(|e| SourceError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SourceError::InvalidUrl(base_url.to_string()));
        }

        // No content encoding, so responses keep their Content-Length.
        // `timeout` bounds connecting and each read, never the whole body.
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| SourceError::Connection(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of a folder listing.
    pub fn folder_url(&self, folder: &str) -> Result<Url, SourceError> {
        self.api_url(&[folder])
    }

    /// URL of a file. Folder and filename are percent-encoded as path segments.
    pub fn file_url(&self, target: &FetchTarget) -> Result<Url, SourceError> {
        self.api_url(&[&target.folder, &target.filename])
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "data"])
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &Url) -> Result<Response, SourceError> {
        let start = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        debug!(
            "{} -> HTTP {} in {:?}",
            url,
            response.status().as_u16(),
            start.elapsed()
        );

        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    async fn list_folder(&self, folder: &str) -> Result<Vec<FileEntry>, SourceError> {
        let url = self.folder_url(folder)?;
        let response = self.send(self.client.get(url.clone()), &url).await?;
        response
            .json::<Vec<FileEntry>>()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }

    async fn probe(&self, target: &FetchTarget) -> Result<Probe, SourceError> {
        let url = self.file_url(target)?;
        let response = self.send(self.client.head(url.clone()), &url).await?;
        let headers = ResponseHeaders::from_response(&response);

        Ok(Probe {
            content_length: headers.content_length(),
            content_type: headers.content_type().map(str::to_string),
        })
    }

    async fn open_stream(&self, target: &FetchTarget) -> Result<OpenedStream, SourceError> {
        let url = self.file_url(target)?;
        let response = self.send(self.client.get(url.clone()), &url).await?;
        let headers = ResponseHeaders::from_response(&response);

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| SourceError::Read(e.to_string())))
            .boxed();

        Ok(OpenedStream {
            content_type: headers.content_type().map(str::to_string),
            chunks,
        })
    }
}

/// Response headers with lowercase names.
#[derive(Debug, Clone, Default)]
pub struct ResponseHeaders {
    headers: HashMap<String, String>,
}

impl ResponseHeaders {
    fn from_response(response: &Response) -> Self {
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.to_string(), v.to_string());
            }
        }
        Self { headers }
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(|s| s.as_str())
    }

    /// Get the Content-Length header.
    ///
    /// Read from the raw header: for HEAD responses the body size hint is
    /// always zero.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("content-length")
            .and_then(|s| s.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base: &str) -> HttpSource {
        HttpSource::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_file_url_encodes_segments() {
        let src = source("http://localhost:5000");
        let url = src
            .file_url(&FetchTarget::new("market", "DB1B Market 2019#1.csv"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/data/market/DB1B%20Market%202019%231.csv"
        );
    }

    #[test]
    fn test_folder_url_with_base_path() {
        let src = source("http://example.com/viewer/");
        assert_eq!(
            src.folder_url("coupon").unwrap().as_str(),
            "http://example.com/viewer/api/data/coupon"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpSource::new("not a url", Duration::from_secs(1)),
            Err(SourceError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpSource::new("mailto:someone@example.com", Duration::from_secs(1)),
            Err(SourceError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_content_length_parsing() {
        let mut headers = ResponseHeaders::default();
        assert_eq!(headers.content_length(), None);

        headers
            .headers
            .insert("content-length".to_string(), "6291456".to_string());
        assert_eq!(headers.content_length(), Some(6_291_456));

        headers
            .headers
            .insert("content-length".to_string(), "unknown".to_string());
        assert_eq!(headers.content_length(), None);
    }
}
