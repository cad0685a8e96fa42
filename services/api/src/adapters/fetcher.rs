//! services/api/src/adapters/fetcher.rs
//!
//! Fetches raw artwork bytes for the base64 upload fallback. Handles
//! `data:` URLs locally; `blob:` URLs only exist inside a browser and are
//! rejected with an explicit error.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use teeforge_core::domain::ImageBlob;
use teeforge_core::ports::{ImageFetcher, PortError, PortResult};

#[derive(Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn decode_data_url(url: &str) -> PortResult<ImageBlob> {
        // data:<media-type>;base64,<payload>
        let rest = url.trim_start_matches("data:");
        let (header, payload) = rest.split_once(',').ok_or_else(|| {
            PortError::InvalidInput("malformed data: URL".to_string())
        })?;
        let content_type = header
            .trim_end_matches(";base64")
            .split(';')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = if header.ends_with(";base64") {
            general_purpose::STANDARD
                .decode(payload)
                .map_err(|e| PortError::InvalidInput(format!("invalid base64 payload: {e}")))?
        } else {
            payload.as_bytes().to_vec()
        };
        Ok(ImageBlob {
            content_type,
            bytes,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> PortResult<ImageBlob> {
        if url.starts_with("data:") {
            return Self::decode_data_url(url);
        }
        if url.starts_with("blob:") {
            return Err(PortError::InvalidInput(
                "blob: URLs are browser-local and cannot be fetched server-side".to_string(),
            ));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PortError::Upstream {
                status: response.status().as_u16(),
                body: format!("failed to fetch artwork from {url}"),
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .to_vec();
        Ok(ImageBlob {
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn data_urls_decode_locally() {
        let fetcher = HttpImageFetcher::new(reqwest::Client::new());
        // "PNG!" base64-encoded.
        let blob = fetcher
            .fetch("data:image/png;base64,UE5HIQ==")
            .await
            .unwrap();
        assert_eq!(blob.content_type, "image/png");
        assert_eq!(blob.bytes, b"PNG!");
    }

    #[tokio::test]
    async fn blob_urls_are_rejected_with_an_explicit_error() {
        let fetcher = HttpImageFetcher::new(reqwest::Client::new());
        let err = fetcher
            .fetch("blob:https://app.example/abc")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }

    #[test]
    fn malformed_data_url_is_an_invalid_input() {
        let err = HttpImageFetcher::decode_data_url("data:image/png;base64").unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }
}
