use super::WaveformService;
use crate::{
    ChannelSegment, Error, EventsWithDetectionsAndSegments, HttpMethod, RequestConfig, Result,
    cancellation::until_cancelled,
};
use core::time::Duration;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// [`WaveformService`] over HTTP with JSON payloads.
#[derive(Clone)]
pub struct HttpWaveformService {
    http: reqwest::Client,
}

impl HttpWaveformService {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Network {
                context: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self { http })
    }

    fn resolve_url(config: &RequestConfig) -> Result<Url> {
        let base = config.base_url()?;
        let mut base_url = Url::parse(base).map_err(|err| Error::InvalidRequest {
            reason: format!("invalid base URL {base}: {err}"),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        base_url
            .join(config.url.trim_start_matches('/'))
            .map_err(|err| Error::InvalidRequest {
                reason: format!("invalid URL {}: {err}", config.url),
            })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        config: &RequestConfig,
        token: &CancellationToken,
    ) -> Result<T> {
        let url = Self::resolve_url(config)?;
        let method = match config.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
        };

        let mut request = self.http.request(method, url.clone());
        for (name, value) in &config.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &config.data {
            request = request.json(body);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("{:?} {url}", config.method);

        until_cancelled(token, async move {
            let response = request.send().await.map_err(|err| Error::Network {
                context: err.to_string(),
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::Network {
                    context: format!("{url} answered {status}"),
                });
            }

            response.json::<T>().await.map_err(|err| {
                if err.is_decode() {
                    Error::Serialization {
                        context: err.to_string(),
                    }
                } else {
                    Error::Network {
                        context: err.to_string(),
                    }
                }
            })
        })
        .await
    }
}

impl WaveformService for HttpWaveformService {
    async fn fetch_channel_segments(
        &self,
        config: &RequestConfig,
        token: &CancellationToken,
    ) -> Result<Vec<ChannelSegment>> {
        self.send(config, token).await
    }

    async fn fetch_events_with_segments(
        &self,
        config: &RequestConfig,
        token: &CancellationToken,
    ) -> Result<EventsWithDetectionsAndSegments> {
        self.send(config, token).await
    }
}
