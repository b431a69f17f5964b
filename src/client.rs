use std::env;
use std::time::Duration;

use futures::stream::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, StatusCode};
use url::Url;

use crate::backend::{ByteStream, ChatBackend};
use crate::config::ChatConfig;
use crate::error::{Error, Result};
use crate::types::{ChatRequest, ChatResponse};

/// Environment variable that overrides the configured base URL.
pub const BASE_URL_ENV: &str = "CHATTERBOX_BASE_URL";

const STREAM_PATH: &str = "chat-stream";
const ONESHOT_PATH: &str = "chat";

/// HTTP client for the answering service.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    stream_url: Url,
    oneshot_url: Url,
    timeout: Duration,
}

impl ChatClient {
    /// Create a client for the service at `base_url`.
    ///
    /// When `base_url` is `None` the `CHATTERBOX_BASE_URL` environment variable is consulted,
    /// then the default from [`ChatConfig`].
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let config = ChatConfig::default();
        Self::with_options(base_url, Some(config.timeout), Some(config.connect_timeout))
    }

    /// Create a client from a resolved configuration.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        Self::with_options(
            Some(config.base_url.clone()),
            Some(config.timeout),
            Some(config.connect_timeout),
        )
    }

    /// Create a new client with custom settings.
    ///
    /// `timeout` bounds one-shot requests.  Streaming requests are bounded only by
    /// `connect_timeout`, since a reply may keep streaming well past any fixed deadline.
    pub fn with_options(
        base_url: Option<String>,
        timeout: Option<Duration>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let defaults = ChatConfig::default();
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(BASE_URL_ENV).unwrap_or(defaults.base_url),
        };
        let base = parse_base_url(&base_url)?;
        let stream_url = base.join(STREAM_PATH)?;
        let oneshot_url = base.join(ONESHOT_PATH)?;

        let timeout = timeout.unwrap_or(defaults.timeout);
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout.unwrap_or(defaults.connect_timeout))
            .default_headers(default_headers())
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            stream_url,
            oneshot_url,
            timeout,
        })
    }

    /// The URL of the streaming endpoint.
    pub fn stream_url(&self) -> &Url {
        &self.stream_url
    }

    /// The URL of the one-shot endpoint.
    pub fn oneshot_url(&self) -> &Url {
        &self.oneshot_url
    }

    /// Convert a non-success response into an error carrying its status and body.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        match response.text().await {
            Ok(body) => Error::api(status_code, body.trim()),
            Err(e) => Error::http_client(
                format!("Failed to read error response: {}", e),
                Some(Box::new(e)),
            ),
        }
    }

    /// Post `request` to the one-shot endpoint and parse the complete reply.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self
            .client
            .post(self.oneshot_url.clone())
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::from_transport(e, Some(self.timeout.as_secs_f64())))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<ChatResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    /// Post `request` to the streaming endpoint and return the raw body as it arrives.
    pub async fn stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        let response = self
            .client
            .post(self.stream_url.clone())
            .header(header::ACCEPT, HeaderValue::from_static("text/plain"))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::from_transport(e, None))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        if response.status() == StatusCode::NO_CONTENT {
            return Err(Error::streaming("response has no body", None));
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {}", e), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(stream))
    }
}

#[async_trait::async_trait]
impl ChatBackend for ChatClient {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        self.stream(request).await
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.send(request).await
    }
}

/// Create and return default headers for requests.
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers
}

// `Url::join` drops the last path segment unless the base ends in a slash.
fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url)?;
    if base.cannot_be_a_base() {
        return Err(Error::validation(
            format!("{base_url} cannot be used as a base URL"),
            Some("base_url".to_string()),
        ));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}
