//! HTTP `MappingService` for the OpenStreetMap API v0.6.
//!
//! Every call is a single request; the service performs no retries of its
//! own. Failures are mapped onto [`ServiceError`] with the request URL, and
//! element reads additionally distinguish 404 and 410.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use thiserror::Error;

use mapsync_core::{
    ChangesetId, ChangesetMetadata, Element, ElementRef, FetchError, MappingService, NoteDraft,
    ServiceError,
};

use super::wire::ElementsResponse;
use super::xml::{changeset_document, element_document};

/// Default user agent for API requests.
pub const DEFAULT_USER_AGENT: &str = "mapsync/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const API_PREFIX: &str = "api/0.6";

/// Credentials attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP basic authentication.
    Basic {
        /// Account name.
        user: String,
        /// Account password.
        password: String,
    },
    /// OAuth 2 bearer token.
    Bearer(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// Configuration for [`HttpMappingService`].
#[derive(Debug, Clone)]
pub struct HttpMappingServiceConfig {
    /// Base URL of the API host, e.g. `https://api.openstreetmap.org`.
    pub base_url: String,
    /// Credentials for write operations.
    pub credentials: Credentials,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl HttpMappingServiceConfig {
    /// Create a configuration with default timeout and user agent.
    #[must_use]
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Errors raised while constructing an [`HttpMappingService`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The base URL is empty.
    #[error("API base URL must not be empty")]
    EmptyBaseUrl,
    /// The HTTP client could not be configured.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// OSM API client implementing [`MappingService`].
#[derive(Debug, Clone)]
pub struct HttpMappingService {
    client: Client,
    config: HttpMappingServiceConfig,
}

impl HttpMappingService {
    /// Build a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or the HTTP client fails
    /// to build.
    pub fn new(config: HttpMappingServiceConfig) -> Result<Self, ClientBuildError> {
        if config.base_url.trim().is_empty() {
            return Err(ClientBuildError::EmptyBaseUrl);
        }
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpMappingServiceConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{API_PREFIX}/{path}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn element_read_url(&self, element: ElementRef) -> String {
        self.url(&format!("{element}.json"))
    }

    fn authorise(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.credentials {
            Credentials::Basic { user, password } => request.basic_auth(user, Some(password)),
            Credentials::Bearer(token) => request.bearer_auth(token),
        }
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, ServiceError> {
        let response = self
            .authorise(request)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(url, status, body))
    }

    async fn text(&self, response: Response, url: &str) -> Result<String, ServiceError> {
        response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> ServiceError {
        if error.is_timeout() {
            return ServiceError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return ServiceError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        ServiceError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

fn status_error(url: &str, status: StatusCode, body: String) -> ServiceError {
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or_default().to_owned()
    } else {
        body.trim().to_owned()
    };
    ServiceError::Http {
        url: url.to_owned(),
        status: status.as_u16(),
        message,
    }
}

/// Map an element read failure onto [`FetchError`].
fn classify_fetch_error(element: ElementRef, error: ServiceError) -> FetchError {
    match error {
        ServiceError::Http { status: 404, .. } => FetchError::NotFound { element },
        ServiceError::Http { status: 410, .. } => FetchError::Gone { element },
        other => FetchError::Other(other),
    }
}

fn parse_changeset_id(url: &str, body: &str) -> Result<ChangesetId, ServiceError> {
    body.trim()
        .parse()
        .map(ChangesetId)
        .map_err(|_| ServiceError::Parse {
            url: url.to_owned(),
            message: format!("expected a changeset id, got {:?}", body.trim()),
        })
}

#[async_trait(?Send)]
impl MappingService for HttpMappingService {
    async fn fetch_element(&self, element: ElementRef) -> Result<Element, FetchError> {
        let url = self.element_read_url(element);
        let response = self
            .send(self.client.get(&url), &url)
            .await
            .map_err(|err| classify_fetch_error(element, err))?;
        let body = self.text(response, &url).await?;
        let parsed: ElementsResponse =
            serde_json::from_str(&body).map_err(|err| ServiceError::Parse {
                url: url.clone(),
                message: err.to_string(),
            })?;
        parsed.into_element(element).map_err(|message| {
            FetchError::Other(ServiceError::Parse {
                url: url.clone(),
                message,
            })
        })
    }

    async fn create_changeset(
        &self,
        metadata: &ChangesetMetadata,
    ) -> Result<ChangesetId, ServiceError> {
        let url = self.url("changeset/create");
        let request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(changeset_document(metadata));
        let response = self.send(request, &url).await?;
        let body = self.text(response, &url).await?;
        parse_changeset_id(&url, &body)
    }

    async fn send_element(
        &self,
        element: &Element,
        changeset: ChangesetId,
    ) -> Result<(), ServiceError> {
        let url = self.url(&element.reference.to_string());
        let request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(element_document(element, changeset));
        let response = self.send(request, &url).await?;
        let version = self.text(response, &url).await?;
        debug!("{} is now at version {}", element.reference, version.trim());
        Ok(())
    }

    async fn close_changeset(&self, changeset: ChangesetId) -> Result<(), ServiceError> {
        let url = self.url(&format!("changeset/{changeset}/close"));
        self.send(self.client.put(&url), &url).await?;
        Ok(())
    }

    async fn create_note(&self, note: &NoteDraft) -> Result<(), ServiceError> {
        let url = self.url("notes");
        let request = self.client.post(&url).query(&[
            ("lat", note.lat.to_string()),
            ("lon", note.lon.to_string()),
            ("text", note.text.clone()),
        ]);
        self.send(request, &url).await?;
        Ok(())
    }
}
