//! Remote access to the words collection endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::api_types::{ApiEnvelope, ApiErrorBody, ApiStatus, WORD_NOT_FOUND};
use super::error::ApiError;
use super::types::{Word, WordInput};
use crate::config::Config;

/// CRUD operations against the words collection.
///
/// Implementations never retry; callers decide what to do with a failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WordsApi: Send + Sync {
  /// Fetch every word visible to the current session
  async fn list_all(&self) -> Result<Vec<Word>, ApiError>;

  /// Create a word; the server assigns id and timestamps
  async fn create(&self, input: &WordInput) -> Result<Word, ApiError>;

  /// Replace literal and category of an existing word
  async fn update(&self, id: &str, input: &WordInput) -> Result<Word, ApiError>;

  /// Delete a word. Deleting twice fails with `NotFound`.
  async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

/// Reqwest-backed words API client
#[derive(Clone)]
pub struct HttpWordsClient {
  client: Client,
  base: Url,
  token: Option<String>,
}

impl HttpWordsClient {
  pub fn new(base: Url, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| ApiError::network(format!("failed to build HTTP client: {e}")))?;

    // Url::join drops the last path segment unless the base ends with '/'
    let base = if base.path().ends_with('/') {
      base
    } else {
      let mut base = base;
      let path = format!("{}/", base.path());
      base.set_path(&path);
      base
    };

    Ok(Self {
      client,
      base,
      token,
    })
  }

  pub fn from_config(config: &Config) -> color_eyre::Result<Self> {
    let base = Url::parse(&config.api.url)
      .map_err(|e| color_eyre::eyre::eyre!("Invalid API url '{}': {}", config.api.url, e))?;
    let timeout = Duration::from_secs(config.api.timeout_secs);
    Ok(Self::new(base, Config::get_api_token(), timeout)?)
  }

  /// Host (and port) of the API, for the header bar
  pub fn host(&self) -> String {
    match (self.base.host_str(), self.base.port()) {
      (Some(host), Some(port)) => format!("{host}:{port}"),
      (Some(host), None) => host.to_string(),
      _ => self.base.to_string(),
    }
  }

  fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
    self
      .base
      .join(path)
      .map_err(|e| ApiError::network(format!("invalid endpoint {path}: {e}")))
  }

  async fn send<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    body: Option<&WordInput>,
    target_id: Option<&str>,
  ) -> Result<Option<T>, ApiError> {
    let url = self.endpoint(path)?;
    debug!(%method, %url, "words api request");

    let mut request = self
      .client
      .request(method.clone(), url)
      .header(reqwest::header::ACCEPT, "application/json");
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    let response = request.send().await.map_err(map_transport_error)?;
    let status = response.status();
    let bytes = response.bytes().await.map_err(map_transport_error)?;

    if !status.is_success() {
      let error = map_status_error(status, &bytes, target_id);
      warn!(%method, path, %status, error = %error, "words api request failed");
      return Err(error);
    }

    decode_envelope(status, &bytes, target_id)
  }
}

#[async_trait]
impl WordsApi for HttpWordsClient {
  async fn list_all(&self) -> Result<Vec<Word>, ApiError> {
    let words: Option<Vec<Word>> = self.send(Method::GET, "words/get-all", None, None).await?;
    Ok(words.unwrap_or_default())
  }

  async fn create(&self, input: &WordInput) -> Result<Word, ApiError> {
    self
      .send(Method::POST, "words", Some(input), None)
      .await?
      .ok_or_else(|| ApiError::server(200, "create response carried no word"))
  }

  async fn update(&self, id: &str, input: &WordInput) -> Result<Word, ApiError> {
    let path = format!("words/{id}");
    self
      .send(Method::PUT, &path, Some(input), Some(id))
      .await?
      .ok_or_else(|| ApiError::server(200, "update response carried no word"))
  }

  async fn delete(&self, id: &str) -> Result<(), ApiError> {
    let path = format!("words/{id}");
    let _: Option<serde_json::Value> = self.send(Method::DELETE, &path, None, Some(id)).await?;
    Ok(())
  }
}

fn decode_envelope<T: DeserializeOwned>(
  status: StatusCode,
  body: &[u8],
  target_id: Option<&str>,
) -> Result<Option<T>, ApiError> {
  let envelope: ApiEnvelope<T> = serde_json::from_slice(body).map_err(|e| {
    ApiError::server(
      status.as_u16(),
      format!("invalid response body: {e}"),
    )
  })?;

  // A 2xx response can still carry a failed envelope
  if envelope.status == Some(ApiStatus::Error) {
    let message = envelope
      .message
      .unwrap_or_else(|| "request failed".to_string());
    return Err(match target_id {
      Some(id) if message == WORD_NOT_FOUND => ApiError::not_found(id),
      _ => ApiError::server(status.as_u16(), message),
    });
  }

  if let Some(message) = &envelope.message {
    debug!(%status, message, "words api response");
  }
  Ok(envelope.data)
}

fn map_transport_error(error: reqwest::Error) -> ApiError {
  if error.is_timeout() {
    ApiError::network(format!("request timed out: {error}"))
  } else {
    ApiError::network(error.to_string())
  }
}

fn map_status_error(status: StatusCode, body: &[u8], target_id: Option<&str>) -> ApiError {
  let message = ApiErrorBody::parse(body)
    .message
    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());

  match (status, target_id) {
    (StatusCode::NOT_FOUND, Some(id)) => ApiError::not_found(id),
    (_, Some(id)) if message == WORD_NOT_FOUND => ApiError::not_found(id),
    (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, _) => {
      ApiError::validation(message)
    }
    _ => ApiError::server(status.as_u16(), message),
  }
}
