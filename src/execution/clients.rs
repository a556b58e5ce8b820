use reqwest::{self, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::error::ExecutionError;
use super::retry::ResilientClient;

const MAX_ERROR_BODY: usize = 512;

/// REST JSON client for provider APIs. Every request runs through the
/// wrapped [`ResilientClient`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    http_client: reqwest::Client,
    retry: ResilientClient,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, retry: ResilientClient) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry(&self) -> &ResilientClient {
        &self.retry
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        name: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExecutionError> {
        self.get_parsed(name, path, query, |body| Ok(serde_json::from_value(body)?))
            .await
    }

    /// GET whose body is turned into `T` by `parse` inside each attempt, so a
    /// body that does not parse is retried like any other malformed response.
    pub async fn get_parsed<T, F>(
        &self,
        name: &str,
        path: &str,
        query: &[(&str, String)],
        parse: F,
    ) -> Result<T, ExecutionError>
    where
        F: Fn(Value) -> Result<T, ExecutionError>,
    {
        let url = self.url(path);
        let url = url.as_str();
        let http_client = &self.http_client;
        let parse = &parse;

        self.retry
            .execute(name, move || async move {
                let response = http_client.get(url).query(query).send().await?;
                let body = read_json(response).await?;
                parse(body)
            })
            .await
    }

    pub async fn post_json<B, T>(&self, name: &str, path: &str, body: &B) -> Result<T, ExecutionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let url = url.as_str();
        let http_client = &self.http_client;

        self.retry
            .execute(name, move || async move {
                let response = http_client.post(url).json(body).send().await?;
                let body = read_json(response).await?;
                Ok::<T, ExecutionError>(serde_json::from_value(body)?)
            })
            .await
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }
}

/// Reads a response body as JSON and sorts failures into retryable transport
/// errors and terminal application errors.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<Value, ExecutionError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        // 4xx with an explicit error body is the API answering, not the transport failing
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            if let Some(message) = serde_json::from_str::<Value>(&text)
                .ok()
                .as_ref()
                .and_then(error_message)
            {
                return Err(ExecutionError::ApiError(message));
            }
        }
        return Err(ExecutionError::HttpStatus {
            status: status.as_u16(),
            body: truncate(&text),
        });
    }

    if text.trim().is_empty() {
        return Err(ExecutionError::MalformedResponse("empty response body".to_string()));
    }

    let body: Value = serde_json::from_str(&text)?;
    if let Some(message) = failure_payload(&body) {
        return Err(ExecutionError::ApiError(message));
    }
    Ok(body)
}

/// A 2xx body that still reports failure: `{"error": ...}` or `{"success": false}`.
fn failure_payload(body: &Value) -> Option<String> {
    let object = body.as_object()?;
    let has_error = object.get("error").is_some_and(|error| !error.is_null());
    let unsuccessful = object.get("success").and_then(Value::as_bool) == Some(false);

    if has_error || unsuccessful {
        Some(error_message(body).unwrap_or_else(|| "request unsuccessful".to_string()))
    } else {
        None
    }
}

fn error_message(body: &Value) -> Option<String> {
    let object = body.as_object()?;
    let text = |key: &str| -> Option<String> {
        match object.get(key)? {
            Value::String(message) => Some(message.clone()),
            Value::Object(inner) => inner.get("message").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    };

    let detail = text("error").or_else(|| text("msg")).or_else(|| text("message"));
    match (object.get("errorCode").and_then(Value::as_str), detail) {
        (Some(code), Some(detail)) => Some(format!("{code}: {detail}")),
        (Some(code), None) => Some(code.to_string()),
        (None, detail) => detail,
    }
}

pub(crate) fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
