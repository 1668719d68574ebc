use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};
use serde::Serialize;

use crate::core::{AppError, Result};

/// Applied to every outbound request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Outbound HTTP client bound to one base URL.
///
/// Each call builds its own `reqwest::Client` and drops it afterwards. A
/// non-2xx response becomes [`AppError::UpstreamStatus`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    timeout: Duration,
}

#[derive(Default)]
struct RequestOptions<'a> {
    query_params: Option<&'a [(&'a str, &'a str)]>,
    json: Option<serde_json::Value>,
    headers: Option<HeaderMap>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn get(
        &self,
        path: &str,
        query_params: Option<&[(&str, &str)]>,
        headers: Option<HeaderMap>,
    ) -> Result<Response> {
        self.request(
            Method::GET,
            path,
            RequestOptions {
                query_params,
                headers,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn post<T>(&self, path: &str, json: &T, headers: Option<HeaderMap>) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        self.request(
            Method::POST,
            path,
            RequestOptions {
                json: Some(serde_json::to_value(json)?),
                headers,
                ..Default::default()
            },
        )
        .await
    }

    /// Full URL for `path`
    pub fn url(&self, path: &str) -> String {
        if self.base_url.is_empty() {
            return path.to_string();
        }
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions<'_>,
    ) -> Result<Response> {
        let url = self.url(path);
        tracing::debug!(%method, %url, "Sending outbound request");

        let mut request = self.client()?.request(method.clone(), &url);
        if let Some(params) = options.query_params {
            request = request.query(params);
        }
        if let Some(body) = &options.json {
            request = request.json(body);
        }
        if let Some(headers) = options.headers {
            request = request.headers(headers);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, %url, error = %e, "Outbound request failed");
            AppError::HttpClient(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%method, %url, status = status.as_u16(), "Upstream returned error status");
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                url,
                body,
            });
        }

        Ok(response)
    }

    fn client(&self) -> Result<Client> {
        Ok(Client::builder().timeout(self.timeout).build()?)
    }
}
