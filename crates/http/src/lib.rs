// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client wrapper: uniform GET/POST/download with bearer auth.
//!
//! Every call returns `(status, body)` on any HTTP response (including
//! 4xx/5xx) and an error only when no response was obtained. Callers
//! decide what a given status means for them.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Response status and body, regardless of status class.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { inner })
    }

    pub async fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse, HttpError> {
        let mut request = self.inner.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Self::finish(request).await
    }

    pub async fn post_json<B: Serialize>(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<HttpResponse, HttpError> {
        let mut request = self.inner.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Self::finish(request).await
    }

    /// Download `url` to `dest`, returning the number of bytes written.
    pub async fn download(
        &self,
        url: &str,
        bearer: Option<&str>,
        dest: &Path,
    ) -> Result<u64, HttpError> {
        let mut request = self.inner.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        tracing::debug!(url, dest = %dest.display(), bytes = bytes.len(), "downloaded file");
        Ok(bytes.len() as u64)
    }

    /// POST a single file as a multipart form field.
    pub async fn upload_file(
        &self,
        url: &str,
        bearer: Option<&str>,
        field: &str,
        path: &Path,
    ) -> Result<HttpResponse, HttpError> {
        let contents = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let part = reqwest::multipart::Part::bytes(contents).file_name(file_name);
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let mut request = self.inner.post(url).multipart(form);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Self::finish(request).await
    }

    async fn finish(request: reqwest::RequestBuilder) -> Result<HttpResponse, HttpError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
