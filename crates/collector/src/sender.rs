// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-gated HTTP submission of log batches.

use crate::batch::{BatchSender, SendOutcome};
use async_trait::async_trait;
use wayru_http::HttpClient;
use wayru_ipc::{IpcClient, TokenManager};

pub struct HttpBatchSender {
    http: HttpClient,
    endpoint: String,
    tokens: TokenManager<IpcClient>,
}

impl HttpBatchSender {
    pub fn new(http: HttpClient, endpoint: String, tokens: TokenManager<IpcClient>) -> Self {
        Self { http, endpoint, tokens }
    }
}

#[async_trait]
impl BatchSender for HttpBatchSender {
    async fn send(&mut self, payload: &str) -> SendOutcome {
        // Admission gate: a batch only goes out under a valid bearer token
        if !self.tokens.is_token_valid() {
            if let Err(e) = self.tokens.refresh_access_token().await {
                tracing::warn!(error = %e, "could not obtain access token from agent");
                return SendOutcome::Failed;
            }
        }
        if !self.tokens.should_accept_requests() {
            tracing::debug!("request acceptance disabled, holding batch");
            return SendOutcome::Failed;
        }
        let Some(token) = self.tokens.current_token().map(str::to_string) else {
            return SendOutcome::Failed;
        };

        let body: serde_json::Value = match serde_json::from_str(payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "batch payload is not valid JSON");
                return SendOutcome::Failed;
            }
        };

        match self.http.post_json(&self.endpoint, Some(&token), &body).await {
            Ok(response) if response.is_success() => {
                self.tokens.report_http_success();
                SendOutcome::Accepted
            }
            Ok(response) if response.is_unauthorized() => {
                tracing::warn!("logs endpoint returned 401, refreshing token");
                self.tokens.report_http_failure(Some(response.status));
                SendOutcome::Unauthorized
            }
            Ok(response) => {
                tracing::warn!(status = response.status, "logs endpoint rejected batch");
                self.tokens.report_http_failure(Some(response.status));
                SendOutcome::Failed
            }
            Err(e) => {
                tracing::warn!(error = %e, "batch submission failed");
                self.tokens.report_http_failure(None);
                SendOutcome::Failed
            }
        }
    }
}
