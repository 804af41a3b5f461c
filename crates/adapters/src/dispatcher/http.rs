// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP implementation of the dispatcher adapter on reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;

use rf_core::{CommandDelta, CommandId, PausedUpdate, RegisterPayload, SysInfoUpdate};

use super::{Dispatcher, DispatcherError};

/// Client pinned to a single dispatcher base URL.
///
/// Connections are not reused across calls (idle pool size 0): the
/// protocol predates keep-alive discipline and the dispatcher side
/// expects the socket closed after every exchange.
#[derive(Clone)]
pub struct HttpDispatcher {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDispatcher {
    /// Build a client for `base_url` (e.g. `http://10.0.0.1:8004`).
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, DispatcherError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(request_timeout)
            .build()
            .map_err(|e| DispatcherError::Transient(e.to_string()))?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { base_url, client })
    }

    async fn send<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &T,
    ) -> Result<(), DispatcherError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .request(method, &url)
            .json(body)
            .send()
            .await
            .map_err(|e| DispatcherError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, body))
    }
}

/// Map a non-2xx status to its failure class.
fn classify_failure(status: StatusCode, body: String) -> DispatcherError {
    match status {
        StatusCode::NOT_FOUND => DispatcherError::NotFound,
        StatusCode::CONFLICT => DispatcherError::Conflict,
        _ => DispatcherError::Unexpected {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn register(
        &self,
        name: &str,
        payload: &RegisterPayload,
    ) -> Result<(), DispatcherError> {
        self.send(Method::POST, &format!("/rendernodes/{}/", name), payload)
            .await
    }

    async fn send_sysinfos(
        &self,
        name: &str,
        update: &SysInfoUpdate,
    ) -> Result<(), DispatcherError> {
        self.send(Method::PUT, &format!("/rendernodes/{}/sysinfos", name), update)
            .await
    }

    async fn update_command(
        &self,
        name: &str,
        id: CommandId,
        delta: &CommandDelta,
    ) -> Result<(), DispatcherError> {
        self.send(
            Method::PUT,
            &format!("/rendernodes/{}/commands/{}/", name, id),
            delta,
        )
        .await
    }

    async fn set_paused(
        &self,
        name: &str,
        update: &PausedUpdate,
    ) -> Result<(), DispatcherError> {
        self.send(Method::PUT, &format!("/rendernodes/{}/paused/", name), update)
            .await
    }
}
