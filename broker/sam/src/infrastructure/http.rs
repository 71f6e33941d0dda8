// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

use crate::domain::polling::{PollError, PollingMethod};

/// Healthy means the configured status, or any 2xx when none is configured.
pub struct HttpPoller {
    client: Client,
    url: String,
    expected_status: Option<u16>,
    timeout: Duration,
}

impl HttpPoller {
    pub fn new(client: Client, url: impl Into<String>, expected_status: Option<u16>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            expected_status,
            timeout,
        }
    }
}

#[async_trait]
impl PollingMethod for HttpPoller {
    fn describe(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut url) => {
                // Only fails for cannot-be-a-base URLs, which carry no userinfo.
                let _ = url.set_username("");
                let _ = url.set_password(None);
                url.to_string()
            }
            Err(_) => "invalid http url".to_string(),
        }
    }

    async fn poll(&self) -> Result<(), PollError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PollError::Timeout(self.timeout)
                } else {
                    PollError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        let healthy = match self.expected_status {
            Some(expected) => status.as_u16() == expected,
            None => status.is_success(),
        };
        if healthy {
            Ok(())
        } else {
            Err(PollError::UnexpectedStatus {
                expected: self
                    .expected_status
                    .map_or_else(|| "2xx".to_string(), |s| s.to_string()),
                actual: status.as_u16(),
            })
        }
    }
}
