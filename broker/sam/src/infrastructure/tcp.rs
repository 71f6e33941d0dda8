// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::domain::polling::{PollError, PollingMethod};

/// Up if a TCP connection can be opened within the timeout.
pub struct TcpPoller {
    address: String,
    timeout: Duration,
}

impl TcpPoller {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PollingMethod for TcpPoller {
    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }

    async fn poll(&self) -> Result<(), PollError> {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(PollError::Unreachable(e.to_string())),
            Err(_) => Err(PollError::Timeout(self.timeout)),
        }
    }
}
