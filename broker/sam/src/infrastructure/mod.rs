// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Polling Method Implementations
//!
//! - **HttpPoller** - GET against a health endpoint via `reqwest`
//! - **TcpPoller** - bare TCP connect
//! - **PostgresPoller** - open a connection and run `SELECT 1`

pub mod http;
pub mod postgres;
pub mod tcp;

pub use http::HttpPoller;
pub use postgres::PostgresPoller;
pub use tcp::TcpPoller;
