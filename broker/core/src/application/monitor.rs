// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Operator-facing snapshots of the session and ticket stores.
//!
//! Views are plain serializable data so the CLI can print them as a table or
//! as JSON.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::application::session_manager::SessionManager;
use crate::application::ticket_manager::TicketManager;
use crate::domain::context::Context;
use crate::domain::entry::Entry;
use crate::domain::errors::ManagerError;

#[derive(Debug, Clone, Serialize)]
pub struct EntryRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub context: Context,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreView {
    pub name: String,
    /// Issued since process start.
    pub issued: u64,
    pub live: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
    pub rows: Vec<EntryRow>,
}

impl StoreView {
    fn build(name: &str, issued: u64, max: Option<u64>, entries: impl IntoIterator<Item = (String, Entry)>) -> Self {
        let mut rows: Vec<EntryRow> = entries
            .into_iter()
            .map(|(id, entry)| EntryRow {
                id,
                created_at: millis_to_utc(entry.created_at),
                expires_at: millis_to_utc(entry.expires_at),
                context: entry.context,
            })
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        Self {
            name: name.to_string(),
            issued,
            live: rows.len() as u64,
            max,
            rows,
        }
    }

    /// Fixed-width table, one row per entry, preceded by a summary line.
    pub fn render_table(&self) -> String {
        let max = self.max.map_or_else(|| "unbounded".to_string(), |m| m.to_string());
        let mut out = format!(
            "{} store: {} live / max {} ({} issued)\n",
            self.name, self.live, max, self.issued
        );
        if self.rows.is_empty() {
            out.push_str("  (empty)\n");
            return out;
        }

        out.push_str(&format!("  {:<34} {:<20} {:<20} CONTEXT\n", "ID", "CREATED", "EXPIRES"));
        for row in &self.rows {
            let context = serde_json::to_string(&row.context).unwrap_or_else(|_| "<unprintable>".to_string());
            out.push_str(&format!(
                "  {:<34} {:<20} {:<20} {}\n",
                row.id,
                row.created_at.format("%Y-%m-%d %H:%M:%S"),
                row.expires_at.format("%Y-%m-%d %H:%M:%S"),
                context
            ));
        }
        out
    }
}

fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub async fn session_view(sessions: &SessionManager) -> Result<StoreView, ManagerError> {
    let entries = sessions.get_session_entries().await?;
    Ok(StoreView::build(
        sessions.storage().name(),
        sessions.get_sessions_counter(),
        sessions.storage().max(),
        entries,
    ))
}

pub async fn ticket_view(tickets: &TicketManager) -> Result<StoreView, ManagerError> {
    let entries = tickets.get_ticket_entries().await?;
    Ok(StoreView::build(
        tickets.storage().name(),
        tickets.get_tickets_counter(),
        tickets.storage().max(),
        entries,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::config::StoreConfig;
    use crate::domain::identifier::ScriptedIds;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_session_view_lists_live_entries() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let config = StoreConfig {
            max: Some(10),
            ..StoreConfig::in_memory(Duration::from_secs(60))
        };
        let sessions = SessionManager::init(&config, clock.clone(), Arc::new(ScriptedIds::new(["s1", "s2"])))
            .await
            .unwrap();
        sessions.create_session(Context::new().with("rid", "R1")).await.unwrap();
        clock.advance(Duration::from_secs(1));
        sessions.create_session(Context::new()).await.unwrap();

        let view = session_view(&sessions).await.unwrap();
        assert_eq!(view.name, "session");
        assert_eq!(view.live, 2);
        assert_eq!(view.issued, 2);
        assert_eq!(view.rows[0].id, "s1");
        assert_eq!(view.rows[0].created_at.timestamp_millis(), 1_700_000_000_000);

        let table = view.render_table();
        assert!(table.starts_with("session store: 2 live / max 10 (2 issued)"));
        assert!(table.contains(r#"{"rid":"R1"}"#));
    }

    #[test]
    fn test_empty_view_renders_placeholder() {
        let view = StoreView::build("ticket", 0, None, Vec::<(String, Entry)>::new());
        assert!(view.render_table().contains("(empty)"));
        assert!(view.render_table().contains("max unbounded"));
    }
}
