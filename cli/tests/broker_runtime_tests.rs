// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Composition root tests: start, inspect and shut down a configured broker.

use tokio::net::TcpListener;

use ssobroker_cli::commands::status::collect;
use ssobroker_cli::runtime::Broker;
use ssobroker_core::domain::config::BrokerConfigManifest;
use ssobroker_core::Context;

#[tokio::test]
async fn test_default_broker_round_trip() {
    let broker = Broker::start(&BrokerConfigManifest::default()).await.unwrap();
    assert!(broker.sam.is_none());

    let session = broker
        .sessions
        .create_session(Context::new().with("rid", "R1"))
        .await
        .unwrap();
    let ticket = broker
        .tickets
        .promote_session(&broker.sessions, &session, Context::new().with("uid", "alice"))
        .await
        .unwrap()
        .unwrap();

    let report = collect(&broker).await.unwrap();
    assert_eq!(report.sessions.live, 0);
    assert_eq!(report.sessions.issued, 1);
    assert_eq!(report.tickets.live, 1);
    assert_eq!(report.tickets.rows[0].id, ticket);

    broker.shutdown().await;
    assert_eq!(broker.tickets.get_ticket_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_inspect_polls_resource_groups_once() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let yaml = format!(
        r#"
apiVersion: ssobroker/v1
kind: BrokerConfig
metadata:
  name: status-test
spec:
  sessions: {{ max: 5, expire: 1m, interval: 10s }}
  tickets: {{ max: 5, expire: 1h }}
  sam:
    groups:
      - id: db
        resources:
          - id: local
            polling: {{ method: tcp, address: "{address}" }}
"#
    );
    let manifest = BrokerConfigManifest::from_yaml_str(&yaml).unwrap();

    let broker = Broker::inspect(&manifest).await.unwrap();
    let report = collect(&broker).await.unwrap();
    assert_eq!(report.sam.len(), 1);
    assert_eq!(report.sam[0].active.as_deref(), Some("local"));
    assert_eq!(report.sessions.max, Some(5));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["sam"][0]["resources"][0]["state"], "up");

    broker.detach().await;
}
