mod common;

use common::{Call, RecordingClient};
use elmah_io_forwarder::ElmahIoTarget;
use elmah_io_forwarder::app::{ForwarderService, RelaySummary};
use elmah_io_forwarder::context::StaticContext;
use elmah_io_forwarder::enrich::NoHost;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn service(client: Arc<RecordingClient>) -> ForwarderService {
    let config = common::config();
    let target = ElmahIoTarget::builder(config.clone())
        .host(Arc::new(NoHost))
        .context(Arc::new(StaticContext::new()))
        .build_with_client(client)
        .unwrap();
    let mut config = config;
    config.post_process().unwrap();
    ForwarderService::with_target(Arc::new(target), config)
}

#[tokio::test]
async fn test_relays_lines_and_skips_malformed_ones() {
    let client = Arc::new(RecordingClient::new());
    let service = service(client.clone());

    let input = concat!(
        r#"{"@l":"Error","@mt":"Order {orderId} failed","orderId":1}"#,
        "\n",
        "not json\n",
        "\n",
        r#"{"@l":"Warning","@m":"Slow response","url":"https://shop.test/a?b=1"}"#,
        "\n",
    );

    let summary = assert_ok!(service.run(input.as_bytes(), CancellationToken::new()).await);
    assert_eq!(
        summary,
        RelaySummary {
            lines: 3,
            forwarded: 2,
            skipped: 1
        }
    );

    assert_ok!(service.drain().await);
    assert_eq!(
        client.calls(),
        vec![Call::Bulk(vec![
            "Order 1 failed".into(),
            "Slow response".into()
        ])]
    );
}

#[tokio::test]
async fn test_cancelled_token_stops_before_reading() {
    let client = Arc::new(RecordingClient::new());
    let service = service(client.clone());
    let token = CancellationToken::new();
    token.cancel();

    let summary = assert_ok!(service.run(&b"{\"@m\":\"never\"}\n"[..], token).await);
    assert_eq!(summary, RelaySummary::default());

    assert_ok!(service.drain().await);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_target_rejects_writes_after_drain() {
    let client = Arc::new(RecordingClient::new());
    let service = service(client);

    assert_ok!(service.drain().await);
    assert_err!(service.target().flush().await);
}
