//! Integration test: start the webhook server on a free port, GET /, assert
//! health JSON. Does not require any hosted service to be reachable (the
//! configured endpoints are never called). The server task is left running
//! when the test ends.

use lib::config::Config;
use lib::webhook;
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

fn full_config() -> Config {
    let mut config = Config::default();
    config.media.account_sid = Some("AC123".into());
    config.media.auth_token = Some("secret".into());
    config.intent.endpoint = Some("http://127.0.0.1:1".into());
    config.intent.key = Some("k".into());
    config.intent.project = Some("concierge".into());
    config.intent.deployment = Some("production".into());
    config.speech.endpoint = Some("http://127.0.0.1:1".into());
    config.speech.key = Some("k".into());
    config.vision.endpoint = Some("http://127.0.0.1:1".into());
    config.vision.key = Some("k".into());
    config.chat.endpoint = Some("http://127.0.0.1:1".into());
    config.chat.key = Some("k".into());
    config.chat.deployment = Some("gpt-4o-mini".into());
    config
}

#[tokio::test]
async fn webhook_health_http_responds_with_running() {
    let port = free_port();
    let mut config = full_config();
    config.webhook.port = port;
    config.webhook.bind = "127.0.0.1".to_string();

    let webhook_handle = tokio::spawn(async move {
        let _ = webhook::run_webhook(config).await;
    });

    let url = format!("http://127.0.0.1:{}/", port);
    let client = reqwest::Client::new();
    let mut last_err = None;
    for _ in 0..100 {
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let json: serde_json::Value = resp.json().await.expect("parse JSON");
                assert_eq!(json.get("runtime").and_then(|v| v.as_str()), Some("running"));
                assert_eq!(json.get("port").and_then(|v| v.as_u64()), Some(port as u64));
                return;
            }
            Ok(_) => {}
            Err(e) => last_err = Some(e),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let _ = webhook_handle.abort();
    panic!(
        "GET {} did not return 200 with health JSON within 5s; last error: {:?}",
        url, last_err
    );
}

#[tokio::test]
async fn serve_refuses_to_start_without_required_config() {
    let mut config = Config::default();
    config.webhook.port = free_port();
    let err = webhook::run_webhook(config).await.unwrap_err().to_string();
    assert!(err.contains("missing required configuration"), "got: {}", err);
}
