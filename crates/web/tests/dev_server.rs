use std::net::{IpAddr, Ipv4Addr};

use tdbuild_web::{shutdown, DevServer, DevServerConfig, MockPayloads};

fn config(dir: &std::path::Path) -> DevServerConfig {
    DevServerConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        static_dir: dir.to_path_buf(),
        payloads: MockPayloads {
            success: serde_json::json!({"created": true}),
            error: serde_json::json!({"error": "Bad Request"}),
        },
    }
}

#[tokio::test]
async fn serves_fixtures_and_mock_over_http() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

    let server = DevServer::start(config(dir.path())).await.unwrap();
    let base = server.base_url();
    let client = reqwest::Client::new();

    let page = client.get(format!("{}/index.html", base)).send().await.unwrap();
    assert_eq!(page.status(), 200);
    assert_eq!(page.text().await.unwrap(), "<html></html>");

    let ok = client
        .get(format!("{}/event?callback=cb", base))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);
    assert!(ok.text().await.unwrap().contains(r#"cb({"created":true})"#));

    let failed = client
        .get(format!("{}/event?callback=cb&error=1", base))
        .send()
        .await
        .unwrap();
    assert_eq!(failed.status(), 400);

    shutdown(Some(server)).await;

    // The listener is gone once teardown returns.
    let fresh = reqwest::Client::new();
    assert!(fresh.get(format!("{}/index.html", base)).send().await.is_err());
}
