//! End-to-end integration tests — HTTP requests through the running
//! transport, the default route table and a directory on a temp store.

use std::sync::Arc;

use apps_directory::{
    ApplicationDescriptor, ApplicationSource, DirectoryConfig, DirectoryEngine, DirectoryError,
    StaticUserDirectory, UserAccount,
};
use apps_server::apps_router;
use apps_transport::{TransportConfig, TransportServer};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tempfile::TempDir;

struct FixedSource {
    apps: Mutex<Vec<ApplicationDescriptor>>,
}

impl ApplicationSource for FixedSource {
    async fn discover_applications(&self) -> Result<Vec<ApplicationDescriptor>, DirectoryError> {
        Ok(self.apps.lock().clone())
    }

    async fn unpublish(&self, alias: &str, _collection: &str) -> Result<(), DirectoryError> {
        self.apps.lock().retain(|a| a.alias != alias);
        Ok(())
    }
}

/// Start a server on a random port. The TempDir must outlive the server.
async fn start_test_server() -> (TransportServer, TempDir, String) {
    start_server_with(vec![UserAccount::new("a@x.com", "a", "p")]).await
}

async fn start_server_with(accounts: Vec<UserAccount>) -> (TransportServer, TempDir, String) {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(DirectoryConfig {
        server: "win1".into(),
        user: "Administrator".into(),
        password: "adminpw".into(),
        windows_domain: "CORP".into(),
        xml_configuration_file: dir.path().join("noauth-logins.xml"),
        ..Default::default()
    });
    let source = FixedSource {
        apps: Mutex::new(vec![ApplicationDescriptor::new("calc")]),
    };
    let users = StaticUserDirectory::new(accounts);
    let engine = Arc::new(DirectoryEngine::new(config.clone(), source, users));

    let server = TransportServer::start(
        TransportConfig {
            port: 0, // OS-assigned
            hostname: "127.0.0.1".into(),
            connections_file: Some(config.xml_configuration_file.clone()),
            ..Default::default()
        },
        apps_router(engine).unwrap(),
    )
    .await
    .unwrap();

    let base = format!("http://127.0.0.1:{}", server.port());
    (server, dir, base)
}

#[tokio::test]
async fn health_reports_store_path() {
    let (mut server, dir, base) = start_test_server().await;

    let health: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(
        health["connectionsFile"],
        dir.path().join("noauth-logins.xml").display().to_string()
    );

    server.stop().await;
}

#[tokio::test]
async fn list_applications_over_http() {
    let (mut server, dir, base) = start_test_server().await;

    let response = reqwest::get(format!("{base}/api/apps")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "application/json; charset=UTF-8"
    );
    let apps: Value = response.json().await.unwrap();
    assert_eq!(apps.as_array().unwrap().len(), 1);
    assert_eq!(apps[0]["ConnectionName"], "calc_a@x.com");
    assert_eq!(apps[0]["Hostname"], "win1");

    let xml = std::fs::read_to_string(dir.path().join("noauth-logins.xml")).unwrap();
    assert!(xml.contains(r#"<config name="hapticDesktop" protocol="rdp">"#));

    server.stop().await;
}

#[tokio::test]
async fn per_user_query_with_query_string() {
    let (mut server, _dir, base) = start_test_server().await;

    reqwest::get(format!("{base}/api/apps")).await.unwrap();
    let mine: Value = reqwest::get(format!("{base}/api/apps/a?refresh=0"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine[0]["Username"], "a@CORP");
    assert_eq!(mine[0]["RemoteApp"], "||calc");

    server.stop().await;
}

#[tokio::test]
async fn per_user_query_decodes_percent_escapes() {
    let (mut server, _dir, base) =
        start_server_with(vec![UserAccount::new("j@x.com", "j.doe", "p")]).await;

    reqwest::get(format!("{base}/api/apps")).await.unwrap();
    let mine: Value = reqwest::get(format!("{base}/api/apps/j%2Edoe"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["Username"], "j.doe@CORP");

    server.stop().await;
}

#[tokio::test]
async fn delete_unpublishes() {
    let (mut server, _dir, base) = start_test_server().await;
    let client = reqwest::Client::new();

    let response = client
        .delete(format!("{base}/api/apps/calc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let outcome: Value = response.json().await.unwrap();
    assert_eq!(outcome, json!({"alias": "calc", "status": "unpublished"}));

    let apps: Value = reqwest::get(format!("{base}/api/apps"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(apps, json!([]));

    server.stop().await;
}

#[tokio::test]
async fn unmatched_requests_are_404() {
    let (mut server, _dir, base) = start_test_server().await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}/nowhere")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let response = client.post(format!("{base}/api/apps")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let response = client.get(format!("{base}/api/apps/a/b")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn per_user_before_regeneration_is_500() {
    let (mut server, _dir, base) = start_test_server().await;

    let response = reqwest::get(format!("{base}/api/apps/a")).await.unwrap();
    assert_eq!(response.status(), 500);

    server.stop().await;
}
