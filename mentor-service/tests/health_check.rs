//! HTTP integration tests for mentor-service.
//!
//! These spawn the real application and therefore need MongoDB; when no
//! database is reachable the tests skip themselves rather than fail.

use mentor_service::config::MentorConfig;
use mentor_service::startup::Application;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use reqwest::Client;
use std::time::Duration;

async fn mongo_available(uri: &str) -> bool {
    let Ok(mut options) = ClientOptions::parse(uri).await else {
        return false;
    };
    options.server_selection_timeout = Some(Duration::from_secs(2));
    let Ok(client) = mongodb::Client::with_options(options) else {
        return false;
    };
    client
        .database("admin")
        .run_command(doc! { "ping": 1 }, None)
        .await
        .is_ok()
}

/// Spawn the application on a random port and return the port number,
/// or None when MongoDB is unavailable.
async fn spawn_app() -> Option<u16> {
    let uri =
        std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    if !mongo_available(&uri).await {
        eprintln!("Skipping test: MongoDB not reachable at {}", uri);
        return None;
    }

    std::env::set_var("ENVIRONMENT", "test");
    std::env::set_var("APP__PORT", "0"); // Random port
    std::env::set_var("MONGODB_DATABASE", "magister_test_db");
    std::env::set_var(
        "IMAGE_STORE_PATH",
        std::env::temp_dir()
            .join("magister-test-images")
            .display()
            .to_string(),
    );

    let config = MentorConfig::load().expect("Failed to load config");
    let app = Application::build(config)
        .await
        .expect("Failed to build application");

    let port = app.port();

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    // Wait for the server to start.
    tokio::time::sleep(Duration::from_millis(100)).await;

    Some(port)
}

#[tokio::test]
async fn health_check_returns_ok() {
    let Some(port) = spawn_app().await else {
        return;
    };
    let client = Client::new();

    let response = client
        .get(format!("http://localhost:{}/health", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "mentor-service");
}

#[tokio::test]
async fn readiness_check_returns_ok() {
    let Some(port) = spawn_app().await else {
        return;
    };
    let client = Client::new();

    let response = client
        .get(format!("http://localhost:{}/ready", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn requests_without_identity_are_rejected() {
    let Some(port) = spawn_app().await else {
        return;
    };
    let client = Client::new();

    let response = client
        .get(format!("http://localhost:{}/chats", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}
