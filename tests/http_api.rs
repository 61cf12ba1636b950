/// Full HTTP-surface tests: the actix server is spawned on a random
/// port with in-memory stores behind the session service, and driven
/// with reqwest.

mod helpers;

use std::net::TcpListener;

use serde_json::{json, Value};

use helpers::{seed_user, test_harness, TestHarness};
use riseup_auth::startup::run;

struct TestApp {
    address: String,
    harness: TestHarness,
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let harness = test_harness();
    let server = run(listener, harness.sessions.clone()).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp { address, harness }
}

async fn login_body(app: &TestApp, client: &reqwest::Client) -> Value {
    let response = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "email": "alice@example.com", "password": "Password123" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/health_check", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn register_returns_201_and_a_credential_pair() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/register", &app.address))
        .json(&json!({
            "name": "John Doe",
            "email": "john@example.com",
            "password": "SecurePass123"
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.get("access_token").is_some());
    assert!(body.get("refresh_token").is_some());
    assert_eq!(body["token_type"], "Bearer");
}

#[tokio::test]
async fn register_rejects_invalid_email_and_weak_password() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    for (email, password) in [
        ("notanemail", "SecurePass123"),
        ("user@", "SecurePass123"),
        ("ok@example.com", "weak"),
        ("ok@example.com", "nouppercase1"),
    ] {
        let response = client
            .post(&format!("{}/auth/register", &app.address))
            .json(&json!({ "name": "Test", "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "should reject email={} password={}",
            email,
            password
        );
    }
}

#[tokio::test]
async fn duplicate_registration_returns_409() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let body = json!({
        "name": "John Doe",
        "email": "john@example.com",
        "password": "SecurePass123"
    });

    for expected in [201, 409] {
        let response = client
            .post(&format!("{}/auth/register", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(expected, response.status().as_u16());
    }
}

#[tokio::test]
async fn login_returns_401_for_bad_credentials() {
    let app = spawn_app();
    seed_user(&app.harness, "alice@example.com", "Password123").await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "email": "alice@example.com", "password": "WrongPassword1" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn refresh_rotates_and_rejects_the_spent_credential() {
    let app = spawn_app();
    seed_user(&app.harness, "alice@example.com", "Password123").await;
    let client = reqwest::Client::new();

    let login = login_body(&app, &client).await;
    let refresh1 = login["refresh_token"].as_str().unwrap().to_string();

    // First rotation succeeds and returns a different credential.
    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": refresh1 }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let rotated: Value = response.json().await.expect("Failed to parse response");
    let refresh2 = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(refresh1, refresh2);

    // Replaying the old credential is a 401 with the generic code.
    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": refresh1 }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_INVALID");

    // The replacement still works.
    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": refresh2 }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_malformed_credentials() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": "no-separator-here" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "MALFORMED_TOKEN");
}

#[tokio::test]
async fn me_returns_identity_from_the_access_token_alone() {
    let app = spawn_app();
    let user_id = seed_user(&app.harness, "alice@example.com", "Password123").await;
    let client = reqwest::Client::new();

    let login = login_body(&app, &client).await;
    let access = login["access_token"].as_str().unwrap();

    let response = client
        .get(&format!("{}/auth/me", &app.address))
        .header("Authorization", format!("Bearer {}", access))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["id"], user_id.to_string());
    assert_eq!(body["email"], "alice@example.com");
}

#[tokio::test]
async fn me_requires_a_bearer_token() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/auth/me", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());

    let response = client
        .get(&format!("{}/auth/me", &app.address))
        .header("Authorization", "Bearer garbage.token.here")
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn logout_is_idempotent_over_http() {
    let app = spawn_app();
    seed_user(&app.harness, "alice@example.com", "Password123").await;
    let client = reqwest::Client::new();

    let login = login_body(&app, &client).await;
    let refresh = login["refresh_token"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let response = client
            .post(&format!("{}/auth/logout", &app.address))
            .json(&json!({ "refresh_token": refresh }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());
    }

    // The credential is dead after logout.
    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn logout_all_revokes_every_session() {
    let app = spawn_app();
    seed_user(&app.harness, "alice@example.com", "Password123").await;
    let client = reqwest::Client::new();

    // Three "devices" log in.
    let mut refresh_tokens = Vec::new();
    let mut access = String::new();
    for _ in 0..3 {
        let login = login_body(&app, &client).await;
        refresh_tokens.push(login["refresh_token"].as_str().unwrap().to_string());
        access = login["access_token"].as_str().unwrap().to_string();
    }

    let response = client
        .post(&format!("{}/auth/logout_all", &app.address))
        .header("Authorization", format!("Bearer {}", access))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["revoked"], 3);

    for refresh in refresh_tokens {
        let response = client
            .post(&format!("{}/auth/refresh", &app.address))
            .json(&json!({ "refresh_token": refresh }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(401, response.status().as_u16());
    }
}
