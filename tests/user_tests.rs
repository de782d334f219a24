// tests/user_tests.rs

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use styleswap::{
    config::Config,
    routes,
    state::AppState,
    storage::{BlobStore, FsBlobStore},
};

struct TestApp {
    address: String,
    #[allow(dead_code)]
    pool: SqlitePool,
}

async fn spawn_app() -> TestApp {
    let base = std::env::temp_dir().join(format!("styleswap-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&base).expect("Failed to create test directory");

    let database_url = format!("sqlite://{}", base.join("styleswap.db").display());

    let options = SqliteConnectOptions::from_str(&database_url)
        .expect("Bad test database URL")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to open test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let upload_dir = base.join("Uploads").display().to_string();

    let config = Config {
        database_url,
        upload_dir: upload_dir.clone(),
        public_base_url: "https://styleswap.example.com".to_string(),
        port: 0,
        rust_log: "error".to_string(),
    };

    let blobs: Arc<dyn BlobStore> =
        Arc::new(FsBlobStore::new(&upload_dir).expect("Failed to create blob store"));

    let state = AppState {
        pool: pool.clone(),
        config,
        blobs,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, pool }
}

async fn register(client: &reqwest::Client, address: &str, username: &str, password: &str) -> i64 {
    let response = client
        .post(format!("{}/api/signup", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Signup failed");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().expect("User id not found")
}

async fn login(client: &reqwest::Client, address: &str, username: &str, password: &str) -> String {
    let body: serde_json::Value = client
        .post(format!("{}/api/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");
    body["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
async fn get_user_is_public() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let user_id = register(&client, &app.address, "ada", "password123").await;

    let response = client
        .get(format!("{}/api/users/{}", app.address, user_id))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "ada");

    let response = client
        .get(format!("{}/api/users/999", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn update_user_requires_the_user_themselves() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let ada_id = register(&client, &app.address, "ada", "password123").await;
    register(&client, &app.address, "grace", "password123").await;
    let grace_token = login(&client, &app.address, "grace", "password123").await;

    let response = client
        .put(format!("{}/api/users/{}", app.address, ada_id))
        .bearer_auth(&grace_token)
        .json(&serde_json::json!({ "username": "hijacked" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn update_user_rechecks_handle_uniqueness() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let ada_id = register(&client, &app.address, "ada", "password123").await;
    register(&client, &app.address, "grace", "password123").await;
    let ada_token = login(&client, &app.address, "ada", "password123").await;

    let response = client
        .put(format!("{}/api/users/{}", app.address, ada_id))
        .bearer_auth(&ada_token)
        .json(&serde_json::json!({ "username": "grace" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_handle");

    // A free handle goes through
    let response = client
        .put(format!("{}/api/users/{}", app.address, ada_id))
        .bearer_auth(&ada_token)
        .json(&serde_json::json!({ "username": "ada_lovelace" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "ada_lovelace");
}

#[tokio::test]
async fn update_user_rehashes_a_changed_password() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let ada_id = register(&client, &app.address, "ada", "password123").await;
    let ada_token = login(&client, &app.address, "ada", "password123").await;

    let response = client
        .put(format!("{}/api/users/{}", app.address, ada_id))
        .bearer_auth(&ada_token)
        .json(&serde_json::json!({ "password": "betterpassword" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .post(format!("{}/api/login", app.address))
        .json(&serde_json::json!({
            "username": "ada",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401, "old password must stop working");

    login(&client, &app.address, "ada", "betterpassword").await;
}

#[tokio::test]
async fn update_user_rejects_bad_profile_picture_extension() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let ada_id = register(&client, &app.address, "ada", "password123").await;
    let ada_token = login(&client, &app.address, "ada", "password123").await;

    let response = client
        .put(format!("{}/api/users/{}", app.address, ada_id))
        .bearer_auth(&ada_token)
        .json(&serde_json::json!({ "profile_picture": "me.bmp" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_file");
}
