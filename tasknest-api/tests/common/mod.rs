//! Common test utilities for integration tests
//!
//! Builds the full router over a `MemoryStore` and a recording mailer, and
//! seeds two users with three tasks:
//!
//! - user one (Andrew): "First task" (open), "Second task" (completed)
//! - user two (Jess): "Third task" (open)

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tasknest_api::app::{build_router, AppState};
use tasknest_api::config::{
    ApiConfig, Config, DatabaseConfig, EmailConfig, JwtConfig, PasswordConfig,
};
use tasknest_shared::email::{EmailMessage, MailError, Mailer};
use tasknest_shared::models::{CreateTask, NewUser, Task, User};
use tasknest_shared::store::{MemoryStore, Store};
use tokio::sync::Mutex;
use tower::Service as _;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const USER_ONE_PASSWORD: &str = "12345678@";
pub const USER_TWO_PASSWORD: &str = "myhouse099@@";

/// Mailer that keeps every message in memory
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        self.sent.lock().await.push(message);
        Ok(())
    }
}

/// A seeded user and the token of their first session
pub struct Fixture {
    pub user: User,
    pub token: String,
}

impl Fixture {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Response with the body already collected
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "Response is not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: axum::Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub user_one: Fixture,
    pub user_two: Fixture,
    pub task_one: Task,
    pub task_two: Task,
    pub task_three: Task,
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            production: false,
            cors_origins: vec!["*".to_string()],
            avatar_max_bytes: 1_000_000,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        password: PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        email: EmailConfig {
            sendgrid_api_key: None,
            from: "noreply@tasknest.dev".to_string(),
        },
    }
}

impl TestContext {
    /// Creates a fresh app with seeded users and tasks
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(store.clone(), mailer.clone(), test_config());

        let user_one =
            seed_user(&state, "Andrew", "andrewmendes@live.com", USER_ONE_PASSWORD).await;
        let user_two = seed_user(&state, "Jess", "jess@example.com", USER_TWO_PASSWORD).await;

        let task_one = seed_task(&store, &user_one, "First task", false).await;
        let task_two = seed_task(&store, &user_one, "Second task", true).await;
        let task_three = seed_task(&store, &user_two, "Third task", false).await;

        Self {
            app: build_router(state.clone()),
            state,
            store,
            mailer,
            user_one,
            user_two,
            task_one,
            task_two,
            task_three,
        }
    }

    /// Sends a request through the router
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    pub async fn reload_user(&self, fixture: &Fixture) -> Option<User> {
        self.store.find_user(fixture.user.id).await.unwrap()
    }
}

async fn seed_user(state: &AppState, name: &str, email: &str, password: &str) -> Fixture {
    let (user, token) = state
        .accounts
        .register(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            age: 0,
        })
        .await
        .expect("Failed to seed user");

    Fixture { user, token }
}

async fn seed_task(
    store: &MemoryStore,
    owner: &Fixture,
    description: &str,
    completed: bool,
) -> Task {
    let task = store
        .insert_task(
            owner.user.id,
            CreateTask {
                description: description.to_string(),
                completed,
            },
        )
        .await
        .expect("Failed to seed task");

    // keep timestamps strictly increasing between fixtures
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    task
}

/// Encodes a solid-color image in the given format
pub fn sample_image(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([30, 120, 200]),
    ));
    let mut out = std::io::Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// Builds a `multipart/form-data` request with one file field
pub fn multipart_request(
    uri: &str,
    token: &str,
    field: &str,
    filename: &str,
    content: &[u8],
) -> Request<Body> {
    let boundary = "tasknest-test-boundary";

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}
