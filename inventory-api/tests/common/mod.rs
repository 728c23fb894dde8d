/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - A router over in-memory repositories and a temporary upload root
/// - Cheap Argon2 parameters so tests do not spend seconds hashing
/// - Request helpers for JSON and multipart bodies
/// - Registration / login / admin promotion shortcuts

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use inventory_api::{
    app::{build_router, AppState},
    config::Config,
};
use inventory_shared::{
    auth::password::CredentialStore,
    models::user::{UserPatch, UserRole},
    repository::{
        memory::{MemorySettingsRepository, MemoryUserRepository},
        UserRepository,
    },
};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const PASSWORD: &str = "secret123";

/// Smallest valid PNG header; content is never decoded
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

const BOUNDARY: &str = "inventory-test-boundary";

/// A response with its body parsed as JSON (or `Null` when it is not JSON)
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

/// One part of a multipart body
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub users: Arc<MemoryUserRepository>,
    pub settings: Arc<MemorySettingsRepository>,
    pub upload_dir: TempDir,
    pub config: Config,
}

impl TestContext {
    /// Creates a context with default configuration
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Creates a context with configuration overrides, e.g. `("TOKEN_TRANSPORT", "cookie")`
    pub fn with_vars(overrides: &[(&str, &str)]) -> Self {
        let upload_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut vars: HashMap<String, String> = HashMap::from([
            ("DATABASE_URL".to_string(), "postgresql://unused".to_string()),
            ("JWT_SECRET".to_string(), TEST_SECRET.to_string()),
            (
                "UPLOAD_DIR".to_string(),
                upload_dir.path().to_string_lossy().into_owned(),
            ),
        ]);
        for (key, value) in overrides {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("Invalid test config");

        let users = Arc::new(MemoryUserRepository::new());
        let settings = Arc::new(MemorySettingsRepository::new());

        let credentials = CredentialStore::with_params(1024, 1, 1).expect("Invalid argon2 params");
        let state = AppState::with_repositories(users.clone(), settings.clone(), config.clone())
            .with_credentials(credentials);

        TestContext {
            app: build_router(state),
            users,
            settings,
            upload_dir,
            config,
        }
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    /// Sends a JSON request, optionally with a bearer token
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    /// Sends a request without a body
    pub async fn empty(&self, method: Method, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Sends a multipart request
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        parts: &[Part<'_>],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        self.send(builder.body(Body::from(multipart_body(parts))).unwrap()).await
    }

    /// Registers a user and returns their id
    pub async fn register(&self, email: &str, password: &str) -> String {
        let response = self
            .json(
                Method::POST,
                "/api/users/register",
                None,
                json!({ "email": email, "password": password, "fullName": "Test User" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);

        response.body["data"]["_id"].as_str().unwrap().to_string()
    }

    /// Logs in and returns the bearer token from the body
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .json(
                Method::POST,
                "/api/users/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text);

        response.body["token"].as_str().unwrap().to_string()
    }

    /// Registers and logs in a regular user, returning `(id, token)`
    pub async fn user(&self, email: &str) -> (String, String) {
        let id = self.register(email, PASSWORD).await;
        let token = self.login(email, PASSWORD).await;
        (id, token)
    }

    /// Registers a user, promotes them to admin directly in storage and logs in
    pub async fn admin(&self, email: &str) -> (String, String) {
        let id = self.register(email, PASSWORD).await;

        self.users
            .update_fields(
                &id.parse().unwrap(),
                UserPatch {
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        let token = self.login(email, PASSWORD).await;
        (id, token)
    }

    /// Filesystem location of a public `/uploads/...` path
    pub fn path_of(&self, public_path: &str) -> PathBuf {
        let relative = public_path.strip_prefix("/uploads/").unwrap();
        self.upload_dir.path().join(relative)
    }

    /// Number of files in an upload category directory
    pub fn files_in(&self, category: &str) -> usize {
        count_files(&self.upload_dir.path().join(category))
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(Result::ok).count())
        .unwrap_or(0)
}

/// Encodes parts as `multipart/form-data` with the test boundary
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A PNG file part
pub fn png<'a>(name: &'a str, file_name: &'a str) -> Part<'a> {
    Part::File {
        name,
        file_name,
        content_type: "image/png",
        data: PNG,
    }
}
