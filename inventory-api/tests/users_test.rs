/// Integration tests for accounts, sessions and avatars
///
/// These drive the full router against in-memory repositories:
/// - Registration and login, including cookie sessions
/// - Authentication and role gating on `/api/users`
/// - Avatar upload, replacement and failure cleanup

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{png, Part, TestContext, PASSWORD};
use inventory_shared::{
    models::user::{UserPatch, UserRole, UserStatus},
    repository::UserRepository,
};
use serde_json::json;

/// Test that registration creates a plain user and never echoes the password
#[tokio::test]
async fn test_register_creates_user() {
    let ctx = TestContext::new();

    let response = ctx
        .json(
            Method::POST,
            "/api/users/register",
            None,
            json!({ "email": "Ada@Example.com", "password": PASSWORD, "fullName": "Ada" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["message"], "User Created Successfully");
    assert_eq!(response.body["data"]["email"], "ada@example.com");
    assert_eq!(response.body["data"]["role"], "user");
    assert_eq!(response.body["data"]["_id"].as_str().unwrap().len(), 24);
    assert!(!response.text.contains("password"));
    assert!(!response.text.contains("argon2"));
}

/// Test that an email can only be registered once, ignoring case
#[tokio::test]
async fn test_register_duplicate_email() {
    let ctx = TestContext::new();
    ctx.register("dup@example.com", PASSWORD).await;

    let response = ctx
        .json(
            Method::POST,
            "/api/users/register",
            None,
            json!({ "email": "DUP@example.com", "password": PASSWORD }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["message"], "User already exists");
    assert_eq!(ctx.users.list().await.unwrap().len(), 1);
}

/// Test registration input validation
#[tokio::test]
async fn test_register_validation() {
    let ctx = TestContext::new();

    let response = ctx
        .json(
            Method::POST,
            "/api/users/register",
            None,
            json!({ "email": "short@example.com", "password": "12345" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Password must be at least 6 characters");

    let response = ctx
        .json(
            Method::POST,
            "/api/users/register",
            None,
            json!({ "email": "nopass@example.com" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert!(ctx.users.list().await.unwrap().is_empty());
}

/// Test that login returns a token and a session cookie
#[tokio::test]
async fn test_login_success() {
    let ctx = TestContext::new();
    let id = ctx.register("login@example.com", PASSWORD).await;

    let response = ctx
        .json(
            Method::POST,
            "/api/users/login",
            None,
            json!({ "email": "login@example.com", "password": PASSWORD }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Login Successful");
    assert_eq!(response.body["user"]["_id"], id.as_str());
    assert_eq!(response.body["user"]["role"], "user");
    assert!(response.body["token"].as_str().is_some());

    let cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains(&format!("Max-Age={}", 7 * 24 * 60 * 60)));
}

/// Test that a wrong password and an unknown email look the same
#[tokio::test]
async fn test_login_invalid_credentials() {
    let ctx = TestContext::new();
    ctx.register("wrong@example.com", PASSWORD).await;

    let wrong_password = ctx
        .json(
            Method::POST,
            "/api/users/login",
            None,
            json!({ "email": "wrong@example.com", "password": "not-it" }),
        )
        .await;
    let unknown_email = ctx
        .json(
            Method::POST,
            "/api/users/login",
            None,
            json!({ "email": "ghost@example.com", "password": PASSWORD }),
        )
        .await;

    for response in [wrong_password, unknown_email] {
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["message"], "Invalid Credentials");
        assert!(response.headers.get(header::SET_COOKIE).is_none());
    }
}

/// Test that suspended accounts cannot log in
#[tokio::test]
async fn test_login_suspended_account() {
    let ctx = TestContext::new();
    let id = ctx.register("suspended@example.com", PASSWORD).await;

    ctx.users
        .update_fields(
            &id.parse().unwrap(),
            UserPatch {
                status: Some(UserStatus::Suspended),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let response = ctx
        .json(
            Method::POST,
            "/api/users/login",
            None,
            json!({ "email": "suspended@example.com", "password": PASSWORD }),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["message"], "Account is suspended");
}

/// Test that the user routes require a session
#[tokio::test]
async fn test_users_require_authentication() {
    let ctx = TestContext::new();

    let response = ctx.empty(Method::GET, "/api/users", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Access Denied / No Token Provided");

    let response = ctx.empty(Method::GET, "/api/users", Some("not.a.jwt")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid Token");
}

/// Test listing users with a bearer token
#[tokio::test]
async fn test_list_users() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user("first@example.com").await;
    ctx.register("second@example.com", PASSWORD).await;

    let response = ctx.empty(Method::GET, "/api/users", Some(&token)).await;

    assert_eq!(response.status, StatusCode::OK);
    let users = response.body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["email"], "second@example.com");
    assert!(!response.text.contains("password"));
}

/// Test that the session cookie alone authenticates requests
#[tokio::test]
async fn test_cookie_session() {
    let ctx = TestContext::with_vars(&[("TOKEN_TRANSPORT", "cookie")]);
    ctx.register("cookie@example.com", PASSWORD).await;

    let response = ctx
        .json(
            Method::POST,
            "/api/users/login",
            None,
            json!({ "email": "cookie@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.get("token").is_none());

    let set_cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    let pair = set_cookie.split(';').next().unwrap().to_string();

    let request = Request::builder()
        .uri("/api/users")
        .header(header::COOKIE, pair)
        .body(Body::empty())
        .unwrap();
    assert_eq!(ctx.send(request).await.status, StatusCode::OK);
}

/// Test that cookie-only deployments ignore bearer tokens
#[tokio::test]
async fn test_cookie_transport_rejects_bearer() {
    let ctx = TestContext::with_vars(&[("TOKEN_TRANSPORT", "both")]);
    let (_, token) = ctx.user("both@example.com").await;

    let cookie_only = TestContext::with_vars(&[("TOKEN_TRANSPORT", "cookie")]);
    let response = cookie_only.empty(Method::GET, "/api/users", Some(&token)).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

/// Test production cookies are cross-site capable
#[tokio::test]
async fn test_production_cookie_profile() {
    let ctx = TestContext::with_vars(&[("APP_ENV", "production")]);
    ctx.register("prod@example.com", PASSWORD).await;

    let response = ctx
        .json(
            Method::POST,
            "/api/users/login",
            None,
            json!({ "email": "prod@example.com", "password": PASSWORD }),
        )
        .await;

    let cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=None"));
}

/// Test that logout expires the cookie
#[tokio::test]
async fn test_logout_clears_cookie() {
    let ctx = TestContext::new();

    let response = ctx.empty(Method::POST, "/api/users/logout", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
}

/// Test fetching a single user
#[tokio::test]
async fn test_get_user() {
    let ctx = TestContext::new();
    let (id, token) = ctx.user("get@example.com").await;

    let response = ctx
        .empty(Method::GET, &format!("/api/users/{}", id), Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["email"], "get@example.com");

    let response = ctx.empty(Method::GET, "/api/users/not-an-id", Some(&token)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Invalid User ID");

    let response = ctx
        .empty(Method::GET, "/api/users/0123456789abcdef01234567", Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "User not found");
}

/// Test that a user may change their own name and password
#[tokio::test]
async fn test_update_own_profile() {
    let ctx = TestContext::new();
    let (id, token) = ctx.user("self@example.com").await;

    let response = ctx
        .json(
            Method::PATCH,
            &format!("/api/users/{}", id),
            Some(&token),
            json!({ "fullName": "New Name", "password": "changed-secret" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.body["message"], "User update successfully");
    assert_eq!(response.body["data"]["fullName"], "New Name");

    ctx.login("self@example.com", "changed-secret").await;
}

/// Test that a non-admin cannot change role or status, even on their own record
#[tokio::test]
async fn test_non_admin_cannot_escalate() {
    let ctx = TestContext::new();
    let (id, token) = ctx.user("climber@example.com").await;

    let response = ctx
        .json(
            Method::PATCH,
            &format!("/api/users/{}", id),
            Some(&token),
            json!({ "role": "admin", "fullName": "Sneaky" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["message"], "Only Admin can change role");

    let response = ctx
        .json(
            Method::PATCH,
            &format!("/api/users/{}", id),
            Some(&token),
            json!({ "status": "active" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["message"], "Only Admin can change status");

    let stored = ctx.users.find_by_id(&id.parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.role, UserRole::User);
    assert_eq!(stored.full_name, "Test User");
}

/// Test that unknown role or status values from a non-admin are still forbidden
#[tokio::test]
async fn test_non_admin_unknown_role_is_forbidden() {
    let ctx = TestContext::new();
    let (id, token) = ctx.user("climber@example.com").await;

    let response = ctx
        .json(
            Method::PATCH,
            &format!("/api/users/{}", id),
            Some(&token),
            json!({ "role": "superadmin" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN, "{}", response.text);
    assert_eq!(response.body["message"], "Only Admin can change role");

    let response = ctx
        .json(
            Method::PATCH,
            &format!("/api/users/{}", id),
            Some(&token),
            json!({ "status": "banned" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN, "{}", response.text);
    assert_eq!(response.body["message"], "Only Admin can change status");

    let stored = ctx.users.find_by_id(&id.parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.role, UserRole::User);
    assert_eq!(stored.status, UserStatus::Active);

    // An admin gets the validation error instead
    let (_, admin) = ctx.admin("admin@example.com").await;
    let response = ctx
        .json(
            Method::PATCH,
            &format!("/api/users/{}", id),
            Some(&admin),
            json!({ "role": "superadmin" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Invalid Role");
}

/// Test that a non-admin cannot edit someone else
#[tokio::test]
async fn test_non_admin_cannot_edit_others() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user("mallory@example.com").await;
    let victim = ctx.register("victim@example.com", PASSWORD).await;

    let response = ctx
        .json(
            Method::PATCH,
            &format!("/api/users/{}", victim),
            Some(&token),
            json!({ "fullName": "Owned" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .empty(Method::DELETE, &format!("/api/users/{}", victim), Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(ctx.users.list().await.unwrap().len(), 2);
}

/// Test that an admin can change role and status
#[tokio::test]
async fn test_admin_updates_role_and_status() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.admin("admin@example.com").await;
    let target = ctx.register("target@example.com", PASSWORD).await;

    let response = ctx
        .json(
            Method::PATCH,
            &format!("/api/users/{}", target),
            Some(&admin),
            json!({ "role": "manager", "status": "inactive" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.body["data"]["role"], "manager");
    assert_eq!(response.body["data"]["status"], "inactive");

    let response = ctx
        .json(
            Method::PATCH,
            &format!("/api/users/{}", target),
            Some(&admin),
            json!({ "role": "overlord" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Invalid Role");
}

/// Test that an update with nothing in it is rejected
#[tokio::test]
async fn test_update_requires_fields() {
    let ctx = TestContext::new();
    let (id, token) = ctx.user("empty@example.com").await;

    let response = ctx
        .json(
            Method::PATCH,
            &format!("/api/users/{}", id),
            Some(&token),
            json!({ "fullName": "" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "No fields to update");
}

/// Test avatar upload, serving and replacement
#[tokio::test]
async fn test_avatar_upload_and_replace() {
    let ctx = TestContext::new();
    let (id, token) = ctx.user("avatar@example.com").await;
    let uri = format!("/api/users/{}/avatar", id);

    let response = ctx
        .multipart(Method::PATCH, &uri, Some(&token), &[png("avatar", "me.png")])
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.body["message"], "Profile Image Updated");

    let first = response.body["avatar"].as_str().unwrap().to_string();
    assert!(first.starts_with("/uploads/images/"));
    assert!(first.ends_with(".png"));
    assert_eq!(response.body["data"]["avatar"], first.as_str());
    assert!(ctx.path_of(&first).exists());

    let served = ctx.empty(Method::GET, &first, None).await;
    assert_eq!(served.status, StatusCode::OK);

    let response = ctx
        .multipart(Method::PATCH, &uri, Some(&token), &[png("avatar", "me2.png")])
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let second = response.body["avatar"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert!(ctx.path_of(&second).exists());
    assert!(!ctx.path_of(&first).exists());
    assert_eq!(ctx.files_in("images"), 1);
}

/// Test that a missing avatar part is rejected
#[tokio::test]
async fn test_avatar_missing_file() {
    let ctx = TestContext::new();
    let (id, token) = ctx.user("nofile@example.com").await;

    let response = ctx
        .multipart(
            Method::PATCH,
            &format!("/api/users/{}/avatar", id),
            Some(&token),
            &[Part::Text("caption", "hello")],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "No image uploaded");
}

/// Test that a non-image avatar is rejected without touching the disk
#[tokio::test]
async fn test_avatar_wrong_type() {
    let ctx = TestContext::new();
    let (id, token) = ctx.user("pdf@example.com").await;

    let response = ctx
        .multipart(
            Method::PATCH,
            &format!("/api/users/{}/avatar", id),
            Some(&token),
            &[Part::File {
                name: "avatar",
                file_name: "cv.pdf",
                content_type: "application/pdf",
                data: b"%PDF-1.7",
            }],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(ctx.files_in("images"), 0);
    assert_eq!(ctx.files_in("files"), 0);
}

/// Test that an oversized avatar is rejected and nothing is written
#[tokio::test]
async fn test_avatar_too_large() {
    let ctx = TestContext::with_vars(&[("MAX_UPLOAD_BYTES", "64")]);
    let (id, token) = ctx.user("big@example.com").await;

    let mut data = common::PNG.to_vec();
    data.resize(4096, 0);

    let response = ctx
        .multipart(
            Method::PATCH,
            &format!("/api/users/{}/avatar", id),
            Some(&token),
            &[Part::File {
                name: "avatar",
                file_name: "huge.png",
                content_type: "image/png",
                data: &data,
            }],
        )
        .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(ctx.files_in("images"), 0);

    let stored = ctx.users.find_by_id(&id.parse().unwrap()).await.unwrap().unwrap();
    assert!(stored.avatar.is_none());
}

/// Test that a failed document write discards the freshly stored file
#[tokio::test]
async fn test_avatar_storage_failure_discards_upload() {
    let ctx = TestContext::new();
    let (id, token) = ctx.user("flaky@example.com").await;

    ctx.users.set_unavailable(true);

    let response = ctx
        .multipart(
            Method::PATCH,
            &format!("/api/users/{}/avatar", id),
            Some(&token),
            &[png("avatar", "me.png")],
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], "Server Error");
    assert_eq!(ctx.files_in("images"), 0);
}

/// Test that deleting a user removes their avatar
#[tokio::test]
async fn test_delete_user_removes_avatar() {
    let ctx = TestContext::new();
    let (id, token) = ctx.user("leaving@example.com").await;

    let response = ctx
        .multipart(
            Method::PATCH,
            &format!("/api/users/{}/avatar", id),
            Some(&token),
            &[png("avatar", "me.png")],
        )
        .await;
    let avatar = response.body["avatar"].as_str().unwrap().to_string();

    let response = ctx
        .empty(Method::DELETE, &format!("/api/users/{}", id), Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "User deleted Successfully");
    assert!(!ctx.path_of(&avatar).exists());

    let response = ctx
        .empty(Method::GET, &format!("/api/users/{}", id), Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

/// Test the service banner and version endpoints
#[tokio::test]
async fn test_service_endpoints() {
    let ctx = TestContext::new();

    let response = ctx.empty(Method::GET, "/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text, "Server is running!");

    let response = ctx.empty(Method::GET, "/version", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["version"], "1.0.0");
    assert_eq!(response.body["appName"], "Super Inventory");

    let response = ctx.empty(Method::GET, "/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["database"], "in-memory");
}

/// Test that a request outliving the timeout gets the error envelope
#[tokio::test(start_paused = true)]
async fn test_request_timeout_envelope() {
    let ctx = TestContext::with_vars(&[("REQUEST_TIMEOUT_SECS", "1")]);

    // The body never arrives, so the JSON extractor waits until the deadline
    let stalled = futures::stream::pending::<Result<Vec<u8>, std::io::Error>>();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from_stream(stalled))
        .unwrap();

    let response = ctx.send(request).await;

    assert_eq!(response.status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["message"], "Request timed out");
}
