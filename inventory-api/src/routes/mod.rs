/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Liveness, version and health check endpoints
/// - `auth`: Registration, login and logout
/// - `users`: User management and avatar uploads
/// - `settings`: The basic-settings singleton

pub mod auth;
pub mod health;
pub mod settings;
pub mod users;

use serde::Serialize;

/// Success envelope: `{ "success": true, "message"?, "data"? }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: &'static str) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: None,
        }
    }
}
