/// Middleware modules for the API server
///
/// Authentication is an `axum::middleware::from_fn_with_state` layer defined
/// next to the router in [`crate::app`].

pub mod security;
