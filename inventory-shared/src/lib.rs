//! # Super Inventory Shared Library
//!
//! This crate contains the domain logic used by the Super Inventory API server.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, session tokens and authorization checks
//! - `assets`: Upload classification, storage and replacement of image files
//! - `db`: Connection pool and migrations
//! - `models`: Documents stored by the repositories (users, basic settings)
//! - `repository`: Storage traits with PostgreSQL and in-memory implementations

pub mod assets;
pub mod auth;
pub mod db;
pub mod models;
pub mod repository;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
