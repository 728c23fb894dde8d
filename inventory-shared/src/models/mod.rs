/// Documents stored by the repositories
///
/// # Models
///
/// - `id`: 24-hex-character document identifier
/// - `user`: User accounts, roles and statuses
/// - `settings`: The basic site settings singleton
///
/// Storage operations live in [`crate::repository`].

pub mod id;
pub mod settings;
pub mod user;
