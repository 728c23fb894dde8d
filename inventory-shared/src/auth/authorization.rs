/// Authorization checks
///
/// Every protected route first requires an authenticated caller, then applies
/// one of the role checks below.
///
/// # Permission Model
///
/// 1. **Authenticated**: a verified session token is present
/// 2. **Admin only**: basic settings, and changing any user's role or status
/// 3. **Self or admin**: a user may edit, re-avatar or delete their own record;
///    only `fullName` and `password` are self-serviceable
///
/// # Example
///
/// ```
/// use inventory_shared::auth::authorization::{require_role, AuthzError};
/// use inventory_shared::auth::middleware::AuthContext;
/// use inventory_shared::models::{id::DocumentId, user::UserRole};
///
/// let manager = AuthContext {
///     user_id: DocumentId::new(),
///     email: "m@x.com".to_string(),
///     role: UserRole::Manager,
/// };
///
/// assert!(require_role(&manager, UserRole::Manager).is_ok());
/// assert!(matches!(
///     require_role(&manager, UserRole::Admin),
///     Err(AuthzError::InsufficientRole { .. })
/// ));
/// ```
use super::middleware::AuthContext;
use crate::models::{
    id::DocumentId,
    user::{UserPatch, UserRole},
};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No verified identity on the request
    #[error("Authentication required")]
    Unauthenticated,

    /// Caller does not hold the required role
    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole { required: UserRole, actual: UserRole },

    /// A field only an admin may change
    #[error("Only Admin can change {0}")]
    AdminOnlyField(&'static str),

    /// Caller is neither the resource owner nor an admin
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Requires a verified identity
///
/// # Errors
///
/// Returns `AuthzError::Unauthenticated` when `auth` is `None`
pub fn require_authenticated(auth: Option<&AuthContext>) -> Result<&AuthContext, AuthzError> {
    auth.ok_or(AuthzError::Unauthenticated)
}

/// Which admin-only fields a user patch request carries
///
/// Built from field presence alone, so authorization runs before the values
/// are parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchFields {
    pub role: bool,
    pub status: bool,
}

impl From<&UserPatch> for PatchFields {
    fn from(patch: &UserPatch) -> Self {
        Self {
            role: patch.role.is_some(),
            status: patch.status.is_some(),
        }
    }
}

/// Requires the caller's session role to be exactly `required`
///
/// # Errors
///
/// Returns `AuthzError::InsufficientRole` on mismatch
pub fn require_role(auth: &AuthContext, required: UserRole) -> Result<(), AuthzError> {
    if auth.role != required {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: auth.role,
        });
    }

    Ok(())
}

/// Requires the caller to be the target user or an admin
///
/// # Errors
///
/// Returns `AuthzError::NotAuthorized` otherwise
pub fn require_self_or_admin(auth: &AuthContext, target: &DocumentId) -> Result<(), AuthzError> {
    if auth.is_admin() || auth.is_user(target) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

/// Checks a user patch before anything is parsed or written
///
/// Role and status changes are admin-only, on every record including the
/// caller's own. They are rejected outright rather than dropped from the
/// patch, whatever value was sent.
///
/// # Errors
///
/// - `AdminOnlyField("role")` / `AdminOnlyField("status")` for a non-admin
/// - `NotAuthorized` when a non-admin targets someone else's record
pub fn authorize_user_patch(
    auth: &AuthContext,
    target: &DocumentId,
    fields: PatchFields,
) -> Result<(), AuthzError> {
    if !auth.is_admin() {
        if fields.role {
            return Err(AuthzError::AdminOnlyField("role"));
        }
        if fields.status {
            return Err(AuthzError::AdminOnlyField("status"));
        }
    }

    require_self_or_admin(auth, target)
}
