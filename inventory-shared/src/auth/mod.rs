/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id credential store and password policy
/// - [`jwt`]: Session token issuance and validation
/// - [`cookie`]: Session cookie attributes and parsing
/// - [`middleware`]: Token extraction (header and/or cookie) into an `AuthContext`
/// - [`authorization`]: Role and ownership checks
///
/// # Example
///
/// ```
/// use inventory_shared::auth::jwt::{create_token, validate_token, Claims};
/// use inventory_shared::auth::password::CredentialStore;
/// use inventory_shared::models::{id::DocumentId, user::UserRole};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = CredentialStore::with_params(1024, 1, 1)?;
/// let hash = store.hash("secret1")?;
/// assert!(store.verify("secret1", &hash)?);
///
/// let claims = Claims::new(DocumentId::new(), "a@x.com", UserRole::User);
/// let token = create_token(&claims, "secret")?;
/// let validated = validate_token(&token, "secret")?;
/// assert_eq!(validated.email, "a@x.com");
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod cookie;
pub mod jwt;
pub mod middleware;
pub mod password;
