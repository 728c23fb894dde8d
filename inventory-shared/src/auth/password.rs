/// Password hashing using Argon2id
///
/// The [`CredentialStore`] owns nothing but the Argon2 parameters. Hashes are
/// PHC strings, so verification reads the parameters back out of the stored
/// hash and keeps working after the defaults change.
///
/// # Security
///
/// - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
///
/// # Example
///
/// ```
/// use inventory_shared::auth::password::CredentialStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = CredentialStore::default();
/// let hash = store.hash("secret1")?;
///
/// assert!(store.verify("secret1", &hash)?);
/// assert!(!store.verify("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, ParamsBuilder, Version,
};

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    /// The blocking hashing task did not complete
    #[error("Password task failed: {0}")]
    TaskFailed(String),
}

/// Hashes and verifies passwords with fixed Argon2id parameters
#[derive(Debug, Clone)]
pub struct CredentialStore {
    params: Params,
}

impl Default for CredentialStore {
    /// 64 MB memory, 3 iterations, 4 lanes, 32-byte output
    fn default() -> Self {
        // The default parameters are statically valid
        let params = ParamsBuilder::new()
            .m_cost(65536)
            .t_cost(3)
            .p_cost(4)
            .output_len(32)
            .build()
            .unwrap_or_default();

        Self { params }
    }
}

impl CredentialStore {
    /// Creates a store with custom cost parameters
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if Argon2 rejects the parameters
    ///
    /// # Example
    ///
    /// ```
    /// use inventory_shared::auth::password::CredentialStore;
    ///
    /// // Cheap parameters, only suitable for tests
    /// let store = CredentialStore::with_params(1024, 1, 1).unwrap();
    /// let hash = store.hash("secret1").unwrap();
    /// assert!(hash.contains("m=1024,t=1,p=1"));
    /// ```
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, PasswordError> {
        let params = ParamsBuilder::new()
            .m_cost(memory_kib)
            .t_cost(iterations)
            .p_cost(parallelism)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes a password with a fresh random salt
    ///
    /// Returns a PHC string such as
    /// `$argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>`.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if hashing fails
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    /// Verifies a password against a stored hash
    ///
    /// Comparison is constant-time. A wrong password is `Ok(false)`; only a
    /// malformed hash or an internal failure is an error.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::InvalidHash` if the hash cannot be parsed
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
        }
    }

    /// Hashes on the blocking thread pool so request tasks are not stalled
    ///
    /// # Errors
    ///
    /// Same as [`CredentialStore::hash`], plus `TaskFailed` if the blocking task panics
    pub async fn hash_blocking(&self, password: String) -> Result<String, PasswordError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.hash(&password))
            .await
            .map_err(|e| PasswordError::TaskFailed(e.to_string()))?
    }

    /// Verifies on the blocking thread pool
    ///
    /// # Errors
    ///
    /// Same as [`CredentialStore::verify`], plus `TaskFailed` if the blocking task panics
    pub async fn verify_blocking(&self, password: String, hash: String) -> Result<bool, PasswordError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.verify(&password, &hash))
            .await
            .map_err(|e| PasswordError::TaskFailed(e.to_string()))?
    }
}

/// Checks the password length policy
///
/// Length is counted in characters, not bytes.
///
/// # Example
///
/// ```
/// use inventory_shared::auth::password::validate_password_length;
///
/// assert!(validate_password_length("secret1").is_ok());
/// assert!(validate_password_length("short").is_err());
/// ```
pub fn validate_password_length(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }

    Ok(())
}
