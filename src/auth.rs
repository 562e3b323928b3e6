use argon2::{Algorithm, Argon2, Params, Version};
use rand::{rngs::OsRng, RngCore};
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tokio::task;
use tower_sessions::{session::Error as SessionError, Session};
use tracing::info;

use crate::sessions;

/// Argon2id memory cost in kibibytes (60 MiB).
pub const ARGON2_MEMORY_COST: u32 = 60 * 1024;
/// Argon2id time cost (iterations).
pub const ARGON2_TIME_COST: u32 = 1;
/// Argon2id parallelism (lanes).
pub const ARGON2_PARALLELISM: u32 = 1;
/// Length of the derived key in bytes.
pub const ARGON2_OUTPUT_LENGTH: usize = 32;
/// Length of freshly provisioned salts in bytes.
const SALT_LENGTH: usize = 16;
/// Salt used to burn one derivation when the username is unknown.
const UNKNOWN_USER_SALT: [u8; SALT_LENGTH] = *b"pastebox-no-user";

/// Credential row as stored in the `users` table. Salt and hash are hex.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredCredential {
    pub username: String,
    pub salt: String,
    pub hash: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("stored credential for {username:?} is corrupt: {reason}")]
    CorruptCredential { username: String, reason: String },
    #[error("Argon2 error: {0}")]
    Argon2(argon2::Error),
    #[error("Password hashing join error: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Bootstrap credentials are invalid: {0}")]
    BootstrapValidation(&'static str),
}

impl AuthError {
    /// True for the two outcomes the client sees as a generic bad login.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, AuthError::UserNotFound | AuthError::IncorrectPassword)
    }
}

fn configured_argon2() -> Result<Argon2<'static>, AuthError> {
    let params = Params::new(
        ARGON2_MEMORY_COST,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        Some(ARGON2_OUTPUT_LENGTH),
    )
    .map_err(AuthError::Argon2)?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Derive the raw Argon2id key for `password` and `salt`.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<[u8; ARGON2_OUTPUT_LENGTH], AuthError> {
    let mut output = [0u8; ARGON2_OUTPUT_LENGTH];
    configured_argon2()?
        .hash_password_into(password, salt, &mut output)
        .map_err(AuthError::Argon2)?;
    Ok(output)
}

/// Check `password` against a stored credential.
///
/// The comparison is constant time. Hex decode failures and salts the KDF
/// refuses are storage corruption, not credential failures.
pub async fn verify_password(
    password: &str,
    credential: &StoredCredential,
) -> Result<(), AuthError> {
    let corrupt = |reason: String| AuthError::CorruptCredential {
        username: credential.username.clone(),
        reason,
    };

    let salt = hex::decode(&credential.salt).map_err(|e| corrupt(format!("salt: {e}")))?;
    let expected = hex::decode(&credential.hash).map_err(|e| corrupt(format!("hash: {e}")))?;
    let password = password.to_owned();

    let derived = task::spawn_blocking(move || derive_key(password.as_bytes(), &salt))
        .await?
        .map_err(|err| match err {
            AuthError::Argon2(inner) => corrupt(format!("salt rejected by KDF: {inner}")),
            other => other,
        })?;

    if derived.as_slice().ct_eq(expected.as_slice()).into() {
        Ok(())
    } else {
        Err(AuthError::IncorrectPassword)
    }
}

/// Helper to fetch a credential by username.
pub async fn find_credential(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<StoredCredential>, AuthError> {
    let record = sqlx::query_as::<_, StoredCredential>(
        r#"
        SELECT username, salt, hash
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Validate a username/password pair against the stored credential.
pub async fn verify(pool: &SqlitePool, username: &str, password: &str) -> Result<(), AuthError> {
    let Some(credential) = find_credential(pool, username).await? else {
        // Unknown names pay the same KDF cost as a wrong password
        let password = password.to_owned();
        task::spawn_blocking(move || derive_key(password.as_bytes(), &UNKNOWN_USER_SALT))
            .await??;
        return Err(AuthError::UserNotFound);
    };

    verify_password(password, &credential).await
}

/// Verify the credentials and, only on success, mark the session as
/// authenticated for `username`. A failure leaves the session untouched.
pub async fn authenticate(
    pool: &SqlitePool,
    session: &Session,
    username: &str,
    password: &str,
) -> Result<(), AuthError> {
    verify(pool, username, password).await?;

    session.cycle_id().await?;
    sessions::establish(session, username).await?;

    Ok(())
}

/// Hash `password` under a fresh random salt and store the credential.
pub async fn provision_credential(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<(), AuthError> {
    let mut salt = [0u8; SALT_LENGTH];
    OsRng.fill_bytes(&mut salt);

    let password = password.to_owned();
    let hash = task::spawn_blocking(move || derive_key(password.as_bytes(), &salt)).await??;

    sqlx::query(
        r#"
        INSERT INTO users (username, salt, hash)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(hex::encode(salt))
    .bind(hex::encode(hash))
    .execute(pool)
    .await?;

    Ok(())
}

/// Provision the first account from `BOOTSTRAP_USERNAME` and
/// `BOOTSTRAP_PASSWORD` when the users table is empty.
pub async fn bootstrap_user(pool: &SqlitePool) -> Result<(), AuthError> {
    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if user_count > 0 {
        return Ok(());
    }

    let (username, password) = match (
        std::env::var("BOOTSTRAP_USERNAME").ok(),
        std::env::var("BOOTSTRAP_PASSWORD").ok(),
    ) {
        (Some(username), Some(password)) => (username, password),
        _ => {
            info!(target: "auth", "No bootstrap credentials provided; no account created");
            return Ok(());
        }
    };

    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::BootstrapValidation("username cannot be empty"));
    }

    if password.is_empty() {
        return Err(AuthError::BootstrapValidation("password cannot be empty"));
    }

    provision_credential(pool, username, &password).await?;

    info!(target: "auth", username = %username, "Bootstrap account created");

    Ok(())
}
