//! Credential store and the form checks that run before any auth request.
//!
//! Accounts are keyed by email and hold a bcrypt hash. Signup and login answer
//! with fixed plain-text messages that clients match on.
use anyhow::Context;
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_BCRYPT_COST: u32 = 10;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupOutcome {
    Registered,
    EmailTaken,
}

impl SignupOutcome {
    pub fn message(self) -> &'static str {
        match self {
            SignupOutcome::Registered => "User registered",
            SignupOutcome::EmailTaken => "Email already exists",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    UserNotFound,
    WrongPassword,
}

impl LoginOutcome {
    pub fn message(self) -> &'static str {
        match self {
            LoginOutcome::Success => "Login success",
            LoginOutcome::UserNotFound => "User not found",
            LoginOutcome::WrongPassword => "Wrong password",
        }
    }
}

pub fn email_exists(conn: &Connection, email: &str) -> anyhow::Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM users WHERE email = ?", [email], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some())
}

pub fn password_hash_for(conn: &Connection, email: &str) -> anyhow::Result<Option<String>> {
    conn.query_row(
        "SELECT password_hash FROM users WHERE email = ?",
        [email],
        |r| r.get(0),
    )
    .optional()
    .context("failed to look up user")
}

/// Inserts the account. A concurrent signup that already took the email is
/// reported as `EmailTaken`, not as an error.
pub fn insert_user(conn: &Connection, email: &str, password_hash: &str) -> anyhow::Result<SignupOutcome> {
    let res = conn.execute(
        "INSERT INTO users(id, email, password_hash, created_at) VALUES(?, ?, ?, ?)",
        (
            Uuid::new_v4().to_string(),
            email,
            password_hash,
            chrono::Utc::now().to_rfc3339(),
        ),
    );
    match res {
        Ok(_) => Ok(SignupOutcome::Registered),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Ok(SignupOutcome::EmailTaken)
        }
        Err(e) => Err(e).context("failed to insert user"),
    }
}

pub fn hash_password(password: &str, cost: u32) -> anyhow::Result<String> {
    bcrypt::hash(password, cost).context("failed to hash password")
}

pub fn check_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    bcrypt::verify(password, hash).context("failed to verify password")
}

pub fn register(conn: &Connection, email: &str, password: &str, cost: u32) -> anyhow::Result<SignupOutcome> {
    if email_exists(conn, email)? {
        return Ok(SignupOutcome::EmailTaken);
    }
    let hash = hash_password(password, cost)?;
    insert_user(conn, email, &hash)
}

pub fn verify(conn: &Connection, email: &str, password: &str) -> anyhow::Result<LoginOutcome> {
    let Some(hash) = password_hash_for(conn, email)? else {
        return Ok(LoginOutcome::UserNotFound);
    };
    if check_password(password, &hash)? {
        Ok(LoginOutcome::Success)
    } else {
        Ok(LoginOutcome::WrongPassword)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialsError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn validate_login(email: &str, password: &str) -> Result<Credentials, CredentialsError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(CredentialsError::MissingFields);
    }
    Ok(Credentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}

pub fn validate_signup(
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<Credentials, CredentialsError> {
    if confirm_password.is_empty() {
        return Err(CredentialsError::MissingFields);
    }
    let creds = validate_login(email, password)?;
    if creds.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CredentialsError::PasswordTooShort);
    }
    if creds.password != confirm_password {
        return Err(CredentialsError::PasswordMismatch);
    }
    Ok(creds)
}
