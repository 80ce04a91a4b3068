use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Basic;
use serde::Deserialize;
use std::sync::Arc;

/// Environment variable consulted when no credentials file path is
/// configured. The name is historical: the value is the JSON payload
/// itself, not a path.
pub const SECRET_PATH_VAR: &str = "SECRET_PATH";

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

impl CurrentUser {
    /// Creates a new CurrentUser instance.
    pub fn new(username: String) -> Self {
        Self { username }
    }
}

/// Custom error type for credential loading and hashing.
///
/// Every variant is startup-fatal: the server refuses to serve requests
/// without a valid credential pair.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    /// The credentials file could not be opened or read.
    #[error("Credentials file could not be read: {0}")]
    MissingFile(#[from] std::io::Error),
    /// Neither a file path nor the fallback environment variable is set.
    #[error(
        "No credentials source: set SECRET_FILE to a file path or SECRET_PATH to a JSON payload"
    )]
    MissingSource,
    /// The credentials source is not a JSON object with `user` and `pass` fields.
    #[error("Credentials source is not in the expected format: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
}

#[derive(Deserialize)]
struct RawCredentials {
    user: String,
    pass: String,
}

/// The single username/password pair the service accepts, with the password
/// stored as a salted Argon2 hash.
///
/// Constructed once at startup and never modified afterwards; request
/// handlers see it through [`AuthState`].
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password_hash: String,
}

impl Credentials {
    /// Loads credentials from the configured source.
    ///
    /// When `secret_file` is set to a non-empty path, the file at that
    /// path is read and parsed as JSON. Otherwise (unset or empty) the
    /// `SECRET_PATH` environment variable is expected to hold the JSON
    /// payload itself. Either way the payload must be an object with
    /// string fields `user` and `pass`.
    pub fn load(secret_file: Option<&str>) -> Result<Self, CredentialsError> {
        let payload = match secret_file.filter(|path| !path.is_empty()) {
            Some(path) => std::fs::read_to_string(path)?,
            None => std::env::var(SECRET_PATH_VAR).map_err(|_| CredentialsError::MissingSource)?,
        };
        let raw: RawCredentials = serde_json::from_str(&payload)?;
        Self::from_plaintext(&raw.user, &raw.pass)
    }

    /// Hashes `password` with Argon2 and returns the resulting credential
    /// pair. The plaintext is not retained.
    pub fn from_plaintext(username: &str, password: &str) -> Result<Self, CredentialsError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(CredentialsError::Hash)?
            .to_string();
        Ok(Self {
            username: username.to_string(),
            password_hash,
        })
    }

    /// Checks a username/password pair against the stored hash.
    ///
    /// An unknown username returns `false` without hashing the supplied
    /// password; only the one known user pays the verification cost.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        if username != self.username {
            return false;
        }
        let Ok(parsed_hash) = PasswordHash::new(&self.password_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Returns the username the credentials were loaded for.
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Authentication state shared with the Basic-auth middleware.
#[derive(Clone)]
pub struct AuthState {
    credentials: Credentials,
}

impl AuthState {
    /// Creates a new AuthState holding the loaded credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Returns the loaded credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// JSON body for authentication and API errors.
#[derive(serde::Serialize, Debug, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

/// Basic-auth gate applied in front of every protected route.
///
/// Verifies the `Authorization: Basic` header against the loaded
/// credentials. On success the request proceeds with a [`CurrentUser`]
/// extension; otherwise the client receives a 401 with a Basic challenge
/// and the underlying handler is never invoked.
pub async fn require_basic_auth_middleware(
    State(state): State<Arc<AuthState>>,
    authorization: Option<TypedHeader<Authorization<Basic>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(basic))) = authorization else {
        return unauthorized_response();
    };

    if !state.credentials.verify(basic.username(), basic.password()) {
        return unauthorized_response();
    }

    request
        .extensions_mut()
        .insert(CurrentUser::new(basic.username().to_string()));
    next.run(request).await
}

fn unauthorized_response() -> Response {
    let error_response = ErrorResponse::new(
        "UNAUTHORIZED",
        "Valid credentials are required to access this resource",
    );
    let mut response = (StatusCode::UNAUTHORIZED, Json(error_response)).into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"todo\""),
    );
    response
}
