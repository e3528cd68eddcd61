/// Errors raised by registration and login. Never distinguishes *why* a
/// login failed in its `Display` text — callers must not leak whether a
/// username exists or the password was wrong (spec.md §7, `AuthFailure`).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("username or password is invalid")]
    InvalidCredentials,
    #[error("username '{0}' is reserved")]
    ReservedUsername(String),
    #[error("username must be at least {0} characters")]
    UsernameTooShort(usize),
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("username '{0}' is already registered")]
    UsernameTaken(String),
    #[error("failed to hash password: {0}")]
    HashFailure(String),
    #[error("account store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("account store is malformed: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;
