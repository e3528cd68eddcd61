//! Account persistence, Argon2id password hashing, and session token
//! lifecycle (spec.md §4.5, §6.2).

pub mod account;
pub mod error;
pub mod service;

pub use account::{Account, AccountStore};
pub use error::{AuthError, AuthResult};
pub use service::{verify_password, AuthService};
