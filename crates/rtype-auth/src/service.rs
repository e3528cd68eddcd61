//! Registration, login, and token lifecycle. Grounded on
//! `original_source/server/Sessions/Auth/AuthService.cpp`, with its bcrypt
//! hashing swapped for Argon2id per spec.md §4.5 (memory-hard, ≥2 iterations,
//! ≥64 MiB, 16-byte random salt, 32-byte output) and its plain random-hex
//! session tokens kept as-is (an opaque token validated by set membership,
//! not a JWT — the spec asks for nothing more).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::Rng;

use crate::account::{Account, AccountStore};
use crate::error::{AuthError, AuthResult};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 4;

/// Argon2id parameters: 2 iterations, 64 MiB memory, single-lane, 32-byte output.
fn hasher() -> Argon2<'static> {
    let params = Params::new(64 * 1024, 2, 1, Some(32)).expect("static argon2 params are valid");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

fn is_reserved_username(username: &str) -> bool {
    username == "guest" || username.starts_with("Guest_")
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn random_token(username: &str) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..32)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect();
    format!("{username}_{suffix}")
}

struct State {
    accounts: HashMap<String, Account>,
    /// token -> username, so a disconnect can revoke without the caller
    /// tracking the mapping itself.
    tokens: HashMap<String, String>,
}

/// Owns the account store and the set of currently-valid session tokens.
/// A single instance is shared (behind an `Arc`) across every connection
/// handler; all mutation goes through its internal mutex.
pub struct AuthService {
    store: AccountStore,
    state: Mutex<State>,
}

impl AuthService {
    pub fn new(accounts_path: impl Into<std::path::PathBuf>) -> AuthResult<Self> {
        let store = AccountStore::new(accounts_path);
        let accounts = store.load()?;
        Ok(Self {
            store,
            state: Mutex::new(State {
                accounts,
                tokens: HashMap::new(),
            }),
        })
    }

    /// Registers a new account. Rejects reserved names, too-short
    /// credentials, and usernames already on file.
    pub fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<String>,
    ) -> AuthResult<()> {
        if is_reserved_username(username) {
            return Err(AuthError::ReservedUsername(username.to_string()));
        }
        if username.len() < MIN_USERNAME_LEN {
            return Err(AuthError::UsernameTooShort(MIN_USERNAME_LEN));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort(MIN_PASSWORD_LEN));
        }

        let mut state = self.state.lock().expect("auth state poisoned");
        if state.accounts.contains_key(username) {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }

        let password_hash = hash_password(password)?;
        let account = Account {
            username: username.to_string(),
            password_hash,
            email,
            created_at: now_unix_seconds(),
            last_login: 0,
            extra: serde_json::Map::new(),
        };
        state.accounts.insert(username.to_string(), account);
        self.store.save(&state.accounts)?;
        tracing::info!(username, "account registered");
        Ok(())
    }

    /// Verifies credentials and, on success, issues a fresh session token and
    /// updates `last_login`. Never reveals whether the username or the
    /// password was the problem (spec.md §7, `AuthFailure`).
    pub fn login(&self, username: &str, password: &str) -> AuthResult<String> {
        let mut state = self.state.lock().expect("auth state poisoned");
        let matches = state
            .accounts
            .get(username)
            .map(|account| verify_password(password, &account.password_hash))
            .unwrap_or(false);
        if !matches {
            tracing::warn!(username, "login failed");
            return Err(AuthError::InvalidCredentials);
        }
        let account = state.accounts.get_mut(username).expect("checked above");
        account.last_login = now_unix_seconds();
        self.store.save(&state.accounts)?;

        let token = random_token(username);
        state.tokens.insert(token.clone(), username.to_string());
        tracing::info!(username, "login succeeded");
        Ok(token)
    }

    pub fn validate_token(&self, token: &str) -> bool {
        self.state.lock().expect("auth state poisoned").tokens.contains_key(token)
    }

    /// The username a valid token was issued to, or `None` if the token is unknown.
    pub fn username_for_token(&self, token: &str) -> Option<String> {
        self.state
            .lock()
            .expect("auth state poisoned")
            .tokens
            .get(token)
            .cloned()
    }

    /// Revoked on disconnect (spec.md §4.5): the token no longer validates.
    pub fn revoke_token(&self, token: &str) {
        self.state.lock().expect("auth state poisoned").tokens.remove(token);
    }

    pub fn active_token_count(&self) -> usize {
        self.state.lock().expect("auth state poisoned").tokens.len()
    }
}

/// Returns only `true`/`false`; never distinguishes a missing account from a
/// wrong password (spec.md §8 testable property).
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    hasher().verify_password(password.as_bytes(), &parsed).is_ok()
}

fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    hasher()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::HashFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (AuthService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let service = AuthService::new(dir.path().join("accounts.json")).unwrap();
        (service, dir)
    }

    #[test]
    fn register_then_login_succeeds() {
        let (service, _dir) = service();
        service.register("nova", "hunter22", None).unwrap();
        let token = service.login("nova", "hunter22").unwrap();
        assert!(service.validate_token(&token));
        assert_eq!(service.username_for_token(&token).as_deref(), Some("nova"));
    }

    #[test]
    fn login_with_wrong_password_fails() {
        let (service, _dir) = service();
        service.register("nova", "hunter22", None).unwrap();
        assert!(matches!(
            service.login("nova", "wrongpass"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn login_with_unknown_username_fails_the_same_way() {
        let (service, _dir) = service();
        let err_known = service.register("nova", "hunter22", None).map(|_| ());
        assert!(err_known.is_ok());
        let err = service.login("ghost", "whatever").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn reserved_usernames_cannot_register() {
        let (service, _dir) = service();
        assert!(matches!(
            service.register("guest", "hunter22", None),
            Err(AuthError::ReservedUsername(_))
        ));
        assert!(matches!(
            service.register("Guest_42", "hunter22", None),
            Err(AuthError::ReservedUsername(_))
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (service, _dir) = service();
        service.register("nova", "hunter22", None).unwrap();
        assert!(matches!(
            service.register("nova", "different1", None),
            Err(AuthError::UsernameTaken(_))
        ));
    }

    #[test]
    fn revoked_token_no_longer_validates() {
        let (service, _dir) = service();
        service.register("nova", "hunter22", None).unwrap();
        let token = service.login("nova", "hunter22").unwrap();
        service.revoke_token(&token);
        assert!(!service.validate_token(&token));
    }

    #[test]
    fn verify_password_rejects_any_other_password() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(verify_password("correct-horse", &hash));
        assert!(!verify_password("incorrect-horse", &hash));
    }

    #[test]
    fn accounts_persist_across_service_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        {
            let service = AuthService::new(&path).unwrap();
            service.register("nova", "hunter22", None).unwrap();
        }
        let service = AuthService::new(&path).unwrap();
        assert!(service.login("nova", "hunter22").is_ok());
    }
}
