//! Accounts, passwords and bearer sessions
mod password;
mod service;
mod session;

pub use password::{PasswordError, hash_password, verify_password};
pub use service::{AuthService, Credentials, Registration, Session};
pub use session::{RedisSessionStore, SessionStore, generate_token, token_key};

#[cfg(test)]
pub use session::MemorySessionStore;

/// Lowercase and shape-check an email address
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    let valid = !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && email.len() <= 254;
    valid.then_some(email)
}
