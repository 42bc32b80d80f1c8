//! Credentials for the two transports.
//!
//! The proxy endpoint authenticates with a 48-character auth key sent as a
//! cookie. The OpenAI completions transport uses a bearer token. Both live in
//! the OS keyring, with environment variables as a fallback.

use crate::core::keyring::KeyringAccessError;
use keyring::Entry;
use std::error::Error;
use std::fmt;
use tracing::debug;

const KEYRING_SERVICE: &str = "diybot";
const AUTH_KEY_ACCOUNT: &str = "auth-key";
const OPENAI_ACCOUNT: &str = "openai";

/// Cookie carrying the proxy auth key.
pub const AUTH_COOKIE_NAME: &str = "auth_key";
pub const AUTH_KEY_ENV: &str = "DIYBOT_AUTH_KEY";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const AUTH_KEY_LEN: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthKeyError {
    Missing,
    WrongLength(usize),
    InvalidCharacter(char),
}

impl fmt::Display for AuthKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthKeyError::Missing => write!(f, "no auth key given"),
            AuthKeyError::WrongLength(len) => write!(
                f,
                "auth key must be {AUTH_KEY_LEN} characters long (got {len})"
            ),
            AuthKeyError::InvalidCharacter(ch) => {
                write!(f, "auth key may only contain letters and digits (found {ch:?})")
            }
        }
    }
}

impl Error for AuthKeyError {}

/// A validated proxy auth key.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthKey(String);

impl AuthKey {
    /// Accepts exactly 48 ASCII letters or digits, in either case.
    pub fn parse(raw: &str) -> Result<Self, AuthKeyError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(AuthKeyError::Missing);
        }
        if let Some(bad) = key.chars().find(|ch| !ch.is_ascii_alphanumeric()) {
            return Err(AuthKeyError::InvalidCharacter(bad));
        }
        if key.len() != AUTH_KEY_LEN {
            return Err(AuthKeyError::WrongLength(key.chars().count()));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for a `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        format!("{AUTH_COOKIE_NAME}={}", self.0)
    }

    /// Last four characters, for status output.
    pub fn redacted(&self) -> String {
        format!("…{}", &self.0[self.0.len() - 4..])
    }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthKey").field(&self.redacted()).finish()
    }
}

/// Which credential a command is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    ProxyAuthKey,
    OpenAiToken,
}

impl CredentialKind {
    fn account(self) -> &'static str {
        match self {
            CredentialKind::ProxyAuthKey => AUTH_KEY_ACCOUNT,
            CredentialKind::OpenAiToken => OPENAI_ACCOUNT,
        }
    }

    fn env_var(self) -> &'static str {
        match self {
            CredentialKind::ProxyAuthKey => AUTH_KEY_ENV,
            CredentialKind::OpenAiToken => OPENAI_KEY_ENV,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CredentialKind::ProxyAuthKey => "proxy auth key",
            CredentialKind::OpenAiToken => "OpenAI API key",
        }
    }
}

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Keyring,
    Environment,
}

pub struct AuthManager {
    use_keyring: bool,
    env: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::new_with_keyring(true)
    }

    /// Construct an AuthManager, optionally disabling keyring access (useful for tests)
    pub fn new_with_keyring(use_keyring: bool) -> Self {
        Self {
            use_keyring,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    #[cfg(test)]
    fn with_env(env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            use_keyring: false,
            env: Box::new(env),
        }
    }

    fn entry(kind: CredentialKind) -> Result<Entry, KeyringAccessError> {
        Entry::new(KEYRING_SERVICE, kind.account()).map_err(KeyringAccessError::from)
    }

    pub fn store(&self, kind: CredentialKind, secret: &str) -> Result<(), KeyringAccessError> {
        if !self.use_keyring {
            return Ok(());
        }
        Self::entry(kind)?
            .set_password(secret)
            .map_err(KeyringAccessError::from)?;
        debug!(credential = kind.label(), "stored credential in keyring");
        Ok(())
    }

    /// Removes the stored credential. Returns false if none was stored.
    pub fn remove(&self, kind: CredentialKind) -> Result<bool, KeyringAccessError> {
        if !self.use_keyring {
            return Ok(false);
        }
        match Self::entry(kind)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Looks the credential up in the keyring, then in the environment.
    ///
    /// A recoverable keyring outage falls through to the environment; other
    /// keyring failures are reported.
    pub fn lookup(
        &self,
        kind: CredentialKind,
    ) -> Result<Option<(String, CredentialSource)>, KeyringAccessError> {
        if self.use_keyring {
            match Self::entry(kind).and_then(|entry| {
                entry.get_password().map_err(KeyringAccessError::from)
            }) {
                Ok(secret) => return Ok(Some((secret, CredentialSource::Keyring))),
                Err(KeyringAccessError::Permanent(keyring::Error::NoEntry)) => {}
                Err(err) if err.is_recoverable() => {
                    debug!(credential = kind.label(), error = %err, "keyring unavailable");
                }
                Err(err) => return Err(err),
            }
        }
        Ok((self.env)(kind.env_var())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(|value| (value, CredentialSource::Environment)))
    }

    /// The proxy auth key, if one is configured and valid.
    pub fn auth_key(&self) -> Result<Option<AuthKey>, Box<dyn Error>> {
        match self.lookup(CredentialKind::ProxyAuthKey)? {
            Some((raw, _)) => Ok(Some(AuthKey::parse(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn openai_token(&self) -> Result<Option<String>, KeyringAccessError> {
        Ok(self
            .lookup(CredentialKind::OpenAiToken)?
            .map(|(token, _)| token))
    }
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFGHIJKL";

    #[test]
    fn accepts_48_alphanumerics_in_any_case() {
        let key = AuthKey::parse(VALID).expect("valid key");
        assert_eq!(key.as_str(), VALID);
        assert_eq!(key.cookie_header(), format!("auth_key={VALID}"));
        assert!(AuthKey::parse(&format!("  {VALID}\n")).is_ok());
    }

    #[test]
    fn rejects_bad_keys() {
        assert_eq!(AuthKey::parse(""), Err(AuthKeyError::Missing));
        assert_eq!(
            AuthKey::parse(&VALID[..47]),
            Err(AuthKeyError::WrongLength(47))
        );
        assert_eq!(
            AuthKey::parse(&format!("{}-", &VALID[..47])),
            Err(AuthKeyError::InvalidCharacter('-'))
        );
        assert_eq!(
            AuthKey::parse(&format!("{}é", &VALID[..47])),
            Err(AuthKeyError::InvalidCharacter('é'))
        );
    }

    #[test]
    fn debug_output_hides_the_key() {
        let key = AuthKey::parse(VALID).expect("valid key");
        let shown = format!("{key:?}");
        assert!(!shown.contains(VALID));
        assert!(shown.contains("IJKL"));
    }

    #[test]
    fn environment_is_the_fallback() {
        let manager = AuthManager::with_env(|name| match name {
            AUTH_KEY_ENV => Some(VALID.to_string()),
            OPENAI_KEY_ENV => Some("  ".to_string()),
            _ => None,
        });
        let key = manager.auth_key().expect("lookup").expect("present");
        assert_eq!(key.as_str(), VALID);
        assert_eq!(
            manager.lookup(CredentialKind::ProxyAuthKey).expect("lookup"),
            Some((VALID.to_string(), CredentialSource::Environment))
        );
        assert_eq!(manager.openai_token().expect("lookup"), None);
    }

    #[test]
    fn invalid_env_key_is_an_error() {
        let manager = AuthManager::with_env(|name| {
            (name == AUTH_KEY_ENV).then(|| "short".to_string())
        });
        assert!(manager.auth_key().is_err());
    }

    #[test]
    fn disabled_keyring_store_and_remove_are_noops() {
        let manager = AuthManager::new_with_keyring(false);
        manager
            .store(CredentialKind::OpenAiToken, "sk-test")
            .expect("store");
        assert!(!manager.remove(CredentialKind::OpenAiToken).expect("remove"));
    }
}
