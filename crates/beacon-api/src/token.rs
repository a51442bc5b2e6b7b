//! Bearer credential plumbing.
//!
//! Token acquisition and refresh belong to the auth layer; this module only
//! defines how a current credential reaches the HTTP client, plus secure
//! at-rest storage using the platform keyring:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use tracing::debug;

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "beacon";

/// Keyring entry key for the API bearer token.
const TOKEN_KEY: &str = "beacon_api_token";

/// Supplies the current bearer credential for backend calls.
///
/// Returning `None` sends the request unauthenticated; the backend will
/// answer 401 and the sweep aborts, which is the intended signal path when
/// no credential is available yet.
pub trait TokenProvider: Send + Sync {
    /// Returns the current bearer token, if any.
    fn token(&self) -> Option<String>;
}

/// A fixed token, useful for tests and one-shot tools.
#[derive(Debug, Clone)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    /// Creates a provider that always returns the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// Creates a provider that returns no token.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Bearer token storage backed by the system keyring.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    /// Stores the bearer token in the system keyring.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyring operation fails.
    pub fn store(token: &str) -> keyring::Result<()> {
        let entry = Entry::new(SERVICE_NAME, TOKEN_KEY)?;
        entry.set_password(token)?;
        debug!("Stored API token in keyring");
        Ok(())
    }

    /// Retrieves the bearer token from the system keyring.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyring operation fails for any reason other
    /// than the entry being absent.
    pub fn get() -> keyring::Result<Option<String>> {
        let entry = Entry::new(SERVICE_NAME, TOKEN_KEY)?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => {
                debug!("No API token found in keyring");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Removes the bearer token from the system keyring.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyring operation fails for any reason other
    /// than the entry being absent.
    pub fn clear() -> keyring::Result<()> {
        let entry = Entry::new(SERVICE_NAME, TOKEN_KEY)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl TokenProvider for KeyringTokenStore {
    fn token(&self) -> Option<String> {
        Self::get().ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token() {
        assert_eq!(StaticToken::new("abc").token(), Some("abc".to_string()));
        assert_eq!(StaticToken::anonymous().token(), None);
    }
}
