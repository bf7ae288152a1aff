//! Token provider holding a token supplied up front.
//!
//! Suits service processes configured with a token, and tests. The token
//! can be swapped or cleared to mimic sign-in and sign-out.

use std::sync::{PoisonError, RwLock};

use secrecy::SecretString;

use crate::ports::TokenProvider;

#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<SecretString>>,
}

impl StaticTokenProvider {
    pub fn new(token: SecretString) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }

    /// Provider with no token; every connection attempt fails closed.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_option(token: Option<&str>) -> Self {
        Self {
            token: RwLock::new(token.map(|t| SecretString::new(t.to_string()))),
        }
    }

    /// Replaces the token. Existing connections keep the token they were
    /// opened with.
    pub fn set_token(&self, token: SecretString) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl TokenProvider for StaticTokenProvider {
    fn bearer_token(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn returns_configured_token() {
        let provider = StaticTokenProvider::new(SecretString::new("abc".to_string()));
        assert_eq!(provider.bearer_token().unwrap().expose_secret(), "abc");
    }

    #[test]
    fn anonymous_has_no_token() {
        assert!(StaticTokenProvider::anonymous().bearer_token().is_none());
        assert!(StaticTokenProvider::from_option(None).bearer_token().is_none());
    }

    #[test]
    fn token_can_be_swapped_and_cleared() {
        let provider = StaticTokenProvider::anonymous();
        provider.set_token(SecretString::new("later".to_string()));
        assert_eq!(provider.bearer_token().unwrap().expose_secret(), "later");

        provider.clear();
        assert!(provider.bearer_token().is_none());
    }

    #[test]
    fn debug_does_not_leak_token() {
        let provider = StaticTokenProvider::new(SecretString::new("hunter2".to_string()));
        assert!(!format!("{:?}", provider).contains("hunter2"));
    }
}
