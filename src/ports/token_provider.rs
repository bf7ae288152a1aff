//! TokenProvider port - where the bearer credential comes from.
//!
//! Token storage and refresh belong to the authentication layer. The
//! real-time layer only reads whatever token is current when a connection
//! is created.

use secrecy::SecretString;

pub trait TokenProvider: Send + Sync {
    /// Current bearer token, or `None` when no user is signed in.
    fn bearer_token(&self) -> Option<SecretString>;
}
