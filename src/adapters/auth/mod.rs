//! Authentication adapters.
//!
//! Implementations of the `TokenProvider` port:
//!
//! - `static_token` - Token supplied by configuration or tests

mod static_token;

pub use static_token::StaticTokenProvider;
