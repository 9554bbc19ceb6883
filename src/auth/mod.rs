//! Authentication core.
//!
//! Flow Overview: every request goes through the [`validator::SessionValidator`].
//! Without a valid session the [`registry::ProviderRegistry`] resolves the active
//! provider and the caller is redirected to its login entry. The SSO provider is
//! driven by the [`sso::handshake::SsoHandshake`] state machine; its result is
//! checked against the [`directory::DirectoryClient`] before a session exists.
//!
//! State transitions never touch the request or the session store directly.
//! They return a [`transition::Transition`] describing the session mutation and
//! the cookies to set or remove; [`service::AuthService`] applies it.

pub mod config;
pub mod cookies;
pub mod directory;
pub mod error;
pub mod hooks;
pub mod issuer;
pub mod logout;
pub mod provider;
pub mod registry;
pub mod request;
pub mod service;
pub mod session;
pub mod site;
pub mod sso;
pub mod token;
pub mod transition;
pub mod validator;
mod utils;

pub use error::{AuthError, AuthResult, Disposition, ProtocolError};
pub use config::AuthConfig;
pub use service::AuthService;
