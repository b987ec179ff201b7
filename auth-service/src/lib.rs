// Argent Auth Service Library

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod security;
pub mod services;
pub mod storage;

pub use error::{AuthError, Result};

use std::sync::Arc;

use crate::services::{Authenticator, SessionValidator, TwoFactorService};

/// Shared application state handed to every handler.
///
/// Built once by the composition root; the services inside share the same
/// storage trait objects, selected at startup (in-process or
/// Postgres/Redis-backed).
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub sessions: Arc<SessionValidator>,
    pub two_factor: Arc<TwoFactorService>,
}
