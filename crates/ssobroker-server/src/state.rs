use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use ssobroker_auth::TokenExchanger;

use crate::config::AppConfig;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub exchanger: TokenExchanger,
    pub cookie_key: Key,
    pub cookie: Arc<CookieSettings>,
    /// Mount point of the browser routes, without a trailing slash.
    pub url_prefix: Arc<str>,
    pub rpc_secret: Arc<str>,
}

/// Session cookie attributes.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub max_age: Duration,
}

impl AppState {
    pub fn new(exchanger: TokenExchanger, cfg: &AppConfig) -> Self {
        Self {
            exchanger,
            cookie_key: derive_cookie_key(&cfg.cookie.secret),
            cookie: Arc::new(CookieSettings {
                name: cfg.cookie.name.clone(),
                max_age: cfg.cookie.max_age,
            }),
            url_prefix: Arc::from(cfg.server.url_prefix.as_str()),
            rpc_secret: Arc::from(cfg.rpc.secret.as_str()),
        }
    }
}

/// Stretches the configured secret to the 64 bytes the cookie key needs.
fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
