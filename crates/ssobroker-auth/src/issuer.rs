//! Authorization code issuance and single-use redemption.

use std::sync::Arc;
use std::time::Duration;

use ssobroker_store::{DynSessionStore, SessionValue, StoreError, StoreResult};

use crate::code::UniqueCodeGenerator;
use crate::types::UserId;

/// Builds the store key for `code` issued to `app`.
pub(crate) fn code_key(app: &str, code: &str) -> String {
    format!("code.{app}.{code}")
}

/// Issues codes into the session store and redeems them exactly once.
///
/// Codes are namespaced by application: a code issued for one app is not
/// found when redeemed under another.
#[derive(Clone)]
pub struct CodeIssuer {
    store: DynSessionStore,
    generator: Arc<dyn UniqueCodeGenerator>,
}

impl CodeIssuer {
    /// Creates an issuer over `store` drawing values from `generator`.
    pub fn new(store: DynSessionStore, generator: Arc<dyn UniqueCodeGenerator>) -> Self {
        Self { store, generator }
    }

    /// Issues a fresh code for `user_id` in `app`, valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub async fn issue(&self, app: &str, user_id: UserId, ttl: Duration) -> StoreResult<String> {
        let code = self.generator.next_code();
        self.store
            .put(&code_key(app, &code), SessionValue::UserId(user_id), ttl)
            .await?;
        Ok(code)
    }

    /// Redeems `code` for `app`, consuming it.
    ///
    /// Returns `None` if the code is unknown, spent or expired. Of any number
    /// of concurrent redemptions of one code, at most one returns the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the entry does not hold a user id.
    pub async fn redeem(&self, app: &str, code: &str) -> StoreResult<Option<UserId>> {
        let key = code_key(app, code);
        match self.store.take(&key).await? {
            Some(value) => value
                .as_user_id()
                .map(Some)
                .ok_or_else(|| StoreError::corrupt(key)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for CodeIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeIssuer").finish_non_exhaustive()
    }
}
