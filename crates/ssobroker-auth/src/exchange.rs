//! The token exchanger: login, refresh, logout and browser resume flows.
//!
//! All flows share one session store. Codes are single-use and rotate on
//! every refresh; a logout mark blocks refreshes for a bounded time.
//!
//! ```text
//! Unauthenticated ── login ──────► code (interactive ttl)
//!                 ── login_api ──► code (refresh ttl) + access token
//! code ── refresh ──► new code (refresh ttl) + access token
//! logout ──► mark (revocation ttl) ──► refresh fails with UserRevoked
//! ```

use std::sync::Arc;

use ssobroker_store::DynSessionStore;

use crate::code::UniqueCodeGenerator;
use crate::config::SessionPolicy;
use crate::error::ExchangeError;
use crate::identity::IdentityVerifier;
use crate::issuer::CodeIssuer;
use crate::revocation::RevocationRegistry;
use crate::token::TokenSigner;
use crate::types::{IssuedTokens, LoginCode, TokenClaims, User, UserId};
use crate::ExchangeResult;

/// Orchestrates code issuance, redemption, token signing and revocation.
///
/// Cheap to clone; clones share the same store and collaborators.
#[derive(Clone)]
pub struct TokenExchanger {
    issuer: CodeIssuer,
    revocations: RevocationRegistry,
    verifier: Arc<dyn IdentityVerifier>,
    signer: Arc<dyn TokenSigner>,
    policy: SessionPolicy,
}

impl TokenExchanger {
    /// Creates an exchanger.
    pub fn new(
        store: DynSessionStore,
        generator: Arc<dyn UniqueCodeGenerator>,
        verifier: Arc<dyn IdentityVerifier>,
        signer: Arc<dyn TokenSigner>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            issuer: CodeIssuer::new(store.clone(), generator),
            revocations: RevocationRegistry::new(store),
            verifier,
            signer,
            policy,
        }
    }

    /// Returns the lifetimes this exchanger issues with.
    #[must_use]
    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Interactive login. Returns a short-lived code for the redirect.
    ///
    /// A successful login clears any logout mark for the user.
    ///
    /// # Errors
    ///
    /// Returns `CredentialsInvalid` on a mismatch, or an infrastructure error.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(
        &self,
        app: &str,
        username: &str,
        password: &str,
    ) -> ExchangeResult<LoginCode> {
        let Some(user) = self.verifier.verify(username, password).await? else {
            tracing::info!("Login rejected: invalid credentials");
            return Err(ExchangeError::CredentialsInvalid);
        };

        self.revocations.clear(user.id).await?;
        let code = self
            .issuer
            .issue(app, user.id, self.policy.interactive_code_ttl)
            .await?;

        tracing::info!(user_id = user.id, "Interactive login succeeded");
        Ok(LoginCode {
            user_id: user.id,
            code,
        })
    }

    /// Programmatic login. Returns a refresh code and an access token.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` on a mismatch, or an infrastructure error.
    #[tracing::instrument(skip(self, password))]
    pub async fn login_api(
        &self,
        app: &str,
        username: &str,
        password: &str,
    ) -> ExchangeResult<IssuedTokens> {
        let Some(user) = self.verifier.verify(username, password).await? else {
            tracing::info!("API login rejected: no matching user");
            return Err(ExchangeError::UserNotFound);
        };

        self.revocations.clear(user.id).await?;
        let tokens = self.issue_tokens(app, &user).await?;

        tracing::info!(user_id = user.id, "API login succeeded");
        Ok(tokens)
    }

    /// Redeems a refresh code for a rotated code and a fresh access token.
    ///
    /// The presented code is consumed before the logout mark is checked, so
    /// a refused refresh still spends the code.
    ///
    /// # Errors
    ///
    /// Returns `CodeInvalidOrExpired`, `UserRevoked` or `UserNotFound` for
    /// expected refusals, or an infrastructure error.
    #[tracing::instrument(skip(self, refresh_code))]
    pub async fn refresh(&self, app: &str, refresh_code: &str) -> ExchangeResult<IssuedTokens> {
        let Some(user_id) = self.issuer.redeem(app, refresh_code).await? else {
            tracing::debug!("Refresh rejected: unknown or expired code");
            return Err(ExchangeError::CodeInvalidOrExpired);
        };

        if self.revocations.is_logged_out(user_id).await? {
            tracing::info!(user_id, "Refresh rejected: user logged out");
            return Err(ExchangeError::UserRevoked { user_id });
        }

        let user = self.lookup(user_id).await?;
        let tokens = self.issue_tokens(app, &user).await?;

        tracing::debug!(user_id, "Refresh succeeded");
        Ok(tokens)
    }

    /// Logs `user_id` out of every application.
    ///
    /// Outstanding codes stay in the store but can no longer be refreshed
    /// while the mark lives. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self, user_id: UserId) -> ExchangeResult<()> {
        self.revocations
            .mark_logged_out(user_id, self.policy.revocation_ttl)
            .await?;
        tracing::info!(user_id, "User logged out");
        Ok(())
    }

    /// Issues an interactive code for a browser that already holds a session.
    ///
    /// Unlike [`login`](Self::login) this never clears a logout mark.
    ///
    /// # Errors
    ///
    /// Returns `UserRevoked` or `UserNotFound` for expected refusals, or an
    /// infrastructure error.
    #[tracing::instrument(skip(self))]
    pub async fn resume(&self, app: &str, user_id: UserId) -> ExchangeResult<String> {
        if self.revocations.is_logged_out(user_id).await? {
            tracing::info!(user_id, "Resume rejected: user logged out");
            return Err(ExchangeError::UserRevoked { user_id });
        }

        let user = self.lookup(user_id).await?;
        let code = self
            .issuer
            .issue(app, user.id, self.policy.interactive_code_ttl)
            .await?;
        Ok(code)
    }

    async fn lookup(&self, user_id: UserId) -> ExchangeResult<User> {
        match self.verifier.lookup(user_id).await? {
            Some(user) => Ok(user),
            None => {
                tracing::warn!(user_id, "User vanished from identity backend");
                Err(ExchangeError::UserNotFound)
            }
        }
    }

    async fn issue_tokens(&self, app: &str, user: &User) -> ExchangeResult<IssuedTokens> {
        let refresh_code = self
            .issuer
            .issue(app, user.id, self.policy.refresh_code_ttl)
            .await?;
        let claims = TokenClaims::for_user(user, app, self.policy.access_token_ttl)?;
        let access_token = self.signer.sign(&claims)?;

        Ok(IssuedTokens {
            refresh_code,
            access_token,
        })
    }
}

impl std::fmt::Debug for TokenExchanger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExchanger")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use ssobroker_store::{InMemorySessionStore, SessionStore, SessionValue, StoreError};

    use crate::code::UuidV7CodeGenerator;
    use crate::identity::IdentityError;
    use crate::token::SignerError;

    /// Plain-text directory; keeps tests off argon2.
    struct MockVerifier {
        users: HashMap<String, (String, User)>,
    }

    impl MockVerifier {
        fn new() -> Self {
            let mut users = HashMap::new();
            users.insert(
                "admin".to_string(),
                ("password".to_string(), User::new(1, "admin").with_permissions(vec![1, 2, 3])),
            );
            users.insert(
                "alice".to_string(),
                ("secret".to_string(), User::new(2, "alice")),
            );
            Self { users }
        }
    }

    #[async_trait]
    impl IdentityVerifier for MockVerifier {
        async fn verify(
            &self,
            username: &str,
            password: &str,
        ) -> Result<Option<User>, IdentityError> {
            Ok(self
                .users
                .get(username)
                .filter(|(expected, _)| expected == password)
                .map(|(_, user)| user.clone()))
        }

        async fn lookup(&self, user_id: UserId) -> Result<Option<User>, IdentityError> {
            Ok(self
                .users
                .values()
                .find(|(_, user)| user.id == user_id)
                .map(|(_, user)| user.clone()))
        }
    }

    /// Directory whose backend is down.
    struct FailingVerifier;

    #[async_trait]
    impl IdentityVerifier for FailingVerifier {
        async fn verify(&self, _: &str, _: &str) -> Result<Option<User>, IdentityError> {
            Err(IdentityError::unavailable("directory down"))
        }

        async fn lookup(&self, _: UserId) -> Result<Option<User>, IdentityError> {
            Err(IdentityError::unavailable("directory down"))
        }
    }

    /// Emits `token-<user>-<n>` so tests can tell tokens apart.
    #[derive(Default)]
    struct CountingSigner {
        issued: AtomicU64,
    }

    impl TokenSigner for CountingSigner {
        fn sign(&self, claims: &TokenClaims) -> Result<String, SignerError> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-{}-{n}", claims.user_id))
        }
    }

    struct FailingSigner;

    impl TokenSigner for FailingSigner {
        fn sign(&self, _claims: &TokenClaims) -> Result<String, SignerError> {
            Err(SignerError::encoding_error("boom"))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl SessionStore for BrokenStore {
        async fn put(&self, _: &str, _: SessionValue, _: Duration) -> ssobroker_store::StoreResult<()> {
            Err(StoreError::unavailable("down"))
        }
        async fn get(&self, _: &str) -> ssobroker_store::StoreResult<Option<SessionValue>> {
            Err(StoreError::unavailable("down"))
        }
        async fn delete(&self, _: &str) -> ssobroker_store::StoreResult<()> {
            Err(StoreError::unavailable("down"))
        }
        async fn take(&self, _: &str) -> ssobroker_store::StoreResult<Option<SessionValue>> {
            Err(StoreError::unavailable("down"))
        }
        async fn purge_expired(&self) -> ssobroker_store::StoreResult<u64> {
            Err(StoreError::unavailable("down"))
        }
        async fn entry_count(&self) -> usize {
            0
        }
    }

    fn exchanger_with(store: DynSessionStore, signer: Arc<dyn TokenSigner>) -> TokenExchanger {
        TokenExchanger::new(
            store,
            Arc::new(UuidV7CodeGenerator::new()),
            Arc::new(MockVerifier::new()),
            signer,
            SessionPolicy::default(),
        )
    }

    fn exchanger() -> TokenExchanger {
        exchanger_with(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(CountingSigner::default()),
        )
    }

    #[tokio::test]
    async fn test_login_issues_code() {
        let exchanger = exchanger();
        let login = exchanger.login("app1", "admin", "password").await.unwrap();
        assert_eq!(login.user_id, 1);
        assert_eq!(login.code.len(), 32);
    }

    #[tokio::test]
    async fn test_login_with_bad_password_is_credentials_invalid() {
        let exchanger = exchanger();
        let err = exchanger.login("app1", "admin", "nope").await.unwrap_err();
        assert!(matches!(err, ExchangeError::CredentialsInvalid));
        assert!(err.is_expected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interactive_code_lives_ten_seconds() {
        let exchanger = exchanger();
        let login = exchanger.login("app1", "admin", "password").await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        let err = exchanger.refresh("app1", &login.code).await.unwrap_err();
        assert!(matches!(err, ExchangeError::CodeInvalidOrExpired));
    }

    #[tokio::test]
    async fn test_interactive_code_is_redeemable_by_refresh() {
        let exchanger = exchanger();
        let login = exchanger.login("app1", "admin", "password").await.unwrap();

        let tokens = exchanger.refresh("app1", &login.code).await.unwrap();
        assert!(tokens.access_token.starts_with("token-1-"));
        assert_ne!(tokens.refresh_code, login.code);
    }

    #[tokio::test]
    async fn test_login_api_returns_code_and_token() {
        let exchanger = exchanger();
        let tokens = exchanger.login_api("app1", "alice", "secret").await.unwrap();
        assert_eq!(tokens.access_token, "token-2-0");
        assert_eq!(tokens.refresh_code.len(), 32);
    }

    #[tokio::test]
    async fn test_login_api_with_bad_password_is_user_not_found() {
        let exchanger = exchanger();
        let err = exchanger.login_api("app1", "alice", "wrong").await.unwrap_err();
        assert!(matches!(err, ExchangeError::UserNotFound));
    }

    #[tokio::test]
    async fn test_refresh_rotates_code() {
        let exchanger = exchanger();
        let first = exchanger.login_api("app1", "admin", "password").await.unwrap();
        let second = exchanger.refresh("app1", &first.refresh_code).await.unwrap();

        assert_ne!(first.refresh_code, second.refresh_code);
        assert_ne!(first.access_token, second.access_token);

        let err = exchanger.refresh("app1", &first.refresh_code).await.unwrap_err();
        assert!(matches!(err, ExchangeError::CodeInvalidOrExpired));
        assert!(exchanger.refresh("app1", &second.refresh_code).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_under_other_app_fails() {
        let exchanger = exchanger();
        let tokens = exchanger.login_api("app1", "admin", "password").await.unwrap();

        let err = exchanger.refresh("app2", &tokens.refresh_code).await.unwrap_err();
        assert!(matches!(err, ExchangeError::CodeInvalidOrExpired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_code_lives_sixty_minutes() {
        let exchanger = exchanger();
        let tokens = exchanger.login_api("app1", "admin", "password").await.unwrap();

        tokio::time::advance(Duration::from_secs(3600) - Duration::from_millis(1)).await;
        let rotated = exchanger.refresh("app1", &tokens.refresh_code).await.unwrap();

        tokio::time::advance(Duration::from_secs(3600)).await;
        let err = exchanger.refresh("app1", &rotated.refresh_code).await.unwrap_err();
        assert!(matches!(err, ExchangeError::CodeInvalidOrExpired));
    }

    #[tokio::test]
    async fn test_logout_blocks_refresh_and_spends_code() {
        let exchanger = exchanger();
        let tokens = exchanger.login_api("app1", "admin", "password").await.unwrap();

        exchanger.logout(1).await.unwrap();
        let err = exchanger.refresh("app1", &tokens.refresh_code).await.unwrap_err();
        assert!(matches!(err, ExchangeError::UserRevoked { user_id: 1 }));

        // The code was consumed by the refused attempt.
        let err = exchanger.refresh("app1", &tokens.refresh_code).await.unwrap_err();
        assert!(matches!(err, ExchangeError::CodeInvalidOrExpired));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let exchanger = exchanger();
        exchanger.logout(1).await.unwrap();
        exchanger.logout(1).await.unwrap();
        exchanger.logout(404).await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_only_affects_that_user() {
        let exchanger = exchanger();
        let admin = exchanger.login_api("app1", "admin", "password").await.unwrap();
        let alice = exchanger.login_api("app1", "alice", "secret").await.unwrap();

        exchanger.logout(1).await.unwrap();
        assert!(exchanger.refresh("app1", &admin.refresh_code).await.is_err());
        assert!(exchanger.refresh("app1", &alice.refresh_code).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_supersedes_logout() {
        let exchanger = exchanger();
        exchanger.logout(1).await.unwrap();

        let tokens = exchanger.login_api("app1", "admin", "password").await.unwrap();
        assert!(exchanger.refresh("app1", &tokens.refresh_code).await.is_ok());
    }

    #[tokio::test]
    async fn test_interactive_login_supersedes_logout() {
        let exchanger = exchanger();
        exchanger.logout(1).await.unwrap();

        let login = exchanger.login("app1", "admin", "password").await.unwrap();
        assert!(exchanger.refresh("app1", &login.code).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_revocation_mark_lapses() {
        let exchanger = exchanger();
        exchanger.logout(1).await.unwrap();

        let code = exchanger.issuer.issue("app1", 1, Duration::from_secs(7200)).await.unwrap();
        tokio::time::advance(Duration::from_secs(61 * 60)).await;
        assert!(exchanger.refresh("app1", &code).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_for_vanished_user_is_user_not_found() {
        let exchanger = exchanger();
        let code = exchanger
            .issuer
            .issue("app1", 99, Duration::from_secs(60))
            .await
            .unwrap();

        let err = exchanger.refresh("app1", &code).await.unwrap_err();
        assert!(matches!(err, ExchangeError::UserNotFound));
    }

    #[tokio::test]
    async fn test_resume_issues_code() {
        let exchanger = exchanger();
        let code = exchanger.resume("app1", 2).await.unwrap();
        let tokens = exchanger.refresh("app1", &code).await.unwrap();
        assert!(tokens.access_token.starts_with("token-2-"));
    }

    #[tokio::test]
    async fn test_resume_refuses_revoked_user_and_keeps_mark() {
        let exchanger = exchanger();
        exchanger.logout(1).await.unwrap();

        let err = exchanger.resume("app1", 1).await.unwrap_err();
        assert!(matches!(err, ExchangeError::UserRevoked { user_id: 1 }));
        assert!(exchanger.revocations.is_logged_out(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_resume_refuses_unknown_user() {
        let exchanger = exchanger();
        let err = exchanger.resume("app1", 99).await.unwrap_err();
        assert!(matches!(err, ExchangeError::UserNotFound));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_expected() {
        let exchanger = exchanger_with(Arc::new(BrokenStore), Arc::new(CountingSigner::default()));

        let err = exchanger.login("app1", "admin", "password").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Store(_)));
        assert!(!err.is_expected());

        let err = exchanger.refresh("app1", "anything").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Store(_)));

        let err = exchanger.logout(1).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Store(_)));
    }

    #[tokio::test]
    async fn test_verifier_failure_is_not_expected() {
        let exchanger = TokenExchanger::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(UuidV7CodeGenerator::new()),
            Arc::new(FailingVerifier),
            Arc::new(CountingSigner::default()),
            SessionPolicy::default(),
        );

        let err = exchanger.login("app1", "admin", "password").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Identity(_)));
        assert!(!err.is_expected());

        let err = exchanger.login_api("app1", "admin", "password").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Identity(_)));
        assert!(!err.is_expected());

        let code = exchanger
            .issuer
            .issue("app1", 1, Duration::from_secs(60))
            .await
            .unwrap();
        let err = exchanger.refresh("app1", &code).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Identity(_)));
        assert!(!err.is_expected());

        // The failed refresh already spent its code.
        let err = exchanger.refresh("app1", &code).await.unwrap_err();
        assert!(matches!(err, ExchangeError::CodeInvalidOrExpired));
    }

    #[tokio::test]
    async fn test_out_of_range_token_lifetime_is_signer_error() {
        let policy = SessionPolicy {
            access_token_ttl: Duration::from_secs(2_000_000 * 365 * 24 * 3600),
            ..SessionPolicy::default()
        };
        let exchanger = TokenExchanger::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(UuidV7CodeGenerator::new()),
            Arc::new(MockVerifier::new()),
            Arc::new(CountingSigner::default()),
            policy,
        );

        let err = exchanger.login_api("app1", "admin", "password").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Signer(SignerError::EncodingError { .. })));
        assert!(!err.is_expected());
    }

    #[tokio::test]
    async fn test_signer_failure_propagates() {
        let exchanger = exchanger_with(Arc::new(InMemorySessionStore::new()), Arc::new(FailingSigner));

        let err = exchanger.login_api("app1", "admin", "password").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Signer(_)));
        assert!(!err.is_expected());
    }
}
