//! Service-to-service endpoints authenticated by a shared-secret signature.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use ssobroker_auth::UserId;

use super::error::ApiError;
use crate::state::AppState;

/// Header carrying the hex HMAC-SHA256 of the request body.
pub const SIGNATURE_HEADER: &str = "hash";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLogoutRequest {
    pub user_id: UserId,
}

/// Verify an HMAC-SHA256 request signature.
///
/// `signature_hex` is the lowercase or uppercase hex digest of `body` keyed
/// with `secret`. The comparison is constant-time.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    mac.verify_slice(&expected).is_ok()
}

/// `POST /rpc/logout`
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify_signature(&state.rpc_secret, &body, signature) {
        tracing::warn!("RPC logout rejected: bad signature");
        return Err(ApiError::InvalidSignature);
    }

    let req: RpcLogoutRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    state.exchanger.logout(req.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, body: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
