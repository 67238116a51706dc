//! Session-bound CSRF tokens for state-changing requests.

use axum::{
    Json,
    body::{Body, to_bytes},
    extract::Request,
    http::Method,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use subtle::ConstantTimeEq;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, CsrfTokenResponse};
use crate::constants::{session as keys, tokens};
use crate::db::repositories::admin::generate_token;

pub const CSRF_HEADER: &str = "x-csrf-token";

const CSRF_FIELD: &str = "_csrf_token";

/// Largest JSON body buffered while looking for an embedded token.
const MAX_BUFFERED_BODY: usize = 1024 * 1024;

/// Returns the live token, minting a new one if it is absent or expired.
pub async fn ensure_token(session: &Session) -> Result<String, ApiError> {
    let token = session.get::<String>(keys::CSRF_TOKEN).await?;
    let expires = session.get::<i64>(keys::CSRF_EXPIRES).await?;

    match (token, expires) {
        (Some(token), Some(expires)) if Utc::now().timestamp_millis() < expires => Ok(token),
        _ => regenerate(session).await,
    }
}

/// Replaces the session token unconditionally.
pub async fn regenerate(session: &Session) -> Result<String, ApiError> {
    let token = generate_token();
    let expires = Utc::now() + Duration::seconds(tokens::CSRF_TTL_SECONDS);

    session.insert(keys::CSRF_TOKEN, &token).await?;
    session
        .insert(keys::CSRF_EXPIRES, expires.timestamp_millis())
        .await?;
    Ok(token)
}

pub async fn verify(session: &Session, candidate: Option<&str>) -> Result<bool, ApiError> {
    let Some(candidate) = candidate.filter(|c| !c.is_empty()) else {
        return Ok(false);
    };

    let token = session.get::<String>(keys::CSRF_TOKEN).await?;
    let expires = session.get::<i64>(keys::CSRF_EXPIRES).await?;

    let (Some(token), Some(expires)) = (token, expires) else {
        return Ok(false);
    };
    if Utc::now().timestamp_millis() >= expires {
        return Ok(false);
    }

    Ok(token.as_bytes().ct_eq(candidate.as_bytes()).into())
}

/// Rejects POSTs that do not echo the session token, either in the
/// `X-CSRF-Token` header or as `_csrf_token` in the JSON body.
pub async fn csrf_middleware(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() != Method::POST {
        return Ok(next.run(request).await);
    }

    let header = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if header.is_some() {
        if !verify(&session, header.as_deref()).await? {
            return Err(reject());
        }
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BUFFERED_BODY)
        .await
        .map_err(|_| reject())?;

    let embedded = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|value| {
            value
                .get(CSRF_FIELD)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        });

    if !verify(&session, embedded.as_deref()).await? {
        return Err(reject());
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

fn reject() -> ApiError {
    metrics::counter!("csrf_rejections_total").increment(1);
    tracing::debug!("Rejected request without a valid CSRF token");
    ApiError::csrf_invalid()
}

/// GET /api/csrf
pub async fn get_token(
    session: Session,
) -> Result<Json<ApiResponse<CsrfTokenResponse>>, ApiError> {
    let csrf_token = ensure_token(&session).await?;
    Ok(Json(ApiResponse::success(CsrfTokenResponse { csrf_token })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn token_is_stable_until_regenerated() {
        let session = session();

        let first = ensure_token(&session).await.unwrap();
        assert_eq!(first.len(), tokens::TOKEN_BYTES * 2);
        assert_eq!(ensure_token(&session).await.unwrap(), first);

        let second = regenerate(&session).await.unwrap();
        assert_ne!(first, second);
        assert!(!verify(&session, Some(&first)).await.unwrap());
        assert!(verify(&session, Some(&second)).await.unwrap());
    }

    #[tokio::test]
    async fn missing_or_expired_tokens_fail() {
        let session = session();
        assert!(!verify(&session, Some("anything")).await.unwrap());

        let token = ensure_token(&session).await.unwrap();
        assert!(!verify(&session, None).await.unwrap());
        assert!(!verify(&session, Some("")).await.unwrap());

        session
            .insert(keys::CSRF_EXPIRES, Utc::now().timestamp_millis() - 1)
            .await
            .unwrap();
        assert!(!verify(&session, Some(&token)).await.unwrap());

        let renewed = ensure_token(&session).await.unwrap();
        assert_ne!(renewed, token);
    }
}
